//! Integration tests for hit-testing and focus bookkeeping on the view tree.

#[cfg(test)]
mod tests {
    use arbor::{
        error::{Error, Result},
        geom::{Point, Rect, Thickness},
        view::{AdornmentKind, ViewId, Views},
    };
    use proptest::prelude::*;

    #[test]
    fn hits_through_adornments() -> Result<()> {
        let mut v = Views::new();
        let root = v.create_toplevel("root");
        v.set_frame(root, Rect::new(0, 0, 10, 10))?;
        for kind in AdornmentKind::ALL {
            v.set_thickness(root, kind, Thickness::uniform(1))?;
        }
        let child = v.create("child");
        v.add(root, child)?;
        v.set_frame(child, Rect::new(0, 0, 1, 1))?;

        let a = v.adornments(root)?;
        assert_eq!(v.views_under_mouse(root, Point::new(3, 3))?, vec![root, child]);
        assert_eq!(v.views_under_mouse(root, Point::new(0, 0))?, vec![root, a.margin]);
        assert_eq!(v.views_under_mouse(root, Point::new(1, 5))?, vec![root, a.border]);
        assert_eq!(v.views_under_mouse(root, Point::new(7, 7))?, vec![root, a.padding]);
        assert_eq!(v.views_under_mouse(root, Point::new(4, 4))?, vec![root]);
        assert!(v.views_under_mouse(root, Point::new(10, 10))?.is_empty());
        assert_eq!(v.view_at(root, Point::new(0, 0))?, Some(root));
        Ok(())
    }

    #[test]
    fn coordinates_round_trip() -> Result<()> {
        let mut v = Views::new();
        let root = v.create_toplevel("root");
        v.set_frame(root, Rect::new(0, 0, 20, 20))?;
        v.set_thickness(root, AdornmentKind::Border, Thickness::uniform(1))?;
        let child = v.create("child");
        v.add(root, child)?;
        v.set_frame(child, Rect::new(4, 2, 6, 6))?;
        v.set_thickness(child, AdornmentKind::Padding, Thickness::new(1, 2, 0, 0))?;

        let p = Point::new(3, 1);
        let s = v.view_to_screen(child, p)?;
        assert_eq!(s, Point::new(9, 6));
        assert_eq!(v.screen_to_view(child, s)?, p);
        assert_eq!(v.screen_frame(child)?, Rect::new(5, 3, 6, 6));
        Ok(())
    }

    /// One mutation of a small tree.
    #[derive(Debug, Clone)]
    enum Op {
        Add(usize, usize),
        Remove(usize),
        CanFocus(usize, bool),
        Visible(usize, bool),
        Next,
        Prev,
        Focus(usize),
    }

    /// Views other than the root.
    const POOL: usize = 6;

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..=POOL, 1..=POOL).prop_map(|(p, c)| Op::Add(p, c)),
            (1..=POOL).prop_map(Op::Remove),
            (1..=POOL, any::<bool>()).prop_map(|(c, b)| Op::CanFocus(c, b)),
            (1..=POOL, any::<bool>()).prop_map(|(c, b)| Op::Visible(c, b)),
            Just(Op::Next),
            Just(Op::Prev),
            (1..=POOL).prop_map(Op::Focus),
        ]
    }

    fn apply(v: &mut Views, ids: &[ViewId], op: &Op) -> Result<()> {
        let root = ids[0];
        match *op {
            Op::Add(p, c) => v.add(ids[p], ids[c]),
            Op::Remove(c) => match v.superview(ids[c])? {
                Some(p) => v.remove(p, ids[c]),
                None => Ok(()),
            },
            Op::CanFocus(c, b) => v.set_can_focus(ids[c], b),
            Op::Visible(c, b) => v.set_visible(ids[c], b),
            Op::Next => v.focus_next(root).map(drop),
            Op::Prev => v.focus_prev(root).map(drop),
            Op::Focus(c) => v.set_focus(root, ids[c]),
        }
    }

    proptest! {
        #[test]
        fn focus_stays_consistent(ops in prop::collection::vec(op(), 1..40)) {
            let mut v = Views::new();
            let mut ids = vec![v.create_toplevel("root")];
            for i in 0..POOL {
                ids.push(v.create(&format!("v{i}")));
            }
            for op in &ops {
                let before = v.most_focused(ids[0]);
                if let Err(e) = apply(&mut v, &ids, op) {
                    prop_assert!(
                        matches!(
                            e,
                            Error::AlreadyAttached(_) | Error::WouldCreateCycle(_) | Error::NotDescendant(_)
                        ),
                        "{:?} failed: {}",
                        op,
                        e
                    );
                }
                if let Op::Remove(c) = *op
                    && before != ids[c]
                    && !v.is_descendant(before, ids[c])
                    && v.get(before).is_ok_and(|n| n.can_focus())
                {
                    prop_assert_eq!(v.most_focused(ids[0]), before, "{:?} moved focus", op);
                }
                let check = v.check_invariants(ids[0]);
                prop_assert!(check.is_ok(), "after {:?}: {:?}", op, check);
                let chain = v.focus_chain(ids[0]);
                for w in chain.windows(2) {
                    prop_assert!(v.get(w[1]).map(|n| n.has_focus()).unwrap_or(false));
                    prop_assert_eq!(v.superview(w[1]).ok().flatten(), Some(w[0]));
                }
            }
        }
    }
}
