//! Integration tests for layout and drawing through the application.

#[cfg(test)]
mod tests {
    use arbor::{
        error::{Error, Result},
        geom::{Point, Rect, Thickness},
        layout::{Dim, Placement, Pos},
        testing::{
            Harness,
            widgets::{Fill, Label, Log, Recorder},
        },
        view::{AdornmentKind, Arrangement},
    };
    use proptest::prelude::*;

    #[test]
    fn begin_takes_over_and_draws() -> Result<()> {
        let mut h = Harness::new(10, 3);
        let v = h.views_mut();
        let top = v.create_toplevel("top");
        let l = v.create_with("l", Label::new("hello"));
        v.add(top, l)?;
        v.set_frame(l, Rect::new(1, 1, 5, 1))?;
        assert!(!h.screen.is_active());
        h.begin(top)?;
        assert!(h.screen.is_active());
        assert_eq!(h.screen.inits(), 1);
        assert_eq!(h.snapshot(), "\n hello\n");
        assert_eq!(h.views().frame(top)?, Rect::new(0, 0, 10, 3));
        h.end()?;
        assert!(!h.screen.is_active());
        Ok(())
    }

    #[test]
    fn border_adornment() -> Result<()> {
        let mut h = Harness::new(6, 3);
        let v = h.views_mut();
        let top = v.create_toplevel("top");
        v.set_thickness(top, AdornmentKind::Border, Thickness::uniform(1))?;
        let l = v.create_with("l", Label::new("abcdef"));
        v.add(top, l)?;
        v.set_placement(l, Placement::fill())?;
        h.begin(top)?;
        assert_eq!(h.snapshot(), "┌────┐\n│abcd│\n└────┘");
        assert_eq!(h.views().frame(l)?, Rect::new(0, 0, 4, 1));
        Ok(())
    }

    #[test]
    fn resize_relayouts() -> Result<()> {
        let mut h = Harness::new(10, 4);
        let v = h.views_mut();
        let top = v.create_toplevel("top");
        let bar = v.create_with("bar", Fill('='));
        v.add(top, bar)?;
        v.set_placement(bar, Placement::new(0, Pos::anchor_end(1)?, Dim::fill(0)?, 1))?;
        h.begin(top)?;
        assert_eq!(h.row(3), "==========");

        h.resize(6, 3)?;
        assert_eq!(h.views().frame(top)?, Rect::new(0, 0, 6, 3));
        assert_eq!(h.views().frame(bar)?, Rect::new(0, 2, 6, 1));
        assert_eq!(h.snapshot(), "\n\n======");
        Ok(())
    }

    #[test]
    fn only_damaged_views_redraw() -> Result<()> {
        let log = Log::default();
        let mut h = Harness::new(10, 4);
        let v = h.views_mut();
        let top = v.create_toplevel("top");
        let a = v.create_with("a", Recorder::new("a", &log));
        let b = v.create_with("b", Recorder::new("b", &log));
        v.add(top, a)?;
        v.add(top, b)?;
        v.set_frame(a, Rect::new(0, 0, 4, 1))?;
        v.set_frame(b, Rect::new(0, 1, 4, 1))?;
        h.begin(top)?;
        let draws = |h: &Harness, id| -> Result<usize> { Ok(h.views().widget::<Recorder>(id)?.draws) };
        assert_eq!((draws(&h, a)?, draws(&h, b)?), (1, 1));

        h.pump()?;
        assert_eq!((draws(&h, a)?, draws(&h, b)?), (1, 1));

        h.views_mut().set_needs_display(a)?;
        h.pump()?;
        assert_eq!((draws(&h, a)?, draws(&h, b)?), (2, 1));
        assert!(!h.views().needs_redraw(top)?);
        Ok(())
    }

    #[test]
    fn moving_a_view_repaints_what_it_left() -> Result<()> {
        let mut h = Harness::new(6, 2);
        let v = h.views_mut();
        let top = v.create_toplevel("top");
        let l = v.create_with("l", Label::new("xy"));
        v.add(top, l)?;
        v.set_frame(l, Rect::new(0, 0, 2, 1))?;
        h.begin(top)?;
        assert_eq!(h.row(0), "xy    ");
        h.views_mut().set_frame(l, Rect::new(3, 1, 2, 1))?;
        h.pump()?;
        assert_eq!(h.snapshot(), "\n   xy");
        Ok(())
    }

    #[test]
    fn cursor_follows_focus() -> Result<()> {
        let log = Log::default();
        let mut h = Harness::new(10, 4);
        let v = h.views_mut();
        let top = v.create_toplevel("top");
        let a = v.create_with("a", Recorder::new("a", &log).cursor_at(Point::new(2, 0)));
        let b = v.create_with("b", Recorder::new("b", &log));
        v.add(top, a)?;
        v.add(top, b)?;
        v.set_frame(a, Rect::new(1, 1, 4, 1))?;
        v.set_frame(b, Rect::new(1, 2, 4, 1))?;
        v.set_can_focus(a, true)?;
        v.set_can_focus(b, true)?;
        h.begin(top)?;
        assert_eq!(h.cursor(), Some(Point::new(3, 1)));
        h.views_mut().set_focus(top, b)?;
        h.pump()?;
        assert_eq!(h.cursor(), None);
        Ok(())
    }

    #[test]
    fn degenerate_screen_is_refused() -> Result<()> {
        let mut h = Harness::new(0, 5);
        let top = h.views_mut().create_toplevel("top");
        assert!(matches!(h.begin(top), Err(Error::InvalidArgument(_))));
        assert!(!h.screen.is_active());
        Ok(())
    }

    /// Paint `children` over a 12x6 screen, then repaint child `changed`
    /// with `ch`. Returns the screen after the incremental update, and the
    /// screen of a fresh application showing the final state.
    fn incremental_and_full(children: &[(Rect, char)], changed: usize, ch: char) -> Result<(String, String)> {
        let build = |h: &mut Harness, changed: Option<(usize, char)>| -> Result<_> {
            let v = h.views_mut();
            let top = v.create_toplevel("top");
            let mut ids = Vec::new();
            for (i, &(r, c)) in children.iter().enumerate() {
                let c = match changed {
                    Some((j, ch)) if j == i => ch,
                    _ => c,
                };
                let id = v.create_with("child", Fill(c));
                v.add(top, id)?;
                v.set_frame(id, r)?;
                v.set_arrangement(id, Arrangement::OVERLAPPED)?;
                ids.push(id);
            }
            Ok((top, ids))
        };

        let mut inc = Harness::new(12, 6);
        let (top, ids) = build(&mut inc, None)?;
        inc.begin(top)?;
        let id = ids[changed];
        inc.views_mut().widget_mut::<Fill>(id)?.0 = ch;
        inc.views_mut().set_needs_display(id)?;
        inc.pump()?;

        let mut full = Harness::new(12, 6);
        let (top, _) = build(&mut full, Some((changed, ch)))?;
        full.begin(top)?;
        Ok((inc.snapshot(), full.snapshot()))
    }

    fn child() -> impl Strategy<Value = (Rect, char)> {
        (0i32..12, 0i32..6, 1u32..8, 1u32..5, prop::sample::select(vec!['a', 'b', 'c', 'd']))
            .prop_map(|(x, y, w, h, c)| (Rect::new(x, y, w, h), c))
    }

    proptest! {
        #[test]
        fn damage_matches_full_repaint(
            children in prop::collection::vec(child(), 1..6),
            pick in any::<prop::sample::Index>(),
            ch in prop::sample::select(vec!['#', '%', '@']),
        ) {
            let changed = pick.index(children.len());
            let (inc, full) = incremental_and_full(&children, changed, ch)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(inc, full);
        }
    }
}
