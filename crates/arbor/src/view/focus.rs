use tracing::debug;

use super::{ViewId, Views};
use crate::error::{Error, Result};

/// Which end of a subtree receives focus when focus enters it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    /// The first focusable subview.
    First,
    /// The last focusable subview.
    Last,
}

impl Views {
    /// Allow or forbid focus.
    ///
    /// Allowing focus also allows it on every ancestor. Forbidding it drops
    /// any focus held in the subtree, and cascades to every descendant; their
    /// previous setting returns when focus is allowed again.
    pub fn set_can_focus(&mut self, id: ViewId, value: bool) -> Result<()> {
        if value {
            self.get_mut(id)?.can_focus = true;
            self.restore_can_focus(id)?;
            let mut cur = self.get(id)?.superview;
            while let Some(c) = cur {
                let n = self.get_mut(c)?;
                n.can_focus = true;
                cur = n.superview;
            }
            return Ok(());
        }
        if !self.get(id)?.can_focus {
            return Ok(());
        }
        self.get_mut(id)?.can_focus = false;
        let mut stack = self.get(id)?.subviews.clone();
        while let Some(c) = stack.pop() {
            let n = self.get_mut(c)?;
            if n.can_focus {
                n.saved_can_focus = Some(true);
                n.can_focus = false;
            }
            stack.extend(n.subviews.iter().copied());
        }
        self.relinquish_focus(id)
    }

    /// Undo a cascaded `can_focus = false` below `id`.
    fn restore_can_focus(&mut self, id: ViewId) -> Result<()> {
        let mut stack = self.get(id)?.subviews.clone();
        while let Some(c) = stack.pop() {
            let n = self.get_mut(c)?;
            if let Some(saved) = n.saved_can_focus.take() {
                n.can_focus = saved;
            }
            stack.extend(n.subviews.iter().copied());
        }
        Ok(())
    }

    /// Show or hide a view. Hiding drops focus held in its subtree.
    pub fn set_visible(&mut self, id: ViewId, value: bool) -> Result<()> {
        if self.get(id)?.visible == value {
            return Ok(());
        }
        self.get_mut(id)?.visible = value;
        self.damage_frame_in_container(id)?;
        if !value {
            self.relinquish_focus(id)?;
        }
        Ok(())
    }

    /// Enable or disable input to a view. Disabling drops focus held in its
    /// subtree.
    pub fn set_enabled(&mut self, id: ViewId, value: bool) -> Result<()> {
        if self.get(id)?.enabled == value {
            return Ok(());
        }
        self.get_mut(id)?.enabled = value;
        self.set_needs_display(id)?;
        if !value {
            self.relinquish_focus(id)?;
        }
        Ok(())
    }

    /// Damage the area a view covers in its superview.
    fn damage_frame_in_container(&mut self, id: ViewId) -> Result<()> {
        let n = self.get(id)?;
        match n.superview {
            Some(p) => {
                let f = n.frame;
                self.set_needs_display_region(p, f)
            }
            None => self.set_needs_display(id),
        }
    }

    /// Focus `view`, which must lie in the subtree of `target`.
    ///
    /// Does nothing if `view` cannot take focus right now or already has it.
    /// Otherwise fails if `view` is not a descendant of `target`. Focus moves
    /// away from the previous holder at every level, enters `view`'s first
    /// focusable subview, and propagates up to the root.
    pub fn set_focus(&mut self, target: ViewId, view: ViewId) -> Result<()> {
        let n = self.get(view)?;
        if !n.focusable() || n.has_focus {
            return Ok(());
        }
        if !self.is_descendant(view, target) {
            return Err(Error::NotDescendant(format!(
                "{} is not inside {}",
                self.name(view),
                self.name(target)
            )));
        }
        let parent = self
            .get(view)?
            .superview
            .ok_or_else(|| Error::Internal("descendant without superview".into()))?;
        debug!(view = self.name(view), "set_focus");
        self.focus_child(parent, view, Entry::First)
    }

    /// Focus the first focusable subview of `id`. Returns false if there is
    /// none.
    pub fn focus_first(&mut self, id: ViewId) -> Result<bool> {
        self.focus_edge(id, Entry::First)
    }

    /// Focus the last focusable subview of `id`. Returns false if there is
    /// none.
    pub fn focus_last(&mut self, id: ViewId) -> Result<bool> {
        self.focus_edge(id, Entry::Last)
    }

    /// Shared implementation of `focus_first` and `focus_last`.
    fn focus_edge(&mut self, id: ViewId, entry: Entry) -> Result<bool> {
        let n = self.get(id)?;
        if !n.visible {
            return Ok(false);
        }
        let mut subs = n.subviews.clone();
        if entry == Entry::Last {
            subs.reverse();
        }
        for c in subs {
            if self.get(c)?.focusable() {
                self.focus_child(id, c, entry)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Move focus forward within `id`.
    ///
    /// The focused subview gets the first chance to advance internally. When
    /// the end is reached focus is cleared below `id` and false is returned,
    /// so a caller can wrap around by calling again.
    pub fn focus_next(&mut self, id: ViewId) -> Result<bool> {
        self.focus_step(id, Entry::First)
    }

    /// Move focus backward within `id`. See [`Views::focus_next`].
    pub fn focus_prev(&mut self, id: ViewId) -> Result<bool> {
        self.focus_step(id, Entry::Last)
    }

    /// Shared implementation of `focus_next` and `focus_prev`.
    fn focus_step(&mut self, id: ViewId, entry: Entry) -> Result<bool> {
        let n = self.get(id)?;
        if !n.visible || n.subviews.is_empty() {
            return Ok(false);
        }
        if n.focused.is_none() {
            return self.focus_edge(id, entry);
        }
        let mut subs = n.subviews.clone();
        if entry == Entry::Last {
            subs.reverse();
        }
        let mut passed = false;
        for c in subs {
            let cn = self.get(c)?;
            if cn.has_focus {
                if self.focus_step(c, entry)? {
                    return Ok(true);
                }
                passed = true;
                continue;
            }
            if passed && cn.focusable() {
                self.focus_child(id, c, entry)?;
                return Ok(true);
            }
        }
        if let Some(f) = self.get(id)?.focused {
            self.unfocus_subtree(f)?;
            self.get_mut(id)?.focused = None;
        }
        Ok(false)
    }

    /// Make `child` the focused subview of `parent`, propagate focus to the
    /// root, and let focus enter `child`'s own subviews.
    fn focus_child(&mut self, parent: ViewId, child: ViewId, entry: Entry) -> Result<()> {
        let mut cur = child;
        let mut up = Some(parent);
        while let Some(p) = up {
            let prev = self.get(p)?.focused;
            if prev != Some(cur) {
                if let Some(prev) = prev {
                    self.unfocus_subtree(prev)?;
                }
                self.get_mut(p)?.focused = Some(cur);
            }
            self.set_has_focus(cur, true)?;
            cur = p;
            up = self.get(p)?.superview;
        }
        self.set_has_focus(cur, true)?;
        if self.get(child)?.focused.is_none() {
            self.focus_edge(child, entry)?;
        }
        Ok(())
    }

    /// Clear focus along the focus chain starting at `id`.
    pub(crate) fn unfocus_subtree(&mut self, id: ViewId) -> Result<()> {
        let mut cur = Some(id);
        while let Some(c) = cur {
            self.set_has_focus(c, false)?;
            cur = self.get_mut(c)?.focused.take();
        }
        Ok(())
    }

    /// Drop focus held in `id` and hand it to the next candidate in its
    /// superview. A superview left with nothing focusable, and which cannot
    /// hold focus itself, gives up focus in turn.
    pub(crate) fn relinquish_focus(&mut self, id: ViewId) -> Result<()> {
        if !self.get(id)?.has_focus {
            return Ok(());
        }
        self.unfocus_subtree(id)?;
        let Some(p) = self.get(id)?.superview else {
            return Ok(());
        };
        let pn = self.get_mut(p)?;
        if pn.focused == Some(id) {
            pn.focused = None;
        }
        if !self.focus_first(p)? && !self.get(p)?.can_focus {
            self.relinquish_focus(p)?;
        }
        Ok(())
    }

    /// Update `has_focus`, damaging the view when it changes.
    fn set_has_focus(&mut self, id: ViewId, value: bool) -> Result<()> {
        let n = self.get_mut(id)?;
        if n.has_focus != value {
            n.has_focus = value;
            self.set_needs_display(id)?;
        }
        Ok(())
    }

    /// The deepest view on the focus chain below `id`, or `id` itself.
    pub fn most_focused(&self, id: ViewId) -> ViewId {
        let mut cur = id;
        while let Some(f) = self.nodes.get(cur).and_then(|n| n.focused) {
            cur = f;
        }
        cur
    }

    /// The focus chain from `id` down to its most focused descendant.
    pub fn focus_chain(&self, id: ViewId) -> Vec<ViewId> {
        let mut out = vec![id];
        let mut cur = id;
        while let Some(f) = self.nodes.get(cur).and_then(|n| n.focused) {
            out.push(f);
            cur = f;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// top -> [a, box -> [b, c], d]; every leaf focusable.
    fn fixture() -> Result<(Views, ViewId, [ViewId; 5])> {
        let mut v = Views::new();
        let top = v.create_toplevel("top");
        let a = v.create("a");
        let bx = v.create("box");
        let b = v.create("b");
        let c = v.create("c");
        let d = v.create("d");
        for leaf in [a, b, c, d] {
            v.set_can_focus(leaf, true)?;
        }
        v.add(bx, b)?;
        v.add(bx, c)?;
        v.add(top, a)?;
        v.add(top, bx)?;
        v.add(top, d)?;
        Ok((v, top, [a, bx, b, c, d]))
    }

    #[test]
    fn traversal_wraps_through_containers() -> Result<()> {
        let (mut v, top, [a, bx, b, c, d]) = fixture()?;
        assert!(v.focus_first(top)?);
        assert_eq!(v.most_focused(top), a);
        assert!(v.focus_next(top)?);
        assert_eq!(v.focus_chain(top), vec![top, bx, b]);
        assert!(v.focus_next(top)?);
        assert_eq!(v.most_focused(top), c);
        assert!(v.focus_next(top)?);
        assert_eq!(v.most_focused(top), d);
        assert!(!v.get(b)?.has_focus());
        assert!(!v.get(bx)?.has_focus());
        // End of the line: focus is cleared, calling again wraps.
        assert!(!v.focus_next(top)?);
        assert_eq!(v.get(top)?.focused(), None);
        assert!(v.focus_next(top)?);
        assert_eq!(v.most_focused(top), a);
        v.check_invariants(top)?;
        Ok(())
    }

    #[test]
    fn traversal_backwards() -> Result<()> {
        let (mut v, top, [a, _, _, c, d]) = fixture()?;
        assert!(v.focus_prev(top)?);
        assert_eq!(v.most_focused(top), d);
        assert!(v.focus_prev(top)?);
        assert_eq!(v.most_focused(top), c);
        v.set_focus(top, a)?;
        assert!(!v.focus_prev(top)?);
        v.check_invariants(top)?;
        Ok(())
    }

    #[test]
    fn set_focus_rules() -> Result<()> {
        let (mut v, top, [a, bx, _, c, d]) = fixture()?;
        v.set_focus(top, c)?;
        assert_eq!(v.focus_chain(top), vec![top, bx, c]);
        v.check_invariants(top)?;

        // Already focused: no-op.
        v.set_focus(top, c)?;
        // Not a descendant of the target.
        assert!(matches!(v.set_focus(bx, d), Err(Error::NotDescendant(_))));
        // Unfocusable views are ignored before the ancestry check.
        v.set_enabled(a, false)?;
        v.set_focus(bx, a)?;
        assert_eq!(v.most_focused(top), c);
        Ok(())
    }

    #[test]
    fn hiding_moves_focus() -> Result<()> {
        let (mut v, top, [a, _, b, c, _]) = fixture()?;
        v.set_focus(top, b)?;
        v.set_visible(b, false)?;
        assert_eq!(v.most_focused(top), c);
        v.set_can_focus(c, false)?;
        assert!(!v.get(c)?.has_focus());
        v.check_invariants(top)?;
        assert!(v.get(top)?.has_focus());
        v.set_focus(top, a)?;
        assert_eq!(v.most_focused(top), a);
        Ok(())
    }

    #[test]
    fn can_focus_cascade_restores() -> Result<()> {
        let (mut v, top, [_, bx, b, c, _]) = fixture()?;
        v.set_focus(top, b)?;
        v.set_can_focus(bx, false)?;
        assert!(!v.get(b)?.can_focus());
        assert!(!v.get(bx)?.has_focus());
        assert!(v.get(top)?.focused().is_some());
        v.set_can_focus(bx, true)?;
        assert!(v.get(b)?.can_focus());
        assert!(v.get(c)?.can_focus());
        v.check_invariants(top)?;
        Ok(())
    }
}
