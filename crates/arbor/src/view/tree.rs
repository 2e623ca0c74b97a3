use tracing::debug;

use super::{ViewId, ViewKind, Views};
use crate::error::{Error, Result};

impl Views {
    /// True if `view` is a strict descendant of `ancestor`.
    pub fn is_descendant(&self, view: ViewId, ancestor: ViewId) -> bool {
        let mut cur = self.nodes.get(view).and_then(|n| n.superview);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.nodes.get(c).and_then(|n| n.superview);
        }
        false
    }

    /// Append `child` to `parent`'s subviews.
    ///
    /// A stale `child` id is ignored. A focusable child makes the parent and
    /// its ancestors focusable.
    pub fn add(&mut self, parent: ViewId, child: ViewId) -> Result<()> {
        let Some(c) = self.nodes.get(child) else {
            return Ok(());
        };
        self.get(parent)?;
        if matches!(c.kind, ViewKind::Adornment { .. }) {
            return Err(Error::InvalidArgument(format!(
                "adornment {} cannot be added as a subview",
                self.name(child)
            )));
        }
        if c.superview.is_some() {
            return Err(Error::AlreadyAttached(self.name(child).to_string()));
        }
        if child == parent || self.is_descendant(parent, child) {
            return Err(Error::WouldCreateCycle(format!(
                "{} -> {}",
                self.name(parent),
                self.name(child)
            )));
        }
        let child_can_focus = c.can_focus;
        debug!(parent = self.name(parent), child = self.name(child), "add");

        let p = self.get_mut(parent)?;
        p.subviews.push(child);
        p.layout_needed = true;
        if child_can_focus {
            let mut cur = Some(parent);
            while let Some(a) = cur {
                let n = self.get_mut(a)?;
                n.can_focus = true;
                cur = n.superview;
            }
        }
        self.get_mut(child)?.superview = Some(parent);
        self.set_needs_display(child)
    }

    /// Detach `child` from `parent`. Does nothing if `child` is not one of
    /// `parent`'s subviews.
    ///
    /// Focus held inside `child` is dropped and moved to the first candidate
    /// in `parent`; focus held elsewhere stays put. The vacated frame is
    /// damaged, and a parent left without subviews can no longer take focus.
    pub fn remove(&mut self, parent: ViewId, child: ViewId) -> Result<()> {
        if !self.get(parent)?.subviews.contains(&child) {
            return Ok(());
        }
        debug!(parent = self.name(parent), child = self.name(child), "remove");

        let vacated = self.get(child)?.frame;
        let held = self.get(parent)?.focused == Some(child);
        self.unfocus_subtree(child)?;
        let p = self.get_mut(parent)?;
        p.subviews.retain(|c| *c != child);
        if held {
            p.focused = None;
        }
        p.layout_needed = true;
        let empty = p.subviews.is_empty();
        if empty {
            p.can_focus = false;
        }
        self.get_mut(child)?.superview = None;
        self.set_needs_display_region(parent, vacated)?;

        if self.get(parent)?.has_focus {
            let refocused = held && self.focus_first(parent)?;
            if !refocused && empty {
                self.relinquish_focus(parent)?;
            }
        }
        Ok(())
    }

    /// Detach every subview of `parent`, last first.
    pub fn remove_all(&mut self, parent: ViewId) -> Result<()> {
        let subs = self.get(parent)?.subviews.clone();
        for c in subs.into_iter().rev() {
            self.remove(parent, c)?;
        }
        Ok(())
    }

    /// Detach `id` and delete it, its adornments and its whole subtree from
    /// the arena.
    pub fn destroy(&mut self, id: ViewId) -> Result<()> {
        if let Some(p) = self.get(id)?.superview {
            self.remove(p, id)?;
        }
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(n) = self.nodes.remove(cur) else {
                continue;
            };
            stack.extend(n.subviews);
            if let Some(a) = n.adornments {
                stack.extend([a.margin, a.border, a.padding]);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use geom::Rect;

    use super::*;

    #[test]
    fn add_and_remove() -> Result<()> {
        let mut v = Views::new();
        let p = v.create("p");
        let c = v.create("c");
        v.add(p, c)?;
        assert_eq!(v.subviews(p)?, &[c]);
        assert_eq!(v.superview(c)?, Some(p));
        assert!(matches!(v.add(p, c), Err(Error::AlreadyAttached(_))));

        let g = v.create("g");
        v.add(c, g)?;
        v.remove(c, g)?;
        assert!(matches!(v.add(g, p), Err(Error::WouldCreateCycle(_))));

        v.remove(p, c)?;
        assert!(v.subviews(p)?.is_empty());
        assert_eq!(v.superview(c)?, None);
        // Removing again is a no-op.
        v.remove(p, c)?;
        Ok(())
    }

    #[test]
    fn stale_child_is_ignored() -> Result<()> {
        let mut v = Views::new();
        let p = v.create("p");
        let c = v.create("c");
        v.destroy(c)?;
        v.add(p, c)?;
        assert!(v.subviews(p)?.is_empty());
        Ok(())
    }

    #[test]
    fn removing_last_child_clears_can_focus() -> Result<()> {
        let mut v = Views::new();
        let p = v.create("p");
        v.set_can_focus(p, true)?;
        let c = v.create("c");
        v.set_can_focus(c, true)?;
        v.add(p, c)?;
        assert!(v.get(p)?.can_focus());
        v.remove(p, c)?;
        assert!(!v.get(p)?.can_focus());
        Ok(())
    }

    #[test]
    fn removing_unfocused_sibling_keeps_focus() -> Result<()> {
        let mut v = Views::new();
        let top = v.create("top");
        let mut kids = Vec::new();
        for name in ["a", "b", "c"] {
            let k = v.create(name);
            v.set_can_focus(k, true)?;
            v.add(top, k)?;
            kids.push(k);
        }
        v.set_focus(top, kids[1])?;
        v.remove(top, kids[2])?;
        assert_eq!(v.most_focused(top), kids[1]);
        assert!(v.get(kids[1])?.has_focus());
        assert!(!v.get(kids[0])?.has_focus());

        v.remove(top, kids[1])?;
        assert_eq!(v.most_focused(top), kids[0]);
        v.check_invariants(top)?;
        Ok(())
    }

    #[test]
    fn remove_damages_vacated_frame() -> Result<()> {
        let mut v = Views::new();
        let p = v.create("p");
        v.set_frame(p, Rect::new(0, 0, 20, 20))?;
        let c = v.create("c");
        v.add(p, c)?;
        v.set_frame(c, Rect::new(3, 4, 2, 2))?;
        v.clear_needs_display(p)?;
        v.remove(p, c)?;
        assert_eq!(v.get(p)?.need_display(), Rect::new(3, 4, 2, 2));
        Ok(())
    }

    #[test]
    fn destroy_subtree() -> Result<()> {
        let mut v = Views::new();
        let p = v.create("p");
        let c = v.create("c");
        let g = v.create("g");
        v.add(p, c)?;
        v.add(c, g)?;
        assert_eq!(v.len(), 12);
        v.destroy(c)?;
        assert_eq!(v.len(), 4);
        assert!(!v.contains(g));
        assert!(v.subviews(p)?.is_empty());
        Ok(())
    }
}
