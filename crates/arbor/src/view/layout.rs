use std::collections::HashMap;

use geom::{Rect, Size};
use tracing::debug;

use super::{ViewId, Views};
use crate::{
    error::{Error, Result},
    layout::{Dim, FrameLookup, Placement, Pos},
};

impl FrameLookup for Views {
    fn frame_of(&self, view: ViewId) -> Option<Rect> {
        self.nodes.get(view).map(|n| n.frame)
    }
}

impl Views {
    /// Set a view's frame directly, switching it to absolute layout.
    pub fn set_frame(&mut self, id: ViewId, frame: Rect) -> Result<()> {
        self.get_mut(id)?.placement = None;
        self.apply_frame(id, frame)
    }

    /// Lay a view out relative to its superview.
    pub fn set_placement(&mut self, id: ViewId, placement: Placement) -> Result<()> {
        self.get_mut(id)?.placement = Some(placement);
        self.request_layout(id)
    }

    /// Replace the x expression, keeping the rest of the placement.
    pub fn set_x(&mut self, id: ViewId, x: impl Into<Pos>) -> Result<()> {
        let mut p = self.current_placement(id)?;
        p.x = x.into();
        self.set_placement(id, p)
    }

    /// Replace the y expression, keeping the rest of the placement.
    pub fn set_y(&mut self, id: ViewId, y: impl Into<Pos>) -> Result<()> {
        let mut p = self.current_placement(id)?;
        p.y = y.into();
        self.set_placement(id, p)
    }

    /// Replace the width expression, keeping the rest of the placement.
    pub fn set_width(&mut self, id: ViewId, width: impl Into<Dim>) -> Result<()> {
        let mut p = self.current_placement(id)?;
        p.width = width.into();
        self.set_placement(id, p)
    }

    /// Replace the height expression, keeping the rest of the placement.
    pub fn set_height(&mut self, id: ViewId, height: impl Into<Dim>) -> Result<()> {
        let mut p = self.current_placement(id)?;
        p.height = height.into();
        self.set_placement(id, p)
    }

    /// The placement of a view, or an absolute one matching its frame.
    fn current_placement(&self, id: ViewId) -> Result<Placement> {
        let n = self.get(id)?;
        Ok(n.placement.clone().unwrap_or_else(|| {
            Placement::new(
                n.frame.tl.x,
                n.frame.tl.y,
                n.frame.w as i32,
                n.frame.h as i32,
            )
        }))
    }

    /// Flag the container of `id` for layout.
    fn request_layout(&mut self, id: ViewId) -> Result<()> {
        let target = self.get(id)?.superview.unwrap_or(id);
        self.get_mut(target)?.layout_needed = true;
        Ok(())
    }

    /// True if `id` or any descendant awaits layout.
    pub fn needs_layout(&self, id: ViewId) -> Result<bool> {
        let n = self.get(id)?;
        if n.layout_needed {
            return Ok(true);
        }
        for &c in &n.subviews {
            if self.needs_layout(c)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Store a new frame, damaging the old and new areas in the superview.
    pub(crate) fn apply_frame(&mut self, id: ViewId, frame: Rect) -> Result<()> {
        let n = self.get(id)?;
        let old = n.frame;
        if old == frame {
            return Ok(());
        }
        let superview = n.superview;
        {
            let n = self.get_mut(id)?;
            n.frame = frame;
            if old.size() != frame.size() {
                n.layout_needed = true;
            }
        }
        self.sync_adornments(id)?;
        match superview {
            Some(p) => {
                self.set_needs_display_region(p, old)?;
                self.set_needs_display_region(p, frame)?;
            }
            None => self.set_needs_display(id)?,
        }
        self.set_needs_display(id)
    }

    /// Lay out a root view against a screen of `size`, then its subtree.
    pub fn layout_root(&mut self, id: ViewId, size: Size) -> Result<()> {
        if let Some(p) = self.get(id)?.placement.clone() {
            let frame = p.compute_frame(size, &*self)?;
            self.apply_frame(id, frame)?;
        }
        self.layout_subviews(id)
    }

    /// Compute the frames of every relatively placed subview of `id`, then
    /// recurse. Subviews are processed so that a view's frame is fixed
    /// before any sibling that references it is resolved.
    pub fn layout_subviews(&mut self, id: ViewId) -> Result<()> {
        let content = self.bounds(id)?.size();
        let order = self.layout_order(id)?;
        debug!(view = self.name(id), ?content, "layout");
        for c in &order {
            if let Some(p) = self.get(*c)?.placement.clone() {
                let frame = p.compute_frame(content, &*self)?;
                self.apply_frame(*c, frame)?;
            }
        }
        self.get_mut(id)?.layout_needed = false;
        for c in order {
            self.layout_subviews(c)?;
        }
        Ok(())
    }

    /// Order subviews so that referenced siblings come first, keeping the
    /// subview order among independent views.
    fn layout_order(&self, id: ViewId) -> Result<Vec<ViewId>> {
        let subs = &self.get(id)?.subviews;
        let index: HashMap<ViewId, usize> = subs.iter().enumerate().map(|(i, v)| (*v, i)).collect();
        let mut indegree = vec![0usize; subs.len()];
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); subs.len()];
        for (i, c) in subs.iter().enumerate() {
            let Some(p) = &self.get(*c)?.placement else {
                continue;
            };
            for dep in p.dependencies() {
                if dep == id || dep == *c {
                    continue;
                }
                let Some(&j) = index.get(&dep) else {
                    return Err(Error::Layout(format!(
                        "{} references {}, which is not a sibling",
                        self.name(*c),
                        self.name(dep)
                    )));
                };
                edges[j].push(i);
                indegree[i] += 1;
            }
        }

        let mut order = Vec::with_capacity(subs.len());
        let mut done = vec![false; subs.len()];
        while order.len() < subs.len() {
            let Some(next) = (0..subs.len()).find(|&i| !done[i] && indegree[i] == 0) else {
                return Err(Error::Layout(format!(
                    "dependency cycle among subviews of {}",
                    self.name(id)
                )));
            };
            done[next] = true;
            order.push(subs[next]);
            for &k in &edges[next] {
                indegree[k] -= 1;
            }
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_siblings() -> Result<()> {
        let mut v = Views::new();
        let top = v.create_toplevel("top");
        let a = v.create("a");
        let b = v.create("b");
        v.add(top, b)?;
        v.add(top, a)?;
        v.set_placement(a, Placement::new(2, 1, 10, 3))?;
        // b sits to the right of a and is added first.
        v.set_placement(
            b,
            Placement::new(Pos::right(a) + 1, Pos::top(a), Dim::fill(0)?, Dim::height(a)),
        )?;
        v.layout_root(top, Size::new(40, 10))?;
        assert_eq!(v.frame(top)?, Rect::new(0, 0, 40, 10));
        assert_eq!(v.frame(a)?, Rect::new(2, 1, 10, 3));
        assert_eq!(v.frame(b)?, Rect::new(13, 1, 27, 3));
        assert!(!v.needs_layout(top)?);
        Ok(())
    }

    #[test]
    fn cycles_and_strangers() -> Result<()> {
        let mut v = Views::new();
        let top = v.create_toplevel("top");
        let a = v.create("a");
        let b = v.create("b");
        v.add(top, a)?;
        v.add(top, b)?;
        v.set_placement(a, Placement::new(Pos::right(b), 0, 1, 1))?;
        v.set_placement(b, Placement::new(Pos::right(a), 0, 1, 1))?;
        assert!(matches!(v.layout_root(top, Size::new(10, 10)), Err(Error::Layout(_))));

        let stranger = v.create("stranger");
        v.set_placement(b, Placement::new(Pos::left(stranger), 0, 1, 1))?;
        v.set_placement(a, Placement::new(0, 0, 1, 1))?;
        assert!(matches!(v.layout_root(top, Size::new(10, 10)), Err(Error::Layout(_))));
        Ok(())
    }

    #[test]
    fn frame_change_damages_both_rects() -> Result<()> {
        let mut v = Views::new();
        let p = v.create("p");
        v.set_frame(p, Rect::new(0, 0, 30, 30))?;
        let c = v.create("c");
        v.add(p, c)?;
        v.set_frame(c, Rect::new(1, 1, 2, 2))?;
        v.clear_needs_display(p)?;
        v.set_frame(c, Rect::new(10, 10, 2, 2))?;
        assert_eq!(v.get(p)?.need_display(), Rect::new(1, 1, 11, 11));
        Ok(())
    }

    #[test]
    fn partial_placement_setters() -> Result<()> {
        let mut v = Views::new();
        let top = v.create_toplevel("top");
        let a = v.create("a");
        v.add(top, a)?;
        v.set_frame(a, Rect::new(1, 2, 3, 4))?;
        v.set_x(a, Pos::Center)?;
        v.layout_root(top, Size::new(11, 10))?;
        assert_eq!(v.frame(a)?, Rect::new(4, 2, 3, 4));
        Ok(())
    }
}
