use super::Rect;

/// Per-edge thickness, used for the margin, border and padding adornments.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Thickness {
    /// Left edge.
    pub left: u32,
    /// Top edge.
    pub top: u32,
    /// Right edge.
    pub right: u32,
    /// Bottom edge.
    pub bottom: u32,
}

impl Thickness {
    /// Construct a thickness from explicit edges.
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The same thickness on every edge.
    pub fn uniform(n: u32) -> Self {
        Self::new(n, n, n, n)
    }

    /// True when every edge is zero.
    pub fn is_zero(&self) -> bool {
        self.horizontal() == 0 && self.vertical() == 0
    }

    /// Combined left and right thickness.
    pub fn horizontal(&self) -> u32 {
        self.left + self.right
    }

    /// Combined top and bottom thickness.
    pub fn vertical(&self) -> u32 {
        self.top + self.bottom
    }

    /// The rect left inside `rect` after removing this thickness. Sizes
    /// saturate at zero.
    pub fn inside(&self, rect: Rect) -> Rect {
        Rect::new(
            rect.tl.x + self.left.min(rect.w) as i32,
            rect.tl.y + self.top.min(rect.h) as i32,
            rect.w.saturating_sub(self.horizontal()),
            rect.h.saturating_sub(self.vertical()),
        )
    }

    /// True if `p` falls inside `rect` but outside the inner region.
    pub fn ring_contains(&self, rect: Rect, p: impl Into<super::Point>) -> bool {
        let p = p.into();
        rect.contains_point(p) && !self.inside(rect).contains_point(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;

    #[test]
    fn inside() -> Result<()> {
        let r = Rect::new(0, 0, 10, 10);
        assert_eq!(Thickness::uniform(1).inside(r), Rect::new(1, 1, 8, 8));
        assert_eq!(Thickness::new(2, 0, 1, 3).inside(r), Rect::new(2, 0, 7, 7));
        assert_eq!(Thickness::uniform(6).inside(r), Rect::new(6, 6, 0, 0));
        assert_eq!(Thickness::default().inside(r), r);
        Ok(())
    }

    #[test]
    fn ring() -> Result<()> {
        let r = Rect::new(0, 0, 4, 4);
        let t = Thickness::uniform(1);
        assert!(t.ring_contains(r, (0, 0)));
        assert!(t.ring_contains(r, (3, 2)));
        assert!(!t.ring_contains(r, (1, 1)));
        assert!(!t.ring_contains(r, (4, 4)));
        Ok(())
    }
}
