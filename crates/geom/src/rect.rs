use super::{Point, Size};

/// A rectangle with a signed origin and an unsigned size.
///
/// A rect is *empty* only when both dimensions are zero. A positioned rect
/// with one zero dimension is not empty, but has no area.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Rect {
    /// Top-left corner.
    pub tl: Point,
    /// Width in cells.
    pub w: u32,
    /// Height in cells.
    pub h: u32,
}

impl Rect {
    /// Construct a new rect.
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self {
            tl: Point { x, y },
            w,
            h,
        }
    }

    /// A zero-sized rect at the origin.
    pub fn zero() -> Self {
        Self::default()
    }

    /// True when both width and height are zero.
    pub fn is_empty(&self) -> bool {
        self.w == 0 && self.h == 0
    }

    /// True when the rect covers at least one cell.
    pub fn has_area(&self) -> bool {
        self.w > 0 && self.h > 0
    }

    /// The size of this rect.
    pub fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.tl.x.saturating_add(self.w as i32)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.tl.y.saturating_add(self.h as i32)
    }

    /// The same size located at `tl`.
    pub fn at(&self, tl: Point) -> Self {
        Self { tl, ..*self }
    }

    /// Shift the rect by an offset.
    pub fn shift(&self, dx: i32, dy: i32) -> Self {
        Self {
            tl: self.tl.offset(dx, dy),
            ..*self
        }
    }

    /// Does this rect contain the point?
    pub fn contains_point(&self, p: impl Into<Point>) -> bool {
        let p = p.into();
        p.x >= self.tl.x && p.x < self.right() && p.y >= self.tl.y && p.y < self.bottom()
    }

    /// Does this rect completely enclose `other`? An empty `other` is
    /// contained only if its origin is.
    pub fn contains_rect(&self, other: &Self) -> bool {
        other.tl.x >= self.tl.x
            && other.tl.y >= self.tl.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// The overlapping region of two rects, or `None` if they share no cell.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let x1 = self.tl.x.max(other.tl.x);
        let y1 = self.tl.y.max(other.tl.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Self::new(x1, y1, (x2 - x1) as u32, (y2 - y1) as u32))
    }

    /// True when the two rects share at least one cell.
    pub fn intersects(&self, other: &Self) -> bool {
        self.intersect(other).is_some()
    }

    /// Coordinate-wise union: the bounding box spanning the minimum origin
    /// and maximum far edge of both rects. An empty rect is the identity.
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x1 = self.tl.x.min(other.tl.x);
        let y1 = self.tl.y.min(other.tl.y);
        let x2 = self.right().max(other.right());
        let y2 = self.bottom().max(other.bottom());
        Self::new(x1, y1, (x2 - x1) as u32, (y2 - y1) as u32)
    }
}

impl From<Size> for Rect {
    fn from(s: Size) -> Self {
        s.rect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use proptest::prelude::*;

    #[test]
    fn empty_versus_area() -> Result<()> {
        assert!(Rect::zero().is_empty());
        assert!(!Rect::zero().has_area());
        let line = Rect::new(4, 4, 0, 3);
        assert!(!line.is_empty());
        assert!(!line.has_area());
        Ok(())
    }

    #[test]
    fn contains() -> Result<()> {
        let r = Rect::new(-2, -2, 4, 4);
        assert!(r.contains_point((-2, -2)));
        assert!(r.contains_point((1, 1)));
        assert!(!r.contains_point((2, 1)));
        assert!(r.contains_rect(&Rect::new(-1, -1, 3, 3)));
        assert!(!r.contains_rect(&Rect::new(-1, -1, 4, 3)));
        Ok(())
    }

    #[test]
    fn intersect() -> Result<()> {
        let a = Rect::new(0, 0, 10, 10);
        assert_eq!(a.intersect(&Rect::new(5, 5, 10, 10)), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(a.intersect(&Rect::new(10, 0, 3, 3)), None);
        assert_eq!(a.intersect(&Rect::new(-3, 2, 4, 1)), Some(Rect::new(0, 2, 1, 1)));
        Ok(())
    }

    #[test]
    fn union() -> Result<()> {
        let a = Rect::new(0, 0, 2, 2);
        let b = Rect::new(5, 6, 1, 1);
        assert_eq!(a.union(&b), Rect::new(0, 0, 6, 7));
        assert_eq!(Rect::zero().union(&b), b);
        assert_eq!(b.union(&Rect::zero()), b);
        Ok(())
    }

    fn rect() -> impl Strategy<Value = Rect> {
        (-20i32..20, -20i32..20, 0u32..20, 0u32..20).prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn intersection_is_contained(a in rect(), b in rect()) {
            if let Some(i) = a.intersect(&b) {
                prop_assert!(a.contains_rect(&i));
                prop_assert!(b.contains_rect(&i));
                prop_assert_eq!(Some(i), b.intersect(&a));
            }
        }

        #[test]
        fn union_encloses(a in rect(), b in rect()) {
            let u = a.union(&b);
            if !a.is_empty() {
                prop_assert!(u.contains_rect(&a));
            }
            if !b.is_empty() {
                prop_assert!(u.contains_rect(&b));
            }
        }

        #[test]
        fn point_in_intersection(a in rect(), b in rect(), x in -20i32..40, y in -20i32..40) {
            let both = a.contains_point((x, y)) && b.contains_point((x, y));
            let inside = a.intersect(&b).is_some_and(|i| i.contains_point((x, y)));
            prop_assert_eq!(both, inside);
        }
    }
}
