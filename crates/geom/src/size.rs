use super::{Error, Point, Rect, Result};

/// A width and height with no location.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Size {
    /// Width in cells.
    pub w: u32,
    /// Height in cells.
    pub h: u32,
}

impl Size {
    /// Construct a new size.
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    /// The area of this size.
    pub fn area(&self) -> u32 {
        self.w * self.h
    }

    /// Return a `Rect` with these dimensions located at the origin.
    pub fn rect(&self) -> Rect {
        Rect {
            tl: Point::zero(),
            w: self.w,
            h: self.h,
        }
    }

    /// True if this size can completely enclose `other` in both dimensions.
    pub fn contains(&self, other: &Self) -> bool {
        self.w >= other.w && self.h >= other.h
    }

    /// Reject sizes with a zero dimension. Layout divides extents into
    /// fractions, so a degenerate screen or cell size is refused up front.
    pub fn non_degenerate(self) -> Result<Self> {
        if self.w == 0 || self.h == 0 {
            return Err(Error::Geometry(format!(
                "degenerate size {}x{}",
                self.w, self.h
            )));
        }
        Ok(self)
    }
}

impl From<Rect> for Size {
    fn from(r: Rect) -> Self {
        Self { w: r.w, h: r.h }
    }
}

impl From<(u32, u32)> for Size {
    fn from(v: (u32, u32)) -> Self {
        Self { w: v.0, h: v.1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate() -> Result<()> {
        assert!(Size::new(0, 10).non_degenerate().is_err());
        assert!(Size::new(10, 0).non_degenerate().is_err());
        assert_eq!(Size::new(80, 24).non_degenerate()?, Size::new(80, 24));
        assert_eq!(Size::new(3, 2).rect(), Rect::new(0, 0, 3, 2));
        Ok(())
    }
}
