use geom::{Point, Rect, Size};

use super::{ViewId, ViewKind, Views};
use crate::error::Result;

impl Views {
    /// Translate a point in `id`'s content coordinates to screen
    /// coordinates, without clamping.
    pub fn view_to_screen(&self, id: ViewId, p: Point) -> Result<Point> {
        let off = self.viewport_offset(id)?;
        self.frame_to_screen(id, p + off)
    }

    /// Translate a point in `id`'s content coordinates to screen
    /// coordinates, clamped to a screen of `screen` cells.
    pub fn view_to_screen_clipped(&self, id: ViewId, p: Point, screen: Size) -> Result<Point> {
        Ok(self
            .view_to_screen(id, p)?
            .clamp_to(screen.w as i32 - 1, screen.h as i32 - 1))
    }

    /// Translate a screen point into `id`'s content coordinates. The exact
    /// inverse of [`Views::view_to_screen`].
    pub fn screen_to_view(&self, id: ViewId, p: Point) -> Result<Point> {
        Ok(p - self.view_to_screen(id, Point::zero())?)
    }

    /// Translate a point in `id`'s frame-local coordinates to the screen.
    pub(crate) fn frame_to_screen(&self, id: ViewId, p: Point) -> Result<Point> {
        let n = self.get(id)?;
        let p = p + n.frame.tl;
        match n.kind {
            // Adornment frames are relative to the owner's frame.
            ViewKind::Adornment { owner, .. } => self.frame_to_screen(owner, p),
            _ => match n.superview {
                Some(s) => self.view_to_screen(s, p),
                None => Ok(p),
            },
        }
    }

    /// The frame of `id` in screen coordinates.
    pub fn screen_frame(&self, id: ViewId) -> Result<Rect> {
        let f = self.get(id)?.frame;
        let tl = self.frame_to_screen(id, Point::zero())?;
        Ok(f.at(tl))
    }

    /// The content area of `id` in screen coordinates.
    pub fn screen_bounds(&self, id: ViewId) -> Result<Rect> {
        let b = self.bounds(id)?;
        Ok(b.at(self.view_to_screen(id, Point::zero())?))
    }
}

#[cfg(test)]
mod tests {
    use geom::Thickness;
    use proptest::prelude::*;

    use super::*;
    use crate::view::AdornmentKind;

    /// root(2,1) with a border, holding child(3,4) holding grandchild(1,1).
    fn fixture() -> Result<(Views, ViewId, ViewId, ViewId)> {
        let mut v = Views::new();
        let root = v.create("root");
        v.set_frame(root, Rect::new(2, 1, 40, 30))?;
        v.set_thickness(root, AdornmentKind::Border, Thickness::uniform(1))?;
        let child = v.create("child");
        v.add(root, child)?;
        v.set_frame(child, Rect::new(3, 4, 20, 20))?;
        let grand = v.create("grand");
        v.add(child, grand)?;
        v.set_frame(grand, Rect::new(1, 1, 5, 5))?;
        Ok((v, root, child, grand))
    }

    #[test]
    fn translate() -> Result<()> {
        let (v, root, child, grand) = fixture()?;
        assert_eq!(v.view_to_screen(root, Point::zero())?, Point::new(3, 2));
        assert_eq!(v.view_to_screen(child, Point::zero())?, Point::new(6, 6));
        assert_eq!(v.view_to_screen(grand, Point::new(2, 0))?, Point::new(9, 7));
        assert_eq!(v.screen_frame(grand)?, Rect::new(7, 7, 5, 5));
        assert_eq!(v.screen_frame(v.adornments(root)?.border)?, Rect::new(2, 1, 40, 30));
        assert_eq!(v.screen_bounds(root)?, Rect::new(3, 2, 38, 28));
        Ok(())
    }

    #[test]
    fn clipped() -> Result<()> {
        let (v, _, _, grand) = fixture()?;
        let p = v.view_to_screen_clipped(grand, Point::new(100, -100), Size::new(80, 25))?;
        assert_eq!(p, Point::new(79, 0));
        Ok(())
    }

    proptest! {
        #[test]
        fn round_trip(x in -50i32..50, y in -50i32..50) {
            let (v, _, _, grand) = fixture().map_err(|e| TestCaseError::fail(e.to_string()))?;
            let p = Point::new(x, y);
            let back = v
                .view_to_screen(grand, p)
                .and_then(|s| v.screen_to_view(grand, s))
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(back, p);
        }
    }
}
