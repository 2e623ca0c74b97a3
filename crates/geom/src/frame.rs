use super::{Point, Rect};

/// The pieces of a box frame drawn around the edge of a rectangle.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct BoxFrame {
    /// The top of the frame, not including corners
    pub top: Rect,
    /// The bottom of the frame, not including corners
    pub bottom: Rect,
    /// The left of the frame, not including corners
    pub left: Rect,
    /// The right of the frame, not including corners
    pub right: Rect,
    /// The top left corner
    pub topleft: Point,
    /// The top right corner
    pub topright: Point,
    /// The bottom left corner
    pub bottomleft: Point,
    /// The bottom right corner
    pub bottomright: Point,
    /// The original outer rect
    outer_rect: Rect,
}

impl BoxFrame {
    /// Decompose `rect` into a one-cell frame. Returns `None` if the rect is
    /// too small to hold both corners on either axis.
    pub fn new(rect: Rect) -> Option<Self> {
        if rect.w < 2 || rect.h < 2 {
            return None;
        }
        let (x, y) = (rect.tl.x, rect.tl.y);
        let (r, b) = (rect.right() - 1, rect.bottom() - 1);
        Some(Self {
            top: Rect::new(x + 1, y, rect.w - 2, 1),
            bottom: Rect::new(x + 1, b, rect.w - 2, 1),
            left: Rect::new(x, y + 1, 1, rect.h - 2),
            right: Rect::new(r, y + 1, 1, rect.h - 2),
            topleft: Point::new(x, y),
            topright: Point::new(r, y),
            bottomleft: Point::new(x, b),
            bottomright: Point::new(r, b),
            outer_rect: rect,
        })
    }

    /// The space inside the frame.
    pub fn inner(&self) -> Rect {
        Rect::new(
            self.outer_rect.tl.x + 1,
            self.outer_rect.tl.y + 1,
            self.outer_rect.w - 2,
            self.outer_rect.h - 2,
        )
    }

    /// The rect passed to `BoxFrame::new`.
    pub fn outer(&self) -> Rect {
        self.outer_rect
    }
}
