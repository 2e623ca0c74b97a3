use geom::{Point, Rect, Size};
use unicode_width::UnicodeWidthChar;

use super::Attribute;

/// Logical cursor and clip bookkeeping common to every backend.
///
/// Backends call [`ScreenState::place`] for each character; it reports
/// whether the cell is inside the clip and advances the cursor either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenState {
    /// Terminal size.
    size: Size,
    /// Active clip, always within the screen.
    clip: Rect,
    /// Logical cursor.
    cursor: Point,
}

impl ScreenState {
    /// State for a screen of `size`, clipped to the whole screen.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            clip: size.rect(),
            cursor: Point::zero(),
        }
    }

    /// Terminal size.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Change the size, resetting the clip to the new screen.
    pub fn resize(&mut self, size: Size) {
        self.size = size;
        self.clip = size.rect();
    }

    /// Active clip.
    pub fn clip(&self) -> Rect {
        self.clip
    }

    /// Replace the clip. The result is limited to the screen; a clip
    /// entirely off-screen discards every write.
    pub fn set_clip(&mut self, clip: Rect) {
        self.clip = clip
            .intersect(&self.size.rect())
            .unwrap_or_else(|| Rect::new(0, 0, 0, 0));
    }

    /// Logical cursor.
    pub fn cursor(&self) -> Point {
        self.cursor
    }

    /// Move the logical cursor.
    pub fn move_to(&mut self, col: i32, row: i32) {
        self.cursor = Point::new(col, row);
    }

    /// Account for writing `ch` at the cursor. Returns the cell position and
    /// display width when the character lands inside the clip.
    pub fn place(&mut self, ch: char) -> Option<(Point, u32)> {
        let width = ch.width().unwrap_or(0) as u32;
        let at = self.cursor;
        self.cursor = at.offset(width.max(1) as i32, 0);
        if width == 0 {
            return None;
        }
        let cells = Rect::new(at.x, at.y, width, 1);
        self.clip.contains_rect(&cells).then_some((at, width))
    }
}

/// A single screen cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Character; `'\0'` marks the trailing half of a wide character.
    pub ch: char,
    /// Attribute the cell was written with.
    pub attr: Attribute,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            attr: Attribute::default(),
        }
    }
}

/// An in-memory grid of cells with change tracking, used by backends that
/// render through a shadow buffer.
#[derive(Debug, Clone)]
pub struct CellBuffer {
    /// Grid dimensions.
    size: Size,
    /// Cells, row-major.
    cells: Vec<Cell>,
    /// Per-cell change flags since the last [`CellBuffer::take_changes`].
    changed: Vec<bool>,
}

impl CellBuffer {
    /// A blank buffer.
    pub fn new(size: Size) -> Self {
        let n = size.area() as usize;
        Self {
            size,
            cells: vec![Cell::default(); n],
            changed: vec![true; n],
        }
    }

    /// Grid dimensions.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Resize, blanking the contents.
    pub fn resize(&mut self, size: Size) {
        *self = Self::new(size);
    }

    /// Index of an on-grid point.
    fn index(&self, p: Point) -> Option<usize> {
        (self.size.rect().contains_point(p)).then(|| p.y as usize * self.size.w as usize + p.x as usize)
    }

    /// Write a character of display width `width` at `p`.
    pub fn put(&mut self, p: Point, width: u32, ch: char, attr: Attribute) {
        let cells = [(p, ch)]
            .into_iter()
            .chain((1..width as i32).map(|i| (p.offset(i, 0), '\0')));
        for (at, ch) in cells {
            if let Some(i) = self.index(at) {
                let cell = Cell { ch, attr };
                if self.cells[i] != cell {
                    self.cells[i] = cell;
                    self.changed[i] = true;
                }
            }
        }
    }

    /// The cell at `p`.
    pub fn cell(&self, p: Point) -> Option<Cell> {
        self.index(p).map(|i| self.cells[i])
    }

    /// The text of row `y`, wide-character continuations skipped.
    pub fn row_text(&self, y: u32) -> String {
        if y >= self.size.h {
            return String::new();
        }
        let w = self.size.w as usize;
        let start = y as usize * w;
        self.cells[start..start + w]
            .iter()
            .filter(|c| c.ch != '\0')
            .map(|c| c.ch)
            .collect()
    }

    /// Every row as text.
    pub fn lines(&self) -> Vec<String> {
        (0..self.size.h).map(|y| self.row_text(y)).collect()
    }

    /// Runs of changed cells as `(start, cells)`, clearing the change flags.
    /// A run never spans rows.
    pub fn take_changes(&mut self) -> Vec<(Point, Vec<Cell>)> {
        let w = self.size.w as usize;
        let mut out = Vec::new();
        for y in 0..self.size.h as usize {
            let mut x = 0;
            while x < w {
                let i = y * w + x;
                if !self.changed[i] {
                    x += 1;
                    continue;
                }
                let start = x;
                let mut run = Vec::new();
                while x < w && self.changed[y * w + x] {
                    self.changed[y * w + x] = false;
                    run.push(self.cells[y * w + x]);
                    x += 1;
                }
                out.push((Point::new(start as i32, y as i32), run));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    #[test]
    fn clipped_writes_still_advance() -> Result<()> {
        let mut s = ScreenState::new(Size::new(10, 3));
        s.set_clip(Rect::new(2, 0, 3, 1));
        s.move_to(0, 0);
        assert_eq!(s.place('a'), None);
        assert_eq!(s.place('b'), None);
        assert_eq!(s.place('c'), Some((Point::new(2, 0), 1)));
        assert_eq!(s.cursor(), Point::new(3, 0));
        s.move_to(1, 1);
        assert_eq!(s.place('d'), None);
        Ok(())
    }

    #[test]
    fn wide_chars_need_both_cells() -> Result<()> {
        let mut s = ScreenState::new(Size::new(4, 1));
        s.move_to(3, 0);
        assert_eq!(s.place('世'), None);
        s.move_to(2, 0);
        assert_eq!(s.place('世'), Some((Point::new(2, 0), 2)));
        assert_eq!(s.cursor(), Point::new(4, 0));
        Ok(())
    }

    #[test]
    fn clip_is_limited_to_screen() -> Result<()> {
        let mut s = ScreenState::new(Size::new(10, 10));
        s.set_clip(Rect::new(-5, -5, 8, 8));
        assert_eq!(s.clip(), Rect::new(0, 0, 3, 3));
        s.set_clip(Rect::new(20, 20, 2, 2));
        assert!(!s.clip().has_area());
        Ok(())
    }

    #[test]
    fn buffer_changes() -> Result<()> {
        let mut b = CellBuffer::new(Size::new(4, 2));
        b.take_changes();
        b.put(Point::new(1, 0), 1, 'x', Attribute::default());
        b.put(Point::new(2, 0), 1, 'y', Attribute::default());
        // Rewriting an identical cell is not a change.
        b.put(Point::new(0, 1), 1, ' ', Attribute::default());
        let changes = b.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0, Point::new(1, 0));
        assert_eq!(changes[0].1.len(), 2);
        assert_eq!(b.row_text(0), " xy ");
        assert!(b.take_changes().is_empty());
        Ok(())
    }
}
