//! Integer cell geometry for arbor: points, sizes, rectangles, edge
//! thicknesses and box-frame decomposition.

/// Error types for geometry operations.
mod error;
/// Box frame decomposition.
mod frame;
/// Point helpers.
mod point;
/// Rectangle operations.
mod rect;
/// Width/height size type.
mod size;
/// Per-edge thickness.
mod thickness;

pub use error::{Error, Result};
pub use frame::BoxFrame;
pub use point::Point;
pub use rect::Rect;
pub use size::Size;
pub use thickness::Thickness;

/// Cardinal directions.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Direction {
    /// Upward direction.
    Up,
    /// Downward direction.
    Down,
    /// Leftward direction.
    Left,
    /// Rightward direction.
    Right,
}
