//! Layout expressions.
//!
//! A [`Pos`] or [`Dim`] is a small expression tree evaluated against the
//! extent of a container. Evaluation is pure: the only state it reads is the
//! extent itself and, for view-relative terms, the current frame of the
//! referenced view through a [`FrameLookup`].
//!
//! `Combine` resolves each side completely before adding or subtracting, so
//! rounding happens per term:
//!
//! ```
//! use arbor::layout::{NoFrames, Pos};
//! let a = (Pos::percent(50.0).unwrap() + Pos::percent(50.0).unwrap())
//!     .resolve(21, &NoFrames)
//!     .unwrap();
//! assert_eq!(a, 20);
//! ```

/// Dimension expressions.
mod dim;
/// Position expressions.
mod pos;

use std::collections::HashMap;

use geom::{Rect, Size};

pub use dim::{Dim, Dimension};
pub use pos::{Pos, Side};

use crate::{
    error::{Error, Result},
    view::ViewId,
};

/// Arithmetic operator for `Combine` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Sum of both sides.
    Add,
    /// Left side minus right side.
    Sub,
}

impl Op {
    /// Apply the operator to two resolved values.
    fn apply(self, left: i32, right: i32) -> i32 {
        match self {
            Self::Add => left.saturating_add(right),
            Self::Sub => left.saturating_sub(right),
        }
    }
}

/// Read access to the current frames of views referenced by an expression.
pub trait FrameLookup {
    /// The frame of `view`, in its superview's content coordinates.
    fn frame_of(&self, view: ViewId) -> Option<Rect>;
}

/// A lookup with no frames, for expressions without view-relative terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFrames;

impl FrameLookup for NoFrames {
    fn frame_of(&self, _view: ViewId) -> Option<Rect> {
        None
    }
}

impl FrameLookup for HashMap<ViewId, Rect> {
    fn frame_of(&self, view: ViewId) -> Option<Rect> {
        self.get(&view).copied()
    }
}

/// Look up a referenced frame or fail with a layout error.
fn lookup(frames: &impl FrameLookup, view: ViewId) -> Result<Rect> {
    frames
        .frame_of(view)
        .ok_or_else(|| Error::Layout(format!("no frame for referenced view {view:?}")))
}

/// Validate a percentage argument.
fn check_percent(n: f32) -> Result<f32> {
    if !(0.0..=100.0).contains(&n) {
        return Err(Error::InvalidArgument(format!(
            "percent must be between 0 and 100, got {n}"
        )));
    }
    Ok(n / 100.0)
}

/// Validate a margin argument.
fn check_margin(m: i32) -> Result<i32> {
    if m < 0 {
        return Err(Error::InvalidArgument(format!(
            "margin must be non-negative, got {m}"
        )));
    }
    Ok(m)
}

/// Relative placement of a view inside its superview's content area.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Horizontal position.
    pub x: Pos,
    /// Vertical position.
    pub y: Pos,
    /// Width.
    pub width: Dim,
    /// Height.
    pub height: Dim,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            x: Pos::Absolute(0),
            y: Pos::Absolute(0),
            width: Dim::Fill(0),
            height: Dim::Fill(0),
        }
    }
}

impl Placement {
    /// Construct a placement from its four expressions.
    pub fn new(x: impl Into<Pos>, y: impl Into<Pos>, width: impl Into<Dim>, height: impl Into<Dim>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            width: width.into(),
            height: height.into(),
        }
    }

    /// A placement that fills the container.
    pub fn fill() -> Self {
        Self::default()
    }

    /// Views whose frames this placement reads.
    pub fn dependencies(&self) -> Vec<ViewId> {
        let mut out = Vec::new();
        self.x.collect_views(&mut out);
        self.y.collect_views(&mut out);
        self.width.collect_views(&mut out);
        self.height.collect_views(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Compute a frame inside a container of content size `container`.
    pub fn compute_frame(&self, container: Size, frames: &impl FrameLookup) -> Result<Rect> {
        let (x, w) = resolve_axis(&self.x, &self.width, container.w as i32, frames)?;
        let (y, h) = resolve_axis(&self.y, &self.height, container.h as i32, frames)?;
        Ok(Rect::new(x, y, w, h))
    }
}

/// Resolve one axis. A centered position is computed from the resolved size;
/// otherwise the size is resolved against the extent remaining after the
/// position.
fn resolve_axis(pos: &Pos, dim: &Dim, extent: i32, frames: &impl FrameLookup) -> Result<(i32, u32)> {
    if matches!(pos, Pos::Center) {
        let size = dim.resolve(extent, frames)?.max(0);
        Ok((extent.saturating_sub(size) / 2, size as u32))
    } else {
        let p = pos.resolve(extent, frames)?;
        let size = dim.resolve(extent.saturating_sub(p), frames)?.max(0);
        Ok((p, size as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_and_percent() -> Result<()> {
        assert_eq!(Pos::anchor_end(2)?.resolve(20, &NoFrames)?, 18);
        assert_eq!(Dim::percent(50.0)?.resolve(21, &NoFrames)?, 10);
        Ok(())
    }

    #[test]
    fn validation() -> Result<()> {
        assert!(matches!(Pos::percent(101.0), Err(Error::InvalidArgument(_))));
        assert!(matches!(Pos::percent(-1.0), Err(Error::InvalidArgument(_))));
        assert!(matches!(Pos::anchor_end(-1), Err(Error::InvalidArgument(_))));
        assert!(matches!(Dim::fill(-3), Err(Error::InvalidArgument(_))));
        assert!(Dim::percent(100.0).is_ok());
        Ok(())
    }

    #[test]
    fn centered() -> Result<()> {
        let p = Placement::new(Pos::Center, Pos::Center, 10, Dim::percent(50.0)?);
        assert_eq!(p.compute_frame(Size::new(40, 11), &NoFrames)?, Rect::new(15, 3, 10, 5));
        Ok(())
    }

    #[test]
    fn remaining_extent() -> Result<()> {
        let p = Placement::new(5, Pos::percent(50.0)?, Dim::fill(1)?, Dim::percent(50.0)?);
        // width fills 20 - 5 - 1; height is half of 10 - 5
        assert_eq!(p.compute_frame(Size::new(20, 10), &NoFrames)?, Rect::new(5, 5, 14, 2));
        let neg = Placement::new(18, 0, Dim::fill(4)?, 1);
        assert_eq!(neg.compute_frame(Size::new(20, 10), &NoFrames)?, Rect::new(18, 0, 0, 1));
        Ok(())
    }

    #[test]
    fn combine_rounds_per_term() -> Result<()> {
        let half = Pos::percent(50.0)?;
        assert_eq!((half.clone() + half.clone()).resolve(21, &NoFrames)?, 20);
        assert_eq!(Pos::percent(100.0)?.resolve(21, &NoFrames)?, 21);
        assert_eq!((Pos::anchor_end(1)? - 3).resolve(10, &NoFrames)?, 6);
        Ok(())
    }
}
