use std::ops::{Add, Sub};

use super::{FrameLookup, Op, check_margin, check_percent, lookup};
use crate::{error::Result, view::ViewId};

/// The edge of a view a position can be anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The view's x coordinate.
    Left,
    /// The view's y coordinate.
    Top,
    /// The view's x coordinate plus its width.
    Right,
    /// The view's y coordinate plus its height.
    Bottom,
}

/// A position expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Pos {
    /// A fixed coordinate.
    Absolute(i32),
    /// A fraction of the extent, truncated toward zero.
    Factor(f32),
    /// The middle of the extent. When used as a placement's position, the
    /// view is centered using its resolved size.
    Center,
    /// The extent minus a margin.
    AnchorEnd(i32),
    /// An edge of another view's current frame.
    View {
        /// Referenced view.
        view: ViewId,
        /// Edge to read.
        side: Side,
    },
    /// Two expressions combined after each is resolved.
    Combine {
        /// Operator.
        op: Op,
        /// Left operand.
        left: Box<Self>,
        /// Right operand.
        right: Box<Self>,
    },
}

impl Pos {
    /// A position at `n` percent of the extent. `n` must lie in `0..=100`.
    pub fn percent(n: f32) -> Result<Self> {
        Ok(Self::Factor(check_percent(n)?))
    }

    /// A position `margin` cells before the end of the extent.
    pub fn anchor_end(margin: i32) -> Result<Self> {
        Ok(Self::AnchorEnd(check_margin(margin)?))
    }

    /// The left edge of `view`.
    pub fn left(view: ViewId) -> Self {
        Self::View {
            view,
            side: Side::Left,
        }
    }

    /// The top edge of `view`.
    pub fn top(view: ViewId) -> Self {
        Self::View {
            view,
            side: Side::Top,
        }
    }

    /// The right edge of `view`: one past its last column.
    pub fn right(view: ViewId) -> Self {
        Self::View {
            view,
            side: Side::Right,
        }
    }

    /// The bottom edge of `view`: one past its last row.
    pub fn bottom(view: ViewId) -> Self {
        Self::View {
            view,
            side: Side::Bottom,
        }
    }

    /// Evaluate the expression against `extent`.
    pub fn resolve(&self, extent: i32, frames: &impl FrameLookup) -> Result<i32> {
        Ok(match self {
            Self::Absolute(n) => *n,
            Self::Factor(f) => (extent as f32 * f) as i32,
            Self::Center => extent / 2,
            Self::AnchorEnd(m) => extent.saturating_sub(*m),
            Self::View { view, side } => {
                let r = lookup(frames, *view)?;
                match side {
                    Side::Left => r.tl.x,
                    Side::Top => r.tl.y,
                    Side::Right => r.right(),
                    Side::Bottom => r.bottom(),
                }
            }
            Self::Combine { op, left, right } => {
                let l = left.resolve(extent, frames)?;
                let r = right.resolve(extent, frames)?;
                op.apply(l, r)
            }
        })
    }

    /// Append every view this expression reads to `out`.
    pub(crate) fn collect_views(&self, out: &mut Vec<ViewId>) {
        match self {
            Self::View { view, .. } => out.push(*view),
            Self::Combine { left, right, .. } => {
                left.collect_views(out);
                right.collect_views(out);
            }
            _ => {}
        }
    }

    /// Build a combined expression.
    fn combine(self, op: Op, right: Self) -> Self {
        Self::Combine {
            op,
            left: Box::new(self),
            right: Box::new(right),
        }
    }
}

impl From<i32> for Pos {
    fn from(n: i32) -> Self {
        Self::Absolute(n)
    }
}

impl Add for Pos {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.combine(Op::Add, rhs)
    }
}

impl Sub for Pos {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.combine(Op::Sub, rhs)
    }
}

impl Add<i32> for Pos {
    type Output = Self;

    fn add(self, rhs: i32) -> Self {
        self.combine(Op::Add, rhs.into())
    }
}

impl Sub<i32> for Pos {
    type Output = Self;

    fn sub(self, rhs: i32) -> Self {
        self.combine(Op::Sub, rhs.into())
    }
}
