use std::ops::{Add, Sub};

use super::{FrameLookup, Op, check_margin, check_percent, lookup};
use crate::{error::Result, view::ViewId};

/// The extent of a view a dimension can be tied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// The view's width.
    Width,
    /// The view's height.
    Height,
}

/// A dimension expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Dim {
    /// A fixed length.
    Absolute(i32),
    /// A fraction of the extent, truncated toward zero.
    Factor(f32),
    /// The extent minus a margin, never below zero.
    Fill(i32),
    /// A dimension of another view's current frame.
    View {
        /// Referenced view.
        view: ViewId,
        /// Dimension to read.
        dimension: Dimension,
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

impl Dim {
    /// `n` percent of the extent. `n` must lie in `0..=100`.
    pub fn percent(n: f32) -> Result<Self> {
        Ok(Self::Factor(check_percent(n)?))
    }

    /// Everything but `margin` cells of the extent.
    pub fn fill(margin: i32) -> Result<Self> {
        Ok(Self::Fill(check_margin(margin)?))
    }

    /// The width of `view`.
    pub fn width(view: ViewId) -> Self {
        Self::View {
            view,
            dimension: Dimension::Width,
        }
    }

    /// The height of `view`.
    pub fn height(view: ViewId) -> Self {
        Self::View {
            view,
            dimension: Dimension::Height,
        }
    }

    /// Evaluate the expression against `extent`.
    pub fn resolve(&self, extent: i32, frames: &impl FrameLookup) -> Result<i32> {
        Ok(match self {
            Self::Absolute(n) => *n,
            Self::Factor(f) => (extent as f32 * f) as i32,
            Self::Fill(m) => extent.saturating_sub(*m).max(0),
            Self::View { view, dimension } => {
                let r = lookup(frames, *view)?;
                match dimension {
                    Dimension::Width => r.w as i32,
                    Dimension::Height => r.h as i32,
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

impl From<i32> for Dim {
    fn from(n: i32) -> Self {
        Self::Absolute(n)
    }
}

impl Add for Dim {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.combine(Op::Add, rhs)
    }
}

impl Sub for Dim {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.combine(Op::Sub, rhs)
    }
}

impl Add<i32> for Dim {
    type Output = Self;

    fn add(self, rhs: i32) -> Self {
        self.combine(Op::Add, rhs.into())
    }
}

impl Sub<i32> for Dim {
    type Output = Self;

    fn sub(self, rhs: i32) -> Self {
        self.combine(Op::Sub, rhs.into())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::layout::NoFrames;

    #[test]
    fn fill_clamps() -> Result<()> {
        assert_eq!(Dim::fill(3)?.resolve(10, &NoFrames)?, 7);
        assert_eq!(Dim::fill(30)?.resolve(10, &NoFrames)?, 0);
        assert_eq!(Dim::Fill(i32::MAX).resolve(-10, &NoFrames)?, 0);
        assert_eq!(Dim::Fill(i32::MIN).resolve(10, &NoFrames)?, i32::MAX);
        // Combine does not clamp.
        assert_eq!((Dim::from(2) - 5).resolve(10, &NoFrames)?, -3);
        Ok(())
    }

    fn leaf() -> impl Strategy<Value = Dim> {
        prop_oneof![
            (-50i32..50).prop_map(Dim::Absolute),
            (0.0f32..=1.0).prop_map(Dim::Factor),
            (0i32..50).prop_map(Dim::Fill),
        ]
    }

    fn expr() -> impl Strategy<Value = Dim> {
        leaf().prop_recursive(3, 16, 2, |inner| {
            (inner.clone(), inner, any::<bool>()).prop_map(|(l, r, add)| if add { l + r } else { l - r })
        })
    }

    proptest! {
        #[test]
        fn resolve_is_deterministic(d in expr(), extent in 0i32..500) {
            let a = d.resolve(extent, &NoFrames).ok();
            let b = d.resolve(extent, &NoFrames).ok();
            prop_assert_eq!(a, b);
        }
    }
}
