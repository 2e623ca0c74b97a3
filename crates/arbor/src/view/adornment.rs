use geom::{Point, Rect, Thickness};

use super::{ViewId, ViewKind, Views};
use crate::error::Result;

/// The three structural rings around a view's content, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdornmentKind {
    /// Outermost ring.
    Margin,
    /// Middle ring.
    Border,
    /// Innermost ring.
    Padding,
}

impl AdornmentKind {
    /// All rings, outside-in.
    pub const ALL: [Self; 3] = [Self::Margin, Self::Border, Self::Padding];

    /// Short name used in debug output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Margin => "margin",
            Self::Border => "border",
            Self::Padding => "padding",
        }
    }
}

/// Nested ring rects of a view, in frame-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rings {
    /// The margin's outer rect; the whole frame.
    pub margin: Rect,
    /// The border's outer rect.
    pub border: Rect,
    /// The padding's outer rect.
    pub padding: Rect,
    /// The content area.
    pub content: Rect,
    /// Margin thickness.
    pub margin_t: Thickness,
    /// Border thickness.
    pub border_t: Thickness,
    /// Padding thickness.
    pub padding_t: Thickness,
}

impl Rings {
    /// The outer rect and thickness of a ring.
    pub fn ring(&self, kind: AdornmentKind) -> (Rect, Thickness) {
        match kind {
            AdornmentKind::Margin => (self.margin, self.margin_t),
            AdornmentKind::Border => (self.border, self.border_t),
            AdornmentKind::Padding => (self.padding, self.padding_t),
        }
    }
}

impl Views {
    /// Compute the ring geometry of a view.
    pub(crate) fn rings(&self, id: ViewId) -> Result<Rings> {
        let n = self.get(id)?;
        let local = n.frame.size().rect();
        let (margin_t, border_t, padding_t) = match n.adornments {
            Some(a) => (
                self.get(a.margin)?.thickness,
                self.get(a.border)?.thickness,
                self.get(a.padding)?.thickness,
            ),
            None => Default::default(),
        };
        let border = margin_t.inside(local);
        let padding = border_t.inside(border);
        let content = padding_t.inside(padding);
        Ok(Rings {
            margin: local,
            border,
            padding,
            content,
            margin_t,
            border_t,
            padding_t,
        })
    }

    /// The thickness of one of a view's rings.
    pub fn thickness(&self, id: ViewId, kind: AdornmentKind) -> Result<Thickness> {
        Ok(self.get(self.adornments(id)?.get(kind))?.thickness)
    }

    /// Set the thickness of one of a view's rings. The content area shrinks
    /// accordingly, so subviews are laid out again.
    pub fn set_thickness(&mut self, id: ViewId, kind: AdornmentKind, t: Thickness) -> Result<()> {
        let a = self.adornments(id)?.get(kind);
        if self.get(a)?.thickness == t {
            return Ok(());
        }
        self.get_mut(a)?.thickness = t;
        self.sync_adornments(id)?;
        self.get_mut(id)?.layout_needed = true;
        self.set_needs_display(id)
    }

    /// Offset of the content area from the frame origin.
    pub fn viewport_offset(&self, id: ViewId) -> Result<Point> {
        Ok(self.rings(id)?.content.tl)
    }

    /// The content area at the origin: the coordinate space subviews and
    /// widget drawing use.
    pub fn bounds(&self, id: ViewId) -> Result<Rect> {
        Ok(self.rings(id)?.content.size().rect())
    }

    /// Keep adornment frames equal to their ring rects.
    pub(crate) fn sync_adornments(&mut self, id: ViewId) -> Result<()> {
        let Some(a) = self.get(id)?.adornments else {
            return Ok(());
        };
        let rings = self.rings(id)?;
        for kind in AdornmentKind::ALL {
            self.get_mut(a.get(kind))?.frame = rings.ring(kind).0;
        }
        Ok(())
    }

    /// If `id` is an adornment, its kind and owner.
    pub fn adornment_of(&self, id: ViewId) -> Option<(AdornmentKind, ViewId)> {
        match self.nodes.get(id)?.kind {
            ViewKind::Adornment { kind, owner } => Some((kind, owner)),
            _ => None,
        }
    }
}
