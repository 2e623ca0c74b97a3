use geom::Rect;
use tracing::trace;

use super::{ViewId, Views};
use crate::error::Result;

impl Views {
    /// Damage the whole frame of a view, adornments included.
    pub fn set_needs_display(&mut self, id: ViewId) -> Result<()> {
        if let Some((_, owner)) = self.adornment_of(id) {
            return self.set_needs_display(owner);
        }
        let local = self.get(id)?.frame.size().rect();
        self.damage_local(id, local)?;
        self.mark_ancestors(id)
    }

    /// Damage a region given in the view's content coordinates.
    ///
    /// The region is unioned into the view's pending damage, and every
    /// subview whose frame intersects it is damaged with the overlapping part.
    pub fn set_needs_display_region(&mut self, id: ViewId, region: Rect) -> Result<()> {
        let off = self.viewport_offset(id)?;
        self.damage_local(id, region.shift(off.x, off.y))?;
        self.mark_ancestors(id)
    }

    /// Union a frame-local region into a view and push it down to every
    /// intersecting subview.
    pub(crate) fn damage_local(&mut self, id: ViewId, region: Rect) -> Result<()> {
        let n = self.get(id)?;
        let Some(region) = region.intersect(&n.frame.size().rect()) else {
            return Ok(());
        };
        trace!(view = %n.name, ?region, "damage");
        let subs = n.subviews.clone();
        let off = self.viewport_offset(id)?;
        let node = self.get_mut(id)?;
        node.need_display = node.need_display.union(&region);
        if subs.is_empty() {
            return Ok(());
        }
        node.child_needs_display = true;

        let content_region = region.shift(-off.x, -off.y);
        for c in subs {
            let f = self.get(c)?.frame;
            if let Some(i) = f.intersect(&content_region) {
                self.damage_local(c, i.shift(-f.tl.x, -f.tl.y))?;
            }
        }
        Ok(())
    }

    /// Flag every ancestor as having a damaged descendant.
    fn mark_ancestors(&mut self, id: ViewId) -> Result<()> {
        let mut cur = self.container(id);
        while let Some(c) = cur {
            self.get_mut(c)?.child_needs_display = true;
            cur = self.container(c);
        }
        Ok(())
    }

    /// Reset damage for a whole subtree.
    pub fn clear_needs_display(&mut self, id: ViewId) -> Result<()> {
        let n = self.get_mut(id)?;
        n.need_display = Rect::zero();
        n.child_needs_display = false;
        let subs = n.subviews.clone();
        for c in subs {
            self.clear_needs_display(c)?;
        }
        Ok(())
    }

    /// True if `id` or any descendant reports damage.
    pub fn needs_redraw(&self, id: ViewId) -> Result<bool> {
        Ok(self.get(id)?.is_dirty())
    }
}
