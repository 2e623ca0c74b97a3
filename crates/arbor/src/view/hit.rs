use geom::Point;

use super::{AdornmentKind, ViewId, Views};
use crate::error::Result;

impl Views {
    /// The views under a screen point, outermost first, starting at `top`.
    ///
    /// At each level the point is tested against the view's frame, then its
    /// margin, border and padding rings (an adornment hit ends the walk with
    /// the adornment as the last element), then its visible subviews
    /// topmost-first. A point outside `top` yields an empty list.
    pub fn views_under_mouse(&self, top: ViewId, p: Point) -> Result<Vec<ViewId>> {
        let mut out = Vec::new();
        let mut cur = top;
        let mut frame = self.screen_frame(top)?;
        loop {
            let n = self.get(cur)?;
            if !n.visible || !frame.contains_point(p) {
                break;
            }
            out.push(cur);

            let local = p - frame.tl;
            let rings = self.rings(cur)?;
            if let Some(a) = n.adornments {
                let hit = AdornmentKind::ALL.into_iter().find(|k| {
                    let (rect, t) = rings.ring(*k);
                    t.ring_contains(rect, local)
                });
                if let Some(kind) = hit {
                    out.push(a.get(kind));
                    break;
                }
            }

            let origin = frame.tl + rings.content.tl;
            let mut next = None;
            for &c in n.subviews.iter().rev() {
                let cn = self.get(c)?;
                let f = cn.frame.shift(origin.x, origin.y);
                if cn.visible && f.contains_point(p) {
                    next = Some((c, f));
                    break;
                }
            }
            match next {
                Some((c, f)) => {
                    cur = c;
                    frame = f;
                }
                None => break,
            }
        }
        Ok(out)
    }

    /// The deepest view under a screen point; adornments resolve to their
    /// owner.
    pub fn view_at(&self, top: ViewId, p: Point) -> Result<Option<ViewId>> {
        let hits = self.views_under_mouse(top, p)?;
        Ok(hits
            .last()
            .map(|&v| self.adornment_of(v).map_or(v, |(_, owner)| owner)))
    }
}
