use geom::{Point, Rect};
use scopeguard::guard;
use tracing::trace;

use super::{AdornmentKind, Arrangement, ViewId, Views};
use crate::{
    driver::{Attribute, Color, ConsoleDriver},
    error::Result,
};

/// Drawing surface handed to [`Widget::draw`](crate::widget::Widget::draw).
///
/// Coordinates are the view's content coordinates; the driver's clip limits
/// writes to the damaged part of the view.
pub struct DrawContext<'a> {
    /// Target driver, already clipped.
    driver: &'a mut dyn ConsoleDriver,
    /// Screen position of the content origin.
    origin: Point,
    /// Content area at the origin.
    bounds: Rect,
    /// Whether the view is on the focus chain.
    focused: bool,
}

impl<'a> DrawContext<'a> {
    /// A context drawing at `origin` on the screen.
    pub fn new(driver: &'a mut dyn ConsoleDriver, origin: Point, bounds: Rect, focused: bool) -> Self {
        Self {
            driver,
            origin,
            bounds,
            focused,
        }
    }

    /// The content area at the origin.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Whether the view being drawn has focus.
    pub fn has_focus(&self) -> bool {
        self.focused
    }

    /// Move the cursor to a content coordinate.
    pub fn move_to(&mut self, col: i32, row: i32) {
        let p = self.origin.offset(col, row);
        self.driver.move_to(p.x, p.y);
    }

    /// Write a character at the cursor.
    pub fn add_rune(&mut self, ch: char) {
        self.driver.add_char(ch);
    }

    /// Write a string at the cursor.
    pub fn add_str(&mut self, s: &str) {
        self.driver.add_str(s);
    }

    /// Write a string at a content coordinate.
    pub fn print(&mut self, col: i32, row: i32, s: &str) {
        self.move_to(col, row);
        self.add_str(s);
    }

    /// Set the attribute for subsequent writes.
    pub fn set_attribute(&mut self, attr: Attribute) {
        self.driver.set_attribute(attr);
    }

    /// Build an attribute from a color combination.
    pub fn make_attribute(&mut self, fg: Color, bg: Color) -> Attribute {
        self.driver.make_attribute(fg, bg)
    }

    /// Fill a content rect with `ch`.
    pub fn fill(&mut self, rect: Rect, ch: char) {
        for y in rect.tl.y..rect.bottom() {
            self.move_to(rect.tl.x, y);
            for _ in 0..rect.w {
                self.driver.add_char(ch);
            }
        }
    }

    /// Clear the whole content area.
    pub fn clear(&mut self) {
        self.fill(self.bounds, ' ');
    }

    /// Draw a box around a content rect.
    pub fn draw_frame(&mut self, rect: Rect, filled: bool) {
        self.driver
            .draw_box_frame(rect.shift(self.origin.x, self.origin.y), filled);
    }
}

/// Run `f` with the driver clipped to `clip`, restoring the previous clip
/// afterwards.
fn with_clip<R>(
    driver: &mut dyn ConsoleDriver,
    clip: Rect,
    f: impl FnOnce(&mut dyn ConsoleDriver) -> R,
) -> R {
    let prev = driver.clip();
    driver.set_clip(clip);
    let mut driver = guard(driver, move |d| d.set_clip(prev));
    f(&mut **driver)
}

impl Views {
    /// Redraw every damaged view in the subtree at `id` and clear its
    /// damage. Views are drawn parent before children, siblings in order.
    pub fn redraw(&mut self, id: ViewId, driver: &mut dyn ConsoleDriver) -> Result<()> {
        let frame = self.screen_frame(id)?;
        match frame.intersect(&driver.clip()) {
            Some(clip) => self.redraw_view(id, driver, clip),
            None => self.clear_needs_display(id),
        }
    }

    /// Redraw one view within a screen clip.
    fn redraw_view(&mut self, id: ViewId, driver: &mut dyn ConsoleDriver, clip: Rect) -> Result<()> {
        if !self.get(id)?.visible {
            return self.clear_needs_display(id);
        }
        let frame = self.screen_frame(id)?;
        let dirty = self.get(id)?.need_display;
        if !dirty.is_empty()
            && let Some(area) = dirty.shift(frame.tl.x, frame.tl.y).intersect(&clip)
        {
            trace!(view = %self.name(id), ?area, "redraw");
            with_clip(driver, area, |d| -> Result<()> {
                self.draw_adornments(id, d, frame.tl)?;
                self.draw_content(id, d)
            })?;
        }

        self.damage_overlapping_siblings(id)?;
        let content = self.screen_bounds(id)?.intersect(&clip);
        let subs = self.get(id)?.subviews.clone();
        for c in subs {
            let n = self.get(c)?;
            if !n.is_dirty() {
                continue;
            }
            let child_clip = match content {
                Some(content) if n.visible && n.frame.has_area() => {
                    content.intersect(&self.screen_frame(c)?)
                }
                _ => None,
            };
            match child_clip {
                Some(cc) => self.redraw_view(c, driver, cc)?,
                None => self.clear_needs_display(c)?,
            }
        }

        let n = self.get_mut(id)?;
        n.need_display = Rect::zero();
        n.child_needs_display = false;
        Ok(())
    }

    /// A damaged view may share cells with a later overlapped sibling, which
    /// then has to be painted again on top.
    fn damage_overlapping_siblings(&mut self, id: ViewId) -> Result<()> {
        let subs = self.get(id)?.subviews.clone();
        for (i, &c) in subs.iter().enumerate() {
            let n = self.get(c)?;
            if n.need_display.is_empty() || !n.visible {
                continue;
            }
            let dirty = n.need_display.shift(n.frame.tl.x, n.frame.tl.y);
            for &later in &subs[i + 1..] {
                let l = self.get(later)?;
                if !l.visible || !l.arrangement.contains(Arrangement::OVERLAPPED) {
                    continue;
                }
                if let Some(overlap) = dirty.intersect(&l.frame) {
                    let local = overlap.shift(-l.frame.tl.x, -l.frame.tl.y);
                    if !l.need_display.contains_rect(&local) {
                        self.damage_local(later, local)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Paint the margin and padding rings blank and the border as a box.
    fn draw_adornments(&self, id: ViewId, driver: &mut dyn ConsoleDriver, origin: Point) -> Result<()> {
        let rings = self.rings(id)?;
        if rings.margin_t.is_zero() && rings.border_t.is_zero() && rings.padding_t.is_zero() {
            return Ok(());
        }
        driver.set_attribute(Attribute::default());
        for kind in AdornmentKind::ALL {
            let (rect, t) = rings.ring(kind);
            if t.is_zero() {
                continue;
            }
            for y in rect.tl.y..rect.bottom() {
                for x in rect.tl.x..rect.right() {
                    if t.ring_contains(rect, (x, y)) {
                        driver.move_to(origin.x + x, origin.y + y);
                        driver.add_char(' ');
                    }
                }
            }
        }
        if !rings.border_t.is_zero() {
            driver.draw_box_frame(rings.border.shift(origin.x, origin.y), false);
        }
        Ok(())
    }

    /// Draw the widget, or blank the content area if there is none.
    fn draw_content(&mut self, id: ViewId, driver: &mut dyn ConsoleDriver) -> Result<()> {
        let origin = self.view_to_screen(id, Point::zero())?;
        let bounds = self.bounds(id)?;
        let focused = self.get(id)?.has_focus;
        let mut ctx = DrawContext::new(driver, origin, bounds, focused);
        match self.take_widget(id) {
            Some(mut w) => {
                let ret = w.draw(&mut ctx);
                self.restore_widget(id, w);
                ret
            }
            None => {
                ctx.clear();
                Ok(())
            }
        }
    }
}
