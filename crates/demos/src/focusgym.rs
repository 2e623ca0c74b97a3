use arbor::{
    app::EventContext,
    driver::Color,
    error::Result,
    event::key::Key,
    layout::{Dim, Placement, Pos},
    view::{DrawContext, ViewId, Views},
    widget::{EventOutcome, Widget},
};
use tracing::debug;

/// A block that fills its area and can be split into smaller blocks.
#[derive(Debug, Clone, Copy)]
pub struct Block {
    /// Children are laid out side by side rather than stacked.
    pub horizontal: bool,
}

impl Block {
    /// A block whose children will run in the given direction.
    pub fn new(horizontal: bool) -> Self {
        Self { horizontal }
    }

    /// Too small along the split axis to hold another child.
    fn size_limited(&self, views: &Views, id: ViewId) -> Result<bool> {
        let f = views.frame(id)?;
        Ok((self.horizontal && f.w <= 4) || (!self.horizontal && f.h <= 4))
    }
}

/// Create a block as the last child of `parent` and re-place its siblings.
pub fn add_block(views: &mut Views, parent: ViewId, horizontal: bool) -> Result<ViewId> {
    let b = views.create_with("block", Block::new(!horizontal));
    views.set_can_focus(b, true)?;
    views.add(parent, b)?;
    place_children(views, parent, horizontal)?;
    Ok(b)
}

/// Divide `id`'s content evenly among its children.
fn place_children(views: &mut Views, id: ViewId, horizontal: bool) -> Result<()> {
    let subs = views.subviews(id)?.to_vec();
    let n = subs.len() as f32;
    for (i, &c) in subs.iter().enumerate() {
        let start = Pos::percent(100.0 * i as f32 / n)?;
        let extent = if i + 1 == subs.len() {
            Dim::fill(0)?
        } else {
            Dim::percent(100.0 / n)?
        };
        let p = if horizontal {
            Placement::new(start, 0, extent, Dim::fill(0)?)
        } else {
            Placement::new(0, start, Dim::fill(0)?, extent)
        };
        views.set_placement(c, p)?;
    }
    Ok(())
}

impl Widget for Block {
    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<()> {
        let b = ctx.bounds();
        let fg = if ctx.has_focus() {
            Color::BrightMagenta
        } else {
            Color::Blue
        };
        let attr = ctx.make_attribute(fg, Color::Black);
        ctx.set_attribute(attr);
        ctx.fill(b, '\u{2588}');
        ctx.draw_frame(b, false);
        Ok(())
    }

    fn process_key(&mut self, key: Key, ctx: &mut EventContext<'_>) -> Result<EventOutcome> {
        let id = ctx.view();
        if key == 's' {
            if !ctx.views().subviews(id)?.is_empty() || self.size_limited(ctx.views(), id)? {
                return Ok(EventOutcome::Consume);
            }
            debug!("split");
            let views = ctx.views_mut();
            let first = add_block(views, id, self.horizontal)?;
            add_block(views, id, self.horizontal)?;
            let root = views.root_of(id);
            views.set_focus(root, first)?;
            return Ok(EventOutcome::Handle);
        }
        if key == 'a' {
            let Some(parent) = ctx.views().superview(id)? else {
                return Ok(EventOutcome::Ignore);
            };
            let Ok(&pb) = ctx.views().widget::<Self>(parent) else {
                return Ok(EventOutcome::Ignore);
            };
            if pb.size_limited(ctx.views(), id)? {
                return Ok(EventOutcome::Consume);
            }
            add_block(ctx.views_mut(), parent, pb.horizontal)?;
            return Ok(EventOutcome::Handle);
        }
        Ok(EventOutcome::Ignore)
    }
}

/// Build the gym: a toplevel holding one root block.
pub fn build(views: &mut Views) -> Result<ViewId> {
    let top = views.create_toplevel("focusgym");
    let root = views.create_with("root", Block::new(true));
    views.add(top, root)?;
    views.set_placement(root, Placement::fill())?;
    views.set_can_focus(root, true)?;
    Ok(top)
}
