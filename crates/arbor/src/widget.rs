//! Widget trait and event outcome types.

use std::any::{Any, type_name};

use geom::Point;

use crate::{
    app::EventContext,
    error::Result,
    event::{key::Key, mouse::MouseEvent},
    view::DrawContext,
};

/// The result of an event handler.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EventOutcome {
    /// The event was processed and the view changed; propagation stops and
    /// the view is damaged.
    Handle,
    /// The event was processed without a state change; propagation stops.
    Consume,
    /// The event was not handled and continues to the next candidate.
    Ignore,
}

impl EventOutcome {
    /// True unless the outcome is [`EventOutcome::Ignore`].
    pub fn is_handled(self) -> bool {
        self != Self::Ignore
    }
}

/// Behavior attached to a view.
///
/// Key handlers are called in three passes. Hot keys go to every view in
/// pre-order before anything else sees the key, the focus chain gets the
/// key innermost-first, and cold keys go to every view in pre-order after
/// the focus chain has ignored it.
pub trait Widget: Any {
    /// Draw the content area. `ctx` is clipped to the damaged region and
    /// addresses the view's bounds. The default clears the area.
    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<()> {
        ctx.clear();
        Ok(())
    }

    /// First-chance key handler.
    fn process_hot_key(&mut self, _key: Key, _ctx: &mut EventContext<'_>) -> Result<EventOutcome> {
        Ok(EventOutcome::Ignore)
    }

    /// Key handler for views on the focus chain.
    fn process_key(&mut self, _key: Key, _ctx: &mut EventContext<'_>) -> Result<EventOutcome> {
        Ok(EventOutcome::Ignore)
    }

    /// Last-chance key handler.
    fn process_cold_key(&mut self, _key: Key, _ctx: &mut EventContext<'_>) -> Result<EventOutcome> {
        Ok(EventOutcome::Ignore)
    }

    /// Mouse handler. The event location is in the view's content
    /// coordinates.
    fn on_mouse(&mut self, _event: MouseEvent, _ctx: &mut EventContext<'_>) -> Result<EventOutcome> {
        Ok(EventOutcome::Ignore)
    }

    /// Where to place the terminal cursor, in content coordinates, when this
    /// view is the innermost focused view.
    fn cursor(&self) -> Option<Point> {
        None
    }

    /// Name used in debug output.
    fn name(&self) -> &'static str {
        let name = type_name::<Self>();
        name.rsplit("::").next().unwrap_or(name)
    }
}

/// Convert widgets into boxed trait objects.
impl<W> From<W> for Box<dyn Widget>
where
    W: Widget + 'static,
{
    fn from(widget: W) -> Self {
        Box::new(widget)
    }
}
