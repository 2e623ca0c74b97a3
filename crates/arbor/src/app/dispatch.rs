use geom::Size;
use tracing::trace;

use super::AppContext;
use crate::{
    error::Result,
    event::{
        KeyCode,
        key::Key,
        mouse::{Action, MouseEvent},
    },
    mainloop::LoopHandle,
    view::{ViewId, Views},
    widget::{EventOutcome, Widget},
};

/// What a widget sees while handling an event: the application context and
/// the id of its own view.
pub struct EventContext<'a> {
    /// Application state.
    app: &'a mut AppContext,
    /// The view whose widget is running.
    view: ViewId,
}

impl EventContext<'_> {
    /// The view whose widget is handling the event.
    pub fn view(&self) -> ViewId {
        self.view
    }

    /// The view arena.
    pub fn views(&self) -> &Views {
        &self.app.views
    }

    /// The view arena, mutably.
    pub fn views_mut(&mut self) -> &mut Views {
        &mut self.app.views
    }

    /// Damage the whole view.
    pub fn set_needs_display(&mut self) -> Result<()> {
        self.app.views.set_needs_display(self.view)
    }

    /// Focus this view inside its toplevel.
    pub fn focus(&mut self) -> Result<()> {
        self.app.set_focus(self.view)
    }

    /// Stop the top toplevel's run loop.
    pub fn request_stop(&mut self) {
        self.app.stop();
    }

    /// Route every mouse event to this view until released.
    pub fn grab_mouse(&mut self) {
        self.app.grab_mouse(self.view);
    }

    /// Release a mouse grab.
    pub fn ungrab_mouse(&mut self) {
        self.app.ungrab_mouse();
    }

    /// Run `toplevel` modally once this event has been dispatched.
    pub fn present(&mut self, toplevel: ViewId) {
        self.app.present(toplevel);
    }

    /// Main-loop registration handle.
    pub fn loop_handle(&self) -> LoopHandle<AppContext> {
        self.app.handle.clone()
    }

    /// Current screen size.
    pub fn screen_size(&self) -> Size {
        self.app.screen_size()
    }
}

impl AppContext {
    /// Run a handler on the widget of `id`. The widget is taken out of the
    /// arena for the duration of the call; a handled outcome damages the
    /// view.
    fn call_widget(
        &mut self,
        id: ViewId,
        f: impl FnOnce(&mut dyn Widget, &mut EventContext<'_>) -> Result<EventOutcome>,
    ) -> Result<EventOutcome> {
        let Some(mut w) = self.views.take_widget(id) else {
            return Ok(EventOutcome::Ignore);
        };
        let ret = {
            let mut ctx = EventContext { app: self, view: id };
            f(w.as_mut(), &mut ctx)
        };
        self.views.restore_widget(id, w);
        let outcome = ret?;
        if outcome == EventOutcome::Handle && self.views.contains(id) {
            self.views.set_needs_display(id)?;
        }
        Ok(outcome)
    }

    /// Route a key through the hot pass, the focus chain, the toplevel's
    /// navigation keys and the cold pass. Returns true if something handled
    /// it.
    pub(crate) fn dispatch_key(&mut self, key: Key) -> Result<bool> {
        let Some(top) = self.top() else {
            return Ok(false);
        };
        trace!(?key, "key");

        for v in self.views.preorder(top) {
            if self
                .call_widget(v, |w, ctx| w.process_hot_key(key, ctx))?
                .is_handled()
            {
                return Ok(true);
            }
        }

        for &v in self.views.focus_chain(top).iter().rev() {
            if self
                .call_widget(v, |w, ctx| w.process_key(key, ctx))?
                .is_handled()
            {
                return Ok(true);
            }
        }

        if self.toplevel_key(top, key)? {
            return Ok(true);
        }

        for v in self.views.preorder(top) {
            if self
                .call_widget(v, |w, ctx| w.process_cold_key(key, ctx))?
                .is_handled()
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Keys every toplevel understands: focus traversal with wrap-around,
    /// and the quit key.
    fn toplevel_key(&mut self, top: ViewId, key: Key) -> Result<bool> {
        let backward =
            key.key == KeyCode::BackTab || (key.key == KeyCode::Tab && key.mods.shift);
        if key == KeyCode::Tab {
            if !self.views.focus_next(top)? {
                self.views.focus_next(top)?;
            }
            return Ok(true);
        }
        if backward {
            if !self.views.focus_prev(top)? {
                self.views.focus_prev(top)?;
            }
            return Ok(true);
        }
        if key == self.quit_key {
            self.request_stop(top);
            return Ok(true);
        }
        Ok(false)
    }

    /// Route a mouse event to the grabbing view, or to the deepest view
    /// under the pointer and then its ancestors while they ignore it.
    /// A button press focuses the target when it can take focus.
    pub(crate) fn dispatch_mouse(&mut self, m: MouseEvent) -> Result<bool> {
        let Some(top) = self.top() else {
            return Ok(false);
        };
        if let Some(g) = self.grab {
            if self.views.contains(g) {
                let local = self.views.screen_to_view(g, m.location)?;
                return Ok(self
                    .call_widget(g, |w, ctx| w.on_mouse(m.with_location(local), ctx))?
                    .is_handled());
            }
            self.grab = None;
        }

        let Some(target) = self.views.view_at(top, m.location)? else {
            return Ok(false);
        };
        trace!(?m, view = %self.views.name(target), "mouse");
        if m.action == Action::Down && target != top {
            self.views.set_focus(top, target)?;
        }

        let mut cur = Some(target);
        while let Some(v) = cur {
            if self.views.get(v)?.enabled() {
                let local = self.views.screen_to_view(v, m.location)?;
                if self
                    .call_widget(v, |w, ctx| w.on_mouse(m.with_location(local), ctx))?
                    .is_handled()
                {
                    return Ok(true);
                }
            }
            cur = if self.views.contains(v) {
                self.views.superview(v)?
            } else {
                None
            };
        }
        Ok(false)
    }
}
