use geom::{Point, Size};

use super::backend::{FakeScreen, fake_backend};
use crate::{
    app::{AppContext, Application, RunState},
    config::Config,
    driver::InputQueue,
    error::{Error, Result},
    event::{Event, key::Key, mouse::MouseEvent},
    view::{ViewId, Views},
};

/// Drives an [`Application`] over a fake backend. Tests queue input and
/// pump the top run loop without blocking, then inspect the screen.
pub struct Harness {
    /// The application under test.
    pub app: Application,
    /// The fake terminal.
    pub screen: FakeScreen,
    /// Input queue shared with the backend.
    input: InputQueue,
    /// Run states begun through the harness, bottom first.
    states: Vec<RunState>,
}

impl Harness {
    /// A harness with a terminal of `width` x `height` and test options.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_config(Config::headless(), Size::new(width, height))
    }

    /// A harness with explicit options.
    pub fn with_config(config: Config, size: Size) -> Self {
        let input = InputQueue::new();
        let (backend, screen) = fake_backend(size, &input);
        Self {
            app: Application::with_backend(config, backend, input.clone()),
            screen,
            input,
            states: Vec::new(),
        }
    }

    /// The view arena.
    pub fn views(&self) -> &Views {
        self.app.views()
    }

    /// The view arena, mutably.
    pub fn views_mut(&mut self) -> &mut Views {
        self.app.views_mut()
    }

    /// The application context.
    pub fn ctx(&mut self) -> &mut AppContext {
        self.app.context_mut()
    }

    /// Begin `toplevel` on top of the run stack.
    pub fn begin(&mut self, toplevel: ViewId) -> Result<()> {
        let state = self.app.begin(toplevel)?;
        self.states.push(state);
        Ok(())
    }

    /// End the most recently begun toplevel.
    pub fn end(&mut self) -> Result<()> {
        let mut state = self
            .states
            .pop()
            .ok_or_else(|| Error::RunLoop("nothing to end".into()))?;
        self.app.end(&mut state)
    }

    /// Process everything pending without blocking.
    pub fn pump(&mut self) -> Result<()> {
        let state = self
            .states
            .last()
            .ok_or_else(|| Error::RunLoop("nothing is running".into()))?;
        self.app.run_loop(state, false)
    }

    /// Queue an event and pump.
    pub fn event(&mut self, e: Event) -> Result<()> {
        self.input.push(e);
        self.pump()
    }

    /// Send a key and pump.
    pub fn key(&mut self, k: impl Into<Key>) -> Result<()> {
        self.event(Event::Key(k.into()))
    }

    /// Send keys one at a time.
    pub fn keys<K: Into<Key>>(&mut self, keys: impl IntoIterator<Item = K>) -> Result<()> {
        for k in keys {
            self.key(k)?;
        }
        Ok(())
    }

    /// Type a string as key events.
    pub fn type_text(&mut self, text: &str) -> Result<()> {
        self.keys(text.chars())
    }

    /// Send a mouse event and pump.
    pub fn mouse(&mut self, m: MouseEvent) -> Result<()> {
        self.event(Event::Mouse(m))
    }

    /// Left-click a screen cell.
    pub fn click(&mut self, x: i32, y: i32) -> Result<()> {
        self.mouse(MouseEvent::click(x, y))
    }

    /// Resize the terminal and pump.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.screen.resize(Size::new(width, height));
        self.pump()
    }

    /// True while the most recent toplevel has not been asked to stop.
    pub fn is_running(&self) -> bool {
        self.states
            .last()
            .is_some_and(|s| self.app.context().is_running(s.toplevel()))
    }

    /// Screen rows, trailing spaces trimmed, joined with newlines.
    pub fn snapshot(&self) -> String {
        self.screen.snapshot()
    }

    /// Screen row `y`.
    pub fn row(&self, y: u32) -> String {
        self.screen.row(y)
    }

    /// The visible cursor position.
    pub fn cursor(&self) -> Option<Point> {
        self.screen.cursor()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        while let Some(mut state) = self.states.pop() {
            if self.app.context().top() == Some(state.toplevel()) {
                drop(self.app.end(&mut state));
            }
        }
    }
}
