use std::{cell::RefCell, rc::Rc};

use geom::Point;

use crate::{
    app::EventContext,
    error::Result,
    event::{key::Key, mouse::MouseEvent},
    view::DrawContext,
    widget::{EventOutcome, Widget},
};

/// Draws a fixed string on its first row.
#[derive(Debug, Clone, Default)]
pub struct Label {
    /// Text to draw.
    pub text: String,
}

impl Label {
    /// A label showing `text`.
    pub fn new(text: &str) -> Self {
        Self { text: text.into() }
    }
}

impl Widget for Label {
    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<()> {
        ctx.clear();
        ctx.print(0, 0, &self.text);
        Ok(())
    }
}

/// Fills its content area with one character.
#[derive(Debug, Clone, Copy)]
pub struct Fill(pub char);

impl Widget for Fill {
    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<()> {
        let b = ctx.bounds();
        ctx.fill(b, self.0);
        Ok(())
    }
}

/// What a [`Recorder`] saw, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    /// `process_hot_key`.
    Hot(&'static str, Key),
    /// `process_key`.
    Key(&'static str, Key),
    /// `process_cold_key`.
    Cold(&'static str, Key),
    /// `on_mouse`, with the location in content coordinates.
    Mouse(&'static str, MouseEvent),
}

/// A shared event log.
pub type Log = Rc<RefCell<Vec<Seen>>>;

/// Logs every event it receives and claims the ones it is told to.
#[derive(Debug, Clone)]
pub struct Recorder {
    /// Tag written to the log.
    pub tag: &'static str,
    /// Destination log.
    pub log: Log,
    /// Hot keys to claim.
    pub hot: Vec<Key>,
    /// Focus-chain keys to claim.
    pub keys: Vec<Key>,
    /// Cold keys to claim.
    pub cold: Vec<Key>,
    /// Claim mouse events.
    pub mouse: bool,
    /// Reported cursor position.
    pub cursor: Option<Point>,
    /// Number of draws.
    pub draws: usize,
}

impl Recorder {
    /// A recorder that claims nothing.
    pub fn new(tag: &'static str, log: &Log) -> Self {
        Self {
            tag,
            log: log.clone(),
            hot: Vec::new(),
            keys: Vec::new(),
            cold: Vec::new(),
            mouse: false,
            cursor: None,
            draws: 0,
        }
    }

    /// Claim `k` on the hot pass.
    pub fn hot(mut self, k: impl Into<Key>) -> Self {
        self.hot.push(k.into());
        self
    }

    /// Claim `k` on the focus chain.
    pub fn key(mut self, k: impl Into<Key>) -> Self {
        self.keys.push(k.into());
        self
    }

    /// Claim `k` on the cold pass.
    pub fn cold(mut self, k: impl Into<Key>) -> Self {
        self.cold.push(k.into());
        self
    }

    /// Claim mouse events.
    pub fn mouse(mut self) -> Self {
        self.mouse = true;
        self
    }

    /// Report a cursor position.
    pub fn cursor_at(mut self, p: Point) -> Self {
        self.cursor = Some(p);
        self
    }

    /// Log an event and decide.
    fn note(&self, seen: Seen, claim: bool) -> EventOutcome {
        self.log.borrow_mut().push(seen);
        if claim {
            EventOutcome::Handle
        } else {
            EventOutcome::Ignore
        }
    }
}

/// Log entries since the last call, draining the log.
pub fn take(log: &Log) -> Vec<Seen> {
    log.borrow_mut().drain(..).collect()
}

impl Widget for Recorder {
    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<()> {
        self.draws += 1;
        ctx.clear();
        ctx.print(0, 0, self.tag);
        Ok(())
    }

    fn process_hot_key(&mut self, key: Key, _ctx: &mut EventContext<'_>) -> Result<EventOutcome> {
        Ok(self.note(Seen::Hot(self.tag, key), self.hot.contains(&key)))
    }

    fn process_key(&mut self, key: Key, _ctx: &mut EventContext<'_>) -> Result<EventOutcome> {
        Ok(self.note(Seen::Key(self.tag, key), self.keys.contains(&key)))
    }

    fn process_cold_key(&mut self, key: Key, _ctx: &mut EventContext<'_>) -> Result<EventOutcome> {
        Ok(self.note(Seen::Cold(self.tag, key), self.cold.contains(&key)))
    }

    fn on_mouse(&mut self, event: MouseEvent, _ctx: &mut EventContext<'_>) -> Result<EventOutcome> {
        Ok(self.note(Seen::Mouse(self.tag, event), self.mouse))
    }

    fn cursor(&self) -> Option<Point> {
        self.cursor
    }

    fn name(&self) -> &'static str {
        self.tag
    }
}
