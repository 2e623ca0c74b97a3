use std::{
    cell::RefCell,
    fmt,
    rc::Rc,
    sync::{Arc, Condvar, Mutex, PoisonError},
    time::Duration,
};

use geom::{Point, Rect, Size};

use crate::{
    driver::{
        Attribute, Backend, Color, ColorPairCache, ConsoleDriver, InputQueue, ResizeHandler,
        screen::{Cell, CellBuffer, ScreenState},
    },
    error::Result,
    mainloop::{MainLoopDriver, Waker},
};

/// Number of color pairs the fake terminal pretends to support.
const FAKE_PAIRS: i16 = 64;

/// State of the in-memory terminal.
struct FakeState {
    /// Cursor and clip.
    screen: ScreenState,
    /// Cell contents.
    buffer: CellBuffer,
    /// Between `init` and `end`.
    active: bool,
    /// Hardware cursor visibility requested by the last update.
    cursor_visible: bool,
    /// Size-change callback.
    on_resize: Option<ResizeHandler>,
    /// Calls to `refresh`.
    refreshes: usize,
    /// Calls to `init`.
    inits: usize,
}

/// A cloneable view onto the fake terminal, for assertions and resize
/// injection.
#[derive(Clone)]
pub struct FakeScreen(Rc<RefCell<FakeState>>);

impl fmt::Debug for FakeScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeScreen")
            .field("size", &self.size())
            .field("active", &self.is_active())
            .finish()
    }
}

impl FakeScreen {
    /// Terminal size.
    pub fn size(&self) -> Size {
        self.0.borrow().screen.size()
    }

    /// Every row as text.
    pub fn lines(&self) -> Vec<String> {
        self.0.borrow().buffer.lines()
    }

    /// Row `y` as text.
    pub fn row(&self, y: u32) -> String {
        self.0.borrow().buffer.row_text(y)
    }

    /// The rows joined with newlines, trailing spaces trimmed.
    pub fn snapshot(&self) -> String {
        self.lines()
            .iter()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The cell at `p`.
    pub fn cell(&self, p: Point) -> Option<Cell> {
        self.0.borrow().buffer.cell(p)
    }

    /// The visible hardware cursor position, if shown.
    pub fn cursor(&self) -> Option<Point> {
        let s = self.0.borrow();
        s.cursor_visible.then(|| s.screen.cursor())
    }

    /// True between `init` and `end`.
    pub fn is_active(&self) -> bool {
        self.0.borrow().active
    }

    /// Number of refreshes so far.
    pub fn refreshes(&self) -> usize {
        self.0.borrow().refreshes
    }

    /// Number of times the terminal was taken over.
    pub fn inits(&self) -> usize {
        self.0.borrow().inits
    }

    /// Change the terminal size and report it the way a real backend does.
    pub fn resize(&self, size: Size) {
        let mut s = self.0.borrow_mut();
        s.screen.resize(size);
        s.buffer.resize(size);
        if let Some(f) = s.on_resize.as_mut() {
            f(size);
        }
    }
}

/// A console driver drawing into memory.
pub struct FakeDriver {
    /// Shared terminal state.
    state: FakeScreen,
    /// Attribute for subsequent writes.
    attr: Attribute,
    /// Pair allocation, mirroring a color terminal.
    pairs: ColorPairCache,
}

impl FakeDriver {
    /// A driver for a terminal of `size`, plus a handle onto its contents.
    pub fn new(size: Size) -> (Self, FakeScreen) {
        let screen = FakeScreen(Rc::new(RefCell::new(FakeState {
            screen: ScreenState::new(size),
            buffer: CellBuffer::new(size),
            active: false,
            cursor_visible: false,
            on_resize: None,
            refreshes: 0,
            inits: 0,
        })));
        (
            Self {
                state: screen.clone(),
                attr: Attribute::default(),
                pairs: ColorPairCache::new(FAKE_PAIRS),
            },
            screen,
        )
    }
}

impl ConsoleDriver for FakeDriver {
    fn cols(&self) -> u32 {
        self.state.size().w
    }

    fn rows(&self) -> u32 {
        self.state.size().h
    }

    fn init(&mut self, on_resize: ResizeHandler) -> Result<()> {
        let mut s = self.state.0.borrow_mut();
        s.active = true;
        s.inits += 1;
        s.on_resize = Some(on_resize);
        Ok(())
    }

    fn move_to(&mut self, col: i32, row: i32) {
        self.state.0.borrow_mut().screen.move_to(col, row);
    }

    fn add_char(&mut self, ch: char) {
        let mut s = self.state.0.borrow_mut();
        if let Some((p, width)) = s.screen.place(ch) {
            s.buffer.put(p, width, ch, self.attr);
        }
    }

    fn set_attribute(&mut self, attr: Attribute) {
        self.attr = attr;
    }

    fn make_attribute(&mut self, fg: Color, bg: Color) -> Attribute {
        let pair = self.pairs.pair(fg, bg, |_, _, _| Ok(()));
        Attribute {
            value: i32::from(pair) << 8,
            fg,
            bg,
        }
    }

    fn clip(&self) -> Rect {
        self.state.0.borrow().screen.clip()
    }

    fn set_clip(&mut self, clip: Rect) {
        self.state.0.borrow_mut().screen.set_clip(clip);
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<()> {
        self.state.0.borrow_mut().cursor_visible = visible;
        Ok(())
    }

    fn refresh(&mut self) -> Result<()> {
        self.state.0.borrow_mut().refreshes += 1;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let mut s = self.state.0.borrow_mut();
        s.active = false;
        s.on_resize = None;
        Ok(())
    }
}

/// Wakeup flag with a condition variable.
#[derive(Default)]
struct Signal {
    /// Set by wakers, cleared by waits.
    woken: Mutex<bool>,
    /// Notified on wake.
    cond: Condvar,
}

/// A loop driver with no input source of its own. It reports work whenever
/// the input queue is non-empty, and blocks on a condition variable
/// otherwise.
pub struct FakeLoop {
    /// Queue filled by the test.
    input: InputQueue,
    /// Wakeup state.
    signal: Arc<Signal>,
}

impl FakeLoop {
    /// A loop watching `input`.
    pub fn new(input: InputQueue) -> Self {
        Self {
            input,
            signal: Arc::default(),
        }
    }
}

impl MainLoopDriver for FakeLoop {
    fn waker(&self) -> Waker {
        let signal = self.signal.clone();
        Waker::new(move || {
            *signal.woken.lock().unwrap_or_else(PoisonError::into_inner) = true;
            signal.cond.notify_all();
        })
    }

    fn events_pending(&mut self, timeout: Option<Duration>) -> Result<bool> {
        if !self.input.is_empty() {
            return Ok(true);
        }
        let mut woken = self.signal.woken.lock().unwrap_or_else(PoisonError::into_inner);
        match timeout {
            Some(d) if d.is_zero() => {}
            Some(d) => {
                woken = self
                    .signal
                    .cond
                    .wait_timeout_while(woken, d, |w| !*w)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
            }
            None => {
                woken = self
                    .signal
                    .cond
                    .wait_while(woken, |w| !*w)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        let was = *woken;
        *woken = false;
        Ok(was || !self.input.is_empty())
    }

    fn iteration(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A fake backend of `size` feeding `input`, plus a handle onto its screen.
pub fn fake_backend(size: Size, input: &InputQueue) -> (Backend, FakeScreen) {
    let (driver, screen) = FakeDriver::new(size);
    (
        Backend {
            console: Box::new(driver),
            main_loop: Box::new(FakeLoop::new(input.clone())),
            watches: None,
            restore: Arc::new(|| {}),
        },
        screen,
    )
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn draws_and_clips() -> Result<()> {
        let (mut d, screen) = FakeDriver::new(Size::new(6, 2));
        d.set_clip(Rect::new(0, 0, 3, 1));
        d.move_to(0, 0);
        d.add_str("abcdef");
        assert_eq!(screen.row(0), "abc   ");
        d.set_clip(Size::new(6, 2).rect());
        d.draw_box_frame(Rect::new(0, 0, 6, 2), false);
        assert_eq!(screen.lines(), vec!["┌────┐", "└────┘"]);
        Ok(())
    }

    #[test]
    fn waker_releases_wait() -> Result<()> {
        let mut lp = FakeLoop::new(InputQueue::new());
        assert!(!lp.events_pending(Some(Duration::ZERO))?);
        let w = lp.waker();
        let t = thread::spawn(move || w.wake());
        assert!(lp.events_pending(None)?);
        drop(t.join());
        Ok(())
    }
}
