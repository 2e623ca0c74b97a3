//! Console drivers.
//!
//! A [`ConsoleDriver`] maps a uniform drawing contract onto a native
//! terminal API. Each backend pairs its console driver with a
//! [`MainLoopDriver`](crate::mainloop::MainLoopDriver) that waits for input
//! and pushes translated events into the shared [`InputQueue`].

/// Curses backend.
#[cfg(unix)]
pub mod curses;
/// Portable crossterm backend with a blocking reader thread.
pub mod fallback;
/// POSIX readiness loop.
#[cfg(unix)]
pub mod posix;
/// Clip, cursor and cell-grid state shared by the backends.
pub mod screen;
/// Win32 console backend.
#[cfg(windows)]
pub mod windows;

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    fmt,
    rc::Rc,
    str::FromStr,
    sync::Arc,
};

use geom::{BoxFrame, Rect, Size};
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    event::Event,
    mainloop::MainLoopDriver,
};

/// Callback invoked synchronously by a backend when the terminal size
/// changes.
pub type ResizeHandler = Box<dyn FnMut(Size)>;

/// The named colors every backend supports. The discriminants match the
/// classic 16-color console palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Black.
    #[default]
    Black = 0,
    /// Blue.
    Blue,
    /// Green.
    Green,
    /// Cyan.
    Cyan,
    /// Red.
    Red,
    /// Magenta.
    Magenta,
    /// Brown, rendered as dark yellow on most terminals.
    Brown,
    /// Gray.
    Gray,
    /// Dark gray.
    DarkGray,
    /// Bright blue.
    BrightBlue,
    /// Bright green.
    BrightGreen,
    /// Bright cyan.
    BrightCyan,
    /// Bright red.
    BrightRed,
    /// Bright magenta.
    BrightMagenta,
    /// Bright yellow.
    BrightYellow,
    /// White.
    White,
}

impl Color {
    /// Palette index, 0 to 15.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// True for the upper eight palette entries.
    pub fn is_bright(self) -> bool {
        self.index() >= 8
    }

    /// The matching entry in the lower eight.
    pub fn base(self) -> Self {
        Self::from_index(self.index() & 7)
    }

    /// Palette lookup; indices wrap modulo 16.
    pub fn from_index(i: u8) -> Self {
        const ALL: [Color; 16] = [
            Color::Black,
            Color::Blue,
            Color::Green,
            Color::Cyan,
            Color::Red,
            Color::Magenta,
            Color::Brown,
            Color::Gray,
            Color::DarkGray,
            Color::BrightBlue,
            Color::BrightGreen,
            Color::BrightCyan,
            Color::BrightRed,
            Color::BrightMagenta,
            Color::BrightYellow,
            Color::White,
        ];
        ALL[(i & 15) as usize]
    }
}

/// A backend-specific attribute value along with the colors it encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attribute {
    /// Backend value, e.g. a curses attribute word or a Win32 color byte.
    pub value: i32,
    /// Foreground.
    pub fg: Color,
    /// Background.
    pub bg: Color,
}

impl Default for Attribute {
    fn default() -> Self {
        Self {
            value: 0,
            fg: Color::Gray,
            bg: Color::Black,
        }
    }
}

impl Attribute {
    /// Use a raw color-pair index. Only meaningful to the curses backend.
    pub fn from_pair(index: i16) -> Self {
        Self {
            value: i32::from(index) << 8,
            ..Self::default()
        }
    }
}

/// Maps `(fg, bg)` to color-pair indices, registering each pair once.
///
/// Pair 0 is the terminal default and is never allocated. When the table is
/// full, further combinations fall back to pair 0.
#[derive(Debug)]
pub struct ColorPairCache {
    /// Allocated pairs.
    pairs: HashMap<(Color, Color), i16>,
    /// Next free index.
    next: i16,
    /// Number of pairs the backend supports.
    capacity: i16,
}

impl ColorPairCache {
    /// A cache for a table of `capacity` pairs.
    pub fn new(capacity: i16) -> Self {
        Self {
            pairs: HashMap::new(),
            next: 1,
            capacity,
        }
    }

    /// Number of allocated pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True if nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The pair for `(fg, bg)`, calling `register` the first time a
    /// combination is seen.
    pub fn pair(
        &mut self,
        fg: Color,
        bg: Color,
        register: impl FnOnce(i16, Color, Color) -> Result<()>,
    ) -> i16 {
        if let Some(p) = self.pairs.get(&(fg, bg)) {
            return *p;
        }
        if self.next >= self.capacity {
            warn!(?fg, ?bg, capacity = self.capacity, "color pair table exhausted");
            return 0;
        }
        let idx = self.next;
        if let Err(e) = register(idx, fg, bg) {
            warn!(?fg, ?bg, "color pair registration failed: {e}");
            return 0;
        }
        self.next += 1;
        self.pairs.insert((fg, bg), idx);
        idx
    }
}

/// The drawing contract every backend implements.
///
/// Coordinates are screen cells. Writes outside the clip rectangle are
/// discarded while the logical cursor still advances.
pub trait ConsoleDriver {
    /// Current width in columns.
    fn cols(&self) -> u32;

    /// Current height in rows.
    fn rows(&self) -> u32;

    /// Current size.
    fn size(&self) -> Size {
        Size::new(self.cols(), self.rows())
    }

    /// Take over the terminal. `on_resize` is called synchronously whenever
    /// the backend observes a size change.
    fn init(&mut self, on_resize: ResizeHandler) -> Result<()>;

    /// Move the logical cursor.
    fn move_to(&mut self, col: i32, row: i32);

    /// Write a character at the cursor and advance it by the character's
    /// display width.
    fn add_char(&mut self, ch: char);

    /// Write a string at the cursor.
    fn add_str(&mut self, s: &str) {
        for ch in s.chars() {
            self.add_char(ch);
        }
    }

    /// Set the attribute used by subsequent writes.
    fn set_attribute(&mut self, attr: Attribute);

    /// Build an attribute for a color combination.
    fn make_attribute(&mut self, fg: Color, bg: Color) -> Attribute;

    /// Draw a single-line box around `rect`, optionally clearing its inside.
    fn draw_box_frame(&mut self, rect: Rect, filled: bool) {
        let Some(frame) = BoxFrame::new(rect) else {
            return;
        };
        let hline = |d: &mut Self, r: Rect| {
            d.move_to(r.tl.x, r.tl.y);
            for _ in 0..r.w {
                d.add_char(glyphs::HLINE);
            }
        };
        let vline = |d: &mut Self, r: Rect| {
            for y in r.tl.y..r.bottom() {
                d.move_to(r.tl.x, y);
                d.add_char(glyphs::VLINE);
            }
        };
        for (p, ch) in [
            (frame.topleft, glyphs::ULCORNER),
            (frame.topright, glyphs::URCORNER),
            (frame.bottomleft, glyphs::LLCORNER),
            (frame.bottomright, glyphs::LRCORNER),
        ] {
            self.move_to(p.x, p.y);
            self.add_char(ch);
        }
        hline(self, frame.top);
        hline(self, frame.bottom);
        vline(self, frame.left);
        vline(self, frame.right);
        if filled {
            let inner = frame.inner();
            for y in inner.tl.y..inner.bottom() {
                self.move_to(inner.tl.x, y);
                for _ in 0..inner.w {
                    self.add_char(' ');
                }
            }
        }
    }

    /// The clip rectangle.
    fn clip(&self) -> Rect;

    /// Replace the clip rectangle.
    fn set_clip(&mut self, clip: Rect);

    /// Show or hide the hardware cursor at the logical cursor position.
    fn set_cursor_visible(&mut self, visible: bool) -> Result<()>;

    /// Flush pending output to the terminal.
    fn refresh(&mut self) -> Result<()>;

    /// Restore the terminal.
    fn end(&mut self) -> Result<()>;
}

/// Box-drawing characters.
pub mod glyphs {
    /// Horizontal line.
    pub const HLINE: char = '─';
    /// Vertical line.
    pub const VLINE: char = '│';
    /// Upper-left corner.
    pub const ULCORNER: char = '┌';
    /// Upper-right corner.
    pub const URCORNER: char = '┐';
    /// Lower-left corner.
    pub const LLCORNER: char = '└';
    /// Lower-right corner.
    pub const LRCORNER: char = '┘';
}

/// The queue through which backends hand translated input to the
/// application. Lives on the loop thread.
#[derive(Clone, Default)]
pub struct InputQueue {
    /// Pending events, oldest first.
    events: Rc<RefCell<VecDeque<Event>>>,
}

impl fmt::Debug for InputQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputQueue")
            .field("len", &self.events.borrow().len())
            .finish()
    }
}

impl InputQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&self, e: Event) {
        self.events.borrow_mut().push_back(e);
    }

    /// Take every pending event.
    pub fn drain(&self) -> Vec<Event> {
        self.events.borrow_mut().drain(..).collect()
    }

    /// True if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

/// Available backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    /// Dynamically loaded ncurses.
    Curses,
    /// Win32 console API.
    Windows,
    /// Portable crossterm backend with a blocking reader thread.
    Fallback,
}

impl FromStr for DriverKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "curses" | "ncurses" => Ok(Self::Curses),
            "windows" | "win32" => Ok(Self::Windows),
            "fallback" | "net" | "crossterm" => Ok(Self::Fallback),
            other => Err(Error::Config(format!("unknown driver: {other}"))),
        }
    }
}

/// Handle to the readiness table of a POSIX loop, when the backend has one.
#[cfg(unix)]
pub type WatchSupport = Option<posix::WatchHandle>;

/// Placeholder on platforms without a POSIX loop.
#[cfg(not(unix))]
pub type WatchSupport = Option<std::convert::Infallible>;

/// Puts the terminal back into its normal state. Safe to call from a panic
/// hook on any thread.
pub type Restore = Arc<dyn Fn() + Send + Sync>;

/// A console driver paired with its main-loop driver.
pub struct Backend {
    /// Drawing side.
    pub console: Box<dyn ConsoleDriver>,
    /// Readiness side.
    pub main_loop: Box<dyn MainLoopDriver>,
    /// File-descriptor watches, on POSIX loops.
    pub watches: WatchSupport,
    /// Terminal restore for panic hooks.
    pub restore: Restore,
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("cols", &self.console.cols())
            .field("rows", &self.console.rows())
            .finish_non_exhaustive()
    }
}

/// Open a backend. With no explicit choice the platform is probed: Windows
/// uses its console API, other platforms use curses when the library can
/// be loaded and fall back to crossterm otherwise.
pub fn open(kind: Option<DriverKind>, input: &InputQueue, mouse: bool) -> Result<Backend> {
    let kind = match kind {
        Some(k) => k,
        None => probe(),
    };
    debug!(?kind, "opening console backend");
    match kind {
        #[cfg(unix)]
        DriverKind::Curses => curses::open(input.clone(), mouse),
        #[cfg(windows)]
        DriverKind::Windows => windows::open(input.clone(), mouse),
        DriverKind::Fallback => fallback::open(input.clone(), mouse),
        #[allow(unreachable_patterns)]
        other => Err(Error::Config(format!(
            "{other:?} backend is not available on this platform"
        ))),
    }
}

/// Pick a backend by platform capability.
fn probe() -> DriverKind {
    #[cfg(windows)]
    {
        DriverKind::Windows
    }
    #[cfg(unix)]
    {
        if curses::available() {
            DriverKind::Curses
        } else {
            DriverKind::Fallback
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        DriverKind::Fallback
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn pair_cache_registers_once() -> Result<()> {
        let mut cache = ColorPairCache::new(3);
        let calls = Cell::new(0);
        let reg = |_: i16, _: Color, _: Color| {
            calls.set(calls.get() + 1);
            Ok(())
        };
        assert_eq!(cache.pair(Color::White, Color::Blue, reg), 1);
        assert_eq!(cache.pair(Color::White, Color::Blue, reg), 1);
        assert_eq!(cache.pair(Color::Red, Color::Black, reg), 2);
        // Full: falls back to the default pair without registering.
        assert_eq!(cache.pair(Color::Green, Color::Black, reg), 0);
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.len(), 2);
        Ok(())
    }

    #[test]
    fn failed_registration_is_not_cached() -> Result<()> {
        let mut cache = ColorPairCache::new(8);
        let p = cache.pair(Color::White, Color::Blue, |_, _, _| {
            Err(Error::driver("init_pair", "refused"))
        });
        assert_eq!(p, 0);
        assert!(cache.is_empty());
        Ok(())
    }

    #[test]
    fn palette() -> Result<()> {
        assert_eq!(Color::BrightRed.base(), Color::Red);
        assert!(Color::White.is_bright());
        assert!(!Color::Gray.is_bright());
        assert_eq!(Color::from_index(14), Color::BrightYellow);
        assert_eq!("Curses".parse::<DriverKind>()?, DriverKind::Curses);
        assert!("bogus".parse::<DriverKind>().is_err());
        Ok(())
    }
}
