//! A console driver over a dynamically loaded ncurses.
//!
//! The library is located with `dlopen` at runtime so that binaries do not
//! link against a particular ncurses ABI. Input is read by a watch on
//! standard input registered with the [`PosixLoop`].

use std::{
    cell::RefCell,
    ffi::{CStr, c_void},
    io::{self, Write},
    mem,
    os::raw::{c_int, c_short, c_uint, c_ulong},
    ptr,
    rc::Rc,
    sync::{Arc, OnceLock},
};

use geom::{Point, Rect, Size};
use tracing::{debug, trace, warn};

use super::{
    Attribute, Backend, Color, ColorPairCache, ConsoleDriver, InputQueue, ResizeHandler,
    posix::{Condition, PosixLoop},
    screen::ScreenState,
};
use crate::{
    error::{Error, Result},
    event::{
        Event,
        key::{self, Key, KeyCode},
        mouse::{Action, Button, MouseEvent},
    },
};

/// Shared objects tried in order.
const LIBRARIES: &[&CStr] = &[
    c"libncursesw.so.6",
    c"libncursesw.so.5",
    c"libncurses.so.6",
    c"libncurses.so.5",
    c"libncursesw.so",
    c"libncurses.so",
    c"libncurses.dylib",
];

/// Return codes.
const OK: c_int = 0;
/// Returned by `get_wch` for a function key.
const KEY_CODE_YES: c_int = 256;

/// Function key codes.
#[allow(clippy::missing_docs_in_private_items)]
mod keys {
    use std::os::raw::c_uint;

    pub const DOWN: c_uint = 258;
    pub const UP: c_uint = 259;
    pub const LEFT: c_uint = 260;
    pub const RIGHT: c_uint = 261;
    pub const HOME: c_uint = 262;
    pub const BACKSPACE: c_uint = 263;
    pub const F0: c_uint = 264;
    pub const DC: c_uint = 330;
    pub const IC: c_uint = 331;
    pub const SF: c_uint = 336;
    pub const SR: c_uint = 337;
    pub const NPAGE: c_uint = 338;
    pub const PPAGE: c_uint = 339;
    pub const ENTER: c_uint = 343;
    pub const BTAB: c_uint = 353;
    pub const END: c_uint = 360;
    pub const SLEFT: c_uint = 393;
    pub const SRIGHT: c_uint = 402;
    pub const MOUSE: c_uint = 409;
    pub const RESIZE: c_uint = 410;
}

/// Mouse masks for the ncurses 6 ABI.
#[allow(clippy::missing_docs_in_private_items)]
mod masks {
    pub const BUTTON1_RELEASED: u32 = 0x1;
    pub const BUTTON1_PRESSED: u32 = 0x2;
    pub const BUTTON2_RELEASED: u32 = 0x20;
    pub const BUTTON2_PRESSED: u32 = 0x40;
    pub const BUTTON3_RELEASED: u32 = 0x400;
    pub const BUTTON3_PRESSED: u32 = 0x800;
    pub const BUTTON4_PRESSED: u32 = 0x10000;
    pub const BUTTON5_PRESSED: u32 = 0x20_0000;
    pub const BUTTON_CTRL: u32 = 0x200_0000;
    pub const BUTTON_SHIFT: u32 = 0x400_0000;
    pub const BUTTON_ALT: u32 = 0x800_0000;
    pub const REPORT_MOUSE_POSITION: u32 = 0x1000_0000;
    pub const ALL_MOUSE_EVENTS: u32 = REPORT_MOUSE_POSITION - 1;
}

/// Bold attribute, used for the bright half of the palette.
const A_BOLD: c_int = 0x20_0000;

/// Terminal sequences enabling and disabling motion reporting.
const MOTION_ON: &[u8] = b"\x1b[?1003h";
/// See [`MOTION_ON`].
const MOTION_OFF: &[u8] = b"\x1b[?1003l";

/// `MEVENT`.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct MouseRecord {
    /// Device id.
    _id: c_short,
    /// Column.
    x: c_int,
    /// Row.
    y: c_int,
    /// Unused.
    _z: c_int,
    /// Button state; the low half of a 64-bit `mmask_t` on older ABIs.
    bstate: c_uint,
    /// Room for a 64-bit `mmask_t`.
    _high: c_uint,
}

/// An opaque `WINDOW *`.
type Window = *mut c_void;

/// The ncurses entry points.
#[allow(clippy::missing_docs_in_private_items)]
struct Api {
    initscr: unsafe extern "C" fn() -> Window,
    endwin: unsafe extern "C" fn() -> c_int,
    noecho: unsafe extern "C" fn() -> c_int,
    raw: unsafe extern "C" fn() -> c_int,
    nonl: unsafe extern "C" fn() -> c_int,
    keypad: unsafe extern "C" fn(Window, bool) -> c_int,
    timeout: unsafe extern "C" fn(c_int),
    get_wch: unsafe extern "C" fn(*mut c_uint) -> c_int,
    addnstr: unsafe extern "C" fn(*const libc::c_char, c_int) -> c_int,
    move_to: unsafe extern "C" fn(c_int, c_int) -> c_int,
    attrset: unsafe extern "C" fn(c_int) -> c_int,
    refresh: unsafe extern "C" fn() -> c_int,
    curs_set: unsafe extern "C" fn(c_int) -> c_int,
    start_color: unsafe extern "C" fn() -> c_int,
    use_default_colors: unsafe extern "C" fn() -> c_int,
    init_pair: unsafe extern "C" fn(c_short, c_short, c_short) -> c_int,
    has_colors: unsafe extern "C" fn() -> bool,
    mousemask: unsafe extern "C" fn(c_ulong, *mut c_ulong) -> c_ulong,
    getmouse: unsafe extern "C" fn(*mut MouseRecord) -> c_int,
    mouseinterval: unsafe extern "C" fn(c_int) -> c_int,
    stdscr: *mut Window,
    lines: *mut c_int,
    cols: *mut c_int,
    color_pairs: *mut c_int,
}

/// Handle of the loaded library, stored as an address. The library is never
/// unloaded.
fn library() -> Option<usize> {
    static LIB: OnceLock<Option<usize>> = OnceLock::new();
    *LIB.get_or_init(|| {
        LIBRARIES.iter().find_map(|name| {
            // SAFETY: name is a valid C string.
            let h = unsafe { libc::dlopen(name.as_ptr(), libc::RTLD_NOW | libc::RTLD_GLOBAL) };
            if h.is_null() {
                None
            } else {
                debug!(library = %name.to_string_lossy(), "loaded curses");
                Some(h as usize)
            }
        })
    })
}

/// True if an ncurses library can be loaded.
pub fn available() -> bool {
    library().is_some()
}

/// Resolve a symbol.
///
/// # Safety
///
/// `T` must be a pointer type matching the symbol's real type.
unsafe fn symbol<T: Copy>(lib: usize, name: &CStr) -> Result<T> {
    // SAFETY: lib came from dlopen and name is a valid C string.
    let p = unsafe { libc::dlsym(lib as *mut c_void, name.as_ptr()) };
    if p.is_null() {
        return Err(Error::driver(
            "dlsym",
            format!("{} not found", name.to_string_lossy()),
        ));
    }
    debug_assert_eq!(mem::size_of::<T>(), mem::size_of::<*mut c_void>());
    // SAFETY: guaranteed by the caller.
    Ok(unsafe { mem::transmute_copy(&p) })
}

impl Api {
    /// Resolve every entry point.
    fn load() -> Result<Self> {
        let lib = library().ok_or_else(|| Error::driver("dlopen", "no ncurses library found"))?;
        // SAFETY: each type matches the ncurses declaration.
        unsafe {
            Ok(Self {
                initscr: symbol(lib, c"initscr")?,
                endwin: symbol(lib, c"endwin")?,
                noecho: symbol(lib, c"noecho")?,
                raw: symbol(lib, c"raw")?,
                nonl: symbol(lib, c"nonl")?,
                keypad: symbol(lib, c"keypad")?,
                timeout: symbol(lib, c"timeout")?,
                get_wch: symbol(lib, c"get_wch")?,
                addnstr: symbol(lib, c"addnstr")?,
                move_to: symbol(lib, c"move")?,
                attrset: symbol(lib, c"attrset")?,
                refresh: symbol(lib, c"refresh")?,
                curs_set: symbol(lib, c"curs_set")?,
                start_color: symbol(lib, c"start_color")?,
                use_default_colors: symbol(lib, c"use_default_colors")?,
                init_pair: symbol(lib, c"init_pair")?,
                has_colors: symbol(lib, c"has_colors")?,
                mousemask: symbol(lib, c"mousemask")?,
                getmouse: symbol(lib, c"getmouse")?,
                mouseinterval: symbol(lib, c"mouseinterval")?,
                stdscr: symbol(lib, c"stdscr")?,
                lines: symbol(lib, c"LINES")?,
                cols: symbol(lib, c"COLS")?,
                color_pairs: symbol(lib, c"COLOR_PAIRS")?,
            })
        }
    }

    /// `COLS` x `LINES`.
    fn size(&self) -> Size {
        // SAFETY: data symbols resolved at load.
        let (w, h) = unsafe { (*self.cols, *self.lines) };
        Size::new(w.max(0) as u32, h.max(0) as u32)
    }
}

/// State shared between the driver and its input watch.
struct State {
    /// Cursor and clip.
    screen: ScreenState,
    /// The terminal is in curses mode.
    active: bool,
    /// Size-change callback.
    on_resize: Option<ResizeHandler>,
}

/// The curses console driver.
pub struct CursesDriver {
    /// Entry points.
    api: Rc<Api>,
    /// Shared with the input watch.
    state: Rc<RefCell<State>>,
    /// `(fg, bg)` to pair index.
    pairs: ColorPairCache,
    /// `initscr` has run at least once.
    started: bool,
    /// The terminal supports color.
    colors: bool,
    /// Report mouse events.
    mouse: bool,
}

/// Open the curses backend. Input is read from standard input by a watch on
/// a fresh [`PosixLoop`].
pub fn open(input: InputQueue, mouse: bool) -> Result<Backend> {
    let api = Rc::new(Api::load()?);
    let state = Rc::new(RefCell::new(State {
        screen: ScreenState::new(Size::new(0, 0)),
        active: false,
        on_resize: None,
    }));
    let main_loop = PosixLoop::new()?;
    let watches = main_loop.watches();
    let mut reader = Reader {
        api: api.clone(),
        state: state.clone(),
        input,
        held: None,
    };
    watches.add_watch(libc::STDIN_FILENO, Condition::IN, move |_| {
        reader.drain();
        true
    });
    let endwin = api.endwin;
    let restore = Arc::new(move || {
        // SAFETY: endwin is harmless outside curses mode.
        unsafe { endwin() };
        let mut out = io::stdout();
        drop(out.write_all(MOTION_OFF));
        drop(out.flush());
    });
    Ok(Backend {
        console: Box::new(CursesDriver {
            api,
            state,
            pairs: ColorPairCache::new(0),
            started: false,
            colors: false,
            mouse,
        }),
        main_loop: Box::new(main_loop),
        watches: Some(watches),
        restore,
    })
}

/// The curses palette index of a base color.
fn curses_color(c: Color) -> c_short {
    match c.base() {
        Color::Black => 0,
        Color::Red => 1,
        Color::Green => 2,
        Color::Brown => 3,
        Color::Blue => 4,
        Color::Magenta => 5,
        Color::Cyan => 6,
        _ => 7,
    }
}

impl CursesDriver {
    /// Enter curses mode for the first time.
    fn start(&mut self) -> Result<()> {
        // SAFETY: the empty locale string is a valid C string.
        unsafe { libc::setlocale(libc::LC_ALL, c"".as_ptr()) };
        let api = &*self.api;
        // SAFETY: curses calls in the documented order; stdscr is valid after
        // a successful initscr.
        unsafe {
            if (api.initscr)().is_null() {
                return Err(Error::driver("initscr", "could not initialize terminal"));
            }
            (api.raw)();
            (api.noecho)();
            (api.nonl)();
            (api.keypad)(*api.stdscr, true);
            (api.timeout)(0);
            self.colors = (api.has_colors)();
            if self.colors {
                (api.start_color)();
                (api.use_default_colors)();
                let n = (*api.color_pairs).clamp(0, i32::from(i16::MAX));
                self.pairs = ColorPairCache::new(n as i16);
            }
            if self.mouse {
                let mask = masks::ALL_MOUSE_EVENTS | masks::REPORT_MOUSE_POSITION;
                (api.mousemask)(c_ulong::from(mask), ptr::null_mut());
                (api.mouseinterval)(0);
            }
        }
        self.started = true;
        Ok(())
    }
}

impl ConsoleDriver for CursesDriver {
    fn cols(&self) -> u32 {
        self.state.borrow().screen.size().w
    }

    fn rows(&self) -> u32 {
        self.state.borrow().screen.size().h
    }

    fn init(&mut self, on_resize: ResizeHandler) -> Result<()> {
        if self.started {
            // Leaving endwin mode is a refresh.
            // SAFETY: curses was initialized by an earlier start.
            unsafe { (self.api.refresh)() };
        } else {
            self.start()?;
        }
        if self.mouse {
            let mut out = io::stdout();
            out.write_all(MOTION_ON)?;
            out.flush()?;
        }
        let size = self.api.size();
        let mut st = self.state.borrow_mut();
        st.screen.resize(size);
        st.active = true;
        st.on_resize = Some(on_resize);
        debug!(?size, colors = self.colors, "curses started");
        Ok(())
    }

    fn move_to(&mut self, col: i32, row: i32) {
        self.state.borrow_mut().screen.move_to(col, row);
    }

    fn add_char(&mut self, ch: char) {
        let Some((p, _)) = self.state.borrow_mut().screen.place(ch) else {
            return;
        };
        let mut buf = [0u8; 4];
        let s = ch.encode_utf8(&mut buf);
        // SAFETY: buf holds s.len() bytes of UTF-8.
        unsafe {
            (self.api.move_to)(p.y, p.x);
            (self.api.addnstr)(s.as_ptr().cast(), s.len() as c_int);
        }
    }

    fn set_attribute(&mut self, attr: Attribute) {
        // SAFETY: plain attribute word.
        unsafe { (self.api.attrset)(attr.value) };
    }

    fn make_attribute(&mut self, fg: Color, bg: Color) -> Attribute {
        let bold = if fg.is_bright() { A_BOLD } else { 0 };
        if !self.colors {
            return Attribute { value: bold, fg, bg };
        }
        let init_pair = self.api.init_pair;
        let pair = self.pairs.pair(fg.base(), bg.base(), |i, f, b| {
            // SAFETY: i is below COLOR_PAIRS.
            match unsafe { init_pair(i, curses_color(f), curses_color(b)) } {
                OK => Ok(()),
                _ => Err(Error::driver("init_pair", format!("pair {i}"))),
            }
        });
        Attribute {
            value: (c_int::from(pair) << 8) | bold,
            fg,
            bg,
        }
    }

    fn clip(&self) -> Rect {
        self.state.borrow().screen.clip()
    }

    fn set_clip(&mut self, clip: Rect) {
        self.state.borrow_mut().screen.set_clip(clip);
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<()> {
        let Point { x, y } = self.state.borrow().screen.cursor();
        // SAFETY: plain curses calls. curs_set fails on terminals without
        // cursor control, which is not an error here.
        unsafe {
            if visible {
                (self.api.move_to)(y, x);
            }
            (self.api.curs_set)(c_int::from(visible));
        }
        Ok(())
    }

    fn refresh(&mut self) -> Result<()> {
        // SAFETY: plain curses call.
        match unsafe { (self.api.refresh)() } {
            OK => Ok(()),
            _ => Err(Error::driver("refresh", "refresh failed")),
        }
    }

    fn end(&mut self) -> Result<()> {
        let mut st = self.state.borrow_mut();
        if !st.active {
            return Ok(());
        }
        st.active = false;
        st.on_resize = None;
        if self.mouse {
            let mut out = io::stdout();
            out.write_all(MOTION_OFF)?;
            out.flush()?;
        }
        // SAFETY: curses is active.
        match unsafe { (self.api.endwin)() } {
            OK => Ok(()),
            _ => Err(Error::driver("endwin", "endwin failed")),
        }
    }
}

/// Reads and translates pending input when standard input is readable.
struct Reader {
    /// Entry points.
    api: Rc<Api>,
    /// Shared driver state.
    state: Rc<RefCell<State>>,
    /// Destination for translated events.
    input: InputQueue,
    /// Button held since the last press, for drag reporting.
    held: Option<Button>,
}

impl Reader {
    /// Consume everything `get_wch` has buffered.
    fn drain(&mut self) {
        if !self.state.borrow().active {
            return;
        }
        let mut escape = false;
        loop {
            let mut wch: c_uint = 0;
            // SAFETY: wch is a valid out-parameter.
            let ret = unsafe { (self.api.get_wch)(&mut wch) };
            match ret {
                KEY_CODE_YES => match wch {
                    keys::RESIZE => self.resize(),
                    keys::MOUSE => self.mouse(),
                    code => {
                        if let Some(k) = translate_key_code(code) {
                            self.push_key(&mut escape, k);
                        }
                    }
                },
                OK => {
                    if wch == 0x1b {
                        if escape {
                            self.input.push(Event::Key(KeyCode::Esc.into()));
                        }
                        escape = true;
                    } else if let Some(k) = translate_char(wch) {
                        self.push_key(&mut escape, k);
                    }
                }
                _ => break,
            }
        }
        if escape {
            self.input.push(Event::Key(KeyCode::Esc.into()));
        }
    }

    /// Queue a key, folding a preceding escape into Alt.
    fn push_key(&self, escape: &mut bool, k: Key) {
        let k = if mem::take(escape) {
            Key {
                mods: k.mods + key::Alt,
                key: k.key,
            }
        } else {
            k
        };
        trace!(?k, "curses key");
        self.input.push(Event::Key(k));
    }

    /// Pick up a new terminal size.
    fn resize(&mut self) {
        let size = self.api.size();
        let mut st = self.state.borrow_mut();
        st.screen.resize(size);
        if let Some(f) = st.on_resize.as_mut() {
            f(size);
        }
    }

    /// Fetch and translate a mouse report.
    fn mouse(&mut self) {
        let mut rec = MouseRecord::default();
        // SAFETY: rec is large enough for either mmask_t width.
        if unsafe { (self.api.getmouse)(&mut rec) } != OK {
            warn!("getmouse failed");
            return;
        }
        if let Some(m) = translate_mouse(rec.bstate, rec.x, rec.y, &mut self.held) {
            self.input.push(Event::Mouse(m));
        }
    }
}

/// Translate a wide character from `get_wch`.
fn translate_char(wch: c_uint) -> Option<Key> {
    if wch < 0x20 || wch == 0x7f {
        return match wch {
            0 => Some(key::Ctrl + ' '),
            _ => Key::from_control_byte(wch as u8),
        };
    }
    char::from_u32(wch).map(Key::from)
}

/// Translate a function-key code from `get_wch`.
fn translate_key_code(code: c_uint) -> Option<Key> {
    let k: Key = match code {
        keys::DOWN => KeyCode::Down.into(),
        keys::UP => KeyCode::Up.into(),
        keys::LEFT => KeyCode::Left.into(),
        keys::RIGHT => KeyCode::Right.into(),
        keys::HOME => KeyCode::Home.into(),
        keys::END => KeyCode::End.into(),
        keys::BACKSPACE => KeyCode::Backspace.into(),
        keys::DC => KeyCode::Delete.into(),
        keys::IC => KeyCode::Insert.into(),
        keys::NPAGE => KeyCode::PageDown.into(),
        keys::PPAGE => KeyCode::PageUp.into(),
        keys::ENTER => KeyCode::Enter.into(),
        keys::BTAB => KeyCode::BackTab.into(),
        keys::SF => key::Shift + KeyCode::Down,
        keys::SR => key::Shift + KeyCode::Up,
        keys::SLEFT => key::Shift + KeyCode::Left,
        keys::SRIGHT => key::Shift + KeyCode::Right,
        c if (keys::F0 + 1..=keys::F0 + 24).contains(&c) => KeyCode::F((c - keys::F0) as u8).into(),
        _ => return None,
    };
    Some(k)
}

/// Translate a mouse report. `held` tracks the pressed button so motion can
/// be reported as a drag.
fn translate_mouse(bstate: c_uint, x: c_int, y: c_int, held: &mut Option<Button>) -> Option<MouseEvent> {
    use masks::*;

    let (action, button) = if bstate & BUTTON1_PRESSED != 0 {
        (Action::Down, Button::Left)
    } else if bstate & BUTTON2_PRESSED != 0 {
        (Action::Down, Button::Middle)
    } else if bstate & BUTTON3_PRESSED != 0 {
        (Action::Down, Button::Right)
    } else if bstate & BUTTON1_RELEASED != 0 {
        (Action::Up, Button::Left)
    } else if bstate & BUTTON2_RELEASED != 0 {
        (Action::Up, Button::Middle)
    } else if bstate & BUTTON3_RELEASED != 0 {
        (Action::Up, Button::Right)
    } else if bstate & BUTTON4_PRESSED != 0 {
        (Action::ScrollUp, Button::None)
    } else if bstate & BUTTON5_PRESSED != 0 {
        (Action::ScrollDown, Button::None)
    } else if bstate & REPORT_MOUSE_POSITION != 0 {
        match held {
            Some(b) => (Action::Drag, *b),
            None => (Action::Moved, Button::None),
        }
    } else {
        return None;
    };
    match action {
        Action::Down => *held = Some(button),
        Action::Up => *held = None,
        _ => {}
    }
    Some(MouseEvent {
        action,
        button,
        modifiers: key::Mods {
            shift: bstate & BUTTON_SHIFT != 0,
            ctrl: bstate & BUTTON_CTRL != 0,
            alt: bstate & BUTTON_ALT != 0,
        },
        location: Point::new(x, y),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn characters() -> Result<()> {
        assert_eq!(translate_char('a' as u32), Some('a'.into()));
        assert_eq!(translate_char('é' as u32), Some('é'.into()));
        assert_eq!(translate_char(0x11), Some(key::Ctrl + 'q'));
        assert_eq!(translate_char(0x0d), Some(KeyCode::Enter.into()));
        assert_eq!(translate_char(0x09), Some(KeyCode::Tab.into()));
        assert_eq!(translate_char(0x7f), Some(KeyCode::Backspace.into()));
        Ok(())
    }

    #[test]
    fn function_keys() -> Result<()> {
        assert_eq!(translate_key_code(keys::F0 + 1), Some(KeyCode::F(1).into()));
        assert_eq!(translate_key_code(keys::F0 + 12), Some(KeyCode::F(12).into()));
        assert_eq!(translate_key_code(keys::BTAB), Some(KeyCode::BackTab.into()));
        assert_eq!(
            translate_key_code(keys::SLEFT),
            Some(key::Shift + KeyCode::Left)
        );
        assert_eq!(translate_key_code(keys::F0), None);
        assert_eq!(translate_key_code(999), None);
        Ok(())
    }

    #[test]
    fn mouse_press_drag_release() -> Result<()> {
        let mut held = None;
        let m = translate_mouse(masks::BUTTON1_PRESSED, 3, 4, &mut held);
        assert_eq!(m, Some(MouseEvent::click(3, 4)));
        assert_eq!(held, Some(Button::Left));

        let m = translate_mouse(masks::REPORT_MOUSE_POSITION, 5, 4, &mut held)
            .ok_or_else(|| Error::Internal("no event".into()))?;
        assert_eq!((m.action, m.button), (Action::Drag, Button::Left));

        let m = translate_mouse(masks::BUTTON1_RELEASED, 5, 4, &mut held)
            .ok_or_else(|| Error::Internal("no event".into()))?;
        assert_eq!(m.action, Action::Up);
        assert_eq!(held, None);

        let m = translate_mouse(masks::REPORT_MOUSE_POSITION, 6, 4, &mut held)
            .ok_or_else(|| Error::Internal("no event".into()))?;
        assert_eq!(m.action, Action::Moved);

        let m = translate_mouse(masks::BUTTON4_PRESSED | masks::BUTTON_CTRL, 0, 0, &mut held)
            .ok_or_else(|| Error::Internal("no event".into()))?;
        assert_eq!(m.action, Action::ScrollUp);
        assert!(m.modifiers.ctrl);
        assert_eq!(translate_mouse(0, 0, 0, &mut held), None);
        Ok(())
    }

    #[test]
    fn palette_mapping() -> Result<()> {
        assert_eq!(curses_color(Color::Red), 1);
        assert_eq!(curses_color(Color::BrightBlue), 4);
        assert_eq!(curses_color(Color::Brown), 3);
        assert_eq!(curses_color(Color::White), 7);
        Ok(())
    }
}
