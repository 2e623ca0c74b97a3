//! A console driver over the Win32 console API.
//!
//! Output is diffed from a [`CellBuffer`] with `WriteConsoleOutputW`. The
//! loop waits on the console input handle and an auto-reset event used for
//! wakeups.

use std::{
    cell::RefCell,
    ffi::c_void,
    fmt, mem, ptr,
    rc::Rc,
    sync::Arc,
    time::Duration,
};

use geom::{Point, Rect, Size};
use tracing::{debug, trace};

use super::{
    Attribute, Backend, Color, ConsoleDriver, InputQueue, ResizeHandler,
    screen::{Cell, CellBuffer, ScreenState},
};
use crate::{
    error::{Error, Result},
    event::{
        Event,
        key::{self, Key, KeyCode},
        mouse::{Action, Button, MouseEvent},
    },
    mainloop::{MainLoopDriver, Waker},
};

/// `HANDLE`.
type Handle = *mut c_void;
/// `BOOL`.
type Bool = i32;

/// `COORD`.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct Coord {
    /// Column.
    x: i16,
    /// Row.
    y: i16,
}

/// `SMALL_RECT`, inclusive.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct SmallRect {
    /// Left column.
    left: i16,
    /// Top row.
    top: i16,
    /// Right column.
    right: i16,
    /// Bottom row.
    bottom: i16,
}

/// `CONSOLE_SCREEN_BUFFER_INFO`.
#[repr(C)]
#[allow(dead_code)]
#[derive(Debug, Default, Clone, Copy)]
struct ScreenBufferInfo {
    /// Buffer size.
    size: Coord,
    /// Cursor position.
    cursor: Coord,
    /// Current attributes.
    attributes: u16,
    /// Visible window within the buffer.
    window: SmallRect,
    /// Largest possible window.
    max_window: Coord,
}

/// `CHAR_INFO` with the UTF-16 arm of its union.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct CharInfo {
    /// UTF-16 code unit.
    ch: u16,
    /// Color and cell flags.
    attributes: u16,
}

/// `CONSOLE_CURSOR_INFO`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct CursorInfo {
    /// Percentage of the cell filled.
    size: u32,
    /// Visibility.
    visible: Bool,
}

/// `KEY_EVENT_RECORD`.
#[repr(C)]
#[allow(dead_code)]
#[derive(Debug, Default, Clone, Copy)]
struct KeyRecord {
    /// Press or release.
    down: Bool,
    /// Repeat count.
    repeat: u16,
    /// Virtual key code.
    vk: u16,
    /// Scan code.
    scan: u16,
    /// UTF-16 character.
    ch: u16,
    /// Modifier state.
    control: u32,
}

/// `MOUSE_EVENT_RECORD`.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct MouseRecord {
    /// Cell under the pointer.
    position: Coord,
    /// Button state; the high word carries the wheel delta.
    buttons: u32,
    /// Modifier state.
    control: u32,
    /// Move, wheel and double-click flags.
    flags: u32,
}

/// The event union of `INPUT_RECORD`.
#[repr(C)]
#[allow(dead_code)]
#[derive(Clone, Copy)]
union RecordEvent {
    /// `KEY_EVENT`.
    key: KeyRecord,
    /// `MOUSE_EVENT`.
    mouse: MouseRecord,
    /// `WINDOW_BUFFER_SIZE_EVENT`.
    size: Coord,
    /// Full width of the union.
    raw: [u32; 4],
}

/// `INPUT_RECORD`.
#[repr(C)]
#[derive(Clone, Copy)]
struct InputRecord {
    /// Which arm of `event` is valid.
    kind: u16,
    /// Payload.
    event: RecordEvent,
}

impl Default for InputRecord {
    fn default() -> Self {
        Self {
            kind: 0,
            event: RecordEvent { raw: [0; 4] },
        }
    }
}

#[link(name = "kernel32")]
#[allow(clippy::missing_docs_in_private_items)]
unsafe extern "system" {
    fn GetStdHandle(which: u32) -> Handle;
    fn GetConsoleMode(h: Handle, mode: *mut u32) -> Bool;
    fn SetConsoleMode(h: Handle, mode: u32) -> Bool;
    fn GetConsoleScreenBufferInfo(h: Handle, info: *mut ScreenBufferInfo) -> Bool;
    fn WriteConsoleOutputW(
        h: Handle,
        buffer: *const CharInfo,
        size: Coord,
        origin: Coord,
        region: *mut SmallRect,
    ) -> Bool;
    fn ReadConsoleInputW(h: Handle, buffer: *mut InputRecord, len: u32, read: *mut u32) -> Bool;
    fn GetNumberOfConsoleInputEvents(h: Handle, n: *mut u32) -> Bool;
    fn SetConsoleCursorPosition(h: Handle, pos: Coord) -> Bool;
    fn SetConsoleCursorInfo(h: Handle, info: *const CursorInfo) -> Bool;
    fn CreateEventW(attrs: *mut c_void, manual: Bool, initial: Bool, name: *const u16) -> Handle;
    fn SetEvent(h: Handle) -> Bool;
    fn WaitForMultipleObjects(n: u32, handles: *const Handle, all: Bool, ms: u32) -> u32;
    fn GetLastError() -> u32;
}

/// `STD_INPUT_HANDLE`.
const STD_INPUT_HANDLE: u32 = -10i32 as u32;
/// `STD_OUTPUT_HANDLE`.
const STD_OUTPUT_HANDLE: u32 = -11i32 as u32;
/// `INVALID_HANDLE_VALUE`.
const INVALID_HANDLE_VALUE: Handle = -1isize as Handle;

/// Input mode flags.
#[allow(clippy::missing_docs_in_private_items)]
mod mode {
    pub const ENABLE_PROCESSED_INPUT: u32 = 0x1;
    pub const ENABLE_LINE_INPUT: u32 = 0x2;
    pub const ENABLE_ECHO_INPUT: u32 = 0x4;
    pub const ENABLE_WINDOW_INPUT: u32 = 0x8;
    pub const ENABLE_MOUSE_INPUT: u32 = 0x10;
    pub const ENABLE_QUICK_EDIT_MODE: u32 = 0x40;
    pub const ENABLE_EXTENDED_FLAGS: u32 = 0x80;
    pub const ENABLE_WRAP_AT_EOL_OUTPUT: u32 = 0x2;
}

/// Input record kinds.
#[allow(clippy::missing_docs_in_private_items)]
mod record {
    pub const KEY_EVENT: u16 = 0x1;
    pub const MOUSE_EVENT: u16 = 0x2;
    pub const WINDOW_BUFFER_SIZE_EVENT: u16 = 0x4;
}

/// Virtual key codes and modifier bits.
#[allow(clippy::missing_docs_in_private_items)]
mod vk {
    pub const BACK: u16 = 0x08;
    pub const TAB: u16 = 0x09;
    pub const RETURN: u16 = 0x0d;
    pub const ESCAPE: u16 = 0x1b;
    pub const PRIOR: u16 = 0x21;
    pub const NEXT: u16 = 0x22;
    pub const END: u16 = 0x23;
    pub const HOME: u16 = 0x24;
    pub const LEFT: u16 = 0x25;
    pub const UP: u16 = 0x26;
    pub const RIGHT: u16 = 0x27;
    pub const DOWN: u16 = 0x28;
    pub const INSERT: u16 = 0x2d;
    pub const DELETE: u16 = 0x2e;
    pub const F1: u16 = 0x70;
    pub const F24: u16 = 0x87;

    pub const RIGHT_ALT: u32 = 0x1;
    pub const LEFT_ALT: u32 = 0x2;
    pub const RIGHT_CTRL: u32 = 0x4;
    pub const LEFT_CTRL: u32 = 0x8;
    pub const SHIFT: u32 = 0x10;
}

/// Mouse bits.
#[allow(clippy::missing_docs_in_private_items)]
mod mbits {
    pub const LEFT: u32 = 0x1;
    pub const RIGHT: u32 = 0x2;
    pub const MIDDLE: u32 = 0x4;
    pub const MOVED: u32 = 0x1;
    pub const WHEELED: u32 = 0x4;
}

/// Cell flags marking the halves of a wide character.
const LEADING_BYTE: u16 = 0x100;
/// See [`LEADING_BYTE`].
const TRAILING_BYTE: u16 = 0x200;

/// `WaitForMultipleObjects` results.
const WAIT_OBJECT_0: u32 = 0;
/// Timed out.
const WAIT_TIMEOUT: u32 = 0x102;
/// Wait forever.
const INFINITE: u32 = u32::MAX;

/// Reject null and invalid handles.
fn check_handle(call: &str, h: Handle) -> Result<Handle> {
    if h.is_null() {
        return Err(Error::InvalidHandle {
            call: call.into(),
            state: "null".into(),
        });
    }
    if h == INVALID_HANDLE_VALUE {
        return Err(Error::InvalidHandle {
            call: call.into(),
            state: format!("INVALID_HANDLE_VALUE (error {})", unsafe { GetLastError() }),
        });
    }
    Ok(h)
}

/// A failed Win32 call.
fn last_error(call: &str) -> Error {
    // SAFETY: no preconditions.
    let code = unsafe { GetLastError() };
    Error::driver(call, format!("error {code}"))
}

/// Fetch a console mode, which also proves the handle is a console.
fn get_mode(call: &str, h: Handle) -> Result<u32> {
    let mut m = 0;
    // SAFETY: h was checked and m is a valid out-parameter.
    if unsafe { GetConsoleMode(h, &mut m) } == 0 {
        return Err(Error::InvalidHandle {
            call: call.into(),
            state: format!("not a console (error {})", unsafe { GetLastError() }),
        });
    }
    Ok(m)
}

/// Set a console mode.
fn set_mode(h: Handle, m: u32) -> Result<()> {
    // SAFETY: h was checked.
    if unsafe { SetConsoleMode(h, m) } == 0 {
        return Err(last_error("SetConsoleMode"));
    }
    Ok(())
}

/// The visible window size of the output buffer.
fn window_size(out: Handle) -> Result<Size> {
    let mut info = ScreenBufferInfo::default();
    // SAFETY: out was checked and info is a valid out-parameter.
    if unsafe { GetConsoleScreenBufferInfo(out, &mut info) } == 0 {
        return Err(last_error("GetConsoleScreenBufferInfo"));
    }
    let w = i32::from(info.window.right) - i32::from(info.window.left) + 1;
    let h = i32::from(info.window.bottom) - i32::from(info.window.top) + 1;
    Ok(Size::new(w.max(0) as u32, h.max(0) as u32))
}

/// Show or hide the console cursor.
fn show_cursor(out: Handle, visible: bool) -> Result<()> {
    let info = CursorInfo {
        size: 25,
        visible: Bool::from(visible),
    };
    // SAFETY: out was checked and info outlives the call.
    if unsafe { SetConsoleCursorInfo(out, &info) } == 0 {
        return Err(last_error("SetConsoleCursorInfo"));
    }
    Ok(())
}

/// Surface state shared by the console and loop halves.
struct Surface {
    /// Cursor and clip.
    screen: ScreenState,
    /// Shadow of the console contents.
    buffer: CellBuffer,
    /// The console has been taken over.
    active: bool,
    /// Size-change callback.
    on_resize: Option<ResizeHandler>,
}

/// Console modes to put back on `end`.
#[derive(Debug, Clone, Copy)]
struct SavedModes {
    /// Input mode.
    input: u32,
    /// Output mode.
    output: u32,
}

/// Open the Win32 console backend.
pub fn open(input: InputQueue, mouse: bool) -> Result<Backend> {
    // SAFETY: no preconditions.
    let hin = check_handle("GetStdHandle(input)", unsafe { GetStdHandle(STD_INPUT_HANDLE) })?;
    // SAFETY: no preconditions.
    let hout = check_handle("GetStdHandle(output)", unsafe { GetStdHandle(STD_OUTPUT_HANDLE) })?;
    let saved = SavedModes {
        input: get_mode("GetConsoleMode(input)", hin)?,
        output: get_mode("GetConsoleMode(output)", hout)?,
    };
    // SAFETY: auto-reset, initially unsignalled, unnamed.
    let wake = check_handle("CreateEventW", unsafe {
        CreateEventW(ptr::null_mut(), 0, 0, ptr::null())
    })?;
    let surface = Rc::new(RefCell::new(Surface {
        screen: ScreenState::new(Size::new(0, 0)),
        buffer: CellBuffer::new(Size::new(0, 0)),
        active: false,
        on_resize: None,
    }));
    let (hin_addr, hout_addr) = (hin as usize, hout as usize);
    let restore = Arc::new(move || {
        // SAFETY: the standard handles live for the process.
        unsafe {
            SetConsoleMode(hin_addr as Handle, saved.input);
            SetConsoleMode(hout_addr as Handle, saved.output);
        }
        drop(show_cursor(hout_addr as Handle, true));
    });
    Ok(Backend {
        console: Box::new(WindowsDriver {
            hin,
            hout,
            saved,
            surface: surface.clone(),
            attr: Attribute::default(),
            mouse,
        }),
        main_loop: Box::new(WindowsLoop {
            hin,
            wake,
            surface,
            input,
            ready: Vec::new(),
            buttons: 0,
        }),
        watches: None,
        restore,
    })
}

/// The Win32 console driver.
pub struct WindowsDriver {
    /// Console input.
    hin: Handle,
    /// Console output.
    hout: Handle,
    /// Modes at open.
    saved: SavedModes,
    /// Shared with the loop.
    surface: Rc<RefCell<Surface>>,
    /// Attribute for subsequent writes.
    attr: Attribute,
    /// Report mouse events.
    mouse: bool,
}

impl fmt::Debug for WindowsDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowsDriver")
            .field("saved", &self.saved)
            .field("attr", &self.attr)
            .finish_non_exhaustive()
    }
}

/// Encode a run of cells. Characters outside the BMP become `?`.
fn encode_run(cells: &[Cell]) -> Vec<CharInfo> {
    let mut out = Vec::with_capacity(cells.len());
    for (i, c) in cells.iter().enumerate() {
        let attributes = c.attr.value as u16 & 0xff;
        if c.ch == '\0' {
            let lead = i.checked_sub(1).and_then(|j| out.get(j)).map_or(0x20, |p: &CharInfo| p.ch);
            out.push(CharInfo {
                ch: lead,
                attributes: attributes | TRAILING_BYTE,
            });
            continue;
        }
        let mut units = [0u16; 2];
        let ch = match c.ch.encode_utf16(&mut units) {
            [u] => *u,
            _ => u16::from(b'?'),
        };
        let wide = cells.get(i + 1).is_some_and(|n| n.ch == '\0');
        out.push(CharInfo {
            ch,
            attributes: if wide { attributes | LEADING_BYTE } else { attributes },
        });
    }
    out
}

impl WindowsDriver {
    /// Write changed runs.
    fn flush(&mut self) -> Result<()> {
        let changes = self.surface.borrow_mut().buffer.take_changes();
        for (start, cells) in changes {
            let run = encode_run(&cells);
            let mut region = SmallRect {
                left: start.x as i16,
                top: start.y as i16,
                right: (start.x + run.len() as i32 - 1) as i16,
                bottom: start.y as i16,
            };
            let size = Coord {
                x: run.len() as i16,
                y: 1,
            };
            // SAFETY: run holds size.x cells and region lies on screen.
            if unsafe { WriteConsoleOutputW(self.hout, run.as_ptr(), size, Coord::default(), &mut region) }
                == 0
            {
                return Err(last_error("WriteConsoleOutputW"));
            }
        }
        Ok(())
    }
}

impl ConsoleDriver for WindowsDriver {
    fn cols(&self) -> u32 {
        self.surface.borrow().screen.size().w
    }

    fn rows(&self) -> u32 {
        self.surface.borrow().screen.size().h
    }

    fn init(&mut self, on_resize: ResizeHandler) -> Result<()> {
        let mut input = (self.saved.input | mode::ENABLE_WINDOW_INPUT | mode::ENABLE_EXTENDED_FLAGS)
            & !(mode::ENABLE_LINE_INPUT
                | mode::ENABLE_ECHO_INPUT
                | mode::ENABLE_PROCESSED_INPUT
                | mode::ENABLE_QUICK_EDIT_MODE);
        if self.mouse {
            input |= mode::ENABLE_MOUSE_INPUT;
        }
        set_mode(self.hin, input)?;
        set_mode(self.hout, self.saved.output & !mode::ENABLE_WRAP_AT_EOL_OUTPUT)?;
        let size = window_size(self.hout)?;
        let mut s = self.surface.borrow_mut();
        s.screen.resize(size);
        s.buffer.resize(size);
        s.active = true;
        s.on_resize = Some(on_resize);
        debug!(?size, "win32 console started");
        Ok(())
    }

    fn move_to(&mut self, col: i32, row: i32) {
        self.surface.borrow_mut().screen.move_to(col, row);
    }

    fn add_char(&mut self, ch: char) {
        let mut s = self.surface.borrow_mut();
        if let Some((p, width)) = s.screen.place(ch) {
            s.buffer.put(p, width, ch, self.attr);
        }
    }

    fn set_attribute(&mut self, attr: Attribute) {
        self.attr = attr;
    }

    fn make_attribute(&mut self, fg: Color, bg: Color) -> Attribute {
        Attribute {
            value: i32::from(fg.index()) | i32::from(bg.index()) << 4,
            fg,
            bg,
        }
    }

    fn clip(&self) -> Rect {
        self.surface.borrow().screen.clip()
    }

    fn set_clip(&mut self, clip: Rect) {
        self.surface.borrow_mut().screen.set_clip(clip);
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<()> {
        if visible {
            let Point { x, y } = self.surface.borrow().screen.cursor();
            let pos = Coord {
                x: x as i16,
                y: y as i16,
            };
            // SAFETY: hout was checked.
            if unsafe { SetConsoleCursorPosition(self.hout, pos) } == 0 {
                return Err(last_error("SetConsoleCursorPosition"));
            }
        }
        show_cursor(self.hout, visible)
    }

    fn refresh(&mut self) -> Result<()> {
        if !self.surface.borrow().active {
            return Ok(());
        }
        self.flush()
    }

    fn end(&mut self) -> Result<()> {
        {
            let mut s = self.surface.borrow_mut();
            if !s.active {
                return Ok(());
            }
            s.active = false;
            s.on_resize = None;
        }
        set_mode(self.hin, self.saved.input)?;
        set_mode(self.hout, self.saved.output)?;
        show_cursor(self.hout, true)
    }
}

/// The loop half: waits on console input and the wakeup event.
pub struct WindowsLoop {
    /// Console input.
    hin: Handle,
    /// Auto-reset wakeup event.
    wake: Handle,
    /// Shared with the console.
    surface: Rc<RefCell<Surface>>,
    /// Destination for translated events.
    input: InputQueue,
    /// Records read by the last wait.
    ready: Vec<InputRecord>,
    /// Mouse buttons held after the last record.
    buttons: u32,
}

impl fmt::Debug for WindowsLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowsLoop")
            .field("ready", &self.ready.len())
            .field("buttons", &self.buttons)
            .finish_non_exhaustive()
    }
}

impl WindowsLoop {
    /// Read every available input record.
    fn read_input(&mut self) -> Result<()> {
        let mut n = 0;
        // SAFETY: hin was checked.
        if unsafe { GetNumberOfConsoleInputEvents(self.hin, &mut n) } == 0 {
            return Err(last_error("GetNumberOfConsoleInputEvents"));
        }
        if n == 0 {
            return Ok(());
        }
        let mut buf = vec![InputRecord::default(); n as usize];
        let mut read = 0;
        // SAFETY: buf holds n records.
        if unsafe { ReadConsoleInputW(self.hin, buf.as_mut_ptr(), n, &mut read) } == 0 {
            return Err(last_error("ReadConsoleInputW"));
        }
        buf.truncate(read as usize);
        self.ready.extend(buf);
        Ok(())
    }
}

impl MainLoopDriver for WindowsLoop {
    fn waker(&self) -> Waker {
        let wake = self.wake as usize;
        Waker::new(move || {
            // SAFETY: the event handle lives as long as the process.
            unsafe { SetEvent(wake as Handle) };
        })
    }

    fn events_pending(&mut self, timeout: Option<Duration>) -> Result<bool> {
        let ms = timeout.map_or(INFINITE, |d| {
            u32::try_from(d.as_micros().div_ceil(1000)).unwrap_or(INFINITE - 1)
        });
        let active = self.surface.borrow().active;
        let handles = [self.wake, self.hin];
        let n = if active { 2 } else { 1 };
        // SAFETY: handles holds n valid handles.
        let r = unsafe { WaitForMultipleObjects(n, handles.as_ptr(), 0, ms) };
        match r {
            WAIT_TIMEOUT => Ok(false),
            WAIT_OBJECT_0 => Ok(true),
            r if r == WAIT_OBJECT_0 + 1 => {
                self.read_input()?;
                Ok(true)
            }
            _ => Err(last_error("WaitForMultipleObjects")),
        }
    }

    fn iteration(&mut self) -> Result<()> {
        for rec in mem::take(&mut self.ready) {
            match rec.kind {
                record::KEY_EVENT => {
                    // SAFETY: kind selects the key arm.
                    let k = unsafe { rec.event.key };
                    if let Some(key) = translate_key(&k) {
                        trace!(?key, "win32 key");
                        for _ in 0..k.repeat.max(1) {
                            self.input.push(Event::Key(key));
                        }
                    }
                }
                record::MOUSE_EVENT => {
                    // SAFETY: kind selects the mouse arm.
                    let m = unsafe { rec.event.mouse };
                    if let Some(e) = translate_mouse(&m, &mut self.buttons) {
                        self.input.push(Event::Mouse(e));
                    }
                }
                record::WINDOW_BUFFER_SIZE_EVENT => {
                    let Some(size) = self.hout_size() else {
                        continue;
                    };
                    let mut s = self.surface.borrow_mut();
                    s.screen.resize(size);
                    s.buffer.resize(size);
                    if let Some(f) = s.on_resize.as_mut() {
                        f(size);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl WindowsLoop {
    /// The current window size. Buffer-size records report the buffer,
    /// not the visible window, so the output handle is queried instead.
    fn hout_size(&self) -> Option<Size> {
        // SAFETY: no preconditions.
        let out = unsafe { GetStdHandle(STD_OUTPUT_HANDLE) };
        check_handle("GetStdHandle(output)", out)
            .and_then(window_size)
            .ok()
    }
}

/// Translate control-key state.
fn translate_mods(control: u32) -> key::Mods {
    key::Mods {
        shift: control & vk::SHIFT != 0,
        ctrl: control & (vk::LEFT_CTRL | vk::RIGHT_CTRL) != 0,
        alt: control & (vk::LEFT_ALT | vk::RIGHT_ALT) != 0,
    }
}

/// Translate a key record. Releases and bare modifier presses are dropped.
fn translate_key(k: &KeyRecord) -> Option<Key> {
    if k.down == 0 {
        return None;
    }
    let mods = translate_mods(k.control);
    let code = match k.vk {
        vk::BACK => KeyCode::Backspace,
        vk::TAB if mods.shift => return Some(KeyCode::BackTab.into()),
        vk::TAB => KeyCode::Tab,
        vk::RETURN => KeyCode::Enter,
        vk::ESCAPE => KeyCode::Esc,
        vk::PRIOR => KeyCode::PageUp,
        vk::NEXT => KeyCode::PageDown,
        vk::END => KeyCode::End,
        vk::HOME => KeyCode::Home,
        vk::LEFT => KeyCode::Left,
        vk::UP => KeyCode::Up,
        vk::RIGHT => KeyCode::Right,
        vk::DOWN => KeyCode::Down,
        vk::INSERT => KeyCode::Insert,
        vk::DELETE => KeyCode::Delete,
        v if (vk::F1..=vk::F24).contains(&v) => KeyCode::F((v - vk::F1 + 1) as u8),
        _ => {
            // Control letters arrive as their control byte.
            if mods.ctrl && (1..=26).contains(&k.ch) {
                return Some(Key {
                    mods: key::Mods {
                        ctrl: true,
                        ..mods
                    },
                    key: KeyCode::Char(char::from(b'a' + k.ch as u8 - 1)),
                });
            }
            let ch = char::from_u32(u32::from(k.ch)).filter(|c| *c != '\0')?;
            return Some(Key {
                mods: key::Mods {
                    shift: false,
                    ..mods
                },
                key: KeyCode::Char(ch),
            });
        }
    };
    Some(Key { mods, key: code })
}

/// Translate a mouse record, tracking held buttons in `held`.
fn translate_mouse(m: &MouseRecord, held: &mut u32) -> Option<MouseEvent> {
    let buttons = m.buttons & 0xffff;
    let button_of = |bits: u32| {
        if bits & mbits::LEFT != 0 {
            Button::Left
        } else if bits & mbits::RIGHT != 0 {
            Button::Right
        } else if bits & mbits::MIDDLE != 0 {
            Button::Middle
        } else {
            Button::None
        }
    };
    let (action, button) = if m.flags & mbits::WHEELED != 0 {
        if (m.buttons as i32 >> 16) > 0 {
            (Action::ScrollUp, Button::None)
        } else {
            (Action::ScrollDown, Button::None)
        }
    } else if m.flags & mbits::MOVED != 0 {
        if buttons != 0 {
            (Action::Drag, button_of(buttons))
        } else {
            (Action::Moved, Button::None)
        }
    } else {
        let pressed = buttons & !*held;
        let released = *held & !buttons;
        if pressed != 0 {
            (Action::Down, button_of(pressed))
        } else if released != 0 {
            (Action::Up, button_of(released))
        } else {
            return None;
        }
    };
    *held = buttons;
    Some(MouseEvent {
        action,
        button,
        modifiers: translate_mods(m.control),
        location: Point::new(m.position.x.into(), m.position.y.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_down(vk: u16, ch: u16, control: u32) -> KeyRecord {
        KeyRecord {
            down: 1,
            repeat: 1,
            vk,
            ch,
            control,
            ..KeyRecord::default()
        }
    }

    #[test]
    fn keys() -> Result<()> {
        assert_eq!(
            translate_key(&key_down(0x51, 0x11, vk::LEFT_CTRL)),
            Some(key::Ctrl + 'q')
        );
        assert_eq!(
            translate_key(&key_down(0x41, u16::from(b'A'), vk::SHIFT)),
            Some('A'.into())
        );
        assert_eq!(
            translate_key(&key_down(vk::TAB, 9, vk::SHIFT)),
            Some(KeyCode::BackTab.into())
        );
        assert_eq!(
            translate_key(&key_down(vk::F1 + 4, 0, 0)),
            Some(KeyCode::F(5).into())
        );
        let mut up = key_down(vk::RETURN, 13, 0);
        up.down = 0;
        assert_eq!(translate_key(&up), None);
        Ok(())
    }

    #[test]
    fn mouse_transitions() -> Result<()> {
        let mut held = 0;
        let rec = |buttons, flags| MouseRecord {
            position: Coord { x: 2, y: 3 },
            buttons,
            control: 0,
            flags,
        };
        let e = translate_mouse(&rec(mbits::LEFT, 0), &mut held);
        assert_eq!(e, Some(MouseEvent::click(2, 3)));
        let e = translate_mouse(&rec(mbits::LEFT, mbits::MOVED), &mut held)
            .ok_or_else(|| Error::Internal("no event".into()))?;
        assert_eq!(e.action, Action::Drag);
        let e = translate_mouse(&rec(0, 0), &mut held)
            .ok_or_else(|| Error::Internal("no event".into()))?;
        assert_eq!((e.action, e.button), (Action::Up, Button::Left));
        let e = translate_mouse(&rec(0xff88_0000, mbits::WHEELED), &mut held)
            .ok_or_else(|| Error::Internal("no event".into()))?;
        assert_eq!(e.action, Action::ScrollDown);
        Ok(())
    }

    #[test]
    fn wide_runs() -> Result<()> {
        let attr = Attribute::default();
        let cells = [
            Cell { ch: '世', attr },
            Cell { ch: '\0', attr },
            Cell { ch: 'a', attr },
        ];
        let run = encode_run(&cells);
        assert_eq!(run.len(), 3);
        assert_ne!(run[0].attributes & LEADING_BYTE, 0);
        assert_ne!(run[1].attributes & TRAILING_BYTE, 0);
        assert_eq!(run[2].ch, u16::from(b'a'));
        Ok(())
    }
}
