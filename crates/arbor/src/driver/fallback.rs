//! A portable backend over crossterm.
//!
//! Drawing goes to a [`CellBuffer`] that is diffed onto the terminal on
//! refresh. Input is read by a helper thread that performs one blocking
//! read per request from the loop, so nothing is consumed while the
//! console is released.

use std::{
    cell::RefCell,
    fmt,
    io::{self, Stderr, Write},
    rc::Rc,
    sync::{
        Arc,
        mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError},
    },
    thread,
    time::Duration,
};

use crossterm::{
    ExecutableCommand, QueueableCommand, cursor as ccursor, event as cevent, style, terminal,
};
use geom::{Point, Rect, Size};
use tracing::{debug, trace, warn};

use super::{
    Attribute, Backend, Color, ConsoleDriver, InputQueue, ResizeHandler,
    screen::{CellBuffer, ScreenState},
};
use crate::{
    error::{Error, Result},
    event::{Event, key, mouse},
    mainloop::{MainLoopDriver, Waker},
};

/// Messages from the reader thread.
enum Reply {
    /// One terminal event.
    Event(cevent::Event),
    /// A wakeup posted from another thread.
    Wake,
    /// The read failed.
    Error(String),
}

/// Surface state shared by the console and loop halves.
struct Surface {
    /// Cursor and clip.
    screen: ScreenState,
    /// Shadow of the terminal contents.
    buffer: CellBuffer,
    /// The terminal has been taken over.
    active: bool,
    /// Show the hardware cursor at the logical cursor on refresh.
    cursor_visible: bool,
    /// Size-change callback.
    on_resize: Option<ResizeHandler>,
}

impl Surface {
    /// Adopt a new terminal size.
    fn resize(&mut self, size: Size) {
        self.screen.resize(size);
        self.buffer.resize(size);
        if let Some(f) = self.on_resize.as_mut() {
            f(size);
        }
    }
}

/// Open the crossterm backend.
pub fn open(input: InputQueue, mouse: bool) -> Result<Backend> {
    let surface = Rc::new(RefCell::new(Surface {
        screen: ScreenState::new(Size::new(0, 0)),
        buffer: CellBuffer::new(Size::new(0, 0)),
        active: false,
        cursor_visible: false,
        on_resize: None,
    }));
    let (req_tx, req_rx) = mpsc::channel::<()>();
    let (reply_tx, reply_rx) = mpsc::channel();
    spawn_reader(req_rx, reply_tx.clone())?;
    let restore = Arc::new(|| {
        drop(leave(&mut io::stderr(), true));
    });
    Ok(Backend {
        console: Box::new(FallbackDriver {
            fp: io::stderr(),
            surface: surface.clone(),
            attr: Attribute::default(),
            mouse,
        }),
        main_loop: Box::new(FallbackLoop {
            surface,
            input,
            requests: req_tx,
            replies: reply_rx,
            wake_tx: reply_tx,
            outstanding: false,
            ready: Vec::new(),
        }),
        watches: None,
        restore,
    })
}

/// Start the reader thread. It exits when the request channel closes.
fn spawn_reader(requests: Receiver<()>, replies: Sender<Reply>) -> Result<()> {
    thread::Builder::new()
        .name("arbor-input".into())
        .spawn(move || {
            while requests.recv().is_ok() {
                let reply = match cevent::read() {
                    Ok(e) => Reply::Event(e),
                    Err(e) => Reply::Error(e.to_string()),
                };
                if replies.send(reply).is_err() {
                    break;
                }
            }
        })
        .map_err(|e| Error::driver("spawn", e.to_string()))?;
    Ok(())
}

/// Put the terminal into application mode.
fn enter(fp: &mut Stderr, mouse: bool) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    fp.execute(terminal::EnterAlternateScreen)?;
    if mouse {
        fp.execute(cevent::EnableMouseCapture)?;
    }
    fp.execute(cevent::EnableBracketedPaste)?;
    fp.execute(ccursor::Hide)?;
    fp.execute(terminal::Clear(terminal::ClearType::All))?;
    Ok(())
}

/// Restore the terminal.
fn leave(fp: &mut Stderr, mouse: bool) -> io::Result<()> {
    fp.execute(terminal::LeaveAlternateScreen)?;
    if mouse {
        fp.execute(cevent::DisableMouseCapture)?;
    }
    fp.execute(cevent::DisableBracketedPaste)?;
    fp.execute(ccursor::Show)?;
    terminal::disable_raw_mode()?;
    Ok(())
}

/// Map IO results into driver errors.
fn translate_result<T>(call: &str, r: io::Result<T>) -> Result<T> {
    r.map_err(|e| Error::driver(call, e.to_string()))
}

/// Translate a palette color into a crossterm color.
fn translate_color(c: Color) -> style::Color {
    match c {
        Color::Black => style::Color::Black,
        Color::Blue => style::Color::DarkBlue,
        Color::Green => style::Color::DarkGreen,
        Color::Cyan => style::Color::DarkCyan,
        Color::Red => style::Color::DarkRed,
        Color::Magenta => style::Color::DarkMagenta,
        Color::Brown => style::Color::DarkYellow,
        Color::Gray => style::Color::Grey,
        Color::DarkGray => style::Color::DarkGrey,
        Color::BrightBlue => style::Color::Blue,
        Color::BrightGreen => style::Color::Green,
        Color::BrightCyan => style::Color::Cyan,
        Color::BrightRed => style::Color::Red,
        Color::BrightMagenta => style::Color::Magenta,
        Color::BrightYellow => style::Color::Yellow,
        Color::White => style::Color::White,
    }
}

/// The crossterm console driver.
pub struct FallbackDriver {
    /// Output handle.
    fp: Stderr,
    /// Shared with the loop.
    surface: Rc<RefCell<Surface>>,
    /// Attribute for subsequent writes.
    attr: Attribute,
    /// Capture mouse events.
    mouse: bool,
}

impl fmt::Debug for FallbackDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackDriver")
            .field("size", &self.size())
            .field("attr", &self.attr)
            .finish_non_exhaustive()
    }
}

impl FallbackDriver {
    /// Write changed cells and position the cursor.
    fn flush(&mut self) -> io::Result<()> {
        let mut s = self.surface.borrow_mut();
        let mut current: Option<Attribute> = None;
        for (start, cells) in s.buffer.take_changes() {
            self.fp
                .queue(ccursor::MoveTo(start.x as u16, start.y as u16))?;
            for cell in cells {
                // Trailing half of a wide character.
                if cell.ch == '\0' {
                    continue;
                }
                if current != Some(cell.attr) {
                    self.fp.queue(style::SetColors(style::Colors::new(
                        translate_color(cell.attr.fg),
                        translate_color(cell.attr.bg),
                    )))?;
                    current = Some(cell.attr);
                }
                self.fp.queue(style::Print(cell.ch))?;
            }
        }
        if s.cursor_visible {
            let Point { x, y } = s.screen.cursor();
            self.fp.queue(ccursor::MoveTo(x as u16, y as u16))?;
            self.fp.queue(ccursor::Show)?;
        } else {
            self.fp.queue(ccursor::Hide)?;
        }
        self.fp.flush()
    }
}

impl ConsoleDriver for FallbackDriver {
    fn cols(&self) -> u32 {
        self.surface.borrow().screen.size().w
    }

    fn rows(&self) -> u32 {
        self.surface.borrow().screen.size().h
    }

    fn init(&mut self, on_resize: ResizeHandler) -> Result<()> {
        translate_result("enter", enter(&mut self.fp, self.mouse))?;
        let (w, h) = translate_result("size", terminal::size())?;
        let size = Size::new(w.into(), h.into());
        let mut s = self.surface.borrow_mut();
        s.screen.resize(size);
        s.buffer.resize(size);
        s.active = true;
        s.on_resize = Some(on_resize);
        debug!(?size, "crossterm console started");
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
        self.surface.borrow_mut().cursor_visible = visible;
        Ok(())
    }

    fn refresh(&mut self) -> Result<()> {
        if !self.surface.borrow().active {
            return Ok(());
        }
        translate_result("refresh", self.flush())
    }

    fn end(&mut self) -> Result<()> {
        let mut s = self.surface.borrow_mut();
        if !s.active {
            return Ok(());
        }
        s.active = false;
        s.on_resize = None;
        translate_result("leave", leave(&mut self.fp, self.mouse))
    }
}

/// The loop half: waits on the reader thread.
pub struct FallbackLoop {
    /// Shared with the console.
    surface: Rc<RefCell<Surface>>,
    /// Destination for translated events.
    input: InputQueue,
    /// Read requests to the reader thread.
    requests: Sender<()>,
    /// Replies from the reader thread and wakeups.
    replies: Receiver<Reply>,
    /// Cloned into wakers.
    wake_tx: Sender<Reply>,
    /// A read request is in flight.
    outstanding: bool,
    /// Events received by the last wait.
    ready: Vec<cevent::Event>,
}

impl fmt::Debug for FallbackLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackLoop")
            .field("outstanding", &self.outstanding)
            .field("ready", &self.ready.len())
            .finish_non_exhaustive()
    }
}

impl FallbackLoop {
    /// Record a reply. Returns an error for a failed read.
    fn accept(&mut self, reply: Reply) -> Result<()> {
        match reply {
            Reply::Event(e) => {
                self.outstanding = false;
                self.ready.push(e);
            }
            Reply::Wake => {}
            Reply::Error(msg) => {
                warn!("input read failed: {msg}");
                self.outstanding = false;
                return Err(Error::driver("read", msg));
            }
        }
        Ok(())
    }
}

impl MainLoopDriver for FallbackLoop {
    fn waker(&self) -> Waker {
        let tx = self.wake_tx.clone();
        Waker::new(move || {
            drop(tx.send(Reply::Wake));
        })
    }

    fn events_pending(&mut self, timeout: Option<Duration>) -> Result<bool> {
        if self.surface.borrow().active && !self.outstanding {
            self.requests
                .send(())
                .map_err(|_| Error::driver("read", "input thread has exited"))?;
            self.outstanding = true;
        }
        let first = match timeout {
            None => Some(self.replies.recv()?),
            Some(d) if d.is_zero() => match self.replies.try_recv() {
                Ok(r) => Some(r),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    return Err(Error::driver("read", "input thread has exited"));
                }
            },
            Some(d) => match self.replies.recv_timeout(d) {
                Ok(r) => Some(r),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::driver("read", "input thread has exited"));
                }
            },
        };
        let Some(first) = first else {
            return Ok(false);
        };
        self.accept(first)?;
        while let Ok(r) = self.replies.try_recv() {
            self.accept(r)?;
        }
        Ok(true)
    }

    fn iteration(&mut self) -> Result<()> {
        for e in self.ready.drain(..) {
            trace!(?e, "crossterm event");
            match translate_event(e) {
                Some(Event::Resize(size)) => self.surface.borrow_mut().resize(size),
                Some(e) => self.input.push(e),
                None => {}
            }
        }
        Ok(())
    }
}

/// Translate crossterm key modifiers.
fn translate_key_modifiers(mods: cevent::KeyModifiers) -> key::Mods {
    key::Mods {
        shift: mods.contains(cevent::KeyModifiers::SHIFT),
        ctrl: mods.contains(cevent::KeyModifiers::CONTROL),
        alt: mods.contains(cevent::KeyModifiers::ALT),
    }
}

/// Translate a crossterm mouse button.
fn translate_button(b: cevent::MouseButton) -> mouse::Button {
    match b {
        cevent::MouseButton::Left => mouse::Button::Left,
        cevent::MouseButton::Right => mouse::Button::Right,
        cevent::MouseButton::Middle => mouse::Button::Middle,
    }
}

/// Translate a crossterm key code. Lock, media and bare modifier keys are
/// dropped.
fn translate_key_code(code: cevent::KeyCode) -> Option<key::KeyCode> {
    Some(match code {
        cevent::KeyCode::Backspace => key::KeyCode::Backspace,
        cevent::KeyCode::Enter => key::KeyCode::Enter,
        cevent::KeyCode::Left => key::KeyCode::Left,
        cevent::KeyCode::Right => key::KeyCode::Right,
        cevent::KeyCode::Up => key::KeyCode::Up,
        cevent::KeyCode::Down => key::KeyCode::Down,
        cevent::KeyCode::Home => key::KeyCode::Home,
        cevent::KeyCode::End => key::KeyCode::End,
        cevent::KeyCode::PageUp => key::KeyCode::PageUp,
        cevent::KeyCode::PageDown => key::KeyCode::PageDown,
        cevent::KeyCode::Tab => key::KeyCode::Tab,
        cevent::KeyCode::BackTab => key::KeyCode::BackTab,
        cevent::KeyCode::Delete => key::KeyCode::Delete,
        cevent::KeyCode::Insert => key::KeyCode::Insert,
        cevent::KeyCode::F(x) => key::KeyCode::F(x),
        cevent::KeyCode::Char(c) => key::KeyCode::Char(c),
        cevent::KeyCode::Null => key::KeyCode::Null,
        cevent::KeyCode::Esc => key::KeyCode::Esc,
        _ => return None,
    })
}

/// Translate a crossterm event. Key releases and repeats reported by the
/// kitty protocol are dropped.
fn translate_event(e: cevent::Event) -> Option<Event> {
    Some(match e {
        cevent::Event::Key(k) => {
            if k.kind == cevent::KeyEventKind::Release {
                return None;
            }
            Event::Key(key::Key {
                mods: translate_key_modifiers(k.modifiers),
                key: translate_key_code(k.code)?,
            })
        }
        cevent::Event::Mouse(m) => {
            let mut button = mouse::Button::None;
            let action = match m.kind {
                cevent::MouseEventKind::Down(b) => {
                    button = translate_button(b);
                    mouse::Action::Down
                }
                cevent::MouseEventKind::Up(b) => {
                    button = translate_button(b);
                    mouse::Action::Up
                }
                cevent::MouseEventKind::Drag(b) => {
                    button = translate_button(b);
                    mouse::Action::Drag
                }
                cevent::MouseEventKind::Moved => mouse::Action::Moved,
                cevent::MouseEventKind::ScrollDown => mouse::Action::ScrollDown,
                cevent::MouseEventKind::ScrollUp => mouse::Action::ScrollUp,
                cevent::MouseEventKind::ScrollLeft | cevent::MouseEventKind::ScrollRight => {
                    return None;
                }
            };
            Event::Mouse(mouse::MouseEvent {
                button,
                action,
                location: Point {
                    x: m.column.into(),
                    y: m.row.into(),
                },
                modifiers: translate_key_modifiers(m.modifiers),
            })
        }
        cevent::Event::Resize(x, y) => Event::Resize(Size::new(x.into(), y.into())),
        cevent::Event::FocusGained => Event::FocusGained,
        cevent::Event::FocusLost => Event::FocusLost,
        cevent::Event::Paste(s) => Event::Paste(s),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kev(code: cevent::KeyCode, mods: cevent::KeyModifiers) -> cevent::Event {
        cevent::Event::Key(cevent::KeyEvent::new(code, mods))
    }

    #[test]
    fn keys() -> Result<()> {
        assert_eq!(
            translate_event(kev(cevent::KeyCode::Char('q'), cevent::KeyModifiers::CONTROL)),
            Some(Event::Key(key::Ctrl + 'q'))
        );
        assert_eq!(
            translate_event(kev(cevent::KeyCode::F(5), cevent::KeyModifiers::NONE)),
            Some(Event::Key(key::KeyCode::F(5).into()))
        );
        assert_eq!(
            translate_event(kev(cevent::KeyCode::CapsLock, cevent::KeyModifiers::NONE)),
            None
        );
        let mut release = cevent::KeyEvent::new(cevent::KeyCode::Enter, cevent::KeyModifiers::NONE);
        release.kind = cevent::KeyEventKind::Release;
        assert_eq!(translate_event(cevent::Event::Key(release)), None);
        Ok(())
    }

    #[test]
    fn mouse() -> Result<()> {
        let e = cevent::Event::Mouse(cevent::MouseEvent {
            kind: cevent::MouseEventKind::Down(cevent::MouseButton::Left),
            column: 4,
            row: 2,
            modifiers: cevent::KeyModifiers::NONE,
        });
        assert_eq!(
            translate_event(e),
            Some(Event::Mouse(mouse::MouseEvent::click(4, 2)))
        );
        Ok(())
    }

    #[test]
    fn resize_and_paste() -> Result<()> {
        assert_eq!(
            translate_event(cevent::Event::Resize(80, 24)),
            Some(Event::Resize(Size::new(80, 24)))
        );
        assert_eq!(
            translate_event(cevent::Event::Paste("hi".into())),
            Some(Event::Paste("hi".into()))
        );
        Ok(())
    }

    #[test]
    fn palette() -> Result<()> {
        assert_eq!(translate_color(Color::Brown), style::Color::DarkYellow);
        assert_eq!(translate_color(Color::BrightBlue), style::Color::Blue);
        Ok(())
    }

    #[test]
    fn wakeup_without_console() -> Result<()> {
        let input = InputQueue::new();
        let mut backend = open(input, false)?;
        assert!(!backend.main_loop.events_pending(Some(Duration::ZERO))?);
        backend.main_loop.waker().wake();
        assert!(backend.main_loop.events_pending(Some(Duration::from_secs(5)))?);
        backend.main_loop.iteration()?;
        Ok(())
    }
}
