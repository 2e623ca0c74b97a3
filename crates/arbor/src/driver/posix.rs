//! A `poll(2)` readiness loop with file-descriptor watches and a self-pipe
//! wakeup.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt, io,
    os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd},
    rc::Rc,
    sync::Arc,
    time::Duration,
};

use bitflags::bitflags;
use tracing::{trace, warn};

use crate::{
    error::{Error, Result},
    mainloop::{MainLoopDriver, Waker},
};

bitflags! {
    /// Readiness conditions, mirroring the `poll(2)` event bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Condition: i16 {
        /// Data to read.
        const IN = libc::POLLIN;
        /// Urgent data to read.
        const PRI = libc::POLLPRI;
        /// Writing will not block.
        const OUT = libc::POLLOUT;
        /// Error condition.
        const ERR = libc::POLLERR;
        /// Hang up.
        const HUP = libc::POLLHUP;
        /// Invalid descriptor.
        const NVAL = libc::POLLNVAL;
    }
}

/// Identifies a registered watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchToken(u64);

/// A watch callback. Returning false removes the watch.
type WatchCallback = Box<dyn FnMut(Condition) -> bool>;

/// A registered watch.
struct Watch {
    /// Watched descriptor.
    fd: RawFd,
    /// Conditions of interest.
    condition: Condition,
    /// Callback; `None` while it runs.
    callback: Option<WatchCallback>,
}

/// The watch table shared between the loop and its handles.
#[derive(Default)]
struct WatchTable {
    /// Watches by token.
    watches: BTreeMap<WatchToken, Watch>,
    /// Next token value.
    next: u64,
    /// The poll set must be rebuilt.
    dirty: bool,
}

/// A cloneable, loop-thread handle for adding and removing watches, usable
/// from inside watch callbacks.
#[derive(Clone, Default)]
pub struct WatchHandle {
    /// Shared table.
    table: Rc<RefCell<WatchTable>>,
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("watches", &self.len())
            .finish()
    }
}

impl WatchHandle {
    /// Call `callback` whenever `fd` satisfies `condition`.
    pub fn add_watch(
        &self,
        fd: RawFd,
        condition: Condition,
        callback: impl FnMut(Condition) -> bool + 'static,
    ) -> WatchToken {
        let mut t = self.table.borrow_mut();
        let token = WatchToken(t.next);
        t.next += 1;
        t.watches.insert(
            token,
            Watch {
                fd,
                condition,
                callback: Some(Box::new(callback)),
            },
        );
        t.dirty = true;
        trace!(fd, ?condition, ?token, "watch added");
        token
    }

    /// Remove a watch. Returns false if it was not registered.
    pub fn remove_watch(&self, token: WatchToken) -> bool {
        let mut t = self.table.borrow_mut();
        let removed = t.watches.remove(&token).is_some();
        t.dirty |= removed;
        removed
    }

    /// Number of registered watches.
    pub fn len(&self) -> usize {
        self.table.borrow().watches.len()
    }

    /// True if nothing is watched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write end of the wakeup pipe.
#[derive(Clone)]
struct WakeupSender {
    /// Non-blocking write end.
    fd: Arc<OwnedFd>,
}

impl WakeupSender {
    /// Write one byte. A full pipe already guarantees a wakeup, so errors
    /// are ignored.
    fn wake(&self) {
        // SAFETY: fd is a valid pipe write end and the buffer is one byte.
        unsafe {
            libc::write(self.fd.as_raw_fd(), [1u8].as_ptr().cast(), 1);
        }
    }
}

/// Set `O_NONBLOCK` on a descriptor.
fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: fcntl on a descriptor we own.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags == -1 || libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) == -1 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Create the wakeup pipe, both ends non-blocking.
fn wakeup_pipe() -> io::Result<(WakeupSender, OwnedFd)> {
    let mut fds = [0 as RawFd; 2];
    // SAFETY: fds is a valid two-element array.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: pipe() just returned these descriptors and nothing else owns
    // them.
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    set_nonblocking(read.as_raw_fd())?;
    set_nonblocking(write.as_raw_fd())?;
    Ok((WakeupSender { fd: Arc::new(write) }, read))
}

/// Milliseconds for `poll`, rounded up so a pending deadline is not missed
/// by a busy loop.
fn poll_timeout(timeout: Option<Duration>) -> libc::c_int {
    match timeout {
        None => -1,
        Some(d) => {
            let ms = d.as_micros().div_ceil(1000);
            libc::c_int::try_from(ms).unwrap_or(libc::c_int::MAX)
        }
    }
}

/// The POSIX readiness loop.
pub struct PosixLoop {
    /// Shared watch table.
    handle: WatchHandle,
    /// Poll set; index 0 is the wakeup pipe.
    pollfds: Vec<libc::pollfd>,
    /// Token of each poll entry after the first.
    tokens: Vec<WatchToken>,
    /// Watches reported ready by the last wait.
    ready: Vec<(WatchToken, Condition)>,
    /// Read end of the wakeup pipe.
    wake_rx: OwnedFd,
    /// Write end of the wakeup pipe.
    wake_tx: WakeupSender,
}

impl fmt::Debug for PosixLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PosixLoop")
            .field("handle", &self.handle)
            .field("ready", &self.ready.len())
            .finish_non_exhaustive()
    }
}

impl PosixLoop {
    /// A loop with no watches.
    pub fn new() -> Result<Self> {
        let (wake_tx, wake_rx) = wakeup_pipe().map_err(|e| Error::driver("pipe", e.to_string()))?;
        Ok(Self {
            handle: WatchHandle::default(),
            pollfds: Vec::new(),
            tokens: Vec::new(),
            ready: Vec::new(),
            wake_rx,
            wake_tx,
        })
    }

    /// A handle to the watch table.
    pub fn watches(&self) -> WatchHandle {
        self.handle.clone()
    }

    /// Rebuild the poll set if the watch table changed.
    fn rebuild(&mut self) {
        let mut t = self.handle.table.borrow_mut();
        if !t.dirty && !self.pollfds.is_empty() {
            return;
        }
        self.pollfds.clear();
        self.tokens.clear();
        self.pollfds.push(libc::pollfd {
            fd: self.wake_rx.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        });
        for (token, w) in &t.watches {
            self.pollfds.push(libc::pollfd {
                fd: w.fd,
                events: w.condition.bits(),
                revents: 0,
            });
            self.tokens.push(*token);
        }
        t.dirty = false;
    }

    /// Consume pending wakeup bytes.
    fn drain_wakeups(&self) {
        let mut buf = [0u8; 64];
        loop {
            // SAFETY: non-blocking read into a valid buffer.
            let n = unsafe {
                libc::read(self.wake_rx.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len())
            };
            if n <= 0 {
                break;
            }
        }
    }
}

impl MainLoopDriver for PosixLoop {
    fn waker(&self) -> Waker {
        let tx = self.wake_tx.clone();
        Waker::new(move || tx.wake())
    }

    fn events_pending(&mut self, timeout: Option<Duration>) -> Result<bool> {
        self.rebuild();
        for p in &mut self.pollfds {
            p.revents = 0;
        }
        let nfds = self.pollfds.len() as libc::nfds_t;
        // SAFETY: pollfds is a valid, initialised array of nfds entries.
        let n = unsafe { libc::poll(self.pollfds.as_mut_ptr(), nfds, poll_timeout(timeout)) };
        if n < 0 {
            let e = io::Error::last_os_error();
            if e.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(Error::driver("poll", e.to_string()));
        }
        if self.pollfds[0].revents != 0 {
            self.drain_wakeups();
        }
        self.ready.clear();
        for (p, token) in self.pollfds[1..].iter().zip(&self.tokens) {
            if p.revents != 0 {
                self.ready.push((*token, Condition::from_bits_truncate(p.revents)));
            }
        }
        Ok(n > 0)
    }

    fn iteration(&mut self) -> Result<()> {
        for (token, cond) in self.ready.drain(..) {
            let callback = self
                .handle
                .table
                .borrow_mut()
                .watches
                .get_mut(&token)
                .and_then(|w| w.callback.take());
            // Removed by an earlier callback in this batch.
            let Some(mut callback) = callback else {
                continue;
            };
            let keep = callback(cond);
            let mut t = self.handle.table.borrow_mut();
            if keep {
                if let Some(w) = t.watches.get_mut(&token) {
                    w.callback = Some(callback);
                }
            } else if t.watches.remove(&token).is_some() {
                t.dirty = true;
            }
            if cond.contains(Condition::NVAL) && keep {
                warn!(?token, "watched descriptor is invalid");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, thread};

    use super::*;

    /// A pipe for tests: (read, write).
    fn pipe() -> Result<(OwnedFd, OwnedFd)> {
        let mut fds = [0 as RawFd; 2];
        // SAFETY: fds is a valid two-element array.
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error().into());
        }
        // SAFETY: freshly created descriptors.
        Ok(unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) })
    }

    fn write_byte(fd: &OwnedFd) {
        // SAFETY: valid descriptor, one-byte buffer.
        unsafe {
            libc::write(fd.as_raw_fd(), [7u8].as_ptr().cast(), 1);
        }
    }

    #[test]
    fn watch_fires_and_deregisters() -> Result<()> {
        let mut lp = PosixLoop::new()?;
        let (r, w) = pipe()?;
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let handle = lp.watches();
        handle.add_watch(r.as_raw_fd(), Condition::IN, move |c| {
            assert!(c.contains(Condition::IN));
            h.set(h.get() + 1);
            false
        });
        assert!(!lp.events_pending(Some(Duration::ZERO))?);
        write_byte(&w);
        assert!(lp.events_pending(Some(Duration::from_secs(1)))?);
        lp.iteration()?;
        assert_eq!(hits.get(), 1);
        assert!(handle.is_empty());
        Ok(())
    }

    #[test]
    fn wakeup_interrupts_wait() -> Result<()> {
        let mut lp = PosixLoop::new()?;
        let waker = lp.waker();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            waker.wake();
        });
        assert!(lp.events_pending(Some(Duration::from_secs(10)))?);
        lp.iteration()?;
        t.join().map_err(|_| Error::Internal("thread panicked".into()))?;
        // Drained: a second wait times out.
        assert!(!lp.events_pending(Some(Duration::ZERO))?);
        Ok(())
    }

    #[test]
    fn remove_watch() -> Result<()> {
        let lp = PosixLoop::new()?;
        let (r, _w) = pipe()?;
        let handle = lp.watches();
        let t = handle.add_watch(r.as_raw_fd(), Condition::IN, |_| true);
        assert!(handle.remove_watch(t));
        assert!(!handle.remove_watch(t));
        Ok(())
    }

    #[test]
    fn timeouts_round_up() -> Result<()> {
        assert_eq!(poll_timeout(None), -1);
        assert_eq!(poll_timeout(Some(Duration::ZERO)), 0);
        assert_eq!(poll_timeout(Some(Duration::from_micros(1))), 1);
        assert_eq!(poll_timeout(Some(Duration::from_millis(5))), 5);
        Ok(())
    }
}
