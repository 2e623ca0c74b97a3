//! The main loop: timers, an idle queue and cross-thread invocation layered
//! over a backend's readiness wait.
//!
//! Callbacks receive the loop's context type `C` by mutable reference. Timer
//! and idle callbacks return `true` to stay registered. Everything except
//! [`Invoker`] is confined to the loop thread.

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, VecDeque},
    fmt,
    rc::Rc,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use tracing::trace;

use crate::error::Result;

/// The readiness side of a backend.
pub trait MainLoopDriver {
    /// Prepare for waiting. Called once before the first iteration.
    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    /// A handle that interrupts a blocked [`MainLoopDriver::events_pending`]
    /// from any thread.
    fn waker(&self) -> Waker;

    /// Block for at most `timeout` (forever if `None`) until input is
    /// available or the waker fires. Returns true if there is work for
    /// [`MainLoopDriver::iteration`].
    fn events_pending(&mut self, timeout: Option<Duration>) -> Result<bool>;

    /// Dispatch whatever `events_pending` observed.
    fn iteration(&mut self) -> Result<()>;
}

/// Interrupts a blocked wait. Cheap to clone and safe to call from any
/// thread.
#[derive(Clone)]
pub struct Waker(Arc<dyn Fn() + Send + Sync>);

impl fmt::Debug for Waker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Waker")
    }
}

impl Waker {
    /// Wrap a wake function.
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Wake the loop.
    pub fn wake(&self) {
        (self.0)();
    }
}

/// Identifies a registered timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeoutToken(u64);

/// A loop-thread callback.
type Callback<C> = Box<dyn FnMut(&mut C) -> bool>;

/// A callback posted from another thread.
type Posted<C> = Box<dyn FnOnce(&mut C) + Send>;

/// A registered timer.
struct Timer<C> {
    /// Re-arm interval.
    interval: Duration,
    /// Callback; returning false removes the timer.
    callback: Callback<C>,
}

/// State confined to the loop thread.
struct Local<C> {
    /// Timers keyed by deadline, ties broken by registration order.
    timers: RefCell<BTreeMap<(Instant, TimeoutToken), Timer<C>>>,
    /// Idle callbacks in registration order.
    idles: RefCell<VecDeque<Callback<C>>>,
    /// Timers whose callbacks are running, innermost last, each with a flag
    /// set when the timer is cancelled from inside its own callback.
    firing: RefCell<Vec<(TimeoutToken, bool)>>,
    /// Next token value.
    next_token: Cell<u64>,
    /// Cleared by [`LoopHandle::stop`].
    running: Cell<bool>,
}

/// State shared with other threads.
struct Remote<C> {
    /// Callbacks waiting to be moved onto the idle queue.
    posted: Mutex<Vec<Posted<C>>>,
    /// The backend's waker.
    waker: Waker,
}

impl<C> Remote<C> {
    /// Take every posted callback.
    fn take(&self) -> Vec<Posted<C>> {
        let mut posted = self.posted.lock().unwrap_or_else(PoisonError::into_inner);
        posted.drain(..).collect()
    }

    /// True if anything has been posted.
    fn has_posted(&self) -> bool {
        !self
            .posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

/// Loop-thread handle for registering timers and idles, usable from inside
/// callbacks.
pub struct LoopHandle<C> {
    /// Loop-thread state.
    local: Rc<Local<C>>,
    /// Cross-thread state.
    remote: Arc<Remote<C>>,
}

impl<C> Clone for LoopHandle<C> {
    fn clone(&self) -> Self {
        Self {
            local: self.local.clone(),
            remote: self.remote.clone(),
        }
    }
}

impl<C> fmt::Debug for LoopHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopHandle")
            .field("timers", &self.timer_count())
            .field("idles", &self.idle_count())
            .finish()
    }
}

impl<C> LoopHandle<C> {
    /// Call `callback` after `interval`, and again every `interval` for as
    /// long as it returns true.
    pub fn add_timeout(
        &self,
        interval: Duration,
        callback: impl FnMut(&mut C) -> bool + 'static,
    ) -> TimeoutToken {
        let token = TimeoutToken(self.local.next_token.get());
        self.local.next_token.set(token.0 + 1);
        self.local.timers.borrow_mut().insert(
            (Instant::now() + interval, token),
            Timer {
                interval,
                callback: Box::new(callback),
            },
        );
        trace!(?token, ?interval, "timer added");
        token
    }

    /// Call `callback` once after `interval`.
    pub fn add_timeout_once(
        &self,
        interval: Duration,
        callback: impl FnOnce(&mut C) + 'static,
    ) -> TimeoutToken {
        let mut callback = Some(callback);
        self.add_timeout(interval, move |c| {
            if let Some(f) = callback.take() {
                f(c);
            }
            false
        })
    }

    /// Cancel a timer. Returns false if it already fired for the last time
    /// or was never registered. A callback may cancel its own timer, which
    /// is then not re-armed whatever the callback returns.
    pub fn remove_timeout(&self, token: TimeoutToken) -> bool {
        let mut timers = self.local.timers.borrow_mut();
        let key = timers.keys().find(|(_, t)| *t == token).copied();
        if let Some(k) = key {
            return timers.remove(&k).is_some();
        }
        let mut firing = self.local.firing.borrow_mut();
        match firing.iter_mut().rev().find(|(t, _)| *t == token) {
            Some((_, cancelled)) if !*cancelled => {
                *cancelled = true;
                true
            }
            _ => false,
        }
    }

    /// Run `callback` on a future iteration, and on every iteration after
    /// that for as long as it returns true.
    pub fn add_idle(&self, callback: impl FnMut(&mut C) -> bool + 'static) {
        self.local.idles.borrow_mut().push_back(Box::new(callback));
    }

    /// Number of registered timers.
    pub fn timer_count(&self) -> usize {
        self.local.timers.borrow().len()
    }

    /// Number of queued idle callbacks, posted ones included.
    pub fn idle_count(&self) -> usize {
        let posted = self
            .remote
            .posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        self.local.idles.borrow().len() + posted
    }

    /// Interrupt a blocked wait.
    pub fn wakeup(&self) {
        self.remote.waker.wake();
    }

    /// A thread-safe handle for posting work to this loop.
    pub fn invoker(&self) -> Invoker<C> {
        Invoker {
            remote: self.remote.clone(),
        }
    }

    /// Make [`MainLoop::run`] return after the current iteration.
    pub fn stop(&self) {
        self.local.running.set(false);
        self.wakeup();
    }

    /// The earliest timer deadline.
    fn next_deadline(&self) -> Option<Instant> {
        self.local
            .timers
            .borrow()
            .keys()
            .next()
            .map(|(deadline, _)| *deadline)
    }

    /// True if idle work is queued.
    fn has_idles(&self) -> bool {
        !self.local.idles.borrow().is_empty() || self.remote.has_posted()
    }
}

/// Posts callbacks to a loop from any thread.
pub struct Invoker<C> {
    /// Cross-thread state.
    remote: Arc<Remote<C>>,
}

impl<C> Clone for Invoker<C> {
    fn clone(&self) -> Self {
        Self {
            remote: self.remote.clone(),
        }
    }
}

impl<C> fmt::Debug for Invoker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invoker")
    }
}

impl<C> Invoker<C> {
    /// Queue `f` to run once on the loop thread, then wake the loop.
    pub fn invoke(&self, f: impl FnOnce(&mut C) + Send + 'static) {
        self.remote
            .posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(f));
        self.remote.waker.wake();
    }

    /// Interrupt a blocked wait.
    pub fn wakeup(&self) {
        self.remote.waker.wake();
    }
}

/// A main loop over a backend readiness driver.
pub struct MainLoop<C> {
    /// Backend readiness side.
    driver: Box<dyn MainLoopDriver>,
    /// Registration handle.
    handle: LoopHandle<C>,
}

impl<C> fmt::Debug for MainLoop<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainLoop")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl<C: 'static> MainLoop<C> {
    /// A loop over `driver`.
    pub fn new(driver: Box<dyn MainLoopDriver>) -> Self {
        let waker = driver.waker();
        Self {
            driver,
            handle: LoopHandle {
                local: Rc::new(Local {
                    timers: RefCell::new(BTreeMap::new()),
                    idles: RefCell::new(VecDeque::new()),
                    firing: RefCell::new(Vec::new()),
                    next_token: Cell::new(0),
                    running: Cell::new(false),
                }),
                remote: Arc::new(Remote {
                    posted: Mutex::new(Vec::new()),
                    waker,
                }),
            },
        }
    }

    /// The registration handle.
    pub fn handle(&self) -> &LoopHandle<C> {
        &self.handle
    }

    /// Prepare the driver.
    pub fn setup(&mut self) -> Result<()> {
        self.driver.setup()
    }

    /// Interrupt a blocked wait.
    pub fn wakeup(&self) {
        self.handle.wakeup();
    }

    /// True if an iteration has work to do. With `wait`, blocks until a
    /// timer is due, idle work is queued, input arrives or the loop is
    /// woken.
    pub fn events_pending(&mut self, wait: bool) -> Result<bool> {
        let now = Instant::now();
        let deadline = self.handle.next_deadline();
        if deadline.is_some_and(|d| d <= now) || self.handle.has_idles() {
            return Ok(true);
        }
        let timeout = if wait {
            deadline.map(|d| d.saturating_duration_since(now))
        } else {
            Some(Duration::ZERO)
        };
        if self.driver.events_pending(timeout)? {
            return Ok(true);
        }
        Ok(self
            .handle
            .next_deadline()
            .is_some_and(|d| d <= Instant::now())
            || self.handle.has_idles())
    }

    /// One iteration: fire due timers, dispatch backend work, then drain the
    /// idle queue.
    pub fn main_iteration(&mut self, ctx: &mut C) -> Result<()> {
        self.run_timers(ctx);
        self.driver.iteration()?;
        self.run_idles(ctx);
        Ok(())
    }

    /// Iterate until [`LoopHandle::stop`] is called.
    pub fn run(&mut self, ctx: &mut C) -> Result<()> {
        self.handle.local.running.set(true);
        while self.handle.local.running.get() {
            self.events_pending(true)?;
            self.main_iteration(ctx)?;
        }
        Ok(())
    }

    /// Fire every timer due at the start of the call. Each timer leaves the
    /// table before its callback runs and is re-armed with the same token.
    fn run_timers(&mut self, ctx: &mut C) {
        let now = Instant::now();
        let due: Vec<_> = self
            .handle
            .local
            .timers
            .borrow()
            .keys()
            .take_while(|(deadline, _)| *deadline <= now)
            .copied()
            .collect();
        for key in due {
            let timer = self.handle.local.timers.borrow_mut().remove(&key);
            let Some(mut timer) = timer else {
                continue;
            };
            let local = &self.handle.local;
            local.firing.borrow_mut().push((key.1, false));
            let again = (timer.callback)(ctx);
            let cancelled = local.firing.borrow_mut().pop().is_some_and(|(_, c)| c);
            if again && !cancelled {
                let deadline = Instant::now() + timer.interval;
                self.handle
                    .local
                    .timers
                    .borrow_mut()
                    .insert((deadline, key.1), timer);
            }
        }
    }

    /// Run the idle callbacks queued before this call. Callbacks queued
    /// while draining wait for the next iteration.
    fn run_idles(&mut self, ctx: &mut C) {
        for posted in self.handle.remote.take() {
            let mut posted = Some(posted);
            self.handle.add_idle(move |c| {
                if let Some(f) = posted.take() {
                    f(c);
                }
                false
            });
        }
        let batch: Vec<_> = self.handle.local.idles.borrow_mut().drain(..).collect();
        let mut keep = Vec::new();
        for mut idle in batch {
            if idle(ctx) {
                keep.push(idle);
            }
        }
        self.handle.local.idles.borrow_mut().extend(keep);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
    };

    use super::*;
    use crate::error::Error;

    /// A driver that never reports input.
    struct Quiet {
        /// Wake count.
        wakes: Arc<AtomicUsize>,
    }

    impl MainLoopDriver for Quiet {
        fn waker(&self) -> Waker {
            let wakes = self.wakes.clone();
            Waker::new(move || {
                wakes.fetch_add(1, Ordering::SeqCst);
            })
        }

        fn events_pending(&mut self, _timeout: Option<Duration>) -> Result<bool> {
            Ok(false)
        }

        fn iteration(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn quiet() -> (MainLoop<Vec<&'static str>>, Arc<AtomicUsize>) {
        let wakes = Arc::new(AtomicUsize::new(0));
        (
            MainLoop::new(Box::new(Quiet {
                wakes: wakes.clone(),
            })),
            wakes,
        )
    }

    #[test]
    fn zero_timeout_fires_once() -> Result<()> {
        let (mut ml, _) = quiet();
        let h = ml.handle().clone();
        h.add_timeout_once(Duration::ZERO, |log| log.push("t"));
        let mut log = Vec::new();
        assert!(ml.events_pending(false)?);
        ml.main_iteration(&mut log)?;
        assert_eq!(log, vec!["t"]);
        assert_eq!(h.timer_count(), 0);
        ml.main_iteration(&mut log)?;
        assert_eq!(log, vec!["t"]);
        Ok(())
    }

    #[test]
    fn repeating_timer_keeps_its_token() -> Result<()> {
        let (mut ml, _) = quiet();
        let h = ml.handle().clone();
        let mut n = 0;
        let token = h.add_timeout(Duration::ZERO, move |log| {
            n += 1;
            log.push("tick");
            n < 3
        });
        let mut log = Vec::new();
        for _ in 0..5 {
            ml.main_iteration(&mut log)?;
        }
        assert_eq!(log.len(), 3);
        assert!(!h.remove_timeout(token));

        let token = h.add_timeout(Duration::ZERO, |_| true);
        ml.main_iteration(&mut log)?;
        assert!(h.remove_timeout(token));
        assert_eq!(h.timer_count(), 0);
        Ok(())
    }

    #[test]
    fn timer_cancels_itself() -> Result<()> {
        let (mut ml, _) = quiet();
        let h = ml.handle().clone();
        let inner = h.clone();
        let token = Rc::new(Cell::new(None));
        let own = token.clone();
        token.set(Some(h.add_timeout(Duration::ZERO, move |log| {
            let removed = own.get().is_some_and(|t| inner.remove_timeout(t));
            log.push(if removed { "removed" } else { "missed" });
            true
        })));
        let mut log = Vec::new();
        ml.main_iteration(&mut log)?;
        ml.main_iteration(&mut log)?;
        assert_eq!(log, vec!["removed"]);
        assert_eq!(h.timer_count(), 0);
        assert!(!ml.events_pending(false)?);
        assert!(token.get().is_some_and(|t| !h.remove_timeout(t)));
        Ok(())
    }

    #[test]
    fn future_timer_is_not_due() -> Result<()> {
        let (mut ml, _) = quiet();
        ml.handle().add_timeout_once(Duration::from_secs(3600), |log| log.push("late"));
        let mut log = Vec::new();
        assert!(!ml.events_pending(false)?);
        ml.main_iteration(&mut log)?;
        assert!(log.is_empty());
        assert_eq!(ml.handle().timer_count(), 1);
        Ok(())
    }

    #[test]
    fn idles_added_while_draining_wait() -> Result<()> {
        let (mut ml, _) = quiet();
        let h = ml.handle().clone();
        let inner = h.clone();
        h.add_idle(move |log| {
            log.push("first");
            inner.add_idle(|log| {
                log.push("nested");
                false
            });
            false
        });
        h.add_idle(|log| {
            log.push("second");
            false
        });
        let mut log = Vec::new();
        ml.main_iteration(&mut log)?;
        assert_eq!(log, vec!["first", "second"]);
        ml.main_iteration(&mut log)?;
        assert_eq!(log, vec!["first", "second", "nested"]);
        Ok(())
    }

    #[test]
    fn invoke_from_another_thread() -> Result<()> {
        let (mut ml, wakes) = quiet();
        let invoker = ml.handle().invoker();
        thread::spawn(move || invoker.invoke(|log| log.push("remote")))
            .join()
            .map_err(|_| Error::Internal("thread panicked".into()))?;
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
        assert!(ml.events_pending(false)?);
        let mut log = Vec::new();
        ml.main_iteration(&mut log)?;
        assert_eq!(log, vec!["remote"]);
        assert_eq!(ml.handle().idle_count(), 0);
        Ok(())
    }

    #[test]
    fn stop_ends_run() -> Result<()> {
        let (mut ml, _) = quiet();
        let h = ml.handle().clone();
        let stopper = h.clone();
        h.add_timeout(Duration::ZERO, move |log| {
            log.push("tick");
            if log.len() == 2 {
                stopper.stop();
            }
            true
        });
        let mut log = Vec::new();
        ml.run(&mut log)?;
        assert_eq!(log.len(), 2);
        Ok(())
    }
}
