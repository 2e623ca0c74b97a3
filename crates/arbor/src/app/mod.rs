//! The application: a stack of running toplevels over a backend and a main
//! loop.
//!
//! ```no_run
//! use arbor::{app::Application, config::Config};
//!
//! fn main() -> arbor::error::Result<()> {
//!     let mut app = Application::new(Config::from_env()?)?;
//!     let top = app.views_mut().create_toplevel("main");
//!     app.run(top)
//! }
//! ```

/// Key and mouse routing.
mod dispatch;

use std::{fmt, mem, panic};
#[cfg(unix)]
use std::os::fd::RawFd;

use color_backtrace::{BacktracePrinter, default_output_stream};
use geom::{Point, Size};
use tracing::{debug, trace, warn};

pub use dispatch::EventContext;

use crate::{
    config::Config,
    driver::{self, Backend, ConsoleDriver, InputQueue, Restore, WatchSupport},
    error::{Error, Result},
    event::{Event, KeyCode, key::Key},
    mainloop::{Invoker, LoopHandle, MainLoop},
    view::{ViewId, Views},
};
#[cfg(unix)]
use crate::driver::posix::{Condition, WatchToken};

/// A previously installed panic hook.
type PanicHook = Box<dyn Fn(&panic::PanicHookInfo<'_>) + Sync + Send + 'static>;

/// A callback run after every main-loop iteration that did work.
type IterationHook = Box<dyn FnMut(&mut AppContext) -> Result<()>>;

/// A toplevel on the run stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Toplevel {
    /// The toplevel view.
    view: ViewId,
    /// Cleared by a stop request.
    running: bool,
}

/// Proof of a [`Application::begin`], consumed by [`Application::end`].
#[must_use = "a RunState must be passed to Application::end"]
#[derive(Debug)]
pub struct RunState {
    /// The toplevel this state runs.
    toplevel: ViewId,
    /// Set once `end` has run.
    ended: bool,
}

impl RunState {
    /// The toplevel this state runs.
    pub fn toplevel(&self) -> ViewId {
        self.toplevel
    }

    /// True once the state has been ended.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl Drop for RunState {
    fn drop(&mut self) {
        if !self.ended {
            warn!(toplevel = ?self.toplevel, "run state dropped without end");
        }
    }
}

/// Everything callbacks can reach: the view tree, the console, the run stack
/// and the main loop.
pub struct AppContext {
    /// The view arena.
    views: Views,
    /// Drawing side of the backend.
    driver: Box<dyn ConsoleDriver>,
    /// Running toplevels, bottom first.
    stack: Vec<Toplevel>,
    /// Events translated by the backend.
    input: InputQueue,
    /// Main-loop registration handle.
    handle: LoopHandle<Self>,
    /// View receiving every mouse event, if any.
    grab: Option<ViewId>,
    /// Key that stops the running toplevel.
    quit_key: Key,
    /// Toplevels to run modally once the current dispatch finishes.
    pending_modal: Vec<ViewId>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("views", &self.views)
            .field("stack", &self.stack)
            .field("grab", &self.grab)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// The view arena.
    pub fn views(&self) -> &Views {
        &self.views
    }

    /// The view arena, mutably.
    pub fn views_mut(&mut self) -> &mut Views {
        &mut self.views
    }

    /// The console driver.
    pub fn driver(&mut self) -> &mut dyn ConsoleDriver {
        &mut *self.driver
    }

    /// Current screen size.
    pub fn screen_size(&self) -> Size {
        self.driver.size()
    }

    /// The toplevel at the top of the run stack.
    pub fn top(&self) -> Option<ViewId> {
        self.stack.last().map(|t| t.view)
    }

    /// Running toplevels, bottom first.
    pub fn toplevels(&self) -> Vec<ViewId> {
        self.stack.iter().map(|t| t.view).collect()
    }

    /// Main-loop registration handle.
    pub fn loop_handle(&self) -> &LoopHandle<Self> {
        &self.handle
    }

    /// True while `toplevel` is on the stack and has not been asked to stop.
    pub fn is_running(&self, toplevel: ViewId) -> bool {
        self.stack.iter().any(|t| t.view == toplevel && t.running)
    }

    /// Ask the run loop of `toplevel` to return.
    pub fn request_stop(&mut self, toplevel: ViewId) {
        if let Some(t) = self.stack.iter_mut().find(|t| t.view == toplevel) {
            debug!(toplevel = %self.views.name(toplevel), "stop requested");
            t.running = false;
            self.handle.wakeup();
        }
    }

    /// Ask the run loop of the top toplevel to return.
    pub fn stop(&mut self) {
        if let Some(top) = self.top() {
            self.request_stop(top);
        }
    }

    /// Run `toplevel` modally on top of the stack once the current event
    /// has been dispatched.
    pub fn present(&mut self, toplevel: ViewId) {
        self.pending_modal.push(toplevel);
    }

    /// Route every mouse event to `view` until released.
    pub fn grab_mouse(&mut self, view: ViewId) {
        self.grab = Some(view);
    }

    /// Release a mouse grab.
    pub fn ungrab_mouse(&mut self) {
        self.grab = None;
    }

    /// The view holding the mouse grab.
    pub fn grabbed(&self) -> Option<ViewId> {
        self.grab
    }

    /// Focus `view` inside its toplevel.
    pub fn set_focus(&mut self, view: ViewId) -> Result<()> {
        let root = self.views.root_of(view);
        self.views.set_focus(root, view)
    }

    /// Lay out and redraw every stacked toplevel from scratch, then flush.
    pub fn refresh(&mut self) -> Result<()> {
        let size = self.driver.size();
        let tops = self.toplevels();
        for &t in &tops {
            self.views.layout_root(t, size)?;
            self.views.set_needs_display(t)?;
        }
        self.driver.set_clip(size.rect());
        for t in tops {
            self.views.redraw(t, &mut *self.driver)?;
        }
        self.position_cursor()?;
        self.driver.refresh()
    }

    /// Lay out and redraw the top toplevel if needed, then flush.
    pub(crate) fn update(&mut self) -> Result<()> {
        let Some(top) = self.top() else {
            return Ok(());
        };
        if self.views.needs_layout(top)? {
            let size = self.driver.size();
            self.views.layout_root(top, size)?;
        }
        if self.views.needs_redraw(top)? {
            trace!(toplevel = %self.views.name(top), "redraw");
            let screen = self.driver.size().rect();
            self.driver.set_clip(screen);
            self.views.redraw(top, &mut *self.driver)?;
        }
        self.position_cursor()?;
        self.driver.refresh()
    }

    /// Place the terminal cursor where the innermost focused widget asks
    /// for it, hiding it otherwise.
    fn position_cursor(&mut self) -> Result<()> {
        let Some(top) = self.top() else {
            return self.driver.set_cursor_visible(false);
        };
        let focused = self.views.most_focused(top);
        let cursor = self
            .views
            .get(focused)?
            .widget
            .as_ref()
            .and_then(|w| w.cursor());
        match cursor {
            Some(p) => {
                let size = self.driver.size();
                let Point { x, y } = self.views.view_to_screen_clipped(focused, p, size)?;
                self.driver.move_to(x, y);
                self.driver.set_cursor_visible(true)
            }
            None => self.driver.set_cursor_visible(false),
        }
    }

    /// Dispatch queued input. Resizes are handled before anything else.
    pub(crate) fn process_input(&mut self) -> Result<()> {
        let events = self.input.drain();
        if events.is_empty() {
            return Ok(());
        }
        let resize = events.iter().rev().find_map(|e| match e {
            Event::Resize(s) => Some(*s),
            _ => None,
        });
        if let Some(size) = resize {
            debug!(?size, "resize");
            self.refresh()?;
        }
        for e in events {
            match e {
                Event::Key(k) => {
                    self.dispatch_key(k)?;
                }
                Event::Mouse(m) => {
                    self.dispatch_mouse(m)?;
                }
                Event::Paste(text) => {
                    for ch in text.chars() {
                        let k = match ch {
                            '\n' | '\r' => KeyCode::Enter.into(),
                            '\t' => KeyCode::Tab.into(),
                            c => c.into(),
                        };
                        self.dispatch_key(k)?;
                    }
                }
                Event::Resize(_) => {}
                Event::FocusGained | Event::FocusLost => trace!(?e, "terminal focus"),
            }
        }
        Ok(())
    }
}

/// The application orchestrator.
pub struct Application {
    /// State reachable from callbacks.
    ctx: AppContext,
    /// Timers, idles and the backend readiness wait.
    main_loop: MainLoop<AppContext>,
    /// File-descriptor watches, on POSIX loops.
    watches: WatchSupport,
    /// Thread-safe terminal restore used by the panic hook.
    restore: Restore,
    /// Iteration hooks.
    hooks: Vec<IterationHook>,
    /// Options.
    config: Config,
    /// The main loop has been set up.
    loop_ready: bool,
    /// The console has been taken over.
    console_ready: bool,
    /// The panic hook in place before ours.
    previous_hook: Option<PanicHook>,
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("ctx", &self.ctx)
            .field("console_ready", &self.console_ready)
            .finish_non_exhaustive()
    }
}

impl Application {
    /// Open the configured (or probed) backend. The terminal is not touched
    /// until the first [`Application::begin`].
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        if let Some(path) = &config.log_file {
            crate::logging::init(path)?;
        }
        let input = InputQueue::new();
        let backend = driver::open(config.driver, &input, config.mouse)?;
        Ok(Self::with_backend(config, backend, input))
    }

    /// An application over an existing backend that pushes its input into
    /// `input`.
    pub fn with_backend(config: Config, backend: Backend, input: InputQueue) -> Self {
        let Backend {
            console,
            main_loop,
            watches,
            restore,
        } = backend;
        let main_loop = MainLoop::new(main_loop);
        let ctx = AppContext {
            views: Views::new(),
            driver: console,
            stack: Vec::new(),
            input,
            handle: main_loop.handle().clone(),
            grab: None,
            quit_key: config.quit_key,
            pending_modal: Vec::new(),
        };
        Self {
            ctx,
            main_loop,
            watches,
            restore,
            hooks: Vec::new(),
            config,
            loop_ready: false,
            console_ready: false,
            previous_hook: None,
        }
    }

    /// State reachable from callbacks.
    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// State reachable from callbacks, mutably.
    pub fn context_mut(&mut self) -> &mut AppContext {
        &mut self.ctx
    }

    /// The view arena.
    pub fn views(&self) -> &Views {
        &self.ctx.views
    }

    /// The view arena, mutably.
    pub fn views_mut(&mut self) -> &mut Views {
        &mut self.ctx.views
    }

    /// The main loop, for timers and idles.
    pub fn main_loop(&self) -> &LoopHandle<AppContext> {
        self.main_loop.handle()
    }

    /// A thread-safe handle for posting work to the loop.
    pub fn invoker(&self) -> Invoker<AppContext> {
        self.main_loop.handle().invoker()
    }

    /// Run `hook` after every iteration that did work.
    pub fn add_iteration_hook(&mut self, hook: impl FnMut(&mut AppContext) -> Result<()> + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Watch a file descriptor on backends with a POSIX readiness loop.
    #[cfg(unix)]
    pub fn add_watch(
        &mut self,
        fd: RawFd,
        condition: Condition,
        callback: impl FnMut(Condition) -> bool + 'static,
    ) -> Result<WatchToken> {
        let watches = self
            .watches
            .as_ref()
            .ok_or_else(|| Error::driver("add_watch", "backend has no readiness loop"))?;
        Ok(watches.add_watch(fd, condition, callback))
    }

    /// Remove a watch added with [`Application::add_watch`].
    #[cfg(unix)]
    pub fn remove_watch(&mut self, token: WatchToken) -> bool {
        self.watches
            .as_ref()
            .is_some_and(|w| w.remove_watch(token))
    }

    /// Take over the terminal and set up the loop, once.
    fn init(&mut self) -> Result<()> {
        if !self.loop_ready {
            self.main_loop.setup()?;
            self.loop_ready = true;
        }
        if self.console_ready {
            return Ok(());
        }
        let input = self.ctx.input.clone();
        self.ctx
            .driver
            .init(Box::new(move |size| input.push(Event::Resize(size))))?;
        let size = self.ctx.driver.size();
        if size.w == 0 || size.h == 0 {
            drop(self.ctx.driver.end());
            return Err(Error::InvalidArgument(format!(
                "degenerate terminal size {}x{}",
                size.w, size.h
            )));
        }
        debug!(?size, "console initialized");
        if self.config.install_panic_hook {
            self.install_panic_hook();
        }
        self.console_ready = true;
        Ok(())
    }

    /// Restore the terminal before printing panics.
    fn install_panic_hook(&mut self) {
        let restore = self.restore.clone();
        self.previous_hook = Some(panic::take_hook());
        panic::set_hook(Box::new(move |pi| {
            restore();
            BacktracePrinter::new().print_panic_info(pi, &mut default_output_stream()).ok();
        }));
    }

    /// Push `toplevel` onto the run stack: lay it out, focus its first
    /// focusable view and draw it.
    pub fn begin(&mut self, toplevel: ViewId) -> Result<RunState> {
        let views = &self.ctx.views;
        if views.superview(toplevel)?.is_some() {
            return Err(Error::AlreadyAttached(format!(
                "{} has a superview and cannot run as a toplevel",
                views.name(toplevel)
            )));
        }
        if self.ctx.stack.iter().any(|t| t.view == toplevel) {
            return Err(Error::InvalidArgument(format!(
                "{} is already running",
                views.name(toplevel)
            )));
        }
        self.init()?;
        debug!(
            toplevel = %self.ctx.views.name(toplevel),
            depth = self.ctx.stack.len(),
            "begin"
        );
        self.ctx.stack.push(Toplevel {
            view: toplevel,
            running: true,
        });
        self.ctx.grab = None;
        let size = self.ctx.driver.size();
        self.ctx.views.layout_root(toplevel, size)?;
        if self.ctx.views.get(toplevel)?.focused().is_none() {
            self.ctx.views.focus_first(toplevel)?;
        }
        self.ctx.refresh()?;
        Ok(RunState {
            toplevel,
            ended: false,
        })
    }

    /// Iterate the main loop for `state`'s toplevel until it is asked to
    /// stop. Without `wait`, returns as soon as there is nothing to do.
    pub fn run_loop(&mut self, state: &RunState, wait: bool) -> Result<()> {
        if state.ended {
            return Err(Error::RunLoop("run state has already ended".into()));
        }
        if let Some(t) = self.ctx.stack.iter_mut().find(|t| t.view == state.toplevel) {
            t.running = true;
        }
        while self.ctx.is_running(state.toplevel) {
            let pending = self.main_loop.events_pending(wait)?;
            if pending {
                self.main_loop.main_iteration(&mut self.ctx)?;
                self.ctx.process_input()?;
                for hook in &mut self.hooks {
                    hook(&mut self.ctx)?;
                }
                for modal in mem::take(&mut self.ctx.pending_modal) {
                    self.run(modal)?;
                }
            }
            self.ctx.update()?;
            if !pending && !wait {
                break;
            }
        }
        Ok(())
    }

    /// Pop `state`'s toplevel. The console is released when the stack
    /// empties; otherwise the new top is redrawn. Ending a state twice does
    /// nothing.
    ///
    /// # Panics
    ///
    /// If `state`'s toplevel is not the top of the run stack.
    pub fn end(&mut self, state: &mut RunState) -> Result<()> {
        if state.ended {
            return Ok(());
        }
        let top = self.ctx.top();
        assert_eq!(
            top,
            Some(state.toplevel),
            "end() called for a toplevel that is not the top of the run stack"
        );
        debug!(toplevel = %self.ctx.views.name(state.toplevel), "end");
        self.ctx.stack.pop();
        state.ended = true;
        self.ctx.grab = None;
        if self.ctx.stack.is_empty() {
            self.shutdown()
        } else {
            self.ctx.refresh()
        }
    }

    /// Begin, run until stopped, and end.
    pub fn run(&mut self, toplevel: ViewId) -> Result<()> {
        let mut state = self.begin(toplevel)?;
        let ret = self.run_loop(&state, true);
        let end = self.end(&mut state);
        ret.and(end)
    }

    /// Ask the top toplevel's run loop to return.
    pub fn request_stop(&mut self) {
        self.ctx.stop();
    }

    /// Release the console and the panic hook.
    fn shutdown(&mut self) -> Result<()> {
        if !self.console_ready {
            return Ok(());
        }
        self.console_ready = false;
        if let Some(hook) = self.previous_hook.take() {
            panic::set_hook(hook);
        }
        debug!("console released");
        self.ctx.driver.end()
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        drop(self.shutdown());
    }
}
