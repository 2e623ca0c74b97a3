//! Arbor: a retained-mode terminal UI toolkit core.
//!
//! Arbor keeps a tree of rectangular views, tracks which parts of it need
//! repainting, and drives a console backend from a single-threaded main
//! loop.
//!
//! # Quick Start
//!
//! The main entry points are:
//! - [`app::Application`] - the run stack, backend and main loop
//! - [`view::Views`] - the view arena: hierarchy, layout, damage and focus
//! - [`widget::Widget`] - behavior attached to a view
//!
//! # Module Organization
//!
//! - [`layout`] - relative position and dimension expressions
//! - [`driver`] - the console driver contract and its backends
//! - [`mainloop`] - timers, idles, wakeups and cross-thread invocation

#![warn(missing_docs)]

/// Application orchestration.
pub mod app;
/// Application options.
pub mod config;
/// Console drivers.
pub mod driver;
/// Error types.
pub mod error;
/// Input events.
pub mod event;
/// Relative layout expressions.
pub mod layout;
/// File logging setup.
pub mod logging;
/// The main loop.
pub mod mainloop;
/// Test backends and harness.
#[cfg(any(test, feature = "testing"))]
pub mod testing;
/// The view tree.
pub mod view;
/// The widget trait.
pub mod widget;

pub use geom;

pub use app::{AppContext, Application, EventContext, RunState};
pub use error::{Error, Result};
pub use view::{ViewId, Views};
pub use widget::{EventOutcome, Widget};
