use std::{io, result::Result as StdResult, sync::mpsc};

use thiserror::Error;

/// Result type for arbor operations.
pub type Result<T> = StdResult<T, Error>;

/// Core error type.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
pub enum Error {
    #[error("view is not a descendant: {0}")]
    /// A focus request named a view outside the target's subtree.
    NotDescendant(String),
    #[error("view not found: {0}")]
    /// The view id does not resolve to a live view.
    ViewNotFound(String),
    #[error("view already attached: {0}")]
    /// The view already has a superview.
    AlreadyAttached(String),
    #[error("operation would create a cycle: {0}")]
    /// Attaching would make a view its own ancestor.
    WouldCreateCycle(String),
    #[error("geometry: {0}")]
    /// Geometry failure.
    Geometry(String),
    #[error("layout: {0}")]
    /// Layout failure.
    Layout(String),
    #[error("invalid argument: {0}")]
    /// Invalid argument.
    InvalidArgument(String),
    #[error("config: {0}")]
    /// Configuration failure.
    Config(String),
    #[error("driver: {call}: {message}")]
    /// A console backend call failed.
    Driver {
        /// The failing native call.
        call: String,
        /// Diagnostic detail.
        message: String,
    },
    #[error("invalid handle passed to {call}: {state}")]
    /// A native console handle was closed or invalid.
    InvalidHandle {
        /// The native call that received the handle.
        call: String,
        /// Description of the handle state.
        state: String,
    },
    #[error("io: {0}")]
    /// I/O failure.
    Io(String),
    #[error("runloop: {0}")]
    /// Run loop failure.
    RunLoop(String),
    #[error("internal: {0}")]
    /// Internal error.
    Internal(String),
}

impl Error {
    /// Construct a driver error for a named native call.
    pub fn driver(call: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Driver {
            call: call.into(),
            message: message.into(),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<mpsc::RecvError> for Error {
    fn from(e: mpsc::RecvError) -> Self {
        Self::RunLoop(e.to_string())
    }
}

impl From<geom::Error> for Error {
    fn from(e: geom::Error) -> Self {
        Self::Geometry(e.to_string())
    }
}
