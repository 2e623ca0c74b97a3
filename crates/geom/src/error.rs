use std::result::Result as StdResult;

use thiserror::Error;

/// Geometry errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A geometric operation received arguments it cannot satisfy.
    #[error("geometry: {0}")]
    Geometry(String),
}

/// Result type for geometry operations.
pub type Result<T> = StdResult<T, Error>;
