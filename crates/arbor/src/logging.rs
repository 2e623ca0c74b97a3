//! File logging. The terminal belongs to the console driver, so tracing
//! output goes to a file.

use std::{fs::OpenOptions, path::Path, sync::Mutex};

use tracing_subscriber::{EnvFilter, fmt};

use crate::error::{Error, Result};

/// Install a global subscriber appending to `path`. Filtering follows
/// `RUST_LOG`, defaulting to `info`. Fails if a global subscriber is already
/// installed.
pub fn init(path: &Path) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let format = fmt::format()
        .with_level(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_target(true)
        .compact();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_writer(Mutex::new(file))
        .with_env_filter(filter)
        .event_format(format)
        .try_init()
        .map_err(|e| Error::Config(format!("logging: {e}")))
}
