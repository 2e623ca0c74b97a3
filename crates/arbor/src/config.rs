//! Application options.

use std::{env, path::PathBuf};

use crate::{
    driver::DriverKind,
    error::{Error, Result},
    event::key::{self, Key, KeyCode},
};

/// Environment variable selecting the backend.
pub const DRIVER_VAR: &str = "ARBOR_DRIVER";
/// Environment variable naming a log file.
pub const LOG_VAR: &str = "ARBOR_LOG";

/// Options for an [`Application`](crate::app::Application).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend to use; probed when `None`.
    pub driver: Option<DriverKind>,
    /// Key that stops the running toplevel when nothing else handles it.
    pub quit_key: Key,
    /// Report mouse events.
    pub mouse: bool,
    /// Write tracing output to this file.
    pub log_file: Option<PathBuf>,
    /// Install a panic hook that restores the terminal before printing a
    /// backtrace.
    pub install_panic_hook: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            driver: None,
            quit_key: key::Ctrl + 'q',
            mouse: true,
            log_file: None,
            install_panic_hook: true,
        }
    }
}

impl Config {
    /// Defaults overridden from `ARBOR_DRIVER` and `ARBOR_LOG`.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(env::var(DRIVER_VAR).ok(), env::var(LOG_VAR).ok())
    }

    /// Defaults overridden from explicit variable values.
    fn from_vars(driver: Option<String>, log: Option<String>) -> Result<Self> {
        let mut c = Self::default();
        if let Some(d) = driver.filter(|d| !d.trim().is_empty()) {
            c.driver = Some(d.parse()?);
        }
        if let Some(l) = log.filter(|l| !l.trim().is_empty()) {
            c.log_file = Some(PathBuf::from(l));
        }
        Ok(c)
    }

    /// Options for tests: no panic hook, no mouse.
    pub fn headless() -> Self {
        Self {
            mouse: false,
            install_panic_hook: false,
            ..Self::default()
        }
    }

    /// Check that the options are usable.
    pub fn validate(&self) -> Result<()> {
        if self.quit_key.key == KeyCode::Null {
            return Err(Error::Config("quit key cannot be Null".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vars() -> Result<()> {
        let c = Config::from_vars(Some("fallback".into()), Some("/tmp/arbor.log".into()))?;
        assert_eq!(c.driver, Some(DriverKind::Fallback));
        assert_eq!(c.log_file, Some(PathBuf::from("/tmp/arbor.log")));

        let c = Config::from_vars(Some("  ".into()), None)?;
        assert_eq!(c, Config::default());

        assert!(matches!(
            Config::from_vars(Some("vt100".into()), None),
            Err(Error::Config(_))
        ));
        Ok(())
    }

    #[test]
    fn defaults() -> Result<()> {
        let c = Config::default();
        assert_eq!(c.quit_key, key::Ctrl + 'q');
        c.validate()?;
        Ok(())
    }
}
