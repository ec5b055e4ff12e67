//! # Per-registration options.

use std::time::Duration;

use crate::config::Config;

/// Options applied when a task is registered.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use taskkeeper::CreationOptions;
///
/// let opts = CreationOptions::new().with_timeout(Duration::from_secs(30));
/// assert_eq!(opts.timeout(), Some(Duration::from_secs(30)));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CreationOptions {
    timeout: Option<Duration>,
}

impl CreationOptions {
    /// Options that inherit every default from the manager's [`Config`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the run of the work unit; exceeding it faults the unit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the explicit run timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Resolves the effective run timeout (`0s` means none).
    pub(crate) fn resolve_timeout(&self, cfg: &Config) -> Option<Duration> {
        self.timeout
            .or_else(|| cfg.default_timeout())
            .filter(|d| *d > Duration::ZERO)
    }
}
