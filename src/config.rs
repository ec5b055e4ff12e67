//! # Global task manager configuration.
//!
//! Provides [`Config`] centralized settings for a [`TaskManager`](crate::TaskManager)
//! and [`PollOptions`], the retry/deadline budget of completion polling.
//!
//! Config is used in two ways:
//! 1. **Manager creation**: `TaskManager::builder(config)`
//! 2. **Registration defaults**: `CreationOptions::default()` inherits `Config::default_timeout()`
//!
//! ## Sentinel values
//! - `timeout = 0s` → work units run without a time limit
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

/// Retry/deadline budget for completion polling.
///
/// A check makes up to `retry + 1` attempts; each attempt waits at most `wait`
/// for the work unit to reach a terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollOptions {
    /// Additional attempts after the first one.
    pub retry: u32,
    /// Per-attempt deadline.
    pub wait: Duration,
}

impl PollOptions {
    /// Creates a polling budget.
    pub fn new(retry: u32, wait: Duration) -> Self {
        Self { retry, wait }
    }

    /// Total number of attempts (`retry + 1`).
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.retry.saturating_add(1)
    }
}

impl Default for PollOptions {
    /// `retry = 3`, `wait = 15s`.
    fn default() -> Self {
        Self {
            retry: 3,
            wait: Duration::from_millis(15_000),
        }
    }
}

/// Global configuration for the task manager.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `poll`: Default polling budget for completion checks
/// - `timeout`: Default run timeout for work units (`0s` = no timeout)
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages skip older items.
    pub bus_capacity: usize,

    /// Default polling budget, returned by [`TaskManager::poll_options`](crate::TaskManager::poll_options).
    pub poll: PollOptions,

    /// Default run timeout applied to work units registered without an explicit one.
    ///
    /// - `Duration::ZERO` = no timeout
    /// - `> 0` = the run is cancelled and the unit faulted once exceeded
    pub timeout: Duration,
}

impl Config {
    /// Returns the default run timeout as an `Option`.
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `poll = PollOptions::default()` (3 retries, 15s per attempt)
    /// - `timeout = 0s` (no timeout)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            poll: PollOptions::default(),
            timeout: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels() {
        let mut cfg = Config::default();
        assert_eq!(cfg.default_timeout(), None);
        cfg.timeout = Duration::from_secs(2);
        assert_eq!(cfg.default_timeout(), Some(Duration::from_secs(2)));
        cfg.bus_capacity = 0;
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn attempts_do_not_overflow() {
        assert_eq!(PollOptions::new(0, Duration::ZERO).attempts(), 1);
        assert_eq!(PollOptions::new(u32::MAX, Duration::ZERO).attempts(), u32::MAX);
    }
}
