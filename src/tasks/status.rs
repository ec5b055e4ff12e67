//! # Observable state of a work unit.
//!
//! ```text
//! Created ──start──► Running ──► Completed | Canceled | Faulted
//!    │
//!    └──token cancelled before start──► Canceled
//! ```

use std::fmt;

/// Current state of the work unit wrapped by a task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkStatus {
    /// Registered, not started yet.
    Created,
    /// Started and still executing.
    Running,
    /// Body returned `Ok(())`.
    Completed,
    /// Body returned `TaskError::Canceled`, or cancellation arrived before start.
    Canceled,
    /// Body failed, timed out, or panicked.
    Faulted,
}

impl WorkStatus {
    /// True for `Completed`, `Canceled` and `Faulted`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkStatus::Completed | WorkStatus::Canceled | WorkStatus::Faulted
        )
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            WorkStatus::Created => "created",
            WorkStatus::Running => "running",
            WorkStatus::Completed => "completed",
            WorkStatus::Canceled => "canceled",
            WorkStatus::Faulted => "faulted",
        }
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkStatus::Created => "Created",
            WorkStatus::Running => "Running",
            WorkStatus::Completed => "Completed",
            WorkStatus::Canceled => "Canceled",
            WorkStatus::Faulted => "Faulted",
        };
        f.write_str(s)
    }
}
