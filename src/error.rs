//! Error types used by the task manager, its capabilities, and task bodies.
//!
//! - [`TaskError`]: errors returned by individual task bodies.
//! - [`StartError`], [`CancelError`], [`ReleaseError`]: failures raised by the
//!   work-unit and cancel-handle capabilities; the manager translates them into
//!   [`Status`](crate::Status) values.
//! - [`ManagerError`]: programming-error faults propagated by the manager instead
//!   of being encoded as a status.
//!
//! All types provide `as_label` for logs.

use std::time::Duration;
use thiserror::Error;

use crate::tasks::WorkStatus;

/// # Errors produced by task execution.
///
/// Returned by [`Task::run`](crate::Task::run). `Canceled` marks the unit as canceled;
/// everything else marks it as faulted.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Task execution exceeded its timeout duration.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Task execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task observed its cancellation token and stopped.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskkeeper::TaskError;
    /// use std::time::Duration;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Convenience constructor for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }
}

/// # Failure to start a work unit.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    /// The unit's resources were already released.
    #[error("work unit already released")]
    Released,

    /// The unit is not in the `Created` state (already started or terminal).
    #[error("cannot start work unit in state {status}")]
    InvalidState {
        /// State observed when the start was attempted.
        status: WorkStatus,
    },

    /// No runtime was available to execute the unit.
    #[error("cannot spawn work unit: {reason}")]
    Runtime {
        /// Underlying reason.
        reason: String,
    },
}

impl StartError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StartError::Released => "start_released",
            StartError::InvalidState { .. } => "start_invalid_state",
            StartError::Runtime { .. } => "start_runtime",
        }
    }
}

/// # Failure to request cancellation.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CancelError {
    /// The cancel handle was already released.
    #[error("cancel handle already released")]
    Released,

    /// One or more cancellation callbacks failed; the token itself is cancelled.
    #[error("{} cancellation callback(s) failed: {errors:?}", errors.len())]
    Callbacks {
        /// Messages collected from every failing callback.
        errors: Vec<String>,
    },
}

impl CancelError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            CancelError::Released => "cancel_released",
            CancelError::Callbacks { .. } => "cancel_callbacks_failed",
        }
    }
}

/// # Failure to release a work unit.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReleaseError {
    /// Releasing a unit that has not reached a terminal state is not allowed.
    #[error("cannot release work unit in non-terminal state {status}")]
    InvalidState {
        /// State observed when the release was attempted.
        status: WorkStatus,
    },
}

/// # Faults propagated by the task manager.
///
/// These are programming errors on the caller's side, not operation outcomes.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManagerError {
    /// `delete` was called on a task whose work unit is not terminal.
    #[error("task {task:?} cannot be deleted in state {status}")]
    InvalidState {
        /// Task name.
        task: String,
        /// State of the work unit at the time of the call.
        status: WorkStatus,
    },
}

impl ManagerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ManagerError::InvalidState { .. } => "manager_invalid_state",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_error_message_counts_failures() {
        let err = CancelError::Callbacks {
            errors: vec!["a".into(), "b".into()],
        };
        assert!(err.to_string().starts_with("2 cancellation callback(s) failed"));
        assert_eq!(err.as_label(), "cancel_callbacks_failed");
    }

    #[test]
    fn invalid_state_mentions_status() {
        let err = ManagerError::InvalidState {
            task: "job".into(),
            status: WorkStatus::Running,
        };
        assert_eq!(err.to_string(), "task \"job\" cannot be deleted in state Running");
    }
}
