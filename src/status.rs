//! # Operation outcomes.
//!
//! Every [`TaskManager`](crate::TaskManager) operation reports a [`Status`] instead of
//! returning an error: the status *is* the error channel. The only exception is
//! deleting a non-terminal task, which is a caller bug and propagates
//! [`ManagerError`](crate::ManagerError).
//!
//! ## Taxonomy
//! | Group               | Variants                                                        |
//! |---------------------|-----------------------------------------------------------------|
//! | input validation    | `NameMissing`, `WorkMissing`, `CancelHandleMissing`             |
//! | state conflict      | `AlreadyRegistered`, `TaskNotFound`, `InvalidStateForStart`     |
//! | resource lifecycle  | `HandleReleased`                                                |
//! | multi-cause/unknown | `AggregatedFailure`, `OtherFailure`                             |
//! | success / outcome   | `Added`, `Started`, `CancelHandleObtained`, `Canceled`, ...     |

use std::fmt;

/// Outcome of a task manager operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Task registered.
    Added,
    /// Task name was empty.
    NameMissing,
    /// No unit of work was supplied.
    WorkMissing,
    /// Name already in use.
    AlreadyRegistered,
    /// Cancel handle returned to the caller.
    CancelHandleObtained,
    /// No task registered under the name.
    TaskNotFound,
    /// Cancel handle absent (at registration or on the record).
    CancelHandleMissing,
    /// Work unit started.
    Started,
    /// Work unit or cancel handle resources were already released.
    HandleReleased,
    /// Work unit cannot be started from its current state.
    InvalidStateForStart,
    /// Several causes failed at once (e.g. cancellation callbacks, completion waiter panic).
    AggregatedFailure,
    /// Unexpected failure.
    OtherFailure,
    /// Cancellation requested.
    Canceled,
    /// Work unit reached a terminal state.
    Completed,
    /// Work unit did not reach a terminal state within the polling budget.
    NotCompleted,
    /// Task removed from the registry.
    Deleted,
    /// Disposal queue was empty.
    ObjectNotFound,
    /// Disposal record dequeued.
    ObjectDequeued,
    /// Every task in a bulk cancel received a cancellation request.
    AllAccepted,
    /// Some tasks in a bulk cancel did not receive a request.
    PartiallyAccepted,
    /// Bulk cancel found nothing to cancel.
    NoTasksToCancel,
}

/// Log severity a status maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Success path.
    Info,
    /// Rejected request; nothing broke.
    Warn,
    /// Resource or unexpected failure.
    Error,
}

impl Status {
    /// True for outcomes that mean the operation did what was asked.
    pub fn is_success(self) -> bool {
        matches!(
            self,
            Status::Added
                | Status::CancelHandleObtained
                | Status::Started
                | Status::Canceled
                | Status::Completed
                | Status::Deleted
                | Status::ObjectDequeued
                | Status::AllAccepted
        )
    }

    /// Severity used by log subscribers.
    pub fn severity(self) -> Severity {
        match self {
            Status::HandleReleased | Status::AggregatedFailure | Status::OtherFailure => {
                Severity::Error
            }
            s if s.is_success() => Severity::Info,
            _ => Severity::Warn,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            Status::Added => "added",
            Status::NameMissing => "name_missing",
            Status::WorkMissing => "work_missing",
            Status::AlreadyRegistered => "already_registered",
            Status::CancelHandleObtained => "cancel_handle_obtained",
            Status::TaskNotFound => "task_not_found",
            Status::CancelHandleMissing => "cancel_handle_missing",
            Status::Started => "started",
            Status::HandleReleased => "handle_released",
            Status::InvalidStateForStart => "invalid_state_for_start",
            Status::AggregatedFailure => "aggregated_failure",
            Status::OtherFailure => "other_failure",
            Status::Canceled => "canceled",
            Status::Completed => "completed",
            Status::NotCompleted => "not_completed",
            Status::Deleted => "deleted",
            Status::ObjectNotFound => "object_not_found",
            Status::ObjectDequeued => "object_dequeued",
            Status::AllAccepted => "all_accepted",
            Status::PartiallyAccepted => "partially_accepted",
            Status::NoTasksToCancel => "no_tasks_to_cancel",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_follows_outcome_group() {
        assert_eq!(Status::Added.severity(), Severity::Info);
        assert_eq!(Status::AlreadyRegistered.severity(), Severity::Warn);
        assert_eq!(Status::NotCompleted.severity(), Severity::Warn);
        assert_eq!(Status::PartiallyAccepted.severity(), Severity::Warn);
        assert_eq!(Status::HandleReleased.severity(), Severity::Error);
        assert_eq!(Status::OtherFailure.severity(), Severity::Error);
    }
}
