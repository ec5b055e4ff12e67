//! # LogWriter: tracing-backed event logger
//!
//! A subscriber that renders incoming [`Event`]s as structured `tracing` records.
//! Severity follows the attached [`Status`](crate::Status): success → `info`,
//! rejections → `warn`, resource/unexpected failures → `error`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  taskkeeper: task_register task="worker" status=added
//! WARN  taskkeeper: task_start task="worker" status=invalid_state_for_start reason="cannot start work unit in state Running"
//! WARN  taskkeeper: poll_attempt_expired task="worker" attempt=1 timeout_ms=100
//! INFO  taskkeeper: work_finished task="worker" work_status=canceled
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::status::Severity;
use crate::subscribers::Subscribe;
use crate::tasks::WorkStatus;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn label(kind: EventKind) -> &'static str {
    match kind {
        EventKind::SubscriberPanicked => "subscriber_panicked",
        EventKind::SubscriberOverflow => "subscriber_overflow",
        EventKind::TaskRegister => "task_register",
        EventKind::TaskStart => "task_start",
        EventKind::TaskCancelHandle => "task_cancel_handle",
        EventKind::TaskCancel => "task_cancel",
        EventKind::TaskCompletionCheck => "task_completion_check",
        EventKind::TaskDelete => "task_delete",
        EventKind::DisposalDequeue => "disposal_dequeue",
        EventKind::CancelAll => "cancel_all",
        EventKind::CancelSkipped => "cancel_skipped",
        EventKind::CheckAllCompletion => "check_all_completion",
        EventKind::ClearAll => "clear_all",
        EventKind::WorkStarted => "work_started",
        EventKind::WorkFinished => "work_finished",
        EventKind::TimeoutHit => "timeout_hit",
        EventKind::PollAttemptExpired => "poll_attempt_expired",
    }
}

fn severity(e: &Event) -> Severity {
    match e.kind {
        EventKind::SubscriberPanicked => Severity::Error,
        EventKind::SubscriberOverflow | EventKind::TimeoutHit | EventKind::PollAttemptExpired => {
            Severity::Warn
        }
        EventKind::WorkFinished if e.work_status == Some(WorkStatus::Faulted) => Severity::Warn,
        EventKind::TaskDelete if e.status.is_none() => Severity::Error,
        _ => e.status.map_or(Severity::Info, |s| s.severity()),
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let event = label(e.kind);
        let task = e.task.as_deref().unwrap_or("-");
        let status = e.status.map(|s| s.as_label()).unwrap_or("-");
        let work_status = e.work_status.map(|s| s.as_label()).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match severity(e) {
            Severity::Info => info!(
                seq = e.seq,
                task,
                status,
                work_status,
                attempt = e.attempt,
                "{event}"
            ),
            Severity::Warn => warn!(
                seq = e.seq,
                task,
                status,
                work_status,
                attempt = e.attempt,
                timeout_ms = e.timeout_ms,
                reason,
                "{event}"
            ),
            Severity::Error => error!(
                seq = e.seq,
                task,
                status,
                work_status,
                reason,
                "{event}"
            ),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    #[test]
    fn severity_prefers_status_and_flags_faults() {
        let ok = Event::new(EventKind::TaskRegister).with_status(Status::Added);
        assert_eq!(severity(&ok), Severity::Info);

        let rejected = Event::new(EventKind::TaskStart).with_status(Status::TaskNotFound);
        assert_eq!(severity(&rejected), Severity::Warn);

        let released = Event::new(EventKind::TaskCancel).with_status(Status::HandleReleased);
        assert_eq!(severity(&released), Severity::Error);

        let faulted = Event::new(EventKind::WorkFinished).with_work_status(WorkStatus::Faulted);
        assert_eq!(severity(&faulted), Severity::Warn);

        let refused = Event::new(EventKind::TaskDelete).with_work_status(WorkStatus::Running);
        assert_eq!(severity(&refused), Severity::Error);
    }
}
