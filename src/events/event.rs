//! # Events emitted by the task manager and its work units.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Operation events**: one per manager operation, carrying the resulting [`Status`]
//! - **Work events**: execution flow of a work unit (started, finished, timeout)
//! - **Subscriber events**: delivery problems to a subscriber
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use taskkeeper::{Event, EventKind, Status};
//!
//! let ev = Event::new(EventKind::TaskStart)
//!     .with_task("demo-task")
//!     .with_status(Status::InvalidStateForStart)
//!     .with_reason("cannot start work unit in state Running");
//!
//! assert_eq!(ev.kind, EventKind::TaskStart);
//! assert_eq!(ev.task.as_deref(), Some("demo-task"));
//! assert_eq!(ev.status, Some(Status::InvalidStateForStart));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::status::Status;
use crate::tasks::WorkStatus;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `task` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason`.
    SubscriberOverflow,

    // === Operation events ===
    /// Outcome of `register`. Sets: `task`, `status`.
    TaskRegister,
    /// Outcome of `start`. Sets: `task`, `status`, `reason` on failure.
    TaskStart,
    /// Outcome of `cancel_handle`. Sets: `task`, `status`.
    TaskCancelHandle,
    /// Outcome of `cancel`. Sets: `task`, `status`, `reason` on failure.
    TaskCancel,
    /// Outcome of a completion check. Sets: `task`, `status`, `attempt` (attempts used).
    TaskCompletionCheck,
    /// Outcome of `delete`. Sets: `task`, `status`, `work_status` (final state).
    TaskDelete,
    /// Outcome of `dequeue_disposal_record`. Sets: `status`, `task` when a record was returned.
    DisposalDequeue,
    /// Outcome of `cancel_all`. Sets: `status`, `reason` on failure.
    CancelAll,
    /// Per-name outcome inside `cancel_all` for tasks that were skipped. Sets: `task`, `status`.
    CancelSkipped,
    /// `check_all_completion` finished. Sets: `attempt` (number of tasks checked).
    CheckAllCompletion,
    /// `clear_all` finished.
    ClearAll,

    // === Work events ===
    /// Work unit began executing. Sets: `task`.
    WorkStarted,
    /// Work unit reached a terminal state. Sets: `task`, `work_status`, `reason` on fault.
    WorkFinished,
    /// Work unit exceeded its run timeout. Sets: `task`, `timeout_ms`.
    TimeoutHit,
    /// One completion-polling attempt expired without observing completion.
    ///
    /// Sets: `task`, `attempt` (1-based), `timeout_ms` (attempt window).
    PollAttemptExpired,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Event classification.
    pub kind: EventKind,
    /// Name of the task, if applicable.
    pub task: Option<Arc<str>>,
    /// Operation outcome, if applicable.
    pub status: Option<Status>,
    /// Work unit state, if applicable.
    pub work_status: Option<WorkStatus>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            status: None,
            work_status: None,
            reason: None,
            attempt: None,
            timeout_ms: None,
        }
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches an operation outcome.
    #[inline]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a work unit state.
    #[inline]
    pub fn with_work_status(mut self, status: WorkStatus) -> Self {
        self.work_status = Some(status);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::ClearAll);
        let b = Event::new(EventKind::ClearAll);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn timeout_is_clamped_to_u32() {
        let ev = Event::new(EventKind::TimeoutHit).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }
}
