//! # Run a work unit's body once.
//!
//! Executes the [`Task`] body with an optional timeout, isolates panics, and maps
//! the result to a terminal [`WorkStatus`].
//!
//! ## Outcome mapping
//! ```text
//! task.run() → Ok(())               → Completed
//! task.run() → Err(Canceled)        → Canceled
//! task.run() → Err(Fail/Timeout)    → Faulted
//! task.run() → panic                → Faulted (reason "task_panic")
//! timeout exceeded → cancel child   → publish TimeoutHit → Faulted
//! ```
//!
//! ## Rules
//! - Publishes `WorkStarted` before the body runs and `TimeoutHit` on timeout
//! - `WorkFinished` is published by the caller *after* the state is stored
//! - Derives a **child token** for the run; cancelling it never affects the parent

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    error::TaskError,
    events::{Bus, Event, EventKind},
    tasks::{Task, WorkStatus},
};

/// Terminal state of one run plus an optional failure description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunOutcome {
    pub status: WorkStatus,
    pub reason: Option<String>,
}

/// Executes `task` once under `parent`, bounded by `timeout` when set.
pub(crate) async fn run_once<T: Task + ?Sized>(
    task: &T,
    parent: &CancellationToken,
    timeout: Option<Duration>,
    name: &str,
    bus: &Bus,
) -> RunOutcome {
    let child = parent.child_token();
    bus.publish(Event::new(EventKind::WorkStarted).with_task(name));

    let body = AssertUnwindSafe(task.run(child.clone())).catch_unwind();
    let res = if let Some(dur) = timeout.filter(|d| *d > Duration::ZERO) {
        match time::timeout(dur, body).await {
            Ok(r) => r,
            Err(_elapsed) => {
                child.cancel();
                publish_timeout(bus, name, dur);
                Ok(Err(TaskError::Timeout { timeout: dur }))
            }
        }
    } else {
        body.await
    };

    match res {
        Ok(Ok(())) => RunOutcome {
            status: WorkStatus::Completed,
            reason: None,
        },
        Ok(Err(TaskError::Canceled)) => RunOutcome {
            status: WorkStatus::Canceled,
            reason: None,
        },
        Ok(Err(e)) => RunOutcome {
            status: WorkStatus::Faulted,
            reason: Some(e.to_string()),
        },
        Err(_panic) => RunOutcome {
            status: WorkStatus::Faulted,
            reason: Some("task_panic".to_string()),
        },
    }
}

/// Publishes `WorkFinished` with the terminal state of the run.
pub(crate) fn publish_finished(bus: &Bus, name: &str, outcome: &RunOutcome) {
    let mut ev = Event::new(EventKind::WorkFinished)
        .with_task(name)
        .with_work_status(outcome.status);
    if let Some(reason) = &outcome.reason {
        ev = ev.with_reason(reason.as_str());
    }
    bus.publish(ev);
}

/// Publishes `TimeoutHit` (the run is then reported as faulted).
fn publish_timeout(bus: &Bus, name: &str, dur: Duration) {
    bus.publish(
        Event::new(EventKind::TimeoutHit)
            .with_task(name)
            .with_timeout(dur),
    );
}
