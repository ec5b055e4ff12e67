//! # Completion polling with bounded retries.
//!
//! Detects whether a work unit reached a terminal state within a retry/deadline
//! budget ([`PollOptions`]).
//!
//! ## Protocol
//! ```text
//! for attempt in 1..=retry+1:
//!   ├─► fast path: released → HandleReleased, terminal → Completed
//!   ├─► spawn waiter (WorkUnit::wait_complete) bounded by timeout(wait)
//!   │     ├─ Completed          → stop, Completed
//!   │     ├─ Released           → stop, HandleReleased
//!   │     ├─ deadline elapsed   → abort waiter, publish PollAttemptExpired, next attempt
//!   │     ├─ waiter cancelled   → timeout-class failure, publish PollAttemptExpired, next attempt
//!   │     └─ waiter panicked    → stop, AggregatedFailure
//!   └─► attempts exhausted      → NotCompleted
//! ```
//!
//! ## Rules
//! - Each attempt has its own `wait` deadline; worst case blocks `(retry + 1) × wait`
//! - The waiter blocks on the unit's state channel; it never spins

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinError;
use tokio::time;

use crate::config::PollOptions;
use crate::core::work::{Settled, WorkUnit};
use crate::events::{Bus, Event, EventKind};
use crate::status::Status;

/// Result of a completion check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PollReport {
    /// `Completed`, `NotCompleted`, `HandleReleased` or `AggregatedFailure`.
    pub status: Status,
    /// Attempts started (1-based, at most `retry + 1`).
    pub attempts: u32,
    /// Failure description for `AggregatedFailure`.
    pub reason: Option<String>,
}

impl PollReport {
    fn done(status: Status, attempts: u32) -> Self {
        Self {
            status,
            attempts,
            reason: None,
        }
    }
}

/// One attempt's outcome.
#[derive(Debug)]
enum Attempt {
    Completed,
    Released,
    Expired,
    Failed(String),
}

/// Runs the polling protocol for `work` registered under `name`.
pub(crate) async fn poll_completion(
    name: &str,
    work: &Arc<WorkUnit>,
    poll: PollOptions,
    bus: &Bus,
) -> PollReport {
    poll_with(name, work, poll, bus, || {
        let work = Arc::clone(work);
        async move { work.wait_complete().await }
    })
    .await
}

/// Polling loop over an arbitrary waiter; `wait_for` builds one per attempt.
async fn poll_with<W, Fut>(
    name: &str,
    work: &Arc<WorkUnit>,
    poll: PollOptions,
    bus: &Bus,
    wait_for: W,
) -> PollReport
where
    W: Fn() -> Fut,
    Fut: Future<Output = Settled> + Send + 'static,
{
    let mut attempts = 0;

    for attempt in 1..=poll.attempts() {
        attempts = attempt;
        match run_attempt(work, poll, &wait_for).await {
            Attempt::Completed => return PollReport::done(Status::Completed, attempts),
            Attempt::Released => return PollReport::done(Status::HandleReleased, attempts),
            Attempt::Failed(reason) => {
                return PollReport {
                    status: Status::AggregatedFailure,
                    attempts,
                    reason: Some(reason),
                };
            }
            Attempt::Expired => {
                bus.publish(
                    Event::new(EventKind::PollAttemptExpired)
                        .with_task(name)
                        .with_attempt(attempt)
                        .with_timeout(poll.wait),
                );
            }
        }
    }

    PollReport::done(Status::NotCompleted, attempts)
}

async fn run_attempt<W, Fut>(work: &Arc<WorkUnit>, poll: PollOptions, wait_for: &W) -> Attempt
where
    W: Fn() -> Fut,
    Fut: Future<Output = Settled> + Send + 'static,
{
    if work.is_released() {
        return Attempt::Released;
    }
    if work.is_complete() {
        return Attempt::Completed;
    }

    let mut waiter = tokio::spawn(wait_for());
    match time::timeout(poll.wait, &mut waiter).await {
        Ok(Ok(Settled::Completed)) => Attempt::Completed,
        Ok(Ok(Settled::Released)) => Attempt::Released,
        Ok(Err(e)) => classify_join_error(e),
        Err(_elapsed) => {
            waiter.abort();
            Attempt::Expired
        }
    }
}

/// A cancelled waiter counts as a timeout; a panicking one aborts the check.
fn classify_join_error(e: JoinError) -> Attempt {
    if e.is_cancelled() {
        Attempt::Expired
    } else {
        Attempt::Failed(format!("completion waiter failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::tasks::{TaskFn, TaskRef};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn unit(task: TaskRef, token: CancellationToken) -> Arc<WorkUnit> {
        Arc::new(WorkUnit::new(task, token, None))
    }

    fn never_ending() -> TaskRef {
        TaskFn::arc(|_ctx: CancellationToken| async move {
            std::future::pending::<()>().await;
            Ok::<(), TaskError>(())
        })
    }

    async fn exploding_waiter() -> Settled {
        panic!("waiter exploded")
    }

    fn expired_events(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> usize {
        let mut expired = 0;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::PollAttemptExpired {
                expired += 1;
            }
        }
        expired
    }

    #[tokio::test]
    async fn zero_retry_makes_exactly_one_attempt() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let work = unit(never_ending(), CancellationToken::new());
        work.start("x", &bus).unwrap();

        let report =
            poll_completion("x", &work, PollOptions::new(0, Duration::from_millis(1)), &bus).await;
        assert_eq!(report.status, Status::NotCompleted);
        assert_eq!(report.attempts, 1);
        assert_eq!(expired_events(&mut rx), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_budget_is_spent() {
        let bus = Bus::new(16);
        let work = unit(never_ending(), CancellationToken::new());
        work.start("x", &bus).unwrap();

        let report =
            poll_completion("x", &work, PollOptions::new(2, Duration::from_millis(10)), &bus)
                .await;
        assert_eq!(report.status, Status::NotCompleted);
        assert_eq!(report.attempts, 3);
    }

    #[tokio::test]
    async fn completion_within_deadline_stops_polling() {
        let bus = Bus::new(16);
        let token = CancellationToken::new();
        let work = unit(
            TaskFn::arc(|ctx: CancellationToken| async move {
                ctx.cancelled().await;
                Err::<(), _>(TaskError::Canceled)
            }),
            token.clone(),
        );
        work.start("x", &bus).unwrap();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let report =
            poll_completion("x", &work, PollOptions::new(3, Duration::from_secs(5)), &bus).await;
        assert_eq!(report.status, Status::Completed);
        assert_eq!(report.attempts, 1);
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn released_unit_short_circuits() {
        let bus = Bus::new(16);
        let token = CancellationToken::new();
        let work = unit(never_ending(), token.clone());
        token.cancel();
        work.release().unwrap();

        let report =
            poll_completion("x", &work, PollOptions::new(3, Duration::from_millis(1)), &bus).await;
        assert_eq!(report.status, Status::HandleReleased);
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test]
    async fn cancelled_waiter_is_timeout_class() {
        let waiter = tokio::spawn(std::future::pending::<Settled>());
        waiter.abort();
        let err = waiter.await.unwrap_err();
        assert!(err.is_cancelled());

        assert!(matches!(classify_join_error(err), Attempt::Expired));
    }

    #[tokio::test]
    async fn panicked_waiter_is_a_failure() {
        let err = tokio::spawn(exploding_waiter()).await.unwrap_err();
        assert!(err.is_panic());

        match classify_join_error(err) {
            Attempt::Failed(reason) => assert!(reason.starts_with("completion waiter failed")),
            other => panic!("expected a failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn panicking_waiter_aborts_after_one_attempt() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let work = unit(never_ending(), CancellationToken::new());

        let report = poll_with(
            "x",
            &work,
            PollOptions::new(3, Duration::from_secs(1)),
            &bus,
            exploding_waiter,
        )
        .await;
        assert_eq!(report.status, Status::AggregatedFailure);
        assert_eq!(report.attempts, 1);
        assert!(report.reason.is_some());
        assert_eq!(expired_events(&mut rx), 0);
    }
}
