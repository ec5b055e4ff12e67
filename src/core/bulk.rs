//! # Bulk operations over a registry snapshot.
//!
//! Both operations take a point-in-time [`Registry::snapshot`](crate::Registry::snapshot)
//! minus the excluded names and report one outcome per touched name.
//!
//! ## cancel_all
//! ```text
//! snapshot(except) ── empty ──► NoTasksToCancel, {}
//!        │
//!        └─► JoinSet: one spawned job per entry
//!               ├─ no cancel handle → CancelHandleMissing (skipped)
//!               ├─ already terminal → Completed (skipped)
//!               └─ otherwise        → cancel() (fire-and-forget)
//!        join all ─► any unexpected failure → OtherFailure, {}
//!                ─► skipped map empty       → AllAccepted
//!                ─► otherwise               → PartiallyAccepted
//! ```
//!
//! ## check_all_completion
//! Runs the completion-polling protocol per entry, one after another. Each name gets
//! its own deadline and retry budget; one entry's failure never stops the pass.

use std::collections::HashMap;

use tokio::task::JoinSet;

use crate::config::PollOptions;
use crate::core::manager::{TaskManager, cancel_error_status};
use crate::core::poll::poll_completion;
use crate::core::registry::TaskRecord;
use crate::error::CancelError;
use crate::events::{Event, EventKind};
use crate::status::Status;

/// Per-entry result of the cancel fan-out.
enum CancelOutcome {
    /// Cancellation was requested.
    Accepted,
    /// The entry was skipped for a legitimate reason.
    Skipped(Status),
}

fn cancel_entry(record: &TaskRecord) -> Result<CancelOutcome, CancelError> {
    let Some(handle) = record.cancel_handle() else {
        return Ok(CancelOutcome::Skipped(Status::CancelHandleMissing));
    };
    if record.is_complete() {
        return Ok(CancelOutcome::Skipped(Status::Completed));
    }
    handle.cancel()?;
    Ok(CancelOutcome::Accepted)
}

impl TaskManager {
    /// Requests cancellation of every registered task not named in `except`.
    ///
    /// Returns the overall status and a map of the names that did not receive a
    /// request (`CancelHandleMissing` or `Completed`). Each name appears at most once.
    pub async fn cancel_all(&self, except: &[&str]) -> (Status, HashMap<String, Status>) {
        let entries = self.registry.snapshot(except).await;
        if entries.is_empty() {
            self.bus
                .publish(Event::new(EventKind::CancelAll).with_status(Status::NoTasksToCancel));
            return (Status::NoTasksToCancel, HashMap::new());
        }

        let mut set = JoinSet::new();
        for (name, record) in entries {
            set.spawn(async move {
                let outcome = cancel_entry(&record);
                (name, outcome)
            });
        }

        let mut skipped = HashMap::new();
        let mut failure: Option<String> = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, Ok(CancelOutcome::Skipped(status)))) => {
                    skipped.insert(name, status);
                }
                Ok((_, Ok(CancelOutcome::Accepted))) => {}
                Ok((name, Err(e))) => {
                    if failure.is_none() {
                        failure = Some(format!(
                            "task {name:?}: {e} ({})",
                            cancel_error_status(&e).as_label()
                        ));
                    }
                }
                Err(e) => {
                    if failure.is_none() {
                        failure = Some(format!("cancel job failed: {e}"));
                    }
                }
            }
        }

        if let Some(reason) = failure {
            self.bus.publish(
                Event::new(EventKind::CancelAll)
                    .with_status(Status::OtherFailure)
                    .with_reason(reason),
            );
            return (Status::OtherFailure, HashMap::new());
        }

        for (name, status) in &skipped {
            self.bus.publish(
                Event::new(EventKind::CancelSkipped)
                    .with_task(name.as_str())
                    .with_status(*status),
            );
        }

        let status = if skipped.is_empty() {
            Status::AllAccepted
        } else {
            Status::PartiallyAccepted
        };
        self.bus
            .publish(Event::new(EventKind::CancelAll).with_status(status));
        (status, skipped)
    }

    /// Runs [`check_completion`](Self::check_completion)'s polling protocol for every
    /// registered task not named in `except`, sequentially.
    ///
    /// Each name maps to exactly one of `Completed`, `NotCompleted`, `HandleReleased`
    /// or `AggregatedFailure`.
    pub async fn check_all_completion(
        &self,
        except: &[&str],
        poll: PollOptions,
    ) -> HashMap<String, Status> {
        let entries = self.registry.snapshot(except).await;
        let mut out = HashMap::with_capacity(entries.len());

        for (name, record) in entries {
            let report = poll_completion(&name, record.work(), poll, &self.bus).await;
            out.insert(name, report.status);
        }

        let checked = u32::try_from(out.len()).unwrap_or(u32::MAX);
        self.bus
            .publish(Event::new(EventKind::CheckAllCompletion).with_attempt(checked));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::TaskError;
    use crate::tasks::{CancelHandle, CreationOptions, TaskFn, TaskRef, WorkStatus};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn until_cancelled() -> TaskRef {
        TaskFn::arc(|ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err::<(), _>(TaskError::Canceled)
        })
    }

    fn manager() -> Arc<TaskManager> {
        TaskManager::builder(Config::default()).build()
    }

    async fn register(m: &TaskManager, name: &str) -> CancelHandle {
        let handle = CancelHandle::new();
        let st = m
            .register(
                name,
                Some(until_cancelled()),
                Some(handle.clone()),
                CreationOptions::new(),
            )
            .await;
        assert_eq!(st, Status::Added);
        handle
    }

    async fn add_bare(m: &TaskManager, name: &str) {
        let record = TaskRecord::new(until_cancelled(), None, CreationOptions::new(), &m.cfg);
        assert!(m.registry().add(name, record).await);
    }

    #[tokio::test]
    async fn empty_registry_has_nothing_to_cancel() {
        let m = manager();
        let (st, map) = m.cancel_all(&[]).await;
        assert_eq!(st, Status::NoTasksToCancel);
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn exclusions_can_empty_the_snapshot() {
        let m = manager();
        let handle = register(&m, "keep").await;

        let (st, map) = m.cancel_all(&["keep"]).await;
        assert_eq!(st, Status::NoTasksToCancel);
        assert!(map.is_empty());
        assert!(!handle.is_cancelled());
    }

    #[tokio::test]
    async fn unstarted_tasks_are_all_accepted() {
        let m = manager();
        register(&m, "a").await;
        register(&m, "b").await;

        let (st, map) = m.cancel_all(&[]).await;
        assert_eq!(st, Status::AllAccepted);
        assert!(map.is_empty());

        let statuses = m.statuses().await;
        assert_eq!(statuses.len(), 2);
        assert!(statuses.values().all(|s| *s == WorkStatus::Canceled));
    }

    #[tokio::test]
    async fn handleless_task_is_partially_accepted() {
        let m = manager();
        add_bare(&m, "bare").await;
        let handle = register(&m, "ok").await;

        let (st, map) = m.cancel_all(&[]).await;
        assert_eq!(st, Status::PartiallyAccepted);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("bare"), Some(&Status::CancelHandleMissing));
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn completed_tasks_are_skipped() {
        let m = manager();
        register(&m, "done").await;
        m.cancel("done").await;
        register(&m, "live").await;
        m.start("live").await;

        let (st, map) = m.cancel_all(&[]).await;
        assert_eq!(st, Status::PartiallyAccepted);
        assert_eq!(map.get("done"), Some(&Status::Completed));
        assert!(!map.contains_key("live"));
    }

    #[tokio::test]
    async fn unexpected_failure_aborts_with_empty_map() {
        let m = manager();
        let handle = register(&m, "noisy").await;
        handle.on_cancel(|| Err("callback failed".to_string()));
        register(&m, "quiet").await;

        let (st, map) = m.cancel_all(&[]).await;
        assert_eq!(st, Status::OtherFailure);
        assert!(map.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn cancel_all_reports_each_name_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let m = manager();
        let hits = Arc::new(AtomicUsize::new(0));
        let mut live = 0;
        for i in 0..60 {
            let name = format!("task-{i}");
            match i % 3 {
                0 => add_bare(&m, &name).await,
                1 => {
                    register(&m, &name).await;
                    m.cancel(&name).await;
                }
                _ => {
                    let handle = register(&m, &name).await;
                    let hits = Arc::clone(&hits);
                    assert!(handle.on_cancel(move || {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }));
                    assert_eq!(m.start(&name).await, Status::Started);
                    live += 1;
                }
            }
        }

        let mut rx = m.bus.subscribe();
        let (st, map) = m.cancel_all(&[]).await;
        assert_eq!(st, Status::PartiallyAccepted);
        assert_eq!(map.len(), 40);
        for (name, status) in &map {
            let i: usize = name.trim_start_matches("task-").parse().unwrap();
            let expected = if i % 3 == 0 {
                Status::CancelHandleMissing
            } else {
                Status::Completed
            };
            assert_eq!(*status, expected, "{name}");
        }
        assert_eq!(hits.load(Ordering::SeqCst), live);

        let mut skipped_events = HashMap::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::CancelSkipped {
                let name = ev.task.as_deref().unwrap().to_string();
                *skipped_events.entry(name).or_insert(0) += 1;
            }
        }
        assert_eq!(skipped_events.len(), map.len());
        assert!(skipped_events.values().all(|n| *n == 1));
    }

    #[tokio::test]
    async fn check_all_reports_one_entry_per_name() {
        let m = manager();
        register(&m, "stopped").await;
        m.start("stopped").await;
        m.cancel("stopped").await;
        register(&m, "running").await;
        m.start("running").await;
        register(&m, "skipped").await;

        let out = m
            .check_all_completion(&["skipped"], PollOptions::new(0, Duration::from_millis(50)))
            .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out.get("stopped"), Some(&Status::Completed));
        assert_eq!(out.get("running"), Some(&Status::NotCompleted));
        assert!(!out.contains_key("skipped"));
    }
}
