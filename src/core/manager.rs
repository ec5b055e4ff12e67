//! # TaskManager: named lifecycle control over registered work units.
//!
//! The [`TaskManager`] validates inputs, drives work units and cancel handles stored in
//! the [`Registry`], and reports every outcome as a [`Status`]. One [`Event`] is
//! published per operation so subscribers can observe the lifecycle.
//!
//! ## Lifecycle
//! ```text
//! Unregistered ──register──► Registered ──start──► Running ──► Completed | Canceled | Faulted
//!                                 │                                        │
//!                                 └──cancel (never started) ──► Canceled   └──delete──► Deleted
//! ```
//!
//! ## Validation order
//! Every single-task operation checks, short-circuiting on the first failure:
//! 1. name non-empty      → else `NameMissing`
//! 2. record present      → else `TaskNotFound`
//! 3. operation specific  (cancel handle present, startable state, ...)
//!
//! ## Rules
//! - Outcomes are statuses; only `delete` of a non-terminal unit returns `Err`
//! - `start` and `cancel` never block; `check_completion` blocks for its polling budget
//! - A deleted name may be registered again and yields a fresh record
//! - [`TaskManager::shutdown`] flushes and stops subscriber delivery; dropping the
//!   manager stops it without waiting
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use taskkeeper::{
//!     CancelHandle, Config, CreationOptions, PollOptions, Status, TaskError, TaskFn, TaskManager,
//!     TaskRef,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let manager = TaskManager::builder(Config::default()).build();
//!     let work: TaskRef = TaskFn::arc(|ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!         Err::<(), _>(TaskError::Canceled)
//!     });
//!
//!     let st = manager
//!         .register("worker", Some(work), Some(CancelHandle::new()), CreationOptions::new())
//!         .await;
//!     assert_eq!(st, Status::Added);
//!     assert_eq!(manager.start("worker").await, Status::Started);
//!     assert_eq!(manager.cancel("worker").await, Status::Canceled);
//!
//!     let poll = PollOptions::new(3, Duration::from_secs(1));
//!     assert_eq!(manager.check_completion("worker", poll).await, Status::Completed);
//!     assert_eq!(manager.delete("worker", true).await, Ok(Status::Deleted));
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, PollOptions};
use crate::core::builder::TaskManagerBuilder;
use crate::core::poll::poll_completion;
use crate::core::registry::{DisposalRecord, Registry, TaskRecord};
use crate::error::{CancelError, ManagerError, StartError};
use crate::events::{Bus, Event, EventKind};
use crate::status::Status;
use crate::tasks::{CancelHandle, CreationOptions, TaskRef, WorkStatus};

/// Lifecycle controller over a [`Registry`] of named tasks.
pub struct TaskManager {
    /// Manager configuration.
    pub cfg: Config,
    pub(crate) registry: Arc<Registry>,
    pub(crate) bus: Bus,
    subscribers: usize,
    stop: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl TaskManager {
    /// Starts building a manager with the given configuration.
    pub fn builder(cfg: Config) -> TaskManagerBuilder {
        TaskManagerBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        registry: Arc<Registry>,
        bus: Bus,
        subscribers: usize,
        stop: CancellationToken,
        listener: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            cfg,
            registry,
            bus,
            subscribers,
            stop,
            listener: Mutex::new(listener),
        }
    }

    /// The registry backing this manager.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Polling budget configured as the default for completion checks.
    pub fn poll_options(&self) -> PollOptions {
        self.cfg.poll
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
    }

    /// Stops subscriber delivery.
    ///
    /// Events published before the call are still handed to every subscriber; the
    /// call returns once their workers have drained and exited. Events published
    /// afterwards are not delivered. Registered tasks are left alone, use
    /// [`clear_all`](Self::clear_all) for those. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        self.stop.cancel();
        let mut listener = self.listener.lock().await;
        if let Some(handle) = listener.take() {
            let _ = handle.await;
        }
    }

    /// Publishes the outcome of a single-task operation and returns its status.
    pub(crate) fn report(&self, kind: EventKind, name: &str, status: Status) -> Status {
        self.bus
            .publish(Event::new(kind).with_task(name).with_status(status));
        status
    }

    fn report_with_reason(
        &self,
        kind: EventKind,
        name: &str,
        status: Status,
        reason: impl Into<Arc<str>>,
    ) -> Status {
        self.bus.publish(
            Event::new(kind)
                .with_task(name)
                .with_status(status)
                .with_reason(reason),
        );
        status
    }

    /// Resolves `name` to its record, or the validation status that rejects it.
    async fn lookup(&self, name: &str) -> Result<TaskRecord, Status> {
        if name.is_empty() {
            return Err(Status::NameMissing);
        }
        self.registry.try_get(name).await.ok_or(Status::TaskNotFound)
    }

    /// Registers `work` under `name`, bound to `cancel`.
    ///
    /// The unit is created but not started. Fails with `NameMissing`, `WorkMissing`,
    /// `CancelHandleMissing` (checked in that order) or `AlreadyRegistered`.
    pub async fn register(
        &self,
        name: &str,
        work: Option<TaskRef>,
        cancel: Option<CancelHandle>,
        options: CreationOptions,
    ) -> Status {
        let status = match (name.is_empty(), work, cancel) {
            (true, _, _) => Status::NameMissing,
            (false, None, _) => Status::WorkMissing,
            (false, Some(_), None) => Status::CancelHandleMissing,
            (false, Some(work), Some(cancel)) => {
                let record = TaskRecord::new(work, Some(cancel), options, &self.cfg);
                if self.registry.add(name, record).await {
                    Status::Added
                } else {
                    Status::AlreadyRegistered
                }
            }
        };
        self.report(EventKind::TaskRegister, name, status)
    }

    /// Starts the unit registered under `name` on the ambient tokio runtime.
    ///
    /// Returns `Started`, `HandleReleased`, `InvalidStateForStart` (already started or
    /// terminal) or `OtherFailure` (e.g. no runtime).
    pub async fn start(&self, name: &str) -> Status {
        let record = match self.lookup(name).await {
            Ok(record) => record,
            Err(status) => return self.report(EventKind::TaskStart, name, status),
        };

        match record.work().start(name, &self.bus) {
            Ok(()) => self.report(EventKind::TaskStart, name, Status::Started),
            Err(e) => {
                let status = match e {
                    StartError::Released => Status::HandleReleased,
                    StartError::InvalidState { .. } => Status::InvalidStateForStart,
                    StartError::Runtime { .. } => Status::OtherFailure,
                };
                self.report_with_reason(EventKind::TaskStart, name, status, e.to_string())
            }
        }
    }

    /// Returns the cancel handle stored for `name`.
    ///
    /// The returned handle is a clone of equal standing with the stored one.
    pub async fn cancel_handle(&self, name: &str) -> (Status, Option<CancelHandle>) {
        let record = match self.lookup(name).await {
            Ok(record) => record,
            Err(status) => return (self.report(EventKind::TaskCancelHandle, name, status), None),
        };

        match record.cancel_handle() {
            Some(handle) => (
                self.report(EventKind::TaskCancelHandle, name, Status::CancelHandleObtained),
                Some(handle.clone()),
            ),
            None => (
                self.report(EventKind::TaskCancelHandle, name, Status::CancelHandleMissing),
                None,
            ),
        }
    }

    /// Requests cooperative cancellation of `name`. Returns without waiting.
    ///
    /// Repeated calls keep reporting `Canceled`.
    pub async fn cancel(&self, name: &str) -> Status {
        let record = match self.lookup(name).await {
            Ok(record) => record,
            Err(status) => return self.report(EventKind::TaskCancel, name, status),
        };
        let Some(handle) = record.cancel_handle() else {
            return self.report(EventKind::TaskCancel, name, Status::CancelHandleMissing);
        };

        match handle.cancel() {
            Ok(()) => self.report(EventKind::TaskCancel, name, Status::Canceled),
            Err(e) => {
                let status = cancel_error_status(&e);
                self.report_with_reason(EventKind::TaskCancel, name, status, e.to_string())
            }
        }
    }

    /// Polls `name` for completion within the `poll` budget.
    ///
    /// Returns `Completed`, `NotCompleted`, `HandleReleased` or `AggregatedFailure`.
    pub async fn check_completion(&self, name: &str, poll: PollOptions) -> Status {
        let record = match self.lookup(name).await {
            Ok(record) => record,
            Err(status) => return self.report(EventKind::TaskCompletionCheck, name, status),
        };

        let report = poll_completion(name, record.work(), poll, &self.bus).await;
        let mut ev = Event::new(EventKind::TaskCompletionCheck)
            .with_task(name)
            .with_status(report.status)
            .with_attempt(report.attempts);
        if let Some(reason) = report.reason {
            ev = ev.with_reason(reason);
        }
        self.bus.publish(ev);
        report.status
    }

    /// Deletes `name`, releasing its work unit and cancel handle.
    ///
    /// When `push_disposal` is set, a [`DisposalRecord`] is queued for
    /// [`dequeue_disposal_record`](Self::dequeue_disposal_record).
    ///
    /// # Errors
    /// Returns [`ManagerError::InvalidState`] if the work unit is not terminal; the
    /// record stays registered.
    pub async fn delete(&self, name: &str, push_disposal: bool) -> Result<Status, ManagerError> {
        let record = match self.lookup(name).await {
            Ok(record) => record,
            Err(status) => return Ok(self.report(EventKind::TaskDelete, name, status)),
        };

        if let Err(e) = record.work().release() {
            let status = record.status();
            self.bus.publish(
                Event::new(EventKind::TaskDelete)
                    .with_task(name)
                    .with_work_status(status)
                    .with_reason(e.to_string()),
            );
            return Err(ManagerError::InvalidState {
                task: name.to_string(),
                status,
            });
        }
        if let Some(handle) = record.cancel_handle() {
            handle.release();
        }

        let Some(removed) = self.registry.remove(name).await else {
            return Ok(self.report(EventKind::TaskDelete, name, Status::TaskNotFound));
        };

        let disposal = DisposalRecord::capture(name, &removed);
        let final_status = removed.status();
        if push_disposal {
            self.registry.enqueue_disposal(disposal).await;
        }

        self.bus.publish(
            Event::new(EventKind::TaskDelete)
                .with_task(name)
                .with_status(Status::Deleted)
                .with_work_status(final_status),
        );
        Ok(Status::Deleted)
    }

    /// Pops the oldest queued disposal record.
    pub async fn dequeue_disposal_record(&self) -> (Status, Option<DisposalRecord>) {
        match self.registry.dequeue_disposal().await {
            Some(record) => {
                self.bus.publish(
                    Event::new(EventKind::DisposalDequeue)
                        .with_task(record.task_name.as_str())
                        .with_status(Status::ObjectDequeued),
                );
                (Status::ObjectDequeued, Some(record))
            }
            None => {
                self.bus.publish(
                    Event::new(EventKind::DisposalDequeue).with_status(Status::ObjectNotFound),
                );
                (Status::ObjectNotFound, None)
            }
        }
    }

    /// Current [`WorkStatus`] of every registered task.
    pub async fn statuses(&self) -> HashMap<String, WorkStatus> {
        self.registry
            .snapshot(&[])
            .await
            .into_iter()
            .map(|(name, record)| {
                let status = record.status();
                (name, status)
            })
            .collect()
    }

    /// Best-effort teardown: cancels running units, releases terminal ones and
    /// empties the registry and the disposal queue.
    pub async fn clear_all(&self) {
        self.registry.clear_all().await;
        self.bus.publish(Event::new(EventKind::ClearAll));
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Maps a cancel-handle failure to the status reported for it.
pub(crate) fn cancel_error_status(e: &CancelError) -> Status {
    match e {
        CancelError::Released => Status::HandleReleased,
        CancelError::Callbacks { .. } => Status::AggregatedFailure,
    }
}
