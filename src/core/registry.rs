//! # Task registry - concurrency-safe storage of task records.
//!
//! Owns the name → [`TaskRecord`] map and the FIFO queue of [`DisposalRecord`]s.
//!
//! ## Architecture
//! ```text
//! TaskManager ──► Registry
//!                   ├─► tasks:     RwLock<HashMap<String, TaskRecord>>
//!                   └─► disposals: Mutex<VecDeque<DisposalRecord>>
//! ```
//!
//! ## Rules
//! - Every single operation (add/get/remove/snapshot/enqueue/dequeue) is atomic
//! - Composite operations built on top of them are not transactional
//! - Snapshots are point-in-time copies; no live iterator is exposed
//! - Names are unique and case-sensitive; a rejected `add` leaves no trace

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::work::WorkUnit;
use crate::tasks::{CancelHandle, CreationOptions, TaskRef, WorkStatus};

/// One registered unit of work and its (optional) cancel handle.
///
/// Cloning is cheap: the work unit is shared, the cancel handle is reference counted.
#[derive(Clone, Debug)]
pub struct TaskRecord {
    work: Arc<WorkUnit>,
    cancel: Option<CancelHandle>,
}

impl TaskRecord {
    /// Builds a record for `task`, observing `cancel`'s token when present.
    ///
    /// A record without a cancel handle can never be cancelled; the manager's
    /// `register` always requires one, so such records only enter a registry
    /// through [`Registry::add`].
    pub fn new(
        task: TaskRef,
        cancel: Option<CancelHandle>,
        options: CreationOptions,
        cfg: &Config,
    ) -> Self {
        let token = cancel
            .as_ref()
            .map(CancelHandle::token)
            .unwrap_or_else(CancellationToken::new);
        let work = WorkUnit::new(task, token, options.resolve_timeout(cfg));
        Self {
            work: Arc::new(work),
            cancel,
        }
    }

    /// The wrapped work unit.
    pub fn work(&self) -> &Arc<WorkUnit> {
        &self.work
    }

    /// The stored cancel handle, if any.
    pub fn cancel_handle(&self) -> Option<&CancelHandle> {
        self.cancel.as_ref()
    }

    /// Current state of the work unit.
    pub fn status(&self) -> WorkStatus {
        self.work.status()
    }

    /// True once the work unit is terminal.
    pub fn is_complete(&self) -> bool {
        self.work.is_complete()
    }
}

/// Immutable snapshot produced when a task is deleted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisposalRecord {
    /// Name the task was registered under.
    pub task_name: String,
    /// Id of the work unit.
    pub task_id: u64,
    /// Final state of the work unit, rendered as a string.
    pub final_status: String,
    /// Always `true`: resources were released.
    pub disposed: bool,
    /// Capture time (UTC wall clock).
    pub timestamp: SystemTime,
}

impl DisposalRecord {
    /// Captures `record`'s current state under `name`.
    pub(crate) fn capture(name: &str, record: &TaskRecord) -> Self {
        Self {
            task_name: name.to_string(),
            task_id: record.work.id(),
            final_status: record.status().to_string(),
            disposed: true,
            timestamp: SystemTime::now(),
        }
    }
}

/// Concurrency-safe storage for task records and disposal records.
#[derive(Default)]
pub struct Registry {
    tasks: RwLock<HashMap<String, TaskRecord>>,
    disposals: Mutex<VecDeque<DisposalRecord>>,
}

impl Registry {
    /// Creates a new, empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Inserts `record` iff `name` is absent. Returns `false` on collision.
    pub async fn add(&self, name: &str, record: TaskRecord) -> bool {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(name) {
            return false;
        }
        tasks.insert(name.to_string(), record);
        true
    }

    /// Returns the record registered under `name`.
    pub async fn try_get(&self, name: &str) -> Option<TaskRecord> {
        self.tasks.read().await.get(name).cloned()
    }

    /// Atomically removes and returns the record registered under `name`.
    pub async fn remove(&self, name: &str) -> Option<TaskRecord> {
        self.tasks.write().await.remove(name)
    }

    /// Point-in-time copy of every entry whose name is not in `exclude`.
    pub async fn snapshot(&self, exclude: &[&str]) -> Vec<(String, TaskRecord)> {
        let exclude: HashSet<&str> = exclude.iter().copied().collect();
        let tasks = self.tasks.read().await;
        tasks
            .iter()
            .filter(|(name, _)| !exclude.contains(name.as_str()))
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect()
    }

    /// Returns sorted list of registered task names.
    pub async fn names(&self) -> Vec<String> {
        let tasks = self.tasks.read().await;
        let mut names: Vec<String> = tasks.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// True if no task is registered.
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Appends a disposal record to the queue.
    pub async fn enqueue_disposal(&self, record: DisposalRecord) {
        self.disposals.lock().await.push_back(record);
    }

    /// Pops the oldest disposal record.
    pub async fn dequeue_disposal(&self) -> Option<DisposalRecord> {
        self.disposals.lock().await.pop_front()
    }

    /// Best-effort teardown.
    ///
    /// For every entry: request cancellation if the unit is still running, release
    /// it if it is terminal. Individual failures are ignored. Both the map and the
    /// disposal queue end up empty regardless.
    pub async fn clear_all(&self) {
        for (_, record) in self.snapshot(&[]).await {
            let cancel = record.cancel_handle();
            if !record.is_complete() {
                if let Some(cancel) = cancel {
                    let _ = cancel.cancel();
                }
            }
            if record.is_complete() && record.work.release().is_ok() {
                if let Some(cancel) = cancel {
                    cancel.release();
                }
            }
        }

        self.tasks.write().await.clear();
        self.disposals.lock().await.clear();
    }
}
