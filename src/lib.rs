//! # taskkeeper
//!
//! **Taskkeeper** is a named task registry with lifecycle control for tokio.
//!
//! Units of work are registered under unique names together with a shared
//! cancel handle, then started, cancelled, polled for completion and deleted by
//! name. Every operation reports a closed [`Status`] instead of failing; the one
//! exception is deleting a task that is still running, which returns a
//! [`ManagerError`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller ──register/start/cancel/check/delete──► TaskManager
//!                                                     │
//!            ┌────────────────────────────────────────┼──────────────────────┐
//!            ▼                                        ▼                      ▼
//! ┌─────────────────────┐              ┌──────────────────────────┐   ┌─────────────┐
//! │ Registry            │              │ WorkUnit (per record)    │   │ Bus         │
//! │ - name → TaskRecord │              │ - TaskRef + token        │   │ (broadcast) │
//! │ - disposal FIFO     │              │ - watch<WorkStatus>      │   └──────┬──────┘
//! └─────────────────────┘              │ - run_once on tokio      │          ▼
//!                                      └──────────────────────────┘   listener
//!                                                 ▲                  ┌──────┼──────┐
//!             CancelHandle (shared with caller) ──┘                  ▼      ▼      ▼
//!                                                                 LogWriter  ...  custom
//! ```
//!
//! ### Lifecycle
//! ```text
//! register ──► Created ──start──► Running ──► Completed | Canceled | Faulted ──delete──► gone
//!                 │                                                              │
//!                 └── cancel before start ──► Canceled                  DisposalRecord (optional)
//! ```
//!
//! ## Features
//! | Area              | Description                                                         | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------------|---------------------------------------------|
//! | **Lifecycle**     | Register, start, cancel, poll and delete tasks by name.             | [`TaskManager`], [`Status`]                 |
//! | **Bulk ops**      | Cancel or check every task except a named few.                      | [`TaskManager::cancel_all`]                 |
//! | **Storage**       | Concurrency-safe records and the disposal queue.                    | [`Registry`], [`TaskRecord`], [`DisposalRecord`] |
//! | **Tasks**         | Define units of work as closures or trait objects.                  | [`Task`], [`TaskFn`], [`TaskRef`]           |
//! | **Cancellation**  | Shared, releasable cancel handles with callbacks.                   | [`CancelHandle`]                            |
//! | **Subscriber API**| Hook into operation outcomes and work transitions.                  | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for task bodies, capabilities and manager faults.      | [`TaskError`], [`ManagerError`]             |
//! | **Configuration** | Bus capacity, polling budget, default run timeout.                  | [`Config`], [`PollOptions`]                 |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber backed by `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use taskkeeper::{CancelHandle, Config, CreationOptions, Status, TaskFn, TaskManager, TaskRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn taskkeeper::Subscribe>> = vec![Arc::new(taskkeeper::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn taskkeeper::Subscribe>> = Vec::new();
//!
//!     let manager = TaskManager::builder(Config::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let hello: TaskRef = TaskFn::arc(|_ctx: CancellationToken| async move {
//!         println!("Hello from task!");
//!         Ok::<(), taskkeeper::TaskError>(())
//!     });
//!     let cancel = CancelHandle::new();
//!
//!     manager
//!         .register("hello", Some(hello), Some(cancel), CreationOptions::new())
//!         .await;
//!     assert_eq!(manager.start("hello").await, Status::Started);
//!
//!     let poll = manager.poll_options();
//!     assert_eq!(manager.check_completion("hello", poll).await, Status::Completed);
//!     assert_eq!(manager.delete("hello", false).await, Ok(Status::Deleted));
//!
//!     manager.shutdown().await;
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod status;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use config::{Config, PollOptions};
pub use crate::core::{DisposalRecord, Registry, TaskManager, TaskManagerBuilder, TaskRecord, WorkUnit};
pub use error::{CancelError, ManagerError, ReleaseError, StartError, TaskError};
pub use events::{Event, EventKind};
pub use status::{Severity, Status};
pub use subscribers::Subscribe;
pub use tasks::{CancelHandle, CreationOptions, Task, TaskFn, TaskRef, WorkStatus};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
