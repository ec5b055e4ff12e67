//! # Task abstractions and capabilities.
//!
//! This module provides the task-related types:
//! - [`Task`] - trait for implementing async cancelable units of work
//! - [`TaskFn`] - function-backed task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`CancelHandle`] - shared cancellation capability
//! - [`CreationOptions`] - per-registration options
//! - [`WorkStatus`] - observable state of a work unit

mod cancel;
mod options;
mod status;
mod task;
mod task_fn;

pub use cancel::CancelHandle;
pub use options::CreationOptions;
pub use status::WorkStatus;
pub use task::{Task, TaskRef};
pub use task_fn::TaskFn;
