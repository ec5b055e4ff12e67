//! # Unit-of-work abstraction.
//!
//! This module defines the [`Task`] trait: the body of work a registered task executes.
//! The common handle type is [`TaskRef`], an `Arc<dyn Task>` suitable for sharing across the runtime.
//!
//! A task receives a [`CancellationToken`] and should periodically check it to
//! stop cooperatively when cancellation is requested.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// # Shared handle to a task body.
///
/// This is the type accepted by [`TaskManager::register`](crate::TaskManager::register).
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous, cancelable unit of work.
///
/// Implementors should regularly check cancellation and exit promptly once it is requested.
/// Returning `Err(TaskError::Canceled)` marks the unit as canceled rather than faulted.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use taskkeeper::{Task, TaskError};
///
/// struct Demo;
///
/// #[async_trait]
/// impl Task for Demo {
///     async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         // do work...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Executes the task until completion or cancellation.
    ///
    /// Implementations should check `ctx.is_cancelled()` and exit quickly to honor cancellation requests.
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError>;
}
