//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a fresh
//! future per run. No hidden mutation happens between runs; shared state must be
//! captured explicitly (e.g. through an `Arc<...>` inside the closure).
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use taskkeeper::{TaskFn, TaskRef, TaskError};
//!
//! let t: TaskRef = TaskFn::arc(|ctx: CancellationToken| async move {
//!     if ctx.is_cancelled() {
//!         return Err(TaskError::Canceled);
//!     }
//!     // do work...
//!     Ok::<_, TaskError>(())
//! });
//! # let _ = t;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::Task;

/// Function-backed task implementation.
///
/// Wraps a closure that *creates* a new future per run.
#[derive(Debug)]
pub struct TaskFn<F> {
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        (self.f)(ctx).await
    }
}
