//! # Work unit: one task body bound to a cancellation token.
//!
//! A [`WorkUnit`] owns the [`TaskRef`] registered under a name and tracks its
//! [`WorkStatus`] in a `watch` channel, so completion can be awaited natively
//! instead of sampled in a loop.
//!
//! ## Capabilities
//! - `start`: `Created → Running`, spawns the body on the ambient tokio runtime
//! - `status` / `is_complete`: current state (settles never-started cancelled units)
//! - `release`: marks resources released; only allowed once terminal
//! - `wait_complete`: resolves once terminal (or already released)
//!
//! ## Rules
//! - A unit whose token is cancelled while still `Created` becomes `Canceled` without running.
//! - `start` succeeds at most once; later calls see `InvalidState`.
//! - `release` of a non-terminal unit is rejected; the caller decides how to surface it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::core::runner::{publish_finished, run_once};
use crate::error::{ReleaseError, StartError};
use crate::events::Bus;
use crate::tasks::{TaskRef, WorkStatus};

/// Process-wide id counter for work units.
static WORK_ID: AtomicU64 = AtomicU64::new(1);

/// What a completion waiter observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settled {
    /// The unit reached a terminal state.
    Completed,
    /// The unit's resources were released.
    Released,
}

/// Executable unit of work wrapped by a task record.
pub struct WorkUnit {
    id: u64,
    task: TaskRef,
    token: CancellationToken,
    timeout: Option<Duration>,
    state: Arc<watch::Sender<WorkStatus>>,
    released: AtomicBool,
}

impl WorkUnit {
    /// Binds `task` to `token`; the unit starts in [`WorkStatus::Created`].
    pub(crate) fn new(task: TaskRef, token: CancellationToken, timeout: Option<Duration>) -> Self {
        let (state, _rx) = watch::channel(WorkStatus::Created);
        Self {
            id: WORK_ID.fetch_add(1, Ordering::Relaxed),
            task,
            token,
            timeout,
            state: Arc::new(state),
            released: AtomicBool::new(false),
        }
    }

    /// Process-unique, monotonically assigned id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current state.
    pub fn status(&self) -> WorkStatus {
        self.settle_unstarted();
        *self.state.borrow()
    }

    /// True once the unit is `Completed`, `Canceled` or `Faulted`.
    pub fn is_complete(&self) -> bool {
        self.status().is_terminal()
    }

    /// True once [`release`](Self::release) succeeded.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Moves a never-started unit to `Canceled` once its token is cancelled.
    fn settle_unstarted(&self) {
        if self.token.is_cancelled() {
            self.state.send_if_modified(|s| {
                if *s == WorkStatus::Created {
                    *s = WorkStatus::Canceled;
                    true
                } else {
                    false
                }
            });
        }
    }

    /// Spawns the body on the current tokio runtime.
    pub(crate) fn start(&self, name: &str, bus: &Bus) -> Result<(), StartError> {
        if self.is_released() {
            return Err(StartError::Released);
        }
        let runtime = Handle::try_current().map_err(|e| StartError::Runtime {
            reason: e.to_string(),
        })?;

        self.settle_unstarted();
        let mut observed = WorkStatus::Created;
        let claimed = self.state.send_if_modified(|s| {
            observed = *s;
            if *s == WorkStatus::Created {
                *s = WorkStatus::Running;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(StartError::InvalidState { status: observed });
        }

        let task = Arc::clone(&self.task);
        let token = self.token.clone();
        let state = Arc::clone(&self.state);
        let timeout = self.timeout;
        let bus = bus.clone();
        let name = name.to_string();

        runtime.spawn(async move {
            let outcome = run_once(task.as_ref(), &token, timeout, &name, &bus).await;
            state.send_replace(outcome.status);
            publish_finished(&bus, &name, &outcome);
        });
        Ok(())
    }

    /// Marks the unit's resources released. Fails unless the unit is terminal.
    pub(crate) fn release(&self) -> Result<(), ReleaseError> {
        let status = self.status();
        if !status.is_terminal() {
            return Err(ReleaseError::InvalidState { status });
        }
        self.released.store(true, Ordering::Release);
        Ok(())
    }

    /// Resolves once the unit is terminal, or immediately if it was released.
    pub(crate) async fn wait_complete(&self) -> Settled {
        let mut rx = self.state.subscribe();
        loop {
            if self.is_released() {
                return Settled::Released;
            }
            self.settle_unstarted();
            let status = *rx.borrow_and_update();
            if status.is_terminal() {
                return Settled::Completed;
            }

            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Settled::Released;
                    }
                }
                _ = self.token.cancelled(), if status == WorkStatus::Created => {}
            }
        }
    }
}

impl std::fmt::Debug for WorkUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkUnit")
            .field("id", &self.id)
            .field("status", &*self.state.borrow())
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::tasks::TaskFn;

    fn until_cancelled() -> TaskRef {
        TaskFn::arc(|ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err::<(), _>(TaskError::Canceled)
        })
    }

    #[tokio::test]
    async fn start_once_then_invalid_state() {
        let bus = Bus::new(8);
        let token = CancellationToken::new();
        let unit = WorkUnit::new(until_cancelled(), token.clone(), None);

        assert_eq!(unit.status(), WorkStatus::Created);
        assert!(unit.start("w", &bus).is_ok());
        assert_eq!(
            unit.start("w", &bus),
            Err(StartError::InvalidState {
                status: WorkStatus::Running
            })
        );

        token.cancel();
        assert_eq!(unit.wait_complete().await, Settled::Completed);
        assert_eq!(unit.status(), WorkStatus::Canceled);
    }

    #[tokio::test]
    async fn cancelled_before_start_is_terminal() {
        let bus = Bus::new(8);
        let token = CancellationToken::new();
        let unit = WorkUnit::new(until_cancelled(), token.clone(), None);

        token.cancel();
        assert_eq!(unit.status(), WorkStatus::Canceled);
        assert_eq!(
            unit.start("w", &bus),
            Err(StartError::InvalidState {
                status: WorkStatus::Canceled
            })
        );
    }

    #[tokio::test]
    async fn waiting_unstarted_unit_wakes_on_cancel() {
        let token = CancellationToken::new();
        let unit = Arc::new(WorkUnit::new(until_cancelled(), token.clone(), None));

        let waiter = tokio::spawn({
            let unit = Arc::clone(&unit);
            async move { unit.wait_complete().await }
        });
        tokio::task::yield_now().await;
        token.cancel();

        assert_eq!(waiter.await.unwrap(), Settled::Completed);
    }

    #[tokio::test]
    async fn release_requires_terminal_state() {
        let token = CancellationToken::new();
        let unit = WorkUnit::new(until_cancelled(), token.clone(), None);

        assert_eq!(
            unit.release(),
            Err(ReleaseError::InvalidState {
                status: WorkStatus::Created
            })
        );

        token.cancel();
        assert!(unit.release().is_ok());
        assert!(unit.is_released());
        assert_eq!(unit.wait_complete().await, Settled::Released);
        assert_eq!(unit.start("w", &Bus::new(1)), Err(StartError::Released));
    }

    #[test]
    fn start_without_runtime_fails() {
        let unit = WorkUnit::new(until_cancelled(), CancellationToken::new(), None);
        let err = unit.start("w", &Bus::new(1)).unwrap_err();
        assert_eq!(err.as_label(), "start_runtime");
        assert_eq!(unit.status(), WorkStatus::Created);
    }

    #[test]
    fn ids_are_unique() {
        let a = WorkUnit::new(until_cancelled(), CancellationToken::new(), None);
        let b = WorkUnit::new(until_cancelled(), CancellationToken::new(), None);
        assert_ne!(a.id(), b.id());
    }
}
