//! # Shared cancellation handle.
//!
//! [`CancelHandle`] is the capability used to request cooperative cancellation of a
//! work unit. It wraps a [`CancellationToken`] together with a shared "released" flag
//! and a list of one-shot cancellation callbacks.
//!
//! ## Rules
//! - Cloning is cheap; every clone has equal standing (caller and registry alike).
//! - `cancel()` is idempotent: the token stays cancelled, callbacks run only once.
//! - After `release()` every clone reports [`CancelError::Released`] on `cancel()`.
//! - Callback failures (errors or panics) are aggregated into [`CancelError::Callbacks`];
//!   the token is cancelled regardless.
//! - Registering a callback and cancelling are serialized on the callback lock, so a
//!   callback accepted by `on_cancel` always runs exactly once.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::error::CancelError;

type Callback = Box<dyn FnOnce() -> Result<(), String> + Send + 'static>;

struct Shared {
    released: AtomicBool,
    callbacks: Mutex<Vec<Callback>>,
}

/// Reference-counted cancellation capability.
///
/// ## Example
/// ```rust
/// use taskkeeper::CancelHandle;
///
/// let handle = CancelHandle::new();
/// let theirs = handle.clone();
/// theirs.cancel().unwrap();
/// assert!(handle.is_cancelled());
/// ```
#[derive(Clone)]
pub struct CancelHandle {
    token: CancellationToken,
    shared: Arc<Shared>,
}

impl CancelHandle {
    /// Creates a new, uncancelled handle.
    pub fn new() -> Self {
        Self::from_token(CancellationToken::new())
    }

    /// Wraps an existing token (e.g. a child of an application-wide token).
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            shared: Arc::new(Shared {
                released: AtomicBool::new(false),
                callbacks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns a clone of the underlying token, to be observed by the work unit.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// True once cancellation has been requested through any clone.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the handle has been released.
    pub fn is_released(&self) -> bool {
        self.shared.released.load(Ordering::Acquire)
    }

    /// Registers a callback that runs on the first cancellation request.
    ///
    /// Returns `false`, dropping the callback without running it, if the handle was
    /// already cancelled or released.
    pub fn on_cancel<F>(&self, f: F) -> bool
    where
        F: FnOnce() -> Result<(), String> + Send + 'static,
    {
        let mut callbacks = self.callbacks();
        if self.token.is_cancelled() || self.is_released() {
            return false;
        }
        callbacks.push(Box::new(f));
        true
    }

    fn callbacks(&self) -> MutexGuard<'_, Vec<Callback>> {
        self.shared
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests cancellation.
    ///
    /// Returns immediately; the work unit must observe the token and stop on its own.
    pub fn cancel(&self) -> Result<(), CancelError> {
        if self.is_released() {
            return Err(CancelError::Released);
        }

        let callbacks = {
            let mut guard = self.callbacks();
            self.token.cancel();
            std::mem::take(&mut *guard)
        };

        let errors: Vec<String> = callbacks
            .into_iter()
            .filter_map(|cb| match catch_unwind(AssertUnwindSafe(cb)) {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(_) => Some("callback panicked".to_string()),
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CancelError::Callbacks { errors })
        }
    }

    /// Releases the handle; subsequent `cancel()` calls on any clone fail with `Released`.
    ///
    /// Pending callbacks are dropped. Idempotent.
    pub fn release(&self) {
        let mut callbacks = self.callbacks();
        self.shared.released.store(true, Ordering::Release);
        callbacks.clear();
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .field("released", &self.is_released())
            .finish()
    }
}
