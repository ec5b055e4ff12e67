//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the per-subscriber delivery workers and,
//! behind the `logging` feature, the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//!   TaskManager ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                          ┌──────┼──────┐
//!                                                          ▼      ▼      ▼
//!                                                   LogWriter  Metrics  Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use taskkeeper::{Subscribe, Event, EventKind, Status};
//! use async_trait::async_trait;
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.status.is_some_and(|s| !s.is_success()) {
//!             // increment failure counter
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub(crate) use set::SubscriberSet;
pub use subscribe::Subscribe;
