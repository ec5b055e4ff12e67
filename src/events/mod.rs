//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the task manager, the completion
//! poller, work units and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `TaskManager`, `runner::run_once`, completion poller,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the listener spawned by `TaskManagerBuilder::build`, which fans
//!   out to the `SubscriberSet`.

mod bus;
mod event;

pub(crate) use bus::Bus;
pub use event::{Event, EventKind};
