//! Manager core: registry, work units and lifecycle control.
//!
//! The public API from this module is [`TaskManager`] (built through
//! [`TaskManagerBuilder`]) plus the storage types it operates on.
//!
//! Internal modules:
//! - [`runner`]: executes one work-unit body with timeout/panic isolation and event publishing;
//! - [`work`]: the work unit state machine (`Created → Running → terminal`);
//! - [`registry`]: concurrency-safe storage of task and disposal records;
//! - [`poll`]: bounded completion polling over native waits;
//! - [`manager`]: single-task lifecycle operations;
//! - [`bulk`]: `cancel_all` and `check_all_completion`;
//! - [`builder`]: wiring of bus, subscribers and registry.

mod builder;
mod bulk;
mod manager;
mod poll;
mod registry;
mod runner;
mod work;

pub use builder::TaskManagerBuilder;
pub use manager::TaskManager;
pub use registry::{DisposalRecord, Registry, TaskRecord};
pub use work::WorkUnit;
