use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{manager::TaskManager, registry::Registry};
use crate::{
    config::Config,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`TaskManager`] with optional features.
pub struct TaskManagerBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    registry: Option<Arc<Registry>>,
}

impl TaskManagerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            registry: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive one event per operation outcome and per work-unit
    /// transition through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Uses an existing registry instead of a fresh one.
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Builds and returns the manager.
    ///
    /// This consumes the builder and initializes:
    /// - Event bus for broadcasting
    /// - Registry (fresh unless one was supplied)
    /// - Subscriber workers and the bus listener feeding them, stopped by
    ///   [`TaskManager::shutdown`] or when the manager is dropped
    ///
    /// # Panics
    /// With subscribers attached, must be called from within a tokio runtime.
    pub fn build(self) -> Arc<TaskManager> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let registry = self.registry.unwrap_or_else(Registry::new);
        let stop = CancellationToken::new();

        let set = SubscriberSet::new(self.subscribers, bus.clone());
        let subscriber_count = set.len();
        let listener = if set.is_empty() {
            None
        } else {
            Some(subscriber_listener(&bus, set, stop.clone()))
        };

        Arc::new(TaskManager::new_internal(
            self.cfg,
            registry,
            bus,
            subscriber_count,
            stop,
            listener,
        ))
    }
}

/// Forwards bus events to the subscriber set until `stop` is cancelled.
///
/// On stop, events already on the bus are still delivered, then the workers are
/// drained and joined.
fn subscriber_listener(bus: &Bus, set: SubscriberSet, stop: CancellationToken) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                recv = rx.recv() => match recv {
                    Ok(ev) => set.emit(ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
            }
        }
        loop {
            match rx.try_recv() {
                Ok(ev) => set.emit(ev),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        set.shutdown().await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::events::{Event, EventKind};
    use crate::status::Status;
    use crate::tasks::{CancelHandle, CreationOptions, TaskFn, TaskRef};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Collect {
        seen: Arc<Mutex<Vec<(EventKind, Option<Status>)>>>,
    }

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().unwrap().push((ev.kind, ev.status));
        }
        fn name(&self) -> &'static str {
            "collect"
        }
    }

    fn collector() -> (Arc<Collect>, Arc<Mutex<Vec<(EventKind, Option<Status>)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sub = Arc::new(Collect {
            seen: Arc::clone(&seen),
        });
        (sub, seen)
    }

    #[tokio::test]
    async fn subscribers_observe_operation_outcomes() {
        let (sub, seen) = collector();
        let m = TaskManager::builder(Config::default())
            .with_subscribers(vec![sub as Arc<dyn Subscribe>])
            .build();
        assert_eq!(m.subscriber_count(), 1);

        let work: TaskRef = TaskFn::arc(|_ctx: CancellationToken| async { Ok::<(), TaskError>(()) });
        m.register("w", Some(work), Some(CancelHandle::new()), CreationOptions::new())
            .await;
        m.register("", None, None, CreationOptions::new()).await;

        m.shutdown().await;
        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (EventKind::TaskRegister, Some(Status::Added)),
                (EventKind::TaskRegister, Some(Status::NameMissing)),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_releases_subscribers() {
        let (sub, seen) = collector();
        let m = TaskManager::builder(Config::default())
            .with_subscribers(vec![Arc::clone(&sub) as Arc<dyn Subscribe>])
            .build();
        assert_eq!(Arc::strong_count(&sub), 2);

        m.register("", None, None, CreationOptions::new()).await;
        m.shutdown().await;
        assert_eq!(Arc::strong_count(&sub), 1);
        assert_eq!(seen.lock().unwrap().len(), 1);

        // Later events go nowhere and a second shutdown returns at once.
        m.register("", None, None, CreationOptions::new()).await;
        m.shutdown().await;
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dropping_the_manager_stops_delivery() {
        let (sub, _seen) = collector();
        let m = TaskManager::builder(Config::default())
            .with_subscribers(vec![Arc::clone(&sub) as Arc<dyn Subscribe>])
            .build();
        m.register("", None, None, CreationOptions::new()).await;
        drop(m);

        for _ in 0..200 {
            if Arc::strong_count(&sub) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(Arc::strong_count(&sub), 1);
    }

    #[tokio::test]
    async fn managers_can_share_a_registry() {
        let registry = Registry::new();
        let a = TaskManager::builder(Config::default())
            .with_registry(Arc::clone(&registry))
            .build();
        let b = TaskManager::builder(Config::default())
            .with_registry(registry)
            .build();

        let work: TaskRef = TaskFn::arc(|_ctx: CancellationToken| async { Ok::<(), TaskError>(()) });
        a.register("shared", Some(work), Some(CancelHandle::new()), CreationOptions::new())
            .await;
        assert!(b.statuses().await.contains_key("shared"));
    }

    #[test]
    fn builds_without_runtime_when_no_subscribers() {
        let m = TaskManager::builder(Config::default()).build();
        assert_eq!(m.subscriber_count(), 0);
    }
}
