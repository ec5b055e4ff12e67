//! # Per-subscriber delivery workers.
//!
//! [`SubscriberSet`] is owned by the manager's bus listener. Every attached
//! [`Subscribe`] implementation gets its own bounded queue and worker task, so one
//! slow subscriber only ever delays itself.
//!
//! ```text
//! listener ──emit(ev)──┬──► queue("LogWriter") ──► worker ──► on_event
//!                      └──► queue("audit")     ──► worker ──► on_event
//!                               │ full/closed
//!                               └──► Bus: SubscriberOverflow
//! ```
//!
//! ## Rules
//! - `emit` never waits: a full queue drops the event for that subscriber only
//! - A panicking `on_event` is reported as `SubscriberPanicked`; the worker keeps going
//! - `shutdown` closes every queue and waits until workers drained what was queued

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Queue and worker of one subscriber.
struct Worker {
    name: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
    handle: JoinHandle<()>,
}

/// Delivery workers for every subscriber attached to a manager.
pub(crate) struct SubscriberSet {
    workers: Vec<Worker>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber. Must run inside a tokio runtime unless `subs` is empty.
    pub(crate) fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let workers = subs
            .into_iter()
            .map(|sub| spawn_worker(sub, bus.clone()))
            .collect();
        Self { workers, bus }
    }

    /// Queues `ev` for every subscriber.
    pub(crate) fn emit(&self, ev: Event) {
        let shared = Arc::new(ev);
        let reportable = shared.kind != EventKind::SubscriberOverflow;

        for worker in &self.workers {
            let reason = match worker.queue.try_send(Arc::clone(&shared)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if reportable {
                self.bus
                    .publish(Event::subscriber_overflow(worker.name, reason));
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    /// Closes every queue and waits for the workers to finish their backlog.
    pub(crate) async fn shutdown(self) {
        let mut handles = Vec::with_capacity(self.workers.len());
        for Worker { queue, handle, .. } in self.workers {
            drop(queue);
            handles.push(handle);
        }
        for handle in handles {
            let _ = handle.await;
        }
    }
}

fn spawn_worker(sub: Arc<dyn Subscribe>, bus: Bus) -> Worker {
    let name = sub.name();
    let (queue, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));

    let handle = tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            let delivered = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await;
            if let Err(payload) = delivered {
                bus.publish(Event::subscriber_panicked(name, panic_message(&*payload)));
            }
        }
    });

    Worker {
        name,
        queue,
        handle,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Recorder {
        seen: Arc<Mutex<Vec<EventKind>>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().unwrap().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Exploder;

    #[async_trait]
    impl Subscribe for Exploder {
        async fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "exploder"
        }
    }

    struct Sluggish;

    #[async_trait]
    impl Subscribe for Sluggish {
        async fn on_event(&self, _ev: &Event) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        fn name(&self) -> &'static str {
            "sluggish"
        }
        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn delivers_in_order_and_reports_panics() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let set = SubscriberSet::new(
            vec![
                Arc::new(Recorder {
                    seen: Arc::clone(&seen),
                }),
                Arc::new(Exploder),
            ],
            bus.clone(),
        );
        assert_eq!(set.len(), 2);

        set.emit(Event::new(EventKind::TaskRegister));
        set.emit(Event::new(EventKind::TaskStart));

        let panicked = rx.recv().await.unwrap();
        assert_eq!(panicked.kind, EventKind::SubscriberPanicked);
        assert_eq!(panicked.task.as_deref(), Some("exploder"));
        assert_eq!(panicked.reason.as_deref(), Some("boom"));

        set.shutdown().await;
        assert_eq!(
            *seen.lock().unwrap(),
            vec![EventKind::TaskRegister, EventKind::TaskStart]
        );
    }

    #[tokio::test]
    async fn full_queue_drops_and_reports_overflow() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Sluggish)], bus.clone());

        for _ in 0..4 {
            set.emit(Event::new(EventKind::ClearAll));
        }

        let overflow = rx.recv().await.unwrap();
        assert_eq!(overflow.kind, EventKind::SubscriberOverflow);
        assert_eq!(overflow.task.as_deref(), Some("sluggish"));
        set.shutdown().await;
    }

    #[test]
    fn empty_set_needs_no_runtime() {
        let set = SubscriberSet::new(Vec::new(), Bus::new(1));
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }
}
