//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources (manager, poller, work units).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                 Subscriber (one):
//!   TaskManager ──┐
//!   Poller ───────┼──► Bus ───────► listener ────► SubscriberSet
//!   WorkUnit N ───┘  (broadcast)   (spawned by builder)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active subscribers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately (send clones internally).
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub(crate) struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    ///
    /// If there are no receivers, the event is dropped (this function still returns immediately).
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn subscriber_sees_events_published_after_subscribe() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ClearAll));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::CancelAll).with_task("x"));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::CancelAll);
        assert_eq!(ev.task.as_deref(), Some("x"));
    }
}
