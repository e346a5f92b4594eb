//! # World Events
//!
//! One-shot notifications the transaction manager emits for observers
//! (renderers, UIs, tests). Delivered over a crossbeam channel; every
//! subscriber receives every event sent after it subscribed.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

use bricklayer_core::XaId;

/// Something observers may want to react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorldEvent {
    /// World contents changed (after a replayed transaction or an offline op).
    WorldChanged,
    /// The server refused one of our submissions.
    Conflict,
    /// A server transaction was applied; carries its op lines.
    TransactionProcessed {
        /// Server id of the transaction.
        xa_id: XaId,
        /// Serialized ops.
        ops: String,
    },
}

/// Fan-out event channel.
///
/// Each subscriber owns an unbounded receiver; disconnected subscribers are
/// pruned on the next send.
#[derive(Default)]
pub struct EventChannel {
    subscribers: Mutex<Vec<Sender<WorldEvent>>>,
}

impl EventChannel {
    /// Creates a channel with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> Receiver<WorldEvent> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(sender);
        receiver
    }

    /// Sends an event to every live subscriber (never blocks).
    pub fn send(&self, event: &WorldEvent) {
        self.subscribers.lock().retain(|s| s.send(event.clone()).is_ok());
    }

    /// Number of live subscribers as of the last send.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// Drains everything currently queued on `receiver`.
pub fn drain(receiver: &Receiver<WorldEvent>) -> Vec<WorldEvent> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => return events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_sees_every_event() {
        let channel = EventChannel::new();
        let a = channel.subscribe();
        let b = channel.subscribe();

        channel.send(&WorldEvent::WorldChanged);
        channel.send(&WorldEvent::Conflict);

        assert_eq!(drain(&a), vec![WorldEvent::WorldChanged, WorldEvent::Conflict]);
        assert_eq!(drain(&b), vec![WorldEvent::WorldChanged, WorldEvent::Conflict]);
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let channel = EventChannel::new();
        let keep = channel.subscribe();
        drop(channel.subscribe());
        channel.send(&WorldEvent::WorldChanged);
        assert_eq!(channel.subscriber_count(), 1);
        assert_eq!(drain(&keep).len(), 1);
    }
}
