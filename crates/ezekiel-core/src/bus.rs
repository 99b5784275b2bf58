use tokio::sync::broadcast;

use crate::lock::Lock;

const CHANNEL_CAPACITY: usize = 1024;

/// Process-local pub/sub of `acquired`/`released` events.
///
/// Built on `tokio::sync::broadcast` rather than a hand-rolled subscriber
/// list: every subscriber gets its own ordered queue, a slow subscriber
/// lags and drops old events instead of blocking the publisher or other
/// subscribers, and unsubscription is just dropping the receiver — exactly
/// the failure-isolation and back-reference hygiene a subscriber registry
/// needs.
pub struct EventBus {
    acquired_tx: broadcast::Sender<Lock>,
    released_tx: broadcast::Sender<Lock>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (acquired_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (released_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            acquired_tx,
            released_tx,
        }
    }

    pub fn publish_acquired(&self, lock: Lock) {
        // No subscribers is not an error: publication must never depend on
        // whether anyone is listening.
        let _ = self.acquired_tx.send(lock);
    }

    pub fn publish_released(&self, lock: Lock) {
        let _ = self.released_tx.send(lock);
    }

    pub fn subscribe_acquired(&self) -> broadcast::Receiver<Lock> {
        self.acquired_tx.subscribe()
    }

    pub fn subscribe_released(&self) -> broadcast::Receiver<Lock> {
        self.released_tx.subscribe()
    }
}
