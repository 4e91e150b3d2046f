//! In-memory pub/sub bus with scoped subscriber registration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak, mpsc};

use crate::bus::{EventBus, Subscription};

#[derive(Debug)]
pub enum InMemoryBusError {
    /// Publish failed due to internal lock poisoning.
    Poisoned,
}

/// Slot table shared between the bus and the deregistration hooks held by
/// live subscriptions.
struct Registry<M> {
    slots: Mutex<HashMap<u64, mpsc::Sender<M>>>,
    next_slot: AtomicU64,
}

/// In-memory pub/sub bus.
///
/// - No IO / no async
/// - Best-effort fan-out
/// - Subscribers are registered under a slot id and removed when their
///   [`Subscription`] is dropped, never by waiting for a failed send to
///   reveal a dead channel.
pub struct InMemoryEventBus<M> {
    registry: Arc<Registry<M>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently registered subscribers.
    ///
    /// Invariant checked by tests: after any subscribe/drop cycle this
    /// returns to its value before the cycle.
    pub fn subscriber_count(&self) -> usize {
        self.registry.slots.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Registry {
                slots: Mutex::new(HashMap::new()),
                next_slot: AtomicU64::new(0),
            }),
        }
    }
}

impl<M> core::fmt::Debug for InMemoryEventBus<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryEventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let slots = self
            .registry
            .slots
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?;

        // A send can only fail if the receiving half is gone, which means the
        // subscription is mid-drop; its hook will remove the slot.
        for sender in slots.values() {
            let _ = sender.send(message.clone());
        }

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        let slot = self.registry.next_slot.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut slots) = self.registry.slots.lock() {
            slots.insert(slot, tx);
        }

        let registry: Weak<Registry<M>> = Arc::downgrade(&self.registry);
        Subscription::with_unsubscribe(rx, move || {
            if let Some(registry) = registry.upgrade()
                && let Ok(mut slots) = registry.slots.lock()
            {
                slots.remove(&slot);
            }
        })
    }
}
