//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus is the **transport seam** between the checkout engine and whatever
//! delivers notifications to the outside world. It is intentionally
//! lightweight:
//!
//! - **Transport-agnostic**: in-memory channels here; a broker elsewhere.
//! - **Best-effort fan-out**: publication never blocks a committed
//!   transaction; a consumer that cannot keep up misses messages.
//! - **No persistence**: the ledger and inventory stores are the source of
//!   truth, the bus only distributes facts after they are durable.
//!
//! Subscriptions are **scoped acquisitions**: registering a subscriber hands
//! back a [`Subscription`] that deregisters itself when dropped. Listener
//! count therefore returns to its pre-subscription baseline after any
//! subscribe/drop cycle, without relying on publish-time cleanup of dead
//! channels.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to an event stream.
///
/// Each subscription gets a copy of every message published after it was
/// registered (broadcast semantics). Dropping the subscription deregisters
/// the subscriber from the bus.
pub struct Subscription<M> {
    receiver: Receiver<M>,
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl<M> Subscription<M> {
    /// A subscription with no deregistration hook (e.g. for tests or buses
    /// that manage membership externally).
    pub fn new(receiver: Receiver<M>) -> Self {
        Self {
            receiver,
            unsubscribe: None,
        }
    }

    /// A subscription that runs `unsubscribe` exactly once when dropped.
    pub fn with_unsubscribe(receiver: Receiver<M>, unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            receiver,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl<M> core::fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("scoped", &self.unsubscribe.is_some())
            .finish()
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// `publish` can fail (lock poisoning, broker outage); failures are surfaced
/// to the caller, which decides whether a missed notification matters. The
/// trait requires `Send + Sync` so independent checkout threads can publish
/// concurrently.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
