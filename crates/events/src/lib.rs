//! Domain event distribution.
//!
//! The engine only *emits* events; delivery to the outside world (websocket
//! fan-out, etc.) is an external collaborator. This crate provides the event
//! contract and an in-memory pub/sub bus whose subscriptions are **scoped**:
//! a subscriber registers on subscribe and is deregistered when its handle is
//! dropped, so listener count always returns to its pre-subscription baseline.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
