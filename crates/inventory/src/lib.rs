//! Inventory reservation protocol.
//!
//! Stock is a shared, finite resource mutated under concurrent access. This
//! crate defines the contract every stock store must honor: a **single
//! conditional decrement** ("decrement iff current stock ≥ quantity") as the
//! only way stock ever goes down, plus the release/commit halves of the
//! reserve-then-commit protocol a multi-product checkout needs for
//! all-or-nothing behavior.

pub mod reservation;
pub mod store;

pub use reservation::Reservation;
pub use store::{InventoryError, InventoryStore, ReserveError};
