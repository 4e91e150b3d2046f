//! Checkout transaction engine.
//!
//! Takes an authenticated user, a cart of line items and a payment token and
//! either commits every line item's stock decrement and purchase record or
//! commits none of them. Multi-product carts get all-or-nothing behavior
//! from an explicit reserve/commit/compensate protocol (the store's
//! conditional decrement provides per-product atomicity; compensation
//! provides the cross-product kind).

pub mod error;
pub mod event;
pub mod manager;
pub mod request;

pub use error::CheckoutError;
pub use event::CheckoutEvent;
pub use manager::{CheckoutPhase, CheckoutTransactionManager};
pub use request::{CheckoutReceipt, CheckoutRequest, LineItem};
