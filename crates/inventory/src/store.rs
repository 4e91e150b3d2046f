use std::sync::Arc;

use thiserror::Error;

use storefront_core::{ProductId, ReservationId};

use crate::reservation::Reservation;

/// Why a reservation could not be granted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReserveError {
    /// Current stock is below the requested quantity. Carries what was
    /// available at decision time so callers can surface it.
    #[error("insufficient stock for {product_id} (requested {requested}, available {available})")]
    InsufficientStock {
        product_id: ProductId,
        requested: u64,
        available: u64,
    },

    /// The product does not exist in the store.
    #[error("product {0} not found")]
    NotFound(ProductId),

    /// The underlying store failed; distinct from business-rule failures.
    #[error("inventory store unavailable: {0}")]
    Unavailable(String),
}

/// Failures of the release/commit half of the protocol.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// The reservation is not pending (never granted, already released, or
    /// already committed). Guards against double-release inflating stock.
    #[error("unknown or settled reservation {0}")]
    UnknownReservation(ReservationId),

    #[error("inventory store unavailable: {0}")]
    Unavailable(String),
}

/// Stock store contract.
///
/// `try_reserve` must be atomic with respect to concurrent callers: the
/// stock check and the decrement happen as one indivisible step, so two
/// concurrent requests for the last unit can never both succeed. No caller
/// ever reads stock and writes it back separately.
pub trait InventoryStore: Send + Sync {
    /// Decrement stock by `quantity` iff current stock ≥ `quantity`,
    /// returning a reservation handle for the decrement.
    fn try_reserve(&self, product_id: ProductId, quantity: u64) -> Result<Reservation, ReserveError>;

    /// Compensate failed work: restore stock for every reservation in the
    /// slice, iterating in reverse grant order.
    ///
    /// Must complete before the enclosing transaction returns control, even
    /// on the abort path — a stranded reservation is stock decremented with
    /// no purchase record to show for it.
    fn release(&self, reservations: &[Reservation]) -> Result<(), InventoryError>;

    /// Finalize reservations: the decrement applied at grant time becomes
    /// permanent and the handles can no longer be released.
    fn commit(&self, reservations: &[Reservation]) -> Result<(), InventoryError>;

    /// Number of reservations currently granted but neither released nor
    /// committed. Zero whenever no checkout is mid-flight.
    fn pending_reservations(&self) -> usize;
}

impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    fn try_reserve(&self, product_id: ProductId, quantity: u64) -> Result<Reservation, ReserveError> {
        (**self).try_reserve(product_id, quantity)
    }

    fn release(&self, reservations: &[Reservation]) -> Result<(), InventoryError> {
        (**self).release(reservations)
    }

    fn commit(&self, reservations: &[Reservation]) -> Result<(), InventoryError> {
        (**self).commit(reservations)
    }

    fn pending_reservations(&self) -> usize {
        (**self).pending_reservations()
    }
}
