use serde::{Deserialize, Serialize};

use storefront_core::{ProductId, ReservationId};

/// A tentative, not-yet-final stock decrement held for the duration of one
/// checkout transaction.
///
/// The decrement is applied when the reservation is granted; the reservation
/// handle is what allows the transaction to later `release` (compensate) or
/// `commit` (finalize) it. Reservations are scoped to a single checkout
/// invocation and never outlive it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub product_id: ProductId,
    pub quantity: u64,
}

impl Reservation {
    pub fn new(product_id: ProductId, quantity: u64) -> Self {
        Self {
            id: ReservationId::new(),
            product_id,
            quantity,
        }
    }
}
