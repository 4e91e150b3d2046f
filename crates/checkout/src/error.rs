//! Checkout failure taxonomy.
//!
//! Display strings double as the boundary messages the (out-of-scope) HTTP
//! layer returns verbatim. Every variant below `Validation` guarantees zero
//! purchase-unit creation and zero net stock change; that guarantee is
//! enforced inside the engine, never left to the caller.

use thiserror::Error;

use storefront_core::ProductId;
use storefront_inventory::{InventoryError, ReserveError};
use storefront_ledger::LedgerError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Malformed input, rejected before the authorizer or any store is
    /// touched. Always recoverable by resubmitting corrected input.
    #[error("{0}")]
    Validation(String),

    /// The payment gateway declined the payment.
    #[error("Payment failed")]
    PaymentDeclined,

    /// The payment token is not recognized by the gateway.
    #[error("Invalid payment token")]
    PaymentInvalid,

    /// A line item could not be reserved; all prior reservations in the same
    /// transaction were released.
    #[error("Insufficient stock for {product_id}")]
    InsufficientStock { product_id: ProductId, available: u64 },

    /// A line item referenced a product the catalog does not know.
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    /// The underlying store failed during reserve/record/commit. Server-class,
    /// distinct from the business-rule failures above; the same rollback path
    /// applies.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl CheckoutError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether the caller can fix this by changing the request (client error)
    /// as opposed to a store outage (server error).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<ReserveError> for CheckoutError {
    fn from(err: ReserveError) -> Self {
        match err {
            ReserveError::InsufficientStock {
                product_id,
                available,
                ..
            } => Self::InsufficientStock {
                product_id,
                available,
            },
            ReserveError::NotFound(product_id) => Self::ProductNotFound(product_id),
            ReserveError::Unavailable(msg) => Self::StoreUnavailable(msg),
        }
    }
}

impl From<LedgerError> for CheckoutError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Unavailable(msg) => Self::StoreUnavailable(msg),
        }
    }
}

impl From<InventoryError> for CheckoutError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::UnknownReservation(id) => {
                Self::StoreUnavailable(format!("reservation {id} lost"))
            }
            InventoryError::Unavailable(msg) => Self::StoreUnavailable(msg),
        }
    }
}
