use serde::{Deserialize, Serialize};

use storefront_core::{ProductId, PurchaseUnitId};

use crate::error::CheckoutError;

/// One (product, quantity) pair within a checkout cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: u64,
}

/// Transient checkout input. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Processed in this order; rollback happens in the reverse of it.
    pub items: Vec<LineItem>,
    /// Opaque mock payment token.
    pub payment_token: String,
}

impl CheckoutRequest {
    /// Shape validation, performed before the authorizer or any store is
    /// touched.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        if self.items.is_empty() {
            return Err(CheckoutError::validation("cart cannot be empty"));
        }
        if self.items.iter().any(|item| item.quantity == 0) {
            return Err(CheckoutError::validation("quantity must be at least 1"));
        }
        if self.payment_token.trim().is_empty() {
            return Err(CheckoutError::validation("payment token cannot be blank"));
        }
        Ok(())
    }

    /// Total units this cart asks for.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// Outcome of a committed checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    /// Ids of the purchase-unit rows this transaction created; their count
    /// always equals the cart's total quantity.
    pub purchase_unit_ids: Vec<PurchaseUnitId>,
}

impl CheckoutReceipt {
    pub fn units_committed(&self) -> usize {
        self.purchase_unit_ids.len()
    }

    /// Boundary success message, returned verbatim by the HTTP layer.
    pub fn message(&self) -> &'static str {
        "Checkout successful"
    }
}
