use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::{Entity, ProductId, PurchaseUnitId, UserId};

/// The record of one bought unit of one product by one user.
///
/// Immutable once created. The checkout path only ever appends these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseUnit {
    pub id: PurchaseUnitId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

impl PurchaseUnit {
    pub fn new(user_id: UserId, product_id: ProductId, created_at: DateTime<Utc>) -> Self {
        Self {
            id: PurchaseUnitId::new(),
            user_id,
            product_id,
            created_at,
        }
    }
}

impl Entity for PurchaseUnit {
    type Id = PurchaseUnitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Ledger failure model.
///
/// The ledger never fails on business grounds; the only failure mode is the
/// underlying store being unavailable, which the enclosing checkout
/// transaction must treat like a reservation failure (full rollback).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("purchase ledger unavailable: {0}")]
    Unavailable(String),
}

/// Append-only purchase ledger contract.
pub trait PurchaseLedger: Send + Sync {
    /// Append `count` unit rows for one (user, product) pair.
    fn record_units(
        &self,
        user_id: UserId,
        product_id: ProductId,
        count: u64,
    ) -> Result<Vec<PurchaseUnitId>, LedgerError>;

    /// Append unit rows for a whole cart.
    ///
    /// Implementations should make this all-or-nothing: a store failure
    /// mid-cart must not leave rows for a prefix of the lines. The default
    /// loops over [`PurchaseLedger::record_units`] and is only suitable for
    /// stores whose appends cannot fail partway.
    fn record_cart(
        &self,
        user_id: UserId,
        lines: &[(ProductId, u64)],
    ) -> Result<Vec<PurchaseUnitId>, LedgerError> {
        let mut ids = Vec::with_capacity(lines.iter().map(|(_, q)| *q as usize).sum());
        for (product_id, quantity) in lines {
            ids.extend(self.record_units(user_id, *product_id, *quantity)?);
        }
        Ok(ids)
    }

    /// Cumulative purchase count per product, computed as one grouping pass
    /// over the ledger — never one lookup per product.
    fn counts_by_product(&self) -> Result<HashMap<ProductId, u64>, LedgerError>;

    /// All units recorded for one user, in append order.
    fn units_for_user(&self, user_id: UserId) -> Result<Vec<PurchaseUnit>, LedgerError>;

    /// Total number of unit rows in the ledger.
    fn len(&self) -> Result<usize, LedgerError>;

    fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }
}

impl<L> PurchaseLedger for Arc<L>
where
    L: PurchaseLedger + ?Sized,
{
    fn record_units(
        &self,
        user_id: UserId,
        product_id: ProductId,
        count: u64,
    ) -> Result<Vec<PurchaseUnitId>, LedgerError> {
        (**self).record_units(user_id, product_id, count)
    }

    fn record_cart(
        &self,
        user_id: UserId,
        lines: &[(ProductId, u64)],
    ) -> Result<Vec<PurchaseUnitId>, LedgerError> {
        (**self).record_cart(user_id, lines)
    }

    fn counts_by_product(&self) -> Result<HashMap<ProductId, u64>, LedgerError> {
        (**self).counts_by_product()
    }

    fn units_for_user(&self, user_id: UserId) -> Result<Vec<PurchaseUnit>, LedgerError> {
        (**self).units_for_user(user_id)
    }

    fn len(&self) -> Result<usize, LedgerError> {
        (**self).len()
    }
}
