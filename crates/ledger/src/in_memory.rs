use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use storefront_core::{ProductId, PurchaseUnitId, UserId};

use crate::unit::{LedgerError, PurchaseLedger, PurchaseUnit};

/// In-memory append-only purchase ledger.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryPurchaseLedger {
    units: RwLock<Vec<PurchaseUnit>>,
}

impl InMemoryPurchaseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(units: &mut Vec<PurchaseUnit>, user_id: UserId, product_id: ProductId, count: u64) -> Vec<PurchaseUnitId> {
        let now = Utc::now();
        let mut ids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let unit = PurchaseUnit::new(user_id, product_id, now);
            ids.push(unit.id);
            units.push(unit);
        }
        ids
    }
}

impl PurchaseLedger for InMemoryPurchaseLedger {
    fn record_units(
        &self,
        user_id: UserId,
        product_id: ProductId,
        count: u64,
    ) -> Result<Vec<PurchaseUnitId>, LedgerError> {
        let mut units = self
            .units
            .write()
            .map_err(|_| LedgerError::Unavailable("lock poisoned".to_string()))?;
        Ok(Self::append(&mut units, user_id, product_id, count))
    }

    /// Single write-lock append covering the whole cart: a failure to acquire
    /// the store happens before any row lands, so there is no partial-cart
    /// window.
    fn record_cart(
        &self,
        user_id: UserId,
        lines: &[(ProductId, u64)],
    ) -> Result<Vec<PurchaseUnitId>, LedgerError> {
        let mut units = self
            .units
            .write()
            .map_err(|_| LedgerError::Unavailable("lock poisoned".to_string()))?;

        let mut ids = Vec::new();
        for (product_id, quantity) in lines {
            ids.extend(Self::append(&mut units, user_id, *product_id, *quantity));
        }
        Ok(ids)
    }

    fn counts_by_product(&self) -> Result<HashMap<ProductId, u64>, LedgerError> {
        let units = self
            .units
            .read()
            .map_err(|_| LedgerError::Unavailable("lock poisoned".to_string()))?;

        // One pass over the ledger, grouped by product id.
        let mut counts: HashMap<ProductId, u64> = HashMap::new();
        for unit in units.iter() {
            *counts.entry(unit.product_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn units_for_user(&self, user_id: UserId) -> Result<Vec<PurchaseUnit>, LedgerError> {
        let units = self
            .units
            .read()
            .map_err(|_| LedgerError::Unavailable("lock poisoned".to_string()))?;
        Ok(units.iter().filter(|u| u.user_id == user_id).cloned().collect())
    }

    fn len(&self) -> Result<usize, LedgerError> {
        let units = self
            .units
            .read()
            .map_err(|_| LedgerError::Unavailable("lock poisoned".to_string()))?;
        Ok(units.len())
    }
}
