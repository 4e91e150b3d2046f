use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, ProductId};

/// Input for creating a product (pre-validation shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    /// Price in smallest currency unit (e.g., cents).
    pub price: u64,
    pub category: String,
    pub stock: u64,
}

/// Catalog product.
///
/// `stock` is deliberately inaccessible for mutation outside this crate;
/// only the catalog's reservation protocol changes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    description: String,
    /// Price in smallest currency unit (e.g., cents).
    price: u64,
    category: String,
    stock: u64,
    created_at: DateTime<Utc>,
}

impl Product {
    /// Validate and construct a product.
    pub fn new(input: NewProduct, created_at: DateTime<Utc>) -> DomainResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if input.description.trim().is_empty() {
            return Err(DomainError::validation("description cannot be empty"));
        }
        let category = input.category.trim().to_string();
        if category.is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }

        Ok(Self {
            id: ProductId::new(),
            name,
            description: input.description,
            price: input.price,
            category,
            stock: input.stock,
            created_at,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn stock(&self) -> u64 {
        self.stock
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Decrement stock. Callers must have already verified `quantity <= stock`
    /// inside the same critical section; this only guards the arithmetic.
    pub(crate) fn take_stock(&mut self, quantity: u64) {
        debug_assert!(quantity <= self.stock);
        self.stock = self.stock.saturating_sub(quantity);
    }

    /// Restore stock released by a compensated reservation.
    pub(crate) fn restore_stock(&mut self, quantity: u64) {
        self.stock = self.stock.saturating_add(quantity);
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
