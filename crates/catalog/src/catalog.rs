use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use tracing::{debug, warn};

use storefront_core::{DomainResult, ProductId};
use storefront_events::EventBus;
use storefront_inventory::{InventoryError, InventoryStore, Reservation, ReserveError};

use crate::event::CatalogEvent;
use crate::product::{NewProduct, Product};

/// Products plus the pending-reservation table, guarded together so every
/// reservation-protocol step is one indivisible critical section.
#[derive(Debug, Default)]
struct CatalogState {
    products: HashMap<ProductId, Product>,
    pending: HashMap<storefront_core::ReservationId, Reservation>,
}

/// In-memory product catalog and stock store.
///
/// The [`InventoryStore`] implementation is the only code that mutates
/// `Product::stock`. The stock check and decrement in [`try_reserve`]
/// happen under one write lock — there is no read-then-write pair for a
/// concurrent caller to interleave with.
///
/// [`try_reserve`]: InventoryStore::try_reserve
#[derive(Debug)]
pub struct ProductCatalog<B> {
    state: RwLock<CatalogState>,
    bus: B,
}

impl<B> ProductCatalog<B>
where
    B: EventBus<CatalogEvent>,
{
    pub fn new(bus: B) -> Self {
        Self {
            state: RwLock::new(CatalogState::default()),
            bus,
        }
    }

    /// Validate and insert a product, announcing it on the event bus.
    pub fn create(&self, input: NewProduct) -> DomainResult<Product> {
        let product = Product::new(input, Utc::now())?;

        {
            let mut state = self
                .state
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state.products.insert(product.id_typed(), product.clone());
        }

        // Event delivery is best-effort; the insert above is the truth.
        let event = CatalogEvent::ProductCreated {
            product_id: product.id_typed(),
            name: product.name().to_string(),
            occurred_at: product.created_at(),
        };
        if self.bus.publish(event).is_err() {
            warn!(product_id = %product.id_typed(), "failed to publish product-created event");
        }

        Ok(product)
    }

    pub fn get(&self, product_id: ProductId) -> Option<Product> {
        let state = self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.products.get(&product_id).cloned()
    }

    /// All products, ordered by id for deterministic listings.
    pub fn list(&self) -> Vec<Product> {
        let state = self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by_key(Product::id_typed);
        products
    }
}

impl<B> InventoryStore for ProductCatalog<B>
where
    B: EventBus<CatalogEvent>,
{
    fn try_reserve(&self, product_id: ProductId, quantity: u64) -> Result<Reservation, ReserveError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| ReserveError::Unavailable("catalog lock poisoned".to_string()))?;

        let product = state
            .products
            .get_mut(&product_id)
            .ok_or(ReserveError::NotFound(product_id))?;

        // Check and act inside the same critical section.
        let available = product.stock();
        if available < quantity {
            return Err(ReserveError::InsufficientStock {
                product_id,
                requested: quantity,
                available,
            });
        }
        product.take_stock(quantity);

        let reservation = Reservation::new(product_id, quantity);
        state.pending.insert(reservation.id, reservation.clone());

        debug!(
            product_id = %product_id,
            quantity,
            remaining = available - quantity,
            "stock reserved"
        );
        Ok(reservation)
    }

    fn release(&self, reservations: &[Reservation]) -> Result<(), InventoryError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| InventoryError::Unavailable("catalog lock poisoned".to_string()))?;

        // Reverse grant order keeps rollback well-defined for multi-item carts.
        for reservation in reservations.iter().rev() {
            let granted = state
                .pending
                .remove(&reservation.id)
                .ok_or(InventoryError::UnknownReservation(reservation.id))?;

            if let Some(product) = state.products.get_mut(&granted.product_id) {
                product.restore_stock(granted.quantity);
            }
            debug!(
                product_id = %granted.product_id,
                quantity = granted.quantity,
                "reservation released"
            );
        }
        Ok(())
    }

    fn commit(&self, reservations: &[Reservation]) -> Result<(), InventoryError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| InventoryError::Unavailable("catalog lock poisoned".to_string()))?;

        // Committing only clears the pending entries; the decrement applied
        // at grant time is already in place and now becomes final.
        for reservation in reservations {
            state
                .pending
                .remove(&reservation.id)
                .ok_or(InventoryError::UnknownReservation(reservation.id))?;
        }
        Ok(())
    }

    fn pending_reservations(&self) -> usize {
        let state = self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.pending.len()
    }
}
