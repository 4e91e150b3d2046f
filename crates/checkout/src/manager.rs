use chrono::Utc;
use tracing::{debug, error, info, info_span, warn};

use storefront_core::{ProductId, UserId};
use storefront_events::EventBus;
use storefront_inventory::{InventoryStore, Reservation};
use storefront_ledger::PurchaseLedger;
use storefront_payment::{PaymentAuthorizer, PaymentOutcome};

use crate::error::CheckoutError;
use crate::event::CheckoutEvent;
use crate::request::{CheckoutReceipt, CheckoutRequest};

/// Where a checkout transaction is in its lifecycle.
///
/// `Committed` is the only terminal state with ledger effects; every failure
/// terminal guarantees stock was restored to its pre-transaction value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CheckoutPhase {
    Received,
    Authorizing,
    Reserving,
    Recording,
    Committed,
    Declined,
    InvalidToken,
    RolledBack,
}

impl CheckoutPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckoutPhase::Received => "received",
            CheckoutPhase::Authorizing => "authorizing",
            CheckoutPhase::Reserving => "reserving",
            CheckoutPhase::Recording => "recording",
            CheckoutPhase::Committed => "committed",
            CheckoutPhase::Declined => "declined",
            CheckoutPhase::InvalidToken => "invalid_token",
            CheckoutPhase::RolledBack => "rolled_back",
        }
    }
}

/// Orchestrates authorization, stock reservation and ledger writes as one
/// all-or-nothing unit.
///
/// The two-phase reserve-then-commit shape exists because a cart can span
/// multiple products: a later item's failure must undo an earlier item's
/// success, so per-item outcomes are never decided independently. The
/// manager holds no per-request state and serves concurrent checkouts from
/// independent threads; isolation comes from the store's conditional
/// decrement, not from any global lock here.
#[derive(Debug)]
pub struct CheckoutTransactionManager<I, L, A, B> {
    inventory: I,
    ledger: L,
    authorizer: A,
    bus: B,
}

impl<I, L, A, B> CheckoutTransactionManager<I, L, A, B>
where
    I: InventoryStore,
    L: PurchaseLedger,
    A: PaymentAuthorizer,
    B: EventBus<CheckoutEvent>,
{
    pub fn new(inventory: I, ledger: L, authorizer: A, bus: B) -> Self {
        Self {
            inventory,
            ledger,
            authorizer,
            bus,
        }
    }

    /// Run one checkout transaction.
    ///
    /// On success the ledger gains exactly `request.total_quantity()` unit
    /// rows and each product's stock drops by its requested quantity. On any
    /// failure both are unchanged; compensation completes before this
    /// returns, so no reservation is ever left stranded.
    pub fn checkout(
        &self,
        user_id: UserId,
        request: &CheckoutRequest,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let span = info_span!(
            "checkout",
            user_id = %user_id,
            items = request.items.len(),
            units = request.total_quantity(),
        );
        let _guard = span.enter();
        debug!(phase = CheckoutPhase::Received.as_str(), "checkout received");

        // Shape problems are rejected before the authorizer or any store is
        // touched.
        request.validate()?;

        debug!(phase = CheckoutPhase::Authorizing.as_str(), "authorizing payment");
        match self.authorizer.authorize(&request.payment_token) {
            PaymentOutcome::Authorized => {}
            PaymentOutcome::Declined => {
                debug!(phase = CheckoutPhase::Declined.as_str(), "payment declined");
                return Err(self.reject(user_id, CheckoutError::PaymentDeclined));
            }
            PaymentOutcome::Invalid => {
                debug!(phase = CheckoutPhase::InvalidToken.as_str(), "token not recognized");
                return Err(self.reject(user_id, CheckoutError::PaymentInvalid));
            }
        }

        // Reserve in request order so rollback order is well-defined.
        debug!(phase = CheckoutPhase::Reserving.as_str(), "reserving stock");
        let mut reservations: Vec<Reservation> = Vec::with_capacity(request.items.len());
        for item in &request.items {
            match self.inventory.try_reserve(item.product_id, item.quantity) {
                Ok(reservation) => reservations.push(reservation),
                Err(cause) => {
                    self.rollback(&reservations);
                    return Err(self.reject(user_id, cause.into()));
                }
            }
        }

        // Every line item holds a reservation; only now may ledger rows be
        // written. The whole cart goes in as one append so a store failure
        // cannot leave rows for a prefix of the lines.
        debug!(phase = CheckoutPhase::Recording.as_str(), "recording purchase units");
        let lines: Vec<(ProductId, u64)> = request
            .items
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .collect();
        let purchase_unit_ids = match self.ledger.record_cart(user_id, &lines) {
            Ok(ids) => ids,
            Err(cause) => {
                self.rollback(&reservations);
                return Err(self.reject(user_id, cause.into()));
            }
        };

        // The decrements applied at reserve time become final. The units are
        // already durable, so a bookkeeping failure here is logged rather
        // than surfaced as a failed checkout.
        if let Err(cause) = self.inventory.commit(&reservations) {
            error!(%cause, "failed to settle reservations for a committed checkout");
        }

        let event = CheckoutEvent::Committed {
            user_id,
            lines,
            purchase_unit_ids: purchase_unit_ids.clone(),
            occurred_at: Utc::now(),
        };
        if self.bus.publish(event).is_err() {
            warn!("failed to publish checkout-committed event");
        }

        info!(
            phase = CheckoutPhase::Committed.as_str(),
            units = purchase_unit_ids.len(),
            "checkout committed"
        );
        Ok(CheckoutReceipt { purchase_unit_ids })
    }

    /// Compensate every reservation granted so far, in reverse grant order.
    /// Runs to completion before control returns to the caller.
    fn rollback(&self, reservations: &[Reservation]) {
        if reservations.is_empty() {
            return;
        }
        warn!(
            phase = CheckoutPhase::RolledBack.as_str(),
            count = reservations.len(),
            "releasing reservations"
        );
        if let Err(cause) = self.inventory.release(reservations) {
            // Nothing further to compensate with; surface loudly.
            error!(%cause, "compensating release failed");
        }
    }

    /// Publish the audit-only rejection event and hand the error back.
    fn reject(&self, user_id: UserId, cause: CheckoutError) -> CheckoutError {
        let event = CheckoutEvent::Rejected {
            user_id,
            reason: cause.to_string(),
            occurred_at: Utc::now(),
        };
        if self.bus.publish(event).is_err() {
            warn!("failed to publish checkout-rejected event");
        }
        cause
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use storefront_catalog::{CatalogEvent, NewProduct, ProductCatalog};
    use storefront_core::{ProductId, PurchaseUnitId};
    use storefront_events::InMemoryEventBus;
    use storefront_inventory::{InventoryError, ReserveError};
    use storefront_ledger::{InMemoryPurchaseLedger, LedgerError, PurchaseLedger, PurchaseUnit};
    use storefront_payment::{MockPaymentAuthorizer, TOKEN_FAILURE, TOKEN_SUCCESS};

    use crate::request::LineItem;

    use super::*;

    type TestCatalog = Arc<ProductCatalog<InMemoryEventBus<CatalogEvent>>>;

    fn test_catalog() -> TestCatalog {
        Arc::new(ProductCatalog::new(InMemoryEventBus::new()))
    }

    fn seed_product(catalog: &TestCatalog, name: &str, stock: u64) -> ProductId {
        catalog
            .create(NewProduct {
                name: name.to_string(),
                description: "desc".to_string(),
                price: 5000,
                category: "widgets".to_string(),
                stock,
            })
            .unwrap()
            .id_typed()
    }

    fn manager(
        catalog: &TestCatalog,
        ledger: Arc<InMemoryPurchaseLedger>,
    ) -> CheckoutTransactionManager<
        TestCatalog,
        Arc<InMemoryPurchaseLedger>,
        MockPaymentAuthorizer,
        InMemoryEventBus<CheckoutEvent>,
    > {
        CheckoutTransactionManager::new(
            Arc::clone(catalog),
            ledger,
            MockPaymentAuthorizer::new(),
            InMemoryEventBus::new(),
        )
    }

    fn request_for(items: Vec<LineItem>, token: &str) -> CheckoutRequest {
        CheckoutRequest {
            items,
            payment_token: token.to_string(),
        }
    }

    #[test]
    fn successful_multi_item_checkout_commits_everything() {
        let catalog = test_catalog();
        let ledger = Arc::new(InMemoryPurchaseLedger::new());
        let product_x = seed_product(&catalog, "X", 5);
        let product_y = seed_product(&catalog, "Y", 3);
        let engine = manager(&catalog, Arc::clone(&ledger));
        let user = UserId::new();

        let receipt = engine
            .checkout(
                user,
                &request_for(
                    vec![
                        LineItem { product_id: product_x, quantity: 2 },
                        LineItem { product_id: product_y, quantity: 1 },
                    ],
                    TOKEN_SUCCESS,
                ),
            )
            .unwrap();

        assert_eq!(receipt.units_committed(), 3);
        assert_eq!(receipt.message(), "Checkout successful");
        assert_eq!(catalog.get(product_x).unwrap().stock(), 3);
        assert_eq!(catalog.get(product_y).unwrap().stock(), 2);

        let units = ledger.units_for_user(user).unwrap();
        assert_eq!(units.len(), 3);
        assert_eq!(units.iter().filter(|u| u.product_id == product_x).count(), 2);
        assert_eq!(units.iter().filter(|u| u.product_id == product_y).count(), 1);
        assert_eq!(catalog.pending_reservations(), 0);
    }

    #[test]
    fn insufficient_stock_rolls_back_earlier_reservations() {
        let catalog = test_catalog();
        let ledger = Arc::new(InMemoryPurchaseLedger::new());
        let plentiful = seed_product(&catalog, "Plentiful", 10);
        let scarce = seed_product(&catalog, "Scarce", 1);
        let engine = manager(&catalog, Arc::clone(&ledger));

        let err = engine
            .checkout(
                UserId::new(),
                &request_for(
                    vec![
                        LineItem { product_id: plentiful, quantity: 2 },
                        LineItem { product_id: scarce, quantity: 2 },
                    ],
                    TOKEN_SUCCESS,
                ),
            )
            .unwrap_err();

        assert_eq!(
            err,
            CheckoutError::InsufficientStock {
                product_id: scarce,
                available: 1,
            }
        );
        // The first line's reservation was compensated.
        assert_eq!(catalog.get(plentiful).unwrap().stock(), 10);
        assert_eq!(catalog.get(scarce).unwrap().stock(), 1);
        assert!(ledger.is_empty().unwrap());
        assert_eq!(catalog.pending_reservations(), 0);
    }

    #[test]
    fn single_item_over_stock_is_rejected_with_stock_untouched() {
        let catalog = test_catalog();
        let ledger = Arc::new(InMemoryPurchaseLedger::new());
        let product = seed_product(&catalog, "Limited Edition Widget", 1);
        let engine = manager(&catalog, Arc::clone(&ledger));

        let err = engine
            .checkout(
                UserId::new(),
                &request_for(vec![LineItem { product_id: product, quantity: 2 }], TOKEN_SUCCESS),
            )
            .unwrap_err();

        assert!(err.to_string().contains("Insufficient stock"));
        assert_eq!(catalog.get(product).unwrap().stock(), 1);
        assert!(ledger.is_empty().unwrap());
    }

    #[test]
    fn declined_payment_never_touches_stores() {
        let catalog = test_catalog();
        let ledger = Arc::new(InMemoryPurchaseLedger::new());
        let product = seed_product(&catalog, "Widget", 5);
        let engine = manager(&catalog, Arc::clone(&ledger));

        let err = engine
            .checkout(
                UserId::new(),
                &request_for(vec![LineItem { product_id: product, quantity: 1 }], TOKEN_FAILURE),
            )
            .unwrap_err();

        assert_eq!(err, CheckoutError::PaymentDeclined);
        assert_eq!(err.to_string(), "Payment failed");
        assert_eq!(catalog.get(product).unwrap().stock(), 5);
        assert!(ledger.is_empty().unwrap());
    }

    #[test]
    fn repeated_declined_checkouts_are_idempotent() {
        let catalog = test_catalog();
        let ledger = Arc::new(InMemoryPurchaseLedger::new());
        let product = seed_product(&catalog, "Widget", 5);
        let engine = manager(&catalog, Arc::clone(&ledger));
        let request =
            request_for(vec![LineItem { product_id: product, quantity: 1 }], TOKEN_FAILURE);

        for _ in 0..5 {
            assert!(engine.checkout(UserId::new(), &request).is_err());
        }

        assert_eq!(catalog.get(product).unwrap().stock(), 5);
        assert!(ledger.is_empty().unwrap());
        assert_eq!(catalog.pending_reservations(), 0);
    }

    #[test]
    fn unrecognized_token_is_invalid_not_declined() {
        let catalog = test_catalog();
        let ledger = Arc::new(InMemoryPurchaseLedger::new());
        let product = seed_product(&catalog, "Widget", 5);
        let engine = manager(&catalog, Arc::clone(&ledger));

        let err = engine
            .checkout(
                UserId::new(),
                &request_for(
                    vec![LineItem { product_id: product, quantity: 1 }],
                    "tok_invalid_token",
                ),
            )
            .unwrap_err();

        assert_eq!(err, CheckoutError::PaymentInvalid);
        assert_eq!(catalog.get(product).unwrap().stock(), 5);
    }

    #[test]
    fn unknown_product_rolls_back_and_reports_not_found() {
        let catalog = test_catalog();
        let ledger = Arc::new(InMemoryPurchaseLedger::new());
        let known = seed_product(&catalog, "Known", 5);
        let ghost = ProductId::new();
        let engine = manager(&catalog, Arc::clone(&ledger));

        let err = engine
            .checkout(
                UserId::new(),
                &request_for(
                    vec![
                        LineItem { product_id: known, quantity: 1 },
                        LineItem { product_id: ghost, quantity: 1 },
                    ],
                    TOKEN_SUCCESS,
                ),
            )
            .unwrap_err();

        assert_eq!(err, CheckoutError::ProductNotFound(ghost));
        assert_eq!(catalog.get(known).unwrap().stock(), 5);
        assert!(ledger.is_empty().unwrap());
    }

    #[test]
    fn empty_cart_is_rejected_before_authorization() {
        let catalog = test_catalog();
        let ledger = Arc::new(InMemoryPurchaseLedger::new());
        let engine = manager(&catalog, Arc::clone(&ledger));

        let err = engine
            .checkout(UserId::new(), &request_for(vec![], TOKEN_FAILURE))
            .unwrap_err();

        // Validation wins over the declined token: the authorizer is never
        // consulted for a malformed cart.
        assert_eq!(err, CheckoutError::validation("cart cannot be empty"));
    }

    /// Inventory stub that always reserves and counts release calls, for
    /// exercising the ledger-failure rollback path.
    #[derive(Debug, Default)]
    struct CountingInventory {
        released: std::sync::atomic::AtomicUsize,
    }

    impl InventoryStore for CountingInventory {
        fn try_reserve(
            &self,
            product_id: ProductId,
            quantity: u64,
        ) -> Result<Reservation, ReserveError> {
            Ok(Reservation::new(product_id, quantity))
        }

        fn release(&self, reservations: &[Reservation]) -> Result<(), InventoryError> {
            self.released
                .fetch_add(reservations.len(), std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }

        fn commit(&self, _reservations: &[Reservation]) -> Result<(), InventoryError> {
            Ok(())
        }

        fn pending_reservations(&self) -> usize {
            0
        }
    }

    /// Ledger stub that is permanently down.
    #[derive(Debug, Default)]
    struct UnavailableLedger;

    impl PurchaseLedger for UnavailableLedger {
        fn record_units(
            &self,
            _user_id: UserId,
            _product_id: ProductId,
            _count: u64,
        ) -> Result<Vec<PurchaseUnitId>, LedgerError> {
            Err(LedgerError::Unavailable("ledger down".to_string()))
        }

        fn record_cart(
            &self,
            _user_id: UserId,
            _lines: &[(ProductId, u64)],
        ) -> Result<Vec<PurchaseUnitId>, LedgerError> {
            Err(LedgerError::Unavailable("ledger down".to_string()))
        }

        fn counts_by_product(&self) -> Result<HashMap<ProductId, u64>, LedgerError> {
            Err(LedgerError::Unavailable("ledger down".to_string()))
        }

        fn units_for_user(&self, _user_id: UserId) -> Result<Vec<PurchaseUnit>, LedgerError> {
            Err(LedgerError::Unavailable("ledger down".to_string()))
        }

        fn len(&self) -> Result<usize, LedgerError> {
            Err(LedgerError::Unavailable("ledger down".to_string()))
        }
    }

    #[test]
    fn ledger_outage_takes_the_same_rollback_path_as_insufficient_stock() {
        let inventory = Arc::new(CountingInventory::default());
        let engine = CheckoutTransactionManager::new(
            Arc::clone(&inventory),
            UnavailableLedger,
            MockPaymentAuthorizer::new(),
            InMemoryEventBus::new(),
        );

        let err = engine
            .checkout(
                UserId::new(),
                &request_for(
                    vec![
                        LineItem { product_id: ProductId::new(), quantity: 1 },
                        LineItem { product_id: ProductId::new(), quantity: 2 },
                    ],
                    TOKEN_SUCCESS,
                ),
            )
            .unwrap_err();

        assert!(matches!(err, CheckoutError::StoreUnavailable(_)));
        assert!(!err.is_client_error());
        // Both reservations were compensated before the call returned.
        assert_eq!(
            inventory.released.load(std::sync::atomic::Ordering::SeqCst),
            2
        );
    }

    #[test]
    fn ledger_outage_leaves_real_stock_unchanged() {
        let catalog = test_catalog();
        let product = seed_product(&catalog, "Widget", 5);
        let engine = CheckoutTransactionManager::new(
            Arc::clone(&catalog),
            UnavailableLedger,
            MockPaymentAuthorizer::new(),
            InMemoryEventBus::new(),
        );

        let err = engine
            .checkout(
                UserId::new(),
                &request_for(vec![LineItem { product_id: product, quantity: 3 }], TOKEN_SUCCESS),
            )
            .unwrap_err();

        assert!(matches!(err, CheckoutError::StoreUnavailable(_)));
        assert_eq!(catalog.get(product).unwrap().stock(), 5);
        assert_eq!(catalog.pending_reservations(), 0);
    }
}
