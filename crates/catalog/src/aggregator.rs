use serde::{Deserialize, Serialize};

use storefront_events::EventBus;
use storefront_ledger::{LedgerError, PurchaseLedger};

use crate::catalog::ProductCatalog;
use crate::event::CatalogEvent;
use crate::product::Product;

/// One row of the product listing: the product plus how many units of it
/// have ever been purchased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductListing {
    pub product: Product,
    pub purchase_count: u64,
}

/// Read-side aggregation over catalog + ledger.
///
/// The grouping happens inside the ledger in a single pass; this joins the
/// result against one catalog scan. Total work is O(products + purchases) —
/// there is exactly one ledger query no matter how many products exist,
/// never a per-product lookup.
#[derive(Debug, Default)]
pub struct CatalogAggregator;

impl CatalogAggregator {
    pub fn list_products<B, L>(
        catalog: &ProductCatalog<B>,
        ledger: &L,
    ) -> Result<Vec<ProductListing>, LedgerError>
    where
        B: EventBus<CatalogEvent>,
        L: PurchaseLedger + ?Sized,
    {
        let counts = ledger.counts_by_product()?;

        Ok(catalog
            .list()
            .into_iter()
            .map(|product| {
                let purchase_count = counts.get(&product.id_typed()).copied().unwrap_or(0);
                ProductListing {
                    product,
                    purchase_count,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use storefront_core::{ProductId, PurchaseUnitId, UserId};
    use storefront_events::InMemoryEventBus;
    use storefront_ledger::{InMemoryPurchaseLedger, PurchaseUnit};

    use crate::product::NewProduct;

    use super::*;

    fn test_catalog() -> ProductCatalog<InMemoryEventBus<CatalogEvent>> {
        ProductCatalog::new(InMemoryEventBus::new())
    }

    fn seed_product(
        catalog: &ProductCatalog<InMemoryEventBus<CatalogEvent>>,
        name: &str,
    ) -> ProductId {
        catalog
            .create(NewProduct {
                name: name.to_string(),
                description: "desc".to_string(),
                price: 1000,
                category: "cat".to_string(),
                stock: 10,
            })
            .unwrap()
            .id_typed()
    }

    #[test]
    fn listing_reports_per_product_purchase_counts() {
        let catalog = test_catalog();
        let ledger = InMemoryPurchaseLedger::new();
        let user = UserId::new();

        let product_a = seed_product(&catalog, "Product A");
        let product_b = seed_product(&catalog, "Product B");

        ledger.record_units(user, product_a, 3).unwrap();
        ledger.record_units(user, product_b, 1).unwrap();

        let listings = CatalogAggregator::list_products(&catalog, &ledger).unwrap();
        assert_eq!(listings.len(), 2);

        let count_of = |id: ProductId| {
            listings
                .iter()
                .find(|l| l.product.id_typed() == id)
                .unwrap()
                .purchase_count
        };
        assert_eq!(count_of(product_a), 3);
        assert_eq!(count_of(product_b), 1);
    }

    #[test]
    fn unpurchased_products_list_with_zero_count() {
        let catalog = test_catalog();
        let ledger = InMemoryPurchaseLedger::new();

        seed_product(&catalog, "Lonely");

        let listings = CatalogAggregator::list_products(&catalog, &ledger).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].purchase_count, 0);
    }

    /// Ledger stub that counts how many grouping queries the aggregator
    /// issues.
    #[derive(Default)]
    struct QueryCountingLedger {
        grouping_queries: AtomicUsize,
    }

    impl PurchaseLedger for QueryCountingLedger {
        fn record_units(
            &self,
            _user_id: UserId,
            _product_id: ProductId,
            _count: u64,
        ) -> Result<Vec<PurchaseUnitId>, LedgerError> {
            Ok(vec![])
        }

        fn counts_by_product(&self) -> Result<HashMap<ProductId, u64>, LedgerError> {
            self.grouping_queries.fetch_add(1, Ordering::SeqCst);
            Ok(HashMap::new())
        }

        fn units_for_user(&self, _user_id: UserId) -> Result<Vec<PurchaseUnit>, LedgerError> {
            Ok(vec![])
        }

        fn len(&self) -> Result<usize, LedgerError> {
            Ok(0)
        }
    }

    #[test]
    fn listing_issues_exactly_one_ledger_query_regardless_of_product_count() {
        let catalog = test_catalog();
        let ledger = QueryCountingLedger::default();

        for i in 0..25 {
            seed_product(&catalog, &format!("Product {i}"));
        }

        let listings = CatalogAggregator::list_products(&catalog, &ledger).unwrap();
        assert_eq!(listings.len(), 25);
        assert_eq!(ledger.grouping_queries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listing_order_is_deterministic() {
        let catalog = test_catalog();
        let ledger = InMemoryPurchaseLedger::new();

        for i in 0..5 {
            seed_product(&catalog, &format!("Product {i}"));
        }

        let first = CatalogAggregator::list_products(&catalog, &ledger).unwrap();
        let second = CatalogAggregator::list_products(&catalog, &ledger).unwrap();
        assert_eq!(first, second);
    }
}
