//! Product catalog: the products themselves, the stock store behind the
//! inventory reservation protocol, and the read-side aggregator.
//!
//! Stock lives inside [`Product`] records and is mutated exclusively through
//! the [`storefront_inventory::InventoryStore`] implementation on
//! [`ProductCatalog`] — the conditional-decrement critical section is the
//! only code path that ever lowers it.

pub mod aggregator;
pub mod catalog;
pub mod event;
pub mod product;

pub use aggregator::{CatalogAggregator, ProductListing};
pub use catalog::ProductCatalog;
pub use event::CatalogEvent;
pub use product::{NewProduct, Product};
