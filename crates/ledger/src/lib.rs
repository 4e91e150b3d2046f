//! Purchase ledger: append-only record of purchased units.
//!
//! One [`PurchaseUnit`] row exists per unit bought — buying quantity 3 of a
//! product appends 3 rows. The ledger exposes no mutation or deletion API at
//! all; immutability is enforced by construction, not by discipline.

pub mod in_memory;
pub mod unit;

pub use in_memory::InMemoryPurchaseLedger;
pub use unit::{LedgerError, PurchaseLedger, PurchaseUnit};
