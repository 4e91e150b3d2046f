use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{ProductId, PurchaseUnitId, UserId};
use storefront_events::Event;

/// Checkout domain events.
///
/// Exactly one event is published per transaction: `Committed` describes the
/// whole purchase set (never one event per unit); `Rejected` is audit-only
/// and is never published for a transaction that committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutEvent {
    Committed {
        user_id: UserId,
        /// (product, quantity) per line item, in request order.
        lines: Vec<(ProductId, u64)>,
        purchase_unit_ids: Vec<PurchaseUnitId>,
        occurred_at: DateTime<Utc>,
    },
    Rejected {
        user_id: UserId,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for CheckoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CheckoutEvent::Committed { .. } => "checkout.committed",
            CheckoutEvent::Rejected { .. } => "checkout.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CheckoutEvent::Committed { occurred_at, .. }
            | CheckoutEvent::Rejected { occurred_at, .. } => *occurred_at,
        }
    }
}
