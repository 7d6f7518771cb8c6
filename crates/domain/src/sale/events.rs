//! Sale domain events.
//!
//! Events are derived from the persisted aggregate right before they are
//! published, so `occurred_at` is the construction time of the event.

use chrono::{DateTime, Utc};
use common::{SaleId, SaleItemId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Sale;
use crate::DomainEvent;

/// Events that can occur on a sale aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SaleEvent {
    /// Sale was created.
    SaleCreated(SaleSummaryData),

    /// Sale header and items were replaced.
    SaleModified(SaleSummaryData),

    /// Sale was cancelled.
    SaleCancelled(SaleCancelledData),

    /// Sale was deleted.
    SaleDeleted(SaleDeletedData),

    /// A single item was cancelled.
    SaleItemCancelled(SaleItemCancelledData),

    /// A single item was deleted.
    SaleItemDeleted(SaleItemDeletedData),
}

impl DomainEvent for SaleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SaleEvent::SaleCreated(_) => "SaleCreated",
            SaleEvent::SaleModified(_) => "SaleModified",
            SaleEvent::SaleCancelled(_) => "SaleCancelled",
            SaleEvent::SaleDeleted(_) => "SaleDeleted",
            SaleEvent::SaleItemCancelled(_) => "SaleItemCancelled",
            SaleEvent::SaleItemDeleted(_) => "SaleItemDeleted",
        }
    }

    fn sale_id(&self) -> SaleId {
        match self {
            SaleEvent::SaleCreated(data) | SaleEvent::SaleModified(data) => data.sale_id,
            SaleEvent::SaleCancelled(data) => data.sale_id,
            SaleEvent::SaleDeleted(data) => data.sale_id,
            SaleEvent::SaleItemCancelled(data) => data.sale_id,
            SaleEvent::SaleItemDeleted(data) => data.sale_id,
        }
    }
}

/// Data for SaleCreated and SaleModified events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleSummaryData {
    pub sale_id: SaleId,
    pub customer_id: Uuid,
    pub branch_id: Uuid,
    pub total_amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Data for SaleCancelled event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleCancelledData {
    pub sale_id: SaleId,
    pub occurred_at: DateTime<Utc>,
}

/// Data for SaleDeleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleDeletedData {
    pub sale_id: SaleId,
    pub occurred_at: DateTime<Utc>,
}

/// Data for SaleItemCancelled event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItemCancelledData {
    pub sale_id: SaleId,
    pub item_id: SaleItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Data for SaleItemDeleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItemDeletedData {
    pub sale_id: SaleId,
    pub item_id: SaleItemId,
    pub occurred_at: DateTime<Utc>,
}

// Convenience constructors for events
impl SaleEvent {
    fn summary(sale: &Sale) -> SaleSummaryData {
        SaleSummaryData {
            sale_id: sale.id(),
            customer_id: sale.customer().id(),
            branch_id: sale.branch().id(),
            total_amount: sale.total_amount(),
            occurred_at: Utc::now(),
        }
    }

    pub fn sale_created(sale: &Sale) -> Self {
        SaleEvent::SaleCreated(Self::summary(sale))
    }

    pub fn sale_modified(sale: &Sale) -> Self {
        SaleEvent::SaleModified(Self::summary(sale))
    }

    pub fn sale_cancelled(sale: &Sale) -> Self {
        SaleEvent::SaleCancelled(SaleCancelledData {
            sale_id: sale.id(),
            occurred_at: Utc::now(),
        })
    }

    pub fn sale_deleted(sale: &Sale) -> Self {
        SaleEvent::SaleDeleted(SaleDeletedData {
            sale_id: sale.id(),
            occurred_at: Utc::now(),
        })
    }

    pub fn sale_item_cancelled(sale: &Sale, item_id: SaleItemId) -> Self {
        SaleEvent::SaleItemCancelled(SaleItemCancelledData {
            sale_id: sale.id(),
            item_id,
            occurred_at: Utc::now(),
        })
    }

    pub fn sale_item_deleted(sale: &Sale, item_id: SaleItemId) -> Self {
        SaleEvent::SaleItemDeleted(SaleItemDeletedData {
            sale_id: sale.id(),
            item_id,
            occurred_at: Utc::now(),
        })
    }

    /// Item id carried by item-level events.
    pub fn item_id(&self) -> Option<SaleItemId> {
        match self {
            SaleEvent::SaleItemCancelled(data) => Some(data.item_id),
            SaleEvent::SaleItemDeleted(data) => Some(data.item_id),
            _ => None,
        }
    }
}
