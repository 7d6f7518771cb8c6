//! Read models returned by the use cases.
//!
//! These are what the cache stores, so they round-trip through JSON.

use chrono::{DateTime, Utc};
use domain::{Sale, SaleItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItemResult {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_percentage: Decimal,
    pub total_amount: Decimal,
    pub is_cancelled: bool,
}

impl From<&SaleItem> for SaleItemResult {
    fn from(item: &SaleItem) -> Self {
        Self {
            id: item.id().as_uuid(),
            product_id: item.product().id(),
            product_name: item.product().description().to_string(),
            quantity: item.quantity().value(),
            unit_price: item.unit_price().value(),
            discount_percentage: item.discount_percentage(),
            total_amount: item.total_amount().value(),
            is_cancelled: item.is_cancelled(),
        }
    }
}

/// Full view of a sale with its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleResult {
    pub id: Uuid,
    pub number: i64,
    pub created_date: DateTime<Utc>,
    pub is_cancelled: bool,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub branch_id: Uuid,
    pub branch_name: String,
    pub total_amount: Decimal,
    pub items: Vec<SaleItemResult>,
}

impl From<&Sale> for SaleResult {
    fn from(sale: &Sale) -> Self {
        Self {
            id: sale.id().as_uuid(),
            number: sale.number(),
            created_date: sale.created_date(),
            is_cancelled: sale.is_cancelled(),
            customer_id: sale.customer().id(),
            customer_name: sale.customer().description().to_string(),
            branch_id: sale.branch().id(),
            branch_name: sale.branch().description().to_string(),
            total_amount: sale.total_amount(),
            items: sale.items().iter().map(SaleItemResult::from).collect(),
        }
    }
}

/// One page of results plus the numbers a client needs to page further.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedList<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
    pub page_size: u32,
    pub total_count: u64,
}

impl<T> PaginatedList<T> {
    /// Page number and size are clamped to at least 1.
    pub fn new(data: Vec<T>, total_count: u64, current_page: u32, page_size: u32) -> Self {
        let current_page = current_page.max(1);
        let page_size = page_size.max(1);
        let total_pages = total_count.div_ceil(u64::from(page_size));
        Self {
            data,
            current_page,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            page_size,
            total_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// Outcome of removing one item from a sale.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemDeletion {
    /// The item was removed; the sale remains with its other items.
    ItemRemoved(SaleResult),
    /// The item was the last one, so the sale itself was deleted.
    SaleDeleted,
}
