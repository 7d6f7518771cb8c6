use async_trait::async_trait;
use common::{SaleId, Version};
use domain::Sale;

use crate::{Result, SaleSearchCriteria};

/// A page of sales plus the total number of sales matching the criteria.
#[derive(Debug, Clone)]
pub struct SalePage {
    pub sales: Vec<Sale>,
    pub total_count: u64,
}

/// Persistence for the sale aggregate.
///
/// A sale is always read and written whole: the header together with every
/// item. Writes are atomic per sale. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait SaleRepository: Send + Sync {
    /// Loads a sale with all of its items.
    async fn get_by_id(&self, id: SaleId) -> Result<Option<Sale>>;

    /// Loads a sale that the caller intends to modify.
    ///
    /// The returned aggregate carries its stored version; [`update`] and
    /// [`delete`] reject the write if someone else changed the sale in between.
    ///
    /// [`update`]: SaleRepository::update
    /// [`delete`]: SaleRepository::delete
    async fn get_by_id_for_update(&self, id: SaleId) -> Result<Option<Sale>>;

    /// Returns one page of sales. Pages are 1-based.
    async fn get_paginated(
        &self,
        page: u32,
        size: u32,
        criteria: &SaleSearchCriteria,
    ) -> Result<SalePage>;

    /// Inserts a new sale and returns its assigned business number.
    ///
    /// The stored sale starts at [`Version::first`].
    async fn create(&self, sale: &Sale) -> Result<i64>;

    /// Replaces the stored sale (header and items) and returns the new version.
    ///
    /// Fails with `ConcurrencyConflict` if the stored version differs from
    /// `sale.version()`.
    async fn update(&self, sale: &Sale) -> Result<Version>;

    /// Deletes the sale and its items.
    ///
    /// Fails with `ConcurrencyConflict` if the stored version differs from
    /// `sale.version()`.
    async fn delete(&self, sale: &Sale) -> Result<()>;
}

/// Offset of the first row of a 1-based page.
pub(crate) fn page_offset(page: u32, size: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(size)
}
