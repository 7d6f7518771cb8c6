use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use common::{SaleId, Version};
use domain::Sale;
use tokio::sync::RwLock;

use crate::{
    Result, SalePage, SaleRepository, SaleSearchCriteria, SaleSortField, SortDirection,
    StoreError, repository::page_offset,
};

/// In-memory sale repository.
///
/// Provides the same semantics as the PostgreSQL implementation: numbers
/// are assigned on create, and version checks guard update and delete.
/// Also exposes a few hooks for tests.
#[derive(Clone)]
pub struct InMemorySaleRepository {
    sales: Arc<RwLock<HashMap<SaleId, Sale>>>,
    next_number: Arc<AtomicI64>,
    paginated_queries: Arc<AtomicUsize>,
    fail_on_write: Arc<AtomicBool>,
}

impl Default for InMemorySaleRepository {
    fn default() -> Self {
        Self {
            sales: Arc::default(),
            next_number: Arc::new(AtomicI64::new(1)),
            paginated_queries: Arc::default(),
            fail_on_write: Arc::default(),
        }
    }
}

impl InMemorySaleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sales.
    pub async fn sale_count(&self) -> usize {
        self.sales.read().await.len()
    }

    /// Returns how many times `get_paginated` has been called.
    pub fn paginated_query_count(&self) -> usize {
        self.paginated_queries.load(AtomicOrdering::SeqCst)
    }

    /// When set, every write fails with `StoreError::Unavailable`.
    pub fn set_fail_on_write(&self, fail: bool) {
        self.fail_on_write.store(fail, AtomicOrdering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_on_write.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }

    fn check_version(stored: &Sale, sale: &Sale) -> Result<()> {
        if stored.version() != sale.version() {
            return Err(StoreError::ConcurrencyConflict {
                sale_id: sale.id(),
                expected: sale.version(),
                actual: stored.version(),
            });
        }
        Ok(())
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches(sale: &Sale, criteria: &SaleSearchCriteria) -> bool {
    if let Some(customer) = SaleSearchCriteria::effective(&criteria.customer_name)
        && !contains_ignore_case(sale.customer().description(), customer)
    {
        return false;
    }
    if let Some(branch) = SaleSearchCriteria::effective(&criteria.branch_name)
        && !contains_ignore_case(sale.branch().description(), branch)
    {
        return false;
    }
    if let Some(product) = SaleSearchCriteria::effective(&criteria.product_name)
        && !sale
            .items()
            .iter()
            .any(|item| contains_ignore_case(item.product().description(), product))
    {
        return false;
    }
    true
}

fn compare(a: &Sale, b: &Sale, criteria: &SaleSearchCriteria) -> Ordering {
    let ordering = match criteria.sort_field {
        Some(SaleSortField::CreatedDate) => a.created_date().cmp(&b.created_date()),
        Some(SaleSortField::CustomerName) => {
            a.customer().description().cmp(b.customer().description())
        }
        Some(SaleSortField::BranchName) => a.branch().description().cmp(b.branch().description()),
        None => Ordering::Equal,
    };
    let ordering = match criteria.sort_direction.unwrap_or_default() {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    };
    // ties always fall back to number order
    ordering.then_with(|| a.number().cmp(&b.number()))
}

#[async_trait]
impl SaleRepository for InMemorySaleRepository {
    async fn get_by_id(&self, id: SaleId) -> Result<Option<Sale>> {
        Ok(self.sales.read().await.get(&id).cloned())
    }

    async fn get_by_id_for_update(&self, id: SaleId) -> Result<Option<Sale>> {
        self.get_by_id(id).await
    }

    async fn get_paginated(
        &self,
        page: u32,
        size: u32,
        criteria: &SaleSearchCriteria,
    ) -> Result<SalePage> {
        self.paginated_queries.fetch_add(1, AtomicOrdering::SeqCst);

        let store = self.sales.read().await;
        let mut matching: Vec<&Sale> = store.values().filter(|s| matches(s, criteria)).collect();
        matching.sort_by(|a, b| compare(a, b, criteria));

        let total_count = matching.len() as u64;
        let sales = matching
            .into_iter()
            .skip(page_offset(page, size) as usize)
            .take(size as usize)
            .cloned()
            .collect();

        Ok(SalePage { sales, total_count })
    }

    async fn create(&self, sale: &Sale) -> Result<i64> {
        self.check_writable()?;
        let mut store = self.sales.write().await;

        if let Some(existing) = store.get(&sale.id()) {
            return Err(StoreError::ConcurrencyConflict {
                sale_id: sale.id(),
                expected: Version::initial(),
                actual: existing.version(),
            });
        }

        let number = self.next_number.fetch_add(1, AtomicOrdering::SeqCst);
        let mut stored = sale.clone();
        stored.assign_number(number);
        stored.set_version(Version::first());
        store.insert(stored.id(), stored);

        Ok(number)
    }

    async fn update(&self, sale: &Sale) -> Result<Version> {
        self.check_writable()?;
        let mut store = self.sales.write().await;

        let stored = store
            .get(&sale.id())
            .ok_or(StoreError::NotFound(sale.id()))?;
        Self::check_version(stored, sale)?;

        let new_version = sale.version().next();
        let mut updated = sale.clone();
        updated.set_version(new_version);
        store.insert(updated.id(), updated);

        Ok(new_version)
    }

    async fn delete(&self, sale: &Sale) -> Result<()> {
        self.check_writable()?;
        let mut store = self.sales.write().await;

        let stored = store
            .get(&sale.id())
            .ok_or(StoreError::NotFound(sale.id()))?;
        Self::check_version(stored, sale)?;

        store.remove(&sale.id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{ExternalReference, Money, Quantity, SaleItem};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn reference(name: &str) -> ExternalReference {
        ExternalReference::new(Uuid::new_v4(), name).unwrap()
    }

    fn sale(customer: &str, branch: &str, product: &str) -> Sale {
        let mut sale = Sale::new(reference(customer), reference(branch), 0);
        sale.add_item(
            SaleItem::new(
                reference(product),
                Quantity::new(2).unwrap(),
                Money::new(Decimal::from(10)).unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
        sale
    }

    async fn stored(repo: &InMemorySaleRepository, mut sale: Sale) -> Sale {
        let number = repo.create(&sale).await.unwrap();
        sale.assign_number(number);
        sale.set_version(Version::first());
        sale
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_numbers() {
        let repo = InMemorySaleRepository::new();
        let first = stored(&repo, sale("Ana", "Main", "Beer")).await;
        let second = stored(&repo, sale("Bob", "Main", "Beer")).await;

        assert_eq!(first.number(), 1);
        assert_eq!(second.number(), 2);

        let loaded = repo.get_by_id(first.id()).await.unwrap().unwrap();
        assert_eq!(loaded.number(), 1);
        assert_eq!(loaded.version(), Version::first());
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let repo = InMemorySaleRepository::new();
        let mut sale = stored(&repo, sale("Ana", "Main", "Beer")).await;

        sale.cancel().unwrap();
        let version = repo.update(&sale).await.unwrap();
        assert_eq!(version, Version::new(2));

        let loaded = repo.get_by_id(sale.id()).await.unwrap().unwrap();
        assert!(loaded.is_cancelled());
        assert_eq!(loaded.version(), Version::new(2));
    }

    #[tokio::test]
    async fn test_stale_update_is_rejected() {
        let repo = InMemorySaleRepository::new();
        let sale = stored(&repo, sale("Ana", "Main", "Beer")).await;

        let mut first = repo.get_by_id_for_update(sale.id()).await.unwrap().unwrap();
        let mut second = repo.get_by_id_for_update(sale.id()).await.unwrap().unwrap();

        first.cancel().unwrap();
        repo.update(&first).await.unwrap();

        let item_id = second.items()[0].id();
        second.cancel_item(item_id).unwrap();
        let err = repo.update(&second).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::ConcurrencyConflict { expected, actual, .. }
                if expected == Version::first() && actual == Version::new(2)
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_sale() {
        let repo = InMemorySaleRepository::new();
        let sale = stored(&repo, sale("Ana", "Main", "Beer")).await;

        repo.delete(&sale).await.unwrap();
        assert!(repo.get_by_id(sale.id()).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&sale).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_paginated_filters_and_sorts() {
        let repo = InMemorySaleRepository::new();
        stored(&repo, sale("Charlie", "North", "Lager")).await;
        stored(&repo, sale("alice", "South", "Stout")).await;
        stored(&repo, sale("Bob", "North", "Pale Lager")).await;

        let criteria = SaleSearchCriteria::new()
            .branch_name("north")
            .sort_by(SaleSortField::CustomerName, SortDirection::Descending);
        let page = repo.get_paginated(1, 10, &criteria).await.unwrap();
        let names: Vec<&str> = page
            .sales
            .iter()
            .map(|s| s.customer().description())
            .collect();
        assert_eq!(page.total_count, 2);
        assert_eq!(names, vec!["Charlie", "Bob"]);

        let criteria = SaleSearchCriteria::new().product_name("LAGER");
        let page = repo.get_paginated(1, 1, &criteria).await.unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.sales.len(), 1);
        assert_eq!(page.sales[0].number(), 1);

        let page = repo.get_paginated(2, 1, &criteria).await.unwrap();
        assert_eq!(page.sales[0].number(), 3);

        assert_eq!(repo.paginated_query_count(), 3);
    }

    #[tokio::test]
    async fn test_fail_on_write() {
        let repo = InMemorySaleRepository::new();
        repo.set_fail_on_write(true);

        let err = repo.create(&sale("Ana", "Main", "Beer")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(repo.sale_count().await, 0);
    }
}
