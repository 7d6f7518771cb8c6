use std::sync::Arc;
use std::time::Duration;

use cache::{CacheManager, CacheManagerExt, SALES_LIST_TAG};
use common::{SaleId, Version};
use domain::{DomainEvent, ExternalReference, Sale, SaleEvent, SaleItem};
use messaging::EventBus;
use sale_store::SaleRepository;
use serde::{Serialize, de::DeserializeOwned};

use crate::commands::{
    CancelSaleCommand, CancelSaleItemCommand, CreateSaleCommand, DeleteSaleCommand,
    DeleteSaleItemCommand, GetSaleQuery, GetSalesQuery, SaleItemCommand, UpdateSaleCommand,
};
use crate::error::{ApplicationError, Result};
use crate::results::{ItemDeletion, PaginatedList, SaleResult};

/// How long read results stay cached.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Sale use cases: validate, load, mutate, persist, publish.
///
/// Events are published only after the repository call succeeded. A failed
/// publish is logged and does not undo the write. The cache is fail-open:
/// when it is unreachable, reads go to the repository.
pub struct SaleService {
    repository: Arc<dyn SaleRepository>,
    cache: Arc<dyn CacheManager>,
    bus: Arc<dyn EventBus>,
    cache_ttl: Duration,
}

impl SaleService {
    pub fn new(
        repository: Arc<dyn SaleRepository>,
        cache: Arc<dyn CacheManager>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            repository,
            cache,
            bus,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Creates a sale and publishes `SaleCreated`.
    #[tracing::instrument(skip(self, command), fields(customer_id = %command.customer_id))]
    pub async fn create_sale(&self, command: CreateSaleCommand) -> Result<SaleResult> {
        command.validate()?;

        let customer = ExternalReference::new(command.customer_id, command.customer_name)?;
        let branch = ExternalReference::new(command.branch_id, command.branch_name)?;
        let mut sale = Sale::new(customer, branch, 0);
        for item in build_items(&command.items)? {
            sale.add_item(item)?;
        }

        let number = self.repository.create(&sale).await?;
        sale.assign_number(number);
        sale.set_version(Version::first());

        metrics::counter!("sales_commands_total", "command" => "create").increment(1);
        tracing::info!(sale_id = %sale.id(), number, total = %sale.total_amount(), "sale created");

        self.publish_all(vec![SaleEvent::sale_created(&sale)]).await;
        Ok(SaleResult::from(&sale))
    }

    /// Replaces the customer, branch and items of a sale and publishes
    /// `SaleModified`.
    #[tracing::instrument(skip(self, command), fields(sale_id = %command.sale_id))]
    pub async fn update_sale(&self, command: UpdateSaleCommand) -> Result<SaleResult> {
        command.validate()?;

        let mut sale = self.load_for_update(command.sale_id).await?;
        let customer = ExternalReference::new(command.customer_id, command.customer_name)?;
        let branch = ExternalReference::new(command.branch_id, command.branch_name)?;
        sale.update(customer, branch, build_items(&command.items)?)?;

        let version = self.repository.update(&sale).await?;
        sale.set_version(version);

        metrics::counter!("sales_commands_total", "command" => "update").increment(1);
        tracing::info!(sale_id = %sale.id(), %version, "sale updated");
        self.publish_all(vec![SaleEvent::sale_modified(&sale)]).await;
        Ok(SaleResult::from(&sale))
    }

    /// Cancels a sale and all of its items.
    ///
    /// Publishes `SaleCancelled` followed by one `SaleItemCancelled` per item.
    #[tracing::instrument(skip(self), fields(sale_id = %command.sale_id))]
    pub async fn cancel_sale(&self, command: CancelSaleCommand) -> Result<SaleResult> {
        command.validate()?;

        let mut sale = self.load_for_update(command.sale_id).await?;
        sale.cancel()?;

        let version = self.repository.update(&sale).await?;
        sale.set_version(version);

        metrics::counter!("sales_commands_total", "command" => "cancel").increment(1);
        tracing::info!(sale_id = %sale.id(), items = sale.item_count(), "sale cancelled");

        let mut events = vec![SaleEvent::sale_cancelled(&sale)];
        events.extend(
            sale.items()
                .iter()
                .map(|item| SaleEvent::sale_item_cancelled(&sale, item.id())),
        );
        self.publish_all(events).await;
        Ok(SaleResult::from(&sale))
    }

    /// Cancels one item. If no active item remains, the sale is cancelled
    /// too and `SaleCancelled` follows the `SaleItemCancelled` event.
    #[tracing::instrument(skip(self), fields(sale_id = %command.sale_id, item_id = %command.item_id))]
    pub async fn cancel_sale_item(&self, command: CancelSaleItemCommand) -> Result<SaleResult> {
        command.validate()?;

        let mut sale = self.load_for_update(command.sale_id).await?;
        if sale.get_item(command.item_id).is_none() {
            return Err(ApplicationError::NotFound(format!(
                "Item with ID {} not found for Sale ID {}",
                command.item_id, command.sale_id
            )));
        }
        let sale_cancelled = sale.cancel_item(command.item_id)?;

        let version = self.repository.update(&sale).await?;
        sale.set_version(version);

        metrics::counter!("sales_commands_total", "command" => "cancel_item").increment(1);
        tracing::info!(sale_id = %sale.id(), item_id = %command.item_id, sale_cancelled, "sale item cancelled");

        let mut events = vec![SaleEvent::sale_item_cancelled(&sale, command.item_id)];
        if sale_cancelled {
            events.push(SaleEvent::sale_cancelled(&sale));
        }
        self.publish_all(events).await;
        Ok(SaleResult::from(&sale))
    }

    /// Deletes a sale and publishes `SaleDeleted` followed by one
    /// `SaleItemDeleted` per item.
    #[tracing::instrument(skip(self), fields(sale_id = %command.sale_id))]
    pub async fn delete_sale(&self, command: DeleteSaleCommand) -> Result<()> {
        command.validate()?;

        let sale = self.load_for_update(command.sale_id).await?;
        self.repository.delete(&sale).await?;

        metrics::counter!("sales_commands_total", "command" => "delete").increment(1);
        tracing::info!(sale_id = %sale.id(), "sale deleted");

        self.publish_all(deletion_events(&sale)).await;
        Ok(())
    }

    /// Removes one item. Removing the last item deletes the whole sale.
    #[tracing::instrument(skip(self), fields(sale_id = %command.sale_id, item_id = %command.item_id))]
    pub async fn delete_sale_item(&self, command: DeleteSaleItemCommand) -> Result<ItemDeletion> {
        command.validate()?;

        let mut sale = self.load_for_update(command.sale_id).await?;
        let removed = sale.remove_item(command.item_id)?;

        if sale.has_items() {
            let version = self.repository.update(&sale).await?;
            sale.set_version(version);

            metrics::counter!("sales_commands_total", "command" => "delete_item").increment(1);
            tracing::info!(sale_id = %sale.id(), item_id = %removed.id(), "sale item deleted");
            self.publish_all(vec![SaleEvent::sale_item_deleted(&sale, removed.id())])
                .await;
            return Ok(ItemDeletion::ItemRemoved(SaleResult::from(&sale)));
        }

        self.repository.delete(&sale).await?;

        metrics::counter!("sales_commands_total", "command" => "delete_item").increment(1);
        tracing::info!(sale_id = %sale.id(), item_id = %removed.id(), "last item deleted, sale removed");
        self.publish_all(vec![
            SaleEvent::sale_deleted(&sale),
            SaleEvent::sale_item_deleted(&sale, removed.id()),
        ])
        .await;
        Ok(ItemDeletion::SaleDeleted)
    }

    /// Reads a single sale, through the cache.
    #[tracing::instrument(skip(self), fields(sale_id = %query.sale_id))]
    pub async fn get_sale(&self, query: GetSaleQuery) -> Result<SaleResult> {
        query.validate()?;

        let key = query.sale_id.to_string();
        if let Some(cached) = self.cache_read::<SaleResult>(&key).await {
            return Ok(cached);
        }

        let sale = self
            .repository
            .get_by_id(query.sale_id)
            .await?
            .ok_or_else(|| sale_not_found(query.sale_id))?;
        let result = SaleResult::from(&sale);

        self.cache_write(&key, &result, None).await;
        Ok(result)
    }

    /// Reads one page of sales, through the cache.
    ///
    /// Non-empty pages are cached under a key built from every query
    /// parameter and tagged so any sale change drops them all at once.
    #[tracing::instrument(skip(self))]
    pub async fn get_sales(&self, query: GetSalesQuery) -> Result<PaginatedList<SaleResult>> {
        let (page, size) = query.paging()?;

        let key = query.cache_key();
        if let Some(cached) = self.cache_read::<PaginatedList<SaleResult>>(&key).await {
            return Ok(cached);
        }

        let found = self
            .repository
            .get_paginated(page, size, &query.criteria())
            .await?;

        let list = PaginatedList::new(
            found.sales.iter().map(SaleResult::from).collect(),
            found.total_count,
            page,
            size,
        );
        if !list.is_empty() {
            self.cache_write(&key, &list, Some(SALES_LIST_TAG)).await;
        }
        Ok(list)
    }

    async fn load_for_update(&self, id: SaleId) -> Result<Sale> {
        self.repository
            .get_by_id_for_update(id)
            .await?
            .ok_or_else(|| sale_not_found(id))
    }

    async fn publish_all(&self, events: Vec<SaleEvent>) {
        for event in events {
            let event_type = event.event_type();
            if let Err(e) = self.bus.publish(event).await {
                metrics::counter!("sales_events_publish_failures_total", "event_type" => event_type)
                    .increment(1);
                tracing::warn!(event_type, error = %e, "failed to publish event");
            }
        }
    }

    async fn cache_read<T: DeserializeOwned + Send>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(value)) => {
                metrics::counter!("sales_cache_hits_total").increment(1);
                tracing::debug!(key, "cache hit");
                Some(value)
            }
            Ok(None) => {
                metrics::counter!("sales_cache_misses_total").increment(1);
                None
            }
            Err(e) => {
                metrics::counter!("sales_cache_errors_total").increment(1);
                tracing::warn!(key, error = %e, "cache read failed, falling back to repository");
                None
            }
        }
    }

    async fn cache_write<T: Serialize + Sync>(&self, key: &str, value: &T, tag: Option<&str>) {
        if let Err(e) = self.cache.set(key, value, Some(self.cache_ttl)).await {
            metrics::counter!("sales_cache_errors_total").increment(1);
            tracing::warn!(key, error = %e, "cache write failed");
            return;
        }
        if let Some(tag) = tag
            && let Err(e) = self.cache.tag_key(key, tag).await
        {
            metrics::counter!("sales_cache_errors_total").increment(1);
            tracing::warn!(key, tag, error = %e, "cache tagging failed");
        }
    }
}

fn build_items(items: &[SaleItemCommand]) -> Result<Vec<SaleItem>> {
    items
        .iter()
        .map(|item| item.to_sale_item().map_err(ApplicationError::from))
        .collect()
}

fn deletion_events(sale: &Sale) -> Vec<SaleEvent> {
    let mut events = vec![SaleEvent::sale_deleted(sale)];
    events.extend(
        sale.items()
            .iter()
            .map(|item| SaleEvent::sale_item_deleted(sale, item.id())),
    );
    events
}

fn sale_not_found(id: SaleId) -> ApplicationError {
    ApplicationError::NotFound(format!("Sale with ID {id} not found."))
}
