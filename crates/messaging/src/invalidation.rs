//! Cache invalidation driven by sale events.

use std::sync::Arc;

use async_trait::async_trait;
use cache::{CacheManager, SALES_LIST_TAG};
use domain::{DomainEvent, SaleEvent};

use crate::{EventConsumer, Result};

/// Cache entries made stale by an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    /// Single-sale entry to remove.
    pub entity_key: String,
    /// Tags whose members must all be dropped.
    pub tags: &'static [&'static str],
}

/// Maps an event to the cache entries it invalidates.
///
/// Every sale event can change both the sale itself and any list page that
/// shows it, so every kind drops the sale entry and the list tag.
pub fn invalidation_for(event: &SaleEvent) -> Invalidation {
    let tags: &'static [&'static str] = match event {
        SaleEvent::SaleCreated(_)
        | SaleEvent::SaleModified(_)
        | SaleEvent::SaleCancelled(_)
        | SaleEvent::SaleDeleted(_)
        | SaleEvent::SaleItemCancelled(_)
        | SaleEvent::SaleItemDeleted(_) => &[SALES_LIST_TAG],
    };
    Invalidation {
        entity_key: event.sale_id().to_string(),
        tags,
    }
}

/// Logs each sale event and invalidates the cached reads it affects.
pub struct CacheInvalidationConsumer {
    cache: Arc<dyn CacheManager>,
}

impl CacheInvalidationConsumer {
    pub fn new(cache: Arc<dyn CacheManager>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl EventConsumer for CacheInvalidationConsumer {
    fn name(&self) -> &'static str {
        "CacheInvalidation"
    }

    #[tracing::instrument(skip(self, event), fields(event_type = event.event_type(), sale_id = %event.sale_id()))]
    async fn handle(&self, event: &SaleEvent) -> Result<()> {
        tracing::info!(item_id = ?event.item_id(), "sale event received");

        let invalidation = invalidation_for(event);
        self.cache.remove_key(&invalidation.entity_key).await?;
        for tag in invalidation.tags {
            self.cache.invalidate_tag(tag).await?;
        }

        metrics::counter!("sales_cache_invalidations_total", "event_type" => event.event_type())
            .increment(1);
        Ok(())
    }
}
