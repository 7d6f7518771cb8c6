use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use domain::{DomainEvent, SaleEvent};
use tokio::sync::RwLock;

use crate::{EventBus, EventConsumer, MessagingError, Result, consumer::deliver};

/// In-process event bus that delivers each event to its consumers before
/// `publish` returns.
///
/// Every accepted event is also recorded, which makes the bus convenient
/// for asserting on published events in tests.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    published: Arc<RwLock<Vec<SaleEvent>>>,
    consumers: Arc<RwLock<Vec<Arc<dyn EventConsumer>>>>,
    fail_on_publish: Arc<AtomicBool>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a consumer. Consumers run in registration order.
    pub async fn subscribe(&self, consumer: Arc<dyn EventConsumer>) {
        self.consumers.write().await.push(consumer);
    }

    /// Returns every event accepted so far, oldest first.
    pub async fn published(&self) -> Vec<SaleEvent> {
        self.published.read().await.clone()
    }

    /// Returns the type names of the accepted events, oldest first.
    pub async fn published_types(&self) -> Vec<&'static str> {
        self.published
            .read()
            .await
            .iter()
            .map(|e| e.event_type())
            .collect()
    }

    pub async fn clear(&self) {
        self.published.write().await.clear();
    }

    /// When set, `publish` rejects every event.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.fail_on_publish.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: SaleEvent) -> Result<()> {
        if self.fail_on_publish.load(Ordering::SeqCst) {
            return Err(MessagingError::Unavailable(
                "in-memory bus rejecting events".to_string(),
            ));
        }

        metrics::counter!("sales_events_published_total", "event_type" => event.event_type())
            .increment(1);
        self.published.write().await.push(event.clone());

        let consumers = self.consumers.read().await.clone();
        deliver(&consumers, &event).await;
        Ok(())
    }
}
