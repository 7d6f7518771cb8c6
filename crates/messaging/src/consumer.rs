use async_trait::async_trait;
use domain::SaleEvent;

use crate::Result;

/// Something that reacts to published sale events.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// Returns the name of this consumer, used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Handles a single event.
    async fn handle(&self, event: &SaleEvent) -> Result<()>;
}

/// Delivers an event to every consumer. A failing consumer is logged and
/// does not stop delivery to the others.
pub(crate) async fn deliver(consumers: &[std::sync::Arc<dyn EventConsumer>], event: &SaleEvent) {
    use domain::DomainEvent;

    for consumer in consumers {
        if let Err(e) = consumer.handle(event).await {
            metrics::counter!("sales_event_consumer_failures_total", "consumer" => consumer.name())
                .increment(1);
            tracing::warn!(
                consumer = consumer.name(),
                event_type = event.event_type(),
                sale_id = %event.sale_id(),
                error = %e,
                "event consumer failed"
            );
        }
    }
}
