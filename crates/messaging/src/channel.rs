//! Event bus backed by a tokio channel and a background dispatcher.
//!
//! Events cross the channel in their JSON wire form, the same shape an
//! external broker would carry, and are decoded again by the dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{DomainEvent, SaleEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{EventBus, EventConsumer, MessagingError, Result, consumer::deliver};

/// Publishing half. Cheap to clone.
#[derive(Clone)]
pub struct ChannelEventBus {
    sender: mpsc::UnboundedSender<String>,
}

/// Receiving half. Owns the consumers and runs until every
/// [`ChannelEventBus`] clone has been dropped.
pub struct Dispatcher {
    receiver: mpsc::UnboundedReceiver<String>,
    consumers: Vec<Arc<dyn EventConsumer>>,
}

impl ChannelEventBus {
    /// Creates a connected bus and dispatcher pair.
    pub fn new() -> (Self, Dispatcher) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self { sender },
            Dispatcher {
                receiver,
                consumers: Vec::new(),
            },
        )
    }
}

#[async_trait]
impl EventBus for ChannelEventBus {
    async fn publish(&self, event: SaleEvent) -> Result<()> {
        let payload = serde_json::to_string(&event)?;
        self.sender
            .send(payload)
            .map_err(|_| MessagingError::Unavailable("dispatcher has stopped".to_string()))?;
        metrics::counter!("sales_events_published_total", "event_type" => event.event_type())
            .increment(1);
        Ok(())
    }
}

impl Dispatcher {
    /// Registers a consumer. Consumers run in registration order.
    pub fn register(&mut self, consumer: Arc<dyn EventConsumer>) {
        self.consumers.push(consumer);
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Delivers events until the channel closes.
    pub async fn run(mut self) {
        while let Some(payload) = self.receiver.recv().await {
            match serde_json::from_str::<SaleEvent>(&payload) {
                Ok(event) => {
                    tracing::debug!(event_type = event.event_type(), "dispatching event");
                    deliver(&self.consumers, &event).await;
                }
                Err(e) => tracing::error!(error = %e, "dropping undecodable event"),
            }
        }
        tracing::info!("event dispatcher stopped");
    }

    /// Runs the dispatcher on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::SaleId;
    use domain::SaleCancelledData;
    use tokio::sync::RwLock;

    struct Collecting(Arc<RwLock<Vec<SaleEvent>>>);

    #[async_trait]
    impl EventConsumer for Collecting {
        fn name(&self) -> &'static str {
            "Collecting"
        }

        async fn handle(&self, event: &SaleEvent) -> Result<()> {
            self.0.write().await.push(event.clone());
            Ok(())
        }
    }

    fn cancelled() -> SaleEvent {
        SaleEvent::SaleCancelled(SaleCancelledData {
            sale_id: SaleId::new(),
            occurred_at: chrono::Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_events_reach_consumers_in_order() {
        let (bus, mut dispatcher) = ChannelEventBus::new();
        let seen = Arc::new(RwLock::new(Vec::new()));
        dispatcher.register(Arc::new(Collecting(seen.clone())));
        let handle = dispatcher.spawn();

        let first = cancelled();
        let second = cancelled();
        bus.publish(first.clone()).await.unwrap();
        bus.publish(second.clone()).await.unwrap();

        drop(bus);
        handle.await.unwrap();

        assert_eq!(*seen.read().await, vec![first, second]);
    }

    #[tokio::test]
    async fn test_publish_fails_once_dispatcher_is_gone() {
        let (bus, dispatcher) = ChannelEventBus::new();
        drop(dispatcher);

        assert!(matches!(
            bus.publish(cancelled()).await,
            Err(MessagingError::Unavailable(_))
        ));
    }
}
