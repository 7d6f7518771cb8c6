use async_trait::async_trait;
use domain::SaleEvent;

use crate::Result;

/// Outbound side of the message bus.
///
/// Publishing is fire-and-forget from the caller's point of view: an `Ok`
/// means the bus accepted the event, not that any consumer has run.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: SaleEvent) -> Result<()>;
}
