//! Core domain event trait.

use common::SaleId;
use serde::{Serialize, de::DeserializeOwned};

/// A fact about a sale that other parts of the system may react to.
///
/// Events are named in past tense and are immutable once built.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Stable type name used for routing, logging and metrics labels.
    fn event_type(&self) -> &'static str;

    /// The sale this event is about.
    fn sale_id(&self) -> SaleId;
}
