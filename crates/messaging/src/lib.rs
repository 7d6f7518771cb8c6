//! Publishing sale events and reacting to them.
//!
//! Handlers publish through the [`EventBus`] trait once a change has been
//! stored. Consumers implement [`EventConsumer`]; the one shipped here,
//! [`CacheInvalidationConsumer`], drops cached reads made stale by the event.

pub mod bus;
pub mod channel;
pub mod consumer;
pub mod error;
pub mod invalidation;
pub mod memory;

pub use bus::EventBus;
pub use channel::{ChannelEventBus, Dispatcher};
pub use consumer::EventConsumer;
pub use error::{MessagingError, Result};
pub use invalidation::{CacheInvalidationConsumer, Invalidation, invalidation_for};
pub use memory::InMemoryEventBus;
