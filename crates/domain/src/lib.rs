//! Domain layer for the sales service.
//!
//! This crate holds the business rules and nothing else:
//! - value objects ([`Money`], [`Quantity`], [`ExternalReference`])
//! - the [`SaleItem`] entity with its quantity-based discount tiers
//! - the [`Sale`] aggregate root with cascading cancellation and
//!   full-replacement updates
//! - [`SaleEvent`] derivation from aggregate state
//!
//! There is no I/O here; persistence, caching and publishing live in the
//! crates that consume this one.

pub mod error;
pub mod event;
pub mod sale;

pub use error::DomainError;
pub use event::DomainEvent;
pub use sale::{
    ExternalReference, Money, Quantity, Sale, SaleCancelledData, SaleDeletedData, SaleEvent,
    SaleItem, SaleItemCancelledData, SaleItemDeletedData, SaleSnapshot, SaleState, SaleSummaryData,
    discount_for,
};
