//! Shared types for the sales service.
//!
//! Identifiers are UUID newtypes so a sale id can never be passed where an
//! item id is expected. [`Version`] is the optimistic-concurrency counter
//! carried by every persisted aggregate.

mod ids;
mod version;

pub use ids::{SaleId, SaleItemId};
pub use version::Version;
