//! Sale aggregate and related types.

mod aggregate;
mod events;
mod item;
mod state;
mod value_objects;

pub use aggregate::{Sale, SaleSnapshot};
pub use events::{
    SaleCancelledData, SaleDeletedData, SaleEvent, SaleItemCancelledData, SaleItemDeletedData,
    SaleSummaryData,
};
pub use item::{MID_TIER_MIN_QUANTITY, SaleItem, TOP_TIER_MIN_QUANTITY, discount_for};
pub use state::SaleState;
pub use value_objects::{ExternalReference, Money, Quantity};
