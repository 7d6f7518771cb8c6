//! Domain error types.

use common::SaleItemId;
use rust_decimal::Decimal;
use thiserror::Error;

/// A business rule was violated by a value object or by the sale aggregate.
///
/// Every variant means "the request was well-formed but is not allowed".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Money must be greater than zero (got {value})")]
    InvalidMoney { value: Decimal },

    #[error("Amount exceeds the maximum of {max}")]
    AmountOutOfRange { max: Decimal },

    #[error("Quantity must be greater than zero (got {value})")]
    QuantityNotPositive { value: i32 },

    #[error("The maximum quantity allowed per item is {max} (got {value})")]
    QuantityAboveMaximum { value: i32, max: i32 },

    #[error("External ID is required")]
    ExternalIdRequired,

    #[error("The external identity description is required")]
    ExternalDescriptionRequired,

    #[error("The item {product} is already cancelled")]
    ItemAlreadyCancelled { product: String },

    #[error("Item with ID {item_id} not found in this sale")]
    ItemNotFound { item_id: SaleItemId },

    #[error("The sale {number} is already cancelled")]
    SaleAlreadyCancelled { number: i64 },

    #[error("Cannot cancel items; sale {number} is already fully cancelled")]
    SaleFullyCancelled { number: i64 },

    #[error("Cannot add items; sale {number} is cancelled")]
    CannotAddToCancelledSale { number: i64 },

    #[error("Cannot update cancelled sale {number}")]
    CannotUpdateCancelledSale { number: i64 },

    #[error("Cannot include a cancelled item ({item_id}) in a sale update")]
    CancelledItemInUpdate { item_id: SaleItemId },
}
