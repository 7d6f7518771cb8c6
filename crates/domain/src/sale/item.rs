//! The sale line item entity.

use common::SaleItemId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ExternalReference, Money, Quantity};
use crate::DomainError;

/// Quantity from which the 10% discount tier applies.
pub const MID_TIER_MIN_QUANTITY: i32 = 4;

/// Quantity from which the 20% discount tier applies.
pub const TOP_TIER_MIN_QUANTITY: i32 = 10;

/// Discount fraction for a given quantity. Thresholds are inclusive.
pub fn discount_for(quantity: Quantity) -> Decimal {
    match quantity.value() {
        q if q >= TOP_TIER_MIN_QUANTITY => Decimal::new(20, 2),
        q if q >= MID_TIER_MIN_QUANTITY => Decimal::new(10, 2),
        _ => Decimal::ZERO,
    }
}

/// A product line within a sale.
///
/// Owned by exactly one [`Sale`](super::Sale). The discount and total are
/// derived from quantity and unit price and recomputed on construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    id: SaleItemId,
    product: ExternalReference,
    quantity: Quantity,
    unit_price: Money,
    total_amount: Money,
    discount_percentage: Decimal,
    is_cancelled: bool,
}

impl SaleItem {
    /// Creates a new, active line item with a fresh id.
    pub fn new(
        product: ExternalReference,
        quantity: Quantity,
        unit_price: Money,
    ) -> Result<Self, DomainError> {
        Self::with_id(SaleItemId::new(), product, quantity, unit_price)
    }

    /// Creates a new, active line item keeping a caller-supplied id.
    pub fn with_id(
        id: SaleItemId,
        product: ExternalReference,
        quantity: Quantity,
        unit_price: Money,
    ) -> Result<Self, DomainError> {
        let mut item = Self {
            id,
            product,
            quantity,
            unit_price,
            total_amount: unit_price,
            discount_percentage: Decimal::ZERO,
            is_cancelled: false,
        };
        item.calculate_total()?;
        Ok(item)
    }

    /// Rebuilds an item from persisted state. Derived fields are recomputed
    /// rather than trusted.
    pub fn restore(
        id: SaleItemId,
        product: ExternalReference,
        quantity: Quantity,
        unit_price: Money,
        is_cancelled: bool,
    ) -> Result<Self, DomainError> {
        let mut item = Self::with_id(id, product, quantity, unit_price)?;
        item.is_cancelled = is_cancelled;
        Ok(item)
    }

    /// Recomputes the discount and total from the current quantity and price.
    ///
    /// `total = round(quantity * unit_price * (1 - discount), 2)`
    pub fn calculate_total(&mut self) -> Result<(), DomainError> {
        let discount = discount_for(self.quantity);
        let total = Decimal::from(self.quantity.value())
            .checked_mul(self.unit_price.value())
            .and_then(|gross| gross.checked_mul(Decimal::ONE - discount))
            .ok_or(DomainError::AmountOutOfRange { max: Money::MAX })?;
        self.total_amount = Money::new(total)?;
        self.discount_percentage = discount;
        Ok(())
    }

    /// Marks the item as cancelled. An item can only be cancelled once.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        if self.is_cancelled {
            return Err(DomainError::ItemAlreadyCancelled {
                product: self.product.description().to_string(),
            });
        }
        self.is_cancelled = true;
        Ok(())
    }

    pub fn id(&self) -> SaleItemId {
        self.id
    }

    pub fn product(&self) -> &ExternalReference {
        &self.product
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Discount as a fraction (`0.10` is ten percent).
    pub fn discount_percentage(&self) -> Decimal {
        self.discount_percentage
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled
    }
}
