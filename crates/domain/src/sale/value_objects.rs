//! Value objects for the sale domain.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DomainError;

/// A strictly positive monetary amount, rounded to two decimal places.
///
/// Backed by [`Decimal`] so repeated total recalculation never drifts.
/// Rounding is banker's rounding (midpoint to even).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Number of decimal places every amount is rounded to.
    pub const SCALE: u32 = 2;

    /// Largest representable amount: sixteen integer digits and two decimals,
    /// the width of the `NUMERIC(18, 2)` storage columns.
    pub const MAX: Decimal = Decimal::from_parts(0xA763_FFFF, 0x0DE0_B6B3, 0, false, 2);

    /// Creates a new amount.
    ///
    /// Fails when the value is zero or negative, when it rounds to zero, or
    /// when it is above [`Money::MAX`].
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        let rounded = value.round_dp(Self::SCALE);
        if value <= Decimal::ZERO || rounded <= Decimal::ZERO {
            return Err(DomainError::InvalidMoney { value });
        }
        if rounded > Self::MAX {
            return Err(DomainError::AmountOutOfRange { max: Self::MAX });
        }
        Ok(Self(rounded))
    }

    /// Returns the rounded decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Number of units of a product on a sale line, between 1 and [`Quantity::MAX_VALUE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    /// Maximum number of identical items allowed on a single line.
    pub const MAX_VALUE: i32 = 20;

    pub fn new(value: i32) -> Result<Self, DomainError> {
        if value <= 0 {
            return Err(DomainError::QuantityNotPositive { value });
        }
        if value > Self::MAX_VALUE {
            return Err(DomainError::QuantityAboveMaximum {
                value,
                max: Self::MAX_VALUE,
            });
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Quantity {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Denormalized pointer to an entity owned by another system
/// (customer, branch or product): its identifier plus a display description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalReference {
    id: Uuid,
    description: String,
}

impl ExternalReference {
    /// Creates a new reference. The id must not be nil and the description
    /// must contain something other than whitespace.
    pub fn new(id: Uuid, description: impl Into<String>) -> Result<Self, DomainError> {
        if id.is_nil() {
            return Err(DomainError::ExternalIdRequired);
        }
        let description = description.into();
        if description.trim().is_empty() {
            return Err(DomainError::ExternalDescriptionRequired);
        }
        Ok(Self { id, description })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl std::fmt::Display for ExternalReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn money_rejects_zero_and_negative() {
        assert!(matches!(
            Money::new(Decimal::ZERO),
            Err(DomainError::InvalidMoney { .. })
        ));
        assert!(Money::new(dec("-0.01")).is_err());
        assert!(Money::new(dec("-100")).is_err());
    }

    #[test]
    fn money_rounds_to_two_decimals() {
        let money = Money::new(dec("10.256")).unwrap();
        assert_eq!(money.value(), dec("10.26"));
        assert_eq!(money.value().scale(), 2);

        // midpoint goes to even
        assert_eq!(Money::new(dec("2.345")).unwrap().value(), dec("2.34"));
        assert_eq!(Money::new(dec("2.355")).unwrap().value(), dec("2.36"));
    }

    #[test]
    fn money_rejects_values_that_round_to_zero() {
        assert!(Money::new(dec("0.004")).is_err());
        assert_eq!(Money::new(dec("0.006")).unwrap().value(), dec("0.01"));
    }

    #[test]
    fn money_upper_bound_matches_storage_width() {
        assert_eq!(Money::MAX, dec("9999999999999999.99"));
        assert_eq!(Money::new(Money::MAX).unwrap().value(), Money::MAX);
        assert!(matches!(
            Money::new(dec("10000000000000000")),
            Err(DomainError::AmountOutOfRange { .. })
        ));
        assert!(Money::new(dec("10000000000000000000000000000")).is_err());
    }

    #[test]
    fn money_equality_is_structural() {
        assert_eq!(Money::new(dec("5")).unwrap(), Money::new(dec("5.00")).unwrap());
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::new(dec("480")).unwrap().to_string(), "480.00");
    }

    #[test]
    fn money_serde_validates() {
        let money: Money = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(money.value(), dec("12.50"));
        assert!(serde_json::from_str::<Money>("\"0\"").is_err());
    }

    #[test]
    fn quantity_bounds() {
        assert!(matches!(
            Quantity::new(0),
            Err(DomainError::QuantityNotPositive { value: 0 })
        ));
        assert!(Quantity::new(-3).is_err());
        assert!(matches!(
            Quantity::new(21),
            Err(DomainError::QuantityAboveMaximum { value: 21, max: 20 })
        ));
        assert_eq!(Quantity::new(1).unwrap().value(), 1);
        assert_eq!(Quantity::new(20).unwrap().value(), 20);
    }

    #[test]
    fn quantity_serde_validates() {
        assert!(serde_json::from_str::<Quantity>("25").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("7").unwrap().value(), 7);
    }

    #[test]
    fn external_reference_requires_id() {
        assert_eq!(
            ExternalReference::new(Uuid::nil(), "Acme"),
            Err(DomainError::ExternalIdRequired)
        );
    }

    #[test]
    fn external_reference_requires_description() {
        assert_eq!(
            ExternalReference::new(Uuid::new_v4(), "   "),
            Err(DomainError::ExternalDescriptionRequired)
        );
        assert_eq!(
            ExternalReference::new(Uuid::new_v4(), ""),
            Err(DomainError::ExternalDescriptionRequired)
        );
    }

    #[test]
    fn external_reference_accessors() {
        let id = Uuid::new_v4();
        let reference = ExternalReference::new(id, "Branch 01").unwrap();
        assert_eq!(reference.id(), id);
        assert_eq!(reference.description(), "Branch 01");
    }
}
