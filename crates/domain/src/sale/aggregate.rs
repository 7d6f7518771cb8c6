//! Sale aggregate implementation.

use chrono::{DateTime, Utc};
use common::{SaleId, SaleItemId, Version};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ExternalReference, Money, SaleItem, SaleState};
use crate::DomainError;

/// Sale aggregate root.
///
/// A sale header plus its owned line items. All changes to items go
/// through the sale so the total and the cancellation cascade stay
/// consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    id: SaleId,

    /// Business number, assigned by persistence. Zero until stored.
    number: i64,

    created_date: DateTime<Utc>,
    customer: ExternalReference,
    branch: ExternalReference,

    /// Sum of every item total. `None` while the sale has no items.
    total_amount: Option<Money>,

    state: SaleState,

    /// Items in insertion order.
    items: Vec<SaleItem>,

    /// Persisted version, used for optimistic concurrency.
    #[serde(default)]
    version: Version,
}

/// Persisted state of a sale, used to rebuild the aggregate from storage.
#[derive(Debug, Clone)]
pub struct SaleSnapshot {
    pub id: SaleId,
    pub number: i64,
    pub created_date: DateTime<Utc>,
    pub customer: ExternalReference,
    pub branch: ExternalReference,
    pub is_cancelled: bool,
    pub items: Vec<SaleItem>,
    pub version: Version,
}

impl Sale {
    /// Creates a new active sale with no items.
    pub fn new(customer: ExternalReference, branch: ExternalReference, number: i64) -> Self {
        Self {
            id: SaleId::new(),
            number,
            created_date: Utc::now(),
            customer,
            branch,
            total_amount: None,
            state: SaleState::Active,
            items: Vec::new(),
            version: Version::initial(),
        }
    }

    /// Rebuilds a sale from its persisted state.
    pub fn restore(snapshot: SaleSnapshot) -> Result<Self, DomainError> {
        let total_amount = total_of(&snapshot.items)?;
        Ok(Self {
            id: snapshot.id,
            number: snapshot.number,
            created_date: snapshot.created_date,
            customer: snapshot.customer,
            branch: snapshot.branch,
            total_amount,
            state: SaleState::from_cancelled(snapshot.is_cancelled),
            items: snapshot.items,
            version: snapshot.version,
        })
    }

    pub fn assign_number(&mut self, number: i64) {
        self.number = number;
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }
}

// Query methods
impl Sale {
    pub fn id(&self) -> SaleId {
        self.id
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn created_date(&self) -> DateTime<Utc> {
        self.created_date
    }

    pub fn customer(&self) -> &ExternalReference {
        &self.customer
    }

    pub fn branch(&self) -> &ExternalReference {
        &self.branch
    }

    /// Returns the sale total, zero before any item has been added.
    pub fn total_amount(&self) -> Decimal {
        self.total_amount.map(|m| m.value()).unwrap_or(Decimal::ZERO)
    }

    pub fn state(&self) -> SaleState {
        self.state
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn items(&self) -> &[SaleItem] {
        &self.items
    }

    pub fn get_item(&self, item_id: SaleItemId) -> Option<&SaleItem> {
        self.items.iter().find(|item| item.id() == item_id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the sale has at least one item.
    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }
}

// Commands
impl Sale {
    /// Appends an item and recalculates the total.
    pub fn add_item(&mut self, item: SaleItem) -> Result<(), DomainError> {
        if !self.state.is_mutable() {
            return Err(DomainError::CannotAddToCancelledSale {
                number: self.number,
            });
        }
        let total = total_of(self.items.iter().chain(std::iter::once(&item)))?;
        self.items.push(item);
        self.total_amount = total;
        Ok(())
    }

    /// Removes an item and recalculates the total. Returns the removed item.
    pub fn remove_item(&mut self, item_id: SaleItemId) -> Result<SaleItem, DomainError> {
        let position = self
            .items
            .iter()
            .position(|item| item.id() == item_id)
            .ok_or(DomainError::ItemNotFound { item_id })?;

        let removed = self.items.remove(position);
        self.total_amount = total_of(&self.items)?;
        Ok(removed)
    }

    /// Cancels the sale and every item on it.
    ///
    /// Items that were already cancelled individually are left as they are.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        if self.state.is_cancelled() {
            return Err(DomainError::SaleAlreadyCancelled {
                number: self.number,
            });
        }

        for item in self.items.iter_mut().filter(|item| !item.is_cancelled()) {
            item.cancel()?;
        }
        self.state = SaleState::Cancelled;
        Ok(())
    }

    /// Cancels a single item.
    ///
    /// When this leaves no active item, the sale itself becomes cancelled.
    /// Returns `true` in that case.
    pub fn cancel_item(&mut self, item_id: SaleItemId) -> Result<bool, DomainError> {
        if self.state.is_cancelled() {
            return Err(DomainError::SaleFullyCancelled {
                number: self.number,
            });
        }

        let item = self
            .items
            .iter_mut()
            .find(|item| item.id() == item_id)
            .ok_or(DomainError::ItemNotFound { item_id })?;
        item.cancel()?;

        if self.items.iter().all(SaleItem::is_cancelled) {
            self.state = SaleState::Cancelled;
            return Ok(true);
        }
        Ok(false)
    }

    /// Replaces the customer, the branch and the whole item collection.
    pub fn update(
        &mut self,
        customer: ExternalReference,
        branch: ExternalReference,
        items: Vec<SaleItem>,
    ) -> Result<(), DomainError> {
        if self.state.is_cancelled() {
            return Err(DomainError::CannotUpdateCancelledSale {
                number: self.number,
            });
        }
        if let Some(cancelled) = items.iter().find(|item| item.is_cancelled()) {
            return Err(DomainError::CancelledItemInUpdate {
                item_id: cancelled.id(),
            });
        }

        let total = total_of(&items)?;
        self.customer = customer;
        self.branch = branch;
        self.items = items;
        self.total_amount = total;
        Ok(())
    }
}

/// Sums item totals from scratch. `None` for an empty collection.
fn total_of<'a>(
    items: impl IntoIterator<Item = &'a SaleItem>,
) -> Result<Option<Money>, DomainError> {
    let sum = items
        .into_iter()
        .try_fold(Decimal::ZERO, |sum, item| {
            sum.checked_add(item.total_amount().value())
        })
        .ok_or(DomainError::AmountOutOfRange { max: Money::MAX })?;
    if sum.is_zero() {
        return Ok(None);
    }
    Money::new(sum).map(Some)
}
