//! Sale lifecycle state.

use serde::{Deserialize, Serialize};

/// The state of a sale.
///
/// ```text
/// Active ──► Cancelled
/// ```
///
/// `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SaleState {
    #[default]
    Active,
    Cancelled,
}

impl SaleState {
    pub fn from_cancelled(is_cancelled: bool) -> Self {
        if is_cancelled {
            SaleState::Cancelled
        } else {
            SaleState::Active
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SaleState::Cancelled)
    }

    /// Returns true if the sale can still be modified (cancelled, updated,
    /// or have items added or cancelled).
    pub fn is_mutable(&self) -> bool {
        matches!(self, SaleState::Active)
    }
}

impl std::fmt::Display for SaleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaleState::Active => write!(f, "Active"),
            SaleState::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_active() {
        assert_eq!(SaleState::default(), SaleState::Active);
        assert!(SaleState::default().is_mutable());
    }

    #[test]
    fn cancelled_is_terminal() {
        let state = SaleState::from_cancelled(true);
        assert!(state.is_cancelled());
        assert!(!state.is_mutable());
        assert_eq!(state.to_string(), "Cancelled");
    }
}
