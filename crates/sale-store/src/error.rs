use common::{SaleId, Version};
use thiserror::Error;

/// Errors that can occur when interacting with the sale store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored version did not match the version the caller loaded.
    #[error(
        "Concurrency conflict for sale {sale_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        sale_id: SaleId,
        expected: Version,
        actual: Version,
    },

    /// The sale was not found in the store.
    #[error("Sale not found: {0}")]
    NotFound(SaleId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be turned back into a valid aggregate.
    #[error("Corrupt sale row: {0}")]
    Decode(String),

    /// The store refused the write (used by test doubles).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<domain::DomainError> for StoreError {
    fn from(err: domain::DomainError) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Result type for sale store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
