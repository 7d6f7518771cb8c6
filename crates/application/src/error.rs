use domain::DomainError;
use sale_store::StoreError;
use thiserror::Error;

use crate::ValidationErrors;

/// Errors returned by the sale use cases.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// The command was malformed; nothing was loaded or changed.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The command was well-formed but broke a business rule.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The sale (or the item inside it) does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ValidationErrors> for ApplicationError {
    fn from(errors: ValidationErrors) -> Self {
        ApplicationError::Validation(errors)
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, ApplicationError>;
