//! Application layer for the sales service.
//!
//! Each use case follows the same shape: validate the command, load the
//! sale, call the aggregate, persist, then publish events. Reads go through
//! the cache first. [`SaleService`] wires the repository, cache and bus
//! together; the HTTP layer only maps requests onto it.

pub mod commands;
pub mod error;
pub mod results;
pub mod service;
pub mod validation;

pub use commands::{
    CancelSaleCommand, CancelSaleItemCommand, CreateSaleCommand, DeleteSaleCommand,
    DeleteSaleItemCommand, GetSaleQuery, GetSalesQuery, SaleItemCommand, UpdateSaleCommand,
};
pub use error::{ApplicationError, Result};
pub use results::{ItemDeletion, PaginatedList, SaleItemResult, SaleResult};
pub use service::{DEFAULT_CACHE_TTL, SaleService};
pub use validation::{ValidationErrors, ValidationFailure};
