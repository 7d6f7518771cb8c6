//! Persistence for the sale aggregate.
//!
//! [`SaleRepository`] is the seam the application layer talks to. Two
//! implementations are provided:
//!
//! - [`PostgresSaleRepository`] stores headers and items in two tables and
//!   writes them in one transaction, guarded by a version column.
//! - [`InMemorySaleRepository`] keeps everything in a map and mirrors the
//!   same semantics for tests and local runs.

pub mod criteria;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use criteria::{SaleSearchCriteria, SaleSortField, SortDirection, UnknownSortOption};
pub use error::{Result, StoreError};
pub use memory::InMemorySaleRepository;
pub use postgres::PostgresSaleRepository;
pub use repository::{SalePage, SaleRepository};
