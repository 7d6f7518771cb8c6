//! Cache used by the sale read path.
//!
//! Values are stored as JSON strings under a key prefix. Keys can be grouped
//! under a tag so that a whole family of entries (every cached list page,
//! for instance) can be dropped in one call.

pub mod error;
pub mod manager;
pub mod memory;
pub mod redis_cache;

pub use error::{CacheError, Result};
pub use manager::{CacheManager, CacheManagerExt};
pub use memory::InMemoryCache;
pub use redis_cache::RedisCacheManager;

/// Prefix applied to every key written by this service.
pub const SALE_INSTANCE_PREFIX: &str = "Sales_";

/// Tag grouping every cached sale list page.
pub const SALES_LIST_TAG: &str = "Sales_Lists";
