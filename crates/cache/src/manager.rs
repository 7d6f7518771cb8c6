use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::Result;

/// A string key/value cache with tag-based group invalidation.
///
/// Keys passed in are logical keys; implementations add their own prefix.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CacheManager: Send + Sync {
    /// Returns the raw value stored under `key`, if present and not expired.
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;

    /// Stores a raw value. Without a TTL the entry never expires.
    async fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    /// Removes a single entry. Removing a missing key is not an error.
    async fn remove_key(&self, key: &str) -> Result<()>;

    /// Records `key` as a member of `tag`.
    async fn tag_key(&self, key: &str, tag: &str) -> Result<()>;

    /// Removes every key ever tagged with `tag`, then the tag itself.
    async fn invalidate_tag(&self, tag: &str) -> Result<()>;
}

/// Extension trait providing typed access on top of [`CacheManager`].
#[async_trait]
pub trait CacheManagerExt: CacheManager {
    /// Reads and deserializes a JSON value.
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serializes a value as JSON and stores it.
    async fn set<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, raw, ttl).await
    }
}

// Blanket implementation for all CacheManager implementations
impl<T: CacheManager + ?Sized> CacheManagerExt for T {}
