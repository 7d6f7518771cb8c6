use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{CacheError, CacheManager, Result, SALE_INSTANCE_PREFIX};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    /// Prefixed tag key to the logical keys tagged with it.
    tags: HashMap<String, HashSet<String>>,
}

/// In-memory cache with the same key layout as the Redis implementation.
///
/// Expiry uses the tokio clock, so tests can pause and advance time.
#[derive(Clone)]
pub struct InMemoryCache {
    state: Arc<RwLock<State>>,
    prefix: String,
    unavailable: Arc<AtomicBool>,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::with_prefix(SALE_INSTANCE_PREFIX)
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            state: Arc::default(),
            prefix: prefix.into(),
            unavailable: Arc::default(),
        }
    }

    /// When set, every operation fails with `CacheError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns true if a live entry exists for the logical key.
    pub async fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.state
            .read()
            .await
            .entries
            .get(&self.key(key))
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Returns the logical keys currently recorded under a tag.
    pub async fn tagged_keys(&self, tag: &str) -> HashSet<String> {
        self.state
            .read()
            .await
            .tags
            .get(&self.key(tag))
            .cloned()
            .unwrap_or_default()
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("in-memory cache disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheManager for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        let now = Instant::now();
        let prefixed = self.key(key);

        let mut state = self.state.write().await;
        match state.entries.get(&prefixed) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                state.entries.remove(&prefixed);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        self.check_available()?;
        let entry = Entry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.state.write().await.entries.insert(self.key(key), entry);
        Ok(())
    }

    async fn remove_key(&self, key: &str) -> Result<()> {
        self.check_available()?;
        self.state.write().await.entries.remove(&self.key(key));
        Ok(())
    }

    async fn tag_key(&self, key: &str, tag: &str) -> Result<()> {
        self.check_available()?;
        self.state
            .write()
            .await
            .tags
            .entry(self.key(tag))
            .or_default()
            .insert(key.to_string());
        Ok(())
    }

    async fn invalidate_tag(&self, tag: &str) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if let Some(keys) = state.tags.remove(&self.key(tag)) {
            for key in keys {
                state.entries.remove(&self.key(&key));
            }
        }
        Ok(())
    }
}
