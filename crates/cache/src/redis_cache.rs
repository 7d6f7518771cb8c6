use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::{CacheManager, Result, SALE_INSTANCE_PREFIX};

/// Redis-backed cache.
///
/// Values are plain string keys. A tag is a Redis set stored under the
/// prefixed tag name whose members are the logical (unprefixed) keys.
#[derive(Clone)]
pub struct RedisCacheManager {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisCacheManager {
    /// Connects to Redis. The connection manager reconnects on its own
    /// after transient failures.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }

    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            prefix: SALE_INSTANCE_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Round-trips a PING to the server.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl CacheManager for RedisCacheManager {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(self.key(key)).await?;
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        match ttl {
            // SETEX rejects zero
            Some(ttl) => {
                conn.set_ex::<_, _, ()>(self.key(key), value, ttl.as_secs().max(1))
                    .await?
            }
            None => conn.set::<_, _, ()>(self.key(key), value).await?,
        }
        Ok(())
    }

    async fn remove_key(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.key(key)).await?;
        Ok(())
    }

    async fn tag_key(&self, key: &str, tag: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.sadd::<_, _, ()>(self.key(tag), key).await?;
        Ok(())
    }

    async fn invalidate_tag(&self, tag: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let tag_key = self.key(tag);

        // Read and drop the set in one transaction so a key tagged meanwhile
        // lands in a fresh set instead of being lost.
        let (members, _): (Vec<String>, i64) = redis::pipe()
            .atomic()
            .smembers(&tag_key)
            .del(&tag_key)
            .query_async(&mut conn)
            .await?;

        tracing::debug!(tag, keys = members.len(), "invalidating cache tag");
        if members.is_empty() {
            return Ok(());
        }
        let doomed: Vec<String> = members.iter().map(|member| self.key(member)).collect();
        conn.del::<_, ()>(doomed).await?;
        Ok(())
    }
}
