//! Redis-backed cache store
//!
//! Lets several ledger processes share snapshots and invalidations. Keys
//! are namespaced with a prefix; expiry is left to Redis via `SET ... EX`.

use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tracing::{debug, info};

use crate::error::CacheError;
use crate::store::CacheStore;

/// Prefix applied when none is configured
pub const DEFAULT_KEY_PREFIX: &str = "trip-ledger";

/// Cache store shared through a Redis server
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisCacheStore {
    /// Connects to `url` (for example `redis://localhost:6379`)
    pub async fn connect(url: &str, key_prefix: Option<&str>) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;

        info!(url = %url, "Connected to Redis for trip snapshots");

        Ok(Self {
            conn,
            key_prefix: key_prefix.unwrap_or(DEFAULT_KEY_PREFIX).to_string(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

/// Whole seconds for `SET ... EX`; partial seconds round up and the result
/// is never zero, which Redis would reject
pub fn expiry_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

fn unavailable(error: redis::RedisError) -> CacheError {
    CacheError::Unavailable(error.to_string())
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(self.namespaced(key)).await.map_err(unavailable)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let seconds = expiry_seconds(ttl);
        let _: () = conn
            .set_ex(self.namespaced(key), value, seconds)
            .await
            .map_err(unavailable)?;

        debug!(key = %key, seconds, "Stored cache entry in Redis");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.namespaced(key)).await.map_err(unavailable)?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}
