//! Key/value cache stores
//!
//! Values are opaque string payloads with a per-entry time-to-live. Setting
//! a key replaces its previous value atomically; the last writer wins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::CacheError;

/// A string-valued cache with per-entry expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the value for `key`, or `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key` for `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Removes `key`; removing an absent key is not an error
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct Entry {
    payload: String,
    expires_at: Instant,
}

/// Writes between two sweeps of expired entries
const SWEEP_EVERY: usize = 64;

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, Entry>,
    sets_since_sweep: usize,
}

impl Entries {
    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, e| e.expires_at > now);
        self.sets_since_sweep = 0;
        before - self.map.len()
    }
}

/// Process-local cache store
///
/// Expiry follows `tokio::time`, so tests can drive it with paused time.
/// Expired entries are dropped when read, and every [`SWEEP_EVERY`]th
/// `set` drops all of them, so keys that are never read again do not
/// accumulate.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCacheStore {
    entries: Arc<RwLock<Entries>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, including expired ones not yet purged
    pub async fn len(&self) -> usize {
        self.entries.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.map.is_empty()
    }

    /// Drops every expired entry and returns how many were removed
    pub async fn purge_expired(&self) -> usize {
        self.entries.write().await.sweep(Instant::now())
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.map.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.payload.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it unless a writer replaced it in the meantime.
        let mut entries = self.entries.write().await;
        if entries.map.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.map.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.sets_since_sweep += 1;
        if entries.sets_since_sweep >= SWEEP_EVERY {
            let dropped = entries.sweep(now);
            if dropped > 0 {
                tracing::debug!(dropped, "Swept expired cache entries");
            }
        }
        entries.map.insert(
            key.to_string(),
            Entry {
                payload: value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.map.remove(key);
        Ok(())
    }
}
