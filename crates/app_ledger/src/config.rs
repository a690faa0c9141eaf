//! Ledger configuration

use std::sync::Arc;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use thiserror::Error;

use infra_cache::{CacheError, CacheStore, InMemoryCacheStore};
use infra_db::DatabaseConfig;

/// Prefix of every configuration environment variable
pub const ENV_PREFIX: &str = "LEDGER";

/// A loaded configuration the services cannot run with
#[derive(Debug, Error)]
#[error("Invalid configuration: {0}")]
pub struct InvalidConfig(pub String);

/// Ledger configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Database URL
    pub database_url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Lifetime of cached trip snapshots, in seconds
    pub cache_ttl_secs: u64,
    /// Redis URL for the snapshot cache; the in-process cache is used when unset
    pub redis_url: Option<String>,
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/trip_ledger".to_string(),
            max_connections: 10,
            cache_ttl_secs: 300,
            redis_url: None,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl LedgerConfig {
    /// Loads configuration from `LEDGER_*` environment variables
    ///
    /// An optional `.env` file is read first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_source(Environment::with_prefix(ENV_PREFIX))
    }

    /// Loads configuration from an explicit environment source
    pub fn from_source(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// TTL applied to cached trip snapshots
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Connection pool settings
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.database_url.clone())
            .max_connections(self.max_connections)
    }

    /// Builds the backing store for trip snapshots
    ///
    /// Connects to Redis when `redis_url` is set, otherwise returns an
    /// in-process store.
    pub async fn cache_store(&self) -> Result<Arc<dyn CacheStore>, CacheError> {
        match self.redis_url.as_deref() {
            None => Ok(Arc::new(InMemoryCacheStore::new())),
            #[cfg(feature = "redis")]
            Some(url) => {
                let store = infra_cache::RedisCacheStore::connect(url, None).await?;
                tracing::info!("Caching trip snapshots in Redis");
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "redis"))]
            Some(_) => Err(CacheError::Unavailable(
                "redis_url is set but this build has no Redis support".to_string(),
            )),
        }
    }

    /// Rejects settings the services cannot run with
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.database_url.trim().is_empty() {
            return Err(InvalidConfig("database_url must not be empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(InvalidConfig("max_connections must be at least 1".to_string()));
        }
        if self.cache_ttl_secs == 0 {
            return Err(InvalidConfig("cache_ttl_secs must be at least 1".to_string()));
        }
        if self.redis_url.as_deref().is_some_and(|url| url.trim().is_empty()) {
            return Err(InvalidConfig("redis_url must not be blank".to_string()));
        }
        Ok(())
    }
}
