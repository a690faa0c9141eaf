//! Cache Infrastructure
//!
//! A small key/value cache abstraction with TTL expiry, an in-process
//! implementation, a Redis implementation (feature `redis`) for sharing one
//! cache between processes, and the typed cache that serves trip snapshots
//! to the access policy.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use infra_cache::{InMemoryCacheStore, TripSnapshotCache, DEFAULT_SNAPSHOT_TTL};
//!
//! let cache = TripSnapshotCache::new(Arc::new(InMemoryCacheStore::new()), DEFAULT_SNAPSHOT_TTL);
//! assert_eq!(cache.ttl().as_secs(), 300);
//! ```

pub mod error;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod snapshot;
pub mod store;

pub use error::CacheError;
pub use snapshot::{TripSnapshotCache, DEFAULT_SNAPSHOT_TTL};
pub use store::{CacheStore, InMemoryCacheStore};

#[cfg(feature = "redis")]
pub use redis_store::RedisCacheStore;
