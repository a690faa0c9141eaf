//! Trip snapshot cache
//!
//! Cache-aside storage for [`TripSnapshot`] values keyed by trip id. Callers
//! read through [`TripSnapshotCache::get`], fetch from the trip store on a
//! miss, and [`put`](TripSnapshotCache::put) the result back. Every writer
//! that changes a trip or its member set must call
//! [`invalidate`](TripSnapshotCache::invalidate); otherwise readers may see
//! the old membership until the entry's TTL runs out.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use core_kernel::TripId;
use domain_trip::TripSnapshot;

use crate::error::CacheError;
use crate::store::CacheStore;

/// Default lifetime of a cached snapshot
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(300);

/// Typed snapshot cache over a [`CacheStore`]
#[derive(Clone)]
pub struct TripSnapshotCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl TripSnapshotCache {
    /// Creates a cache whose entries live for `ttl`
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// The TTL applied by [`put`](Self::put)
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key for a trip
    pub fn key(trip_id: TripId) -> String {
        format!("trip:{}", trip_id.as_uuid())
    }

    /// Returns the cached snapshot, or `None` on a miss
    ///
    /// A payload that no longer decodes is treated as a miss and removed.
    pub async fn get(&self, trip_id: TripId) -> Result<Option<TripSnapshot>, CacheError> {
        let key = Self::key(trip_id);
        let Some(payload) = self.store.get(&key).await? else {
            debug!(%trip_id, "Snapshot cache miss");
            return Ok(None);
        };

        match serde_json::from_str::<TripSnapshot>(&payload) {
            Ok(snapshot) => {
                debug!(%trip_id, "Snapshot cache hit");
                Ok(Some(snapshot))
            }
            Err(e) => {
                warn!(%trip_id, error = %e, "Discarding undecodable cached snapshot");
                self.store.delete(&key).await?;
                Ok(None)
            }
        }
    }

    /// Stores a snapshot with the default TTL
    pub async fn put(&self, snapshot: &TripSnapshot) -> Result<(), CacheError> {
        self.put_with_ttl(snapshot, self.ttl).await
    }

    /// Stores a snapshot with an explicit TTL
    pub async fn put_with_ttl(
        &self,
        snapshot: &TripSnapshot,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_string(snapshot)?;
        self.store
            .set(&Self::key(snapshot.trip_id()), payload, ttl)
            .await
    }

    /// Removes the cached snapshot of a trip
    pub async fn invalidate(&self, trip_id: TripId) -> Result<(), CacheError> {
        debug!(%trip_id, "Invalidating cached snapshot");
        self.store.delete(&Self::key(trip_id)).await
    }
}

impl std::fmt::Debug for TripSnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TripSnapshotCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
