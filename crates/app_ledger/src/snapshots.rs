//! Cache-aside loading of trip snapshots

use std::sync::Arc;

use tracing::{instrument, warn};

use core_kernel::TripId;
use domain_trip::{TripSnapshot, TripStore};
use infra_cache::TripSnapshotCache;

use crate::error::LedgerError;

/// Reads trip snapshots through the cache and falls back to the trip store
///
/// Cache failures never fail a read: they are logged and the store answers.
/// Invalidation failures do propagate, since a writer that cannot
/// invalidate would leave readers on a stale membership.
#[derive(Clone)]
pub struct SnapshotLoader {
    trips: Arc<dyn TripStore>,
    cache: TripSnapshotCache,
}

impl SnapshotLoader {
    pub fn new(trips: Arc<dyn TripStore>, cache: TripSnapshotCache) -> Self {
        Self { trips, cache }
    }

    pub fn trips(&self) -> &Arc<dyn TripStore> {
        &self.trips
    }

    pub fn cache(&self) -> &TripSnapshotCache {
        &self.cache
    }

    /// Returns the trip snapshot, from the cache when possible
    ///
    /// # Errors
    ///
    /// `LedgerError::NotFound` if the trip does not exist
    #[instrument(skip(self), fields(trip_id = %trip_id))]
    pub async fn load(&self, trip_id: TripId) -> Result<TripSnapshot, LedgerError> {
        match self.cache.get(trip_id).await {
            Ok(Some(snapshot)) => return Ok(snapshot),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Snapshot cache read failed; using the store"),
        }

        let snapshot = self
            .trips
            .fetch_snapshot(trip_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Trip", trip_id))?;

        if let Err(e) = self.cache.put(&snapshot).await {
            warn!(error = %e, "Failed to cache trip snapshot");
        }

        Ok(snapshot)
    }

    /// Drops the cached snapshot of a trip
    pub async fn invalidate(&self, trip_id: TripId) -> Result<(), LedgerError> {
        self.cache.invalidate(trip_id).await?;
        Ok(())
    }
}

impl std::fmt::Debug for SnapshotLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotLoader")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
