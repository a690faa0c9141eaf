//! Settlement ledger
//!
//! Keeps one net balance per member per trip. Balances are rebuilt from
//! every split of the trip on each recalculation and written back in
//! full, inside the transaction of the expense write that triggered them.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use core_kernel::{MemberId, TripId};
use domain_expense::{
    aggregate, sort_by_amount_desc, sort_by_date_desc, Aggregation, LedgerStore,
    LedgerTransaction, Settlement, SplitContribution,
};

use crate::error::LedgerError;

/// Recalculation and reads of persisted settlements
#[derive(Clone)]
pub struct SettlementLedger {
    store: Arc<dyn LedgerStore>,
}

impl SettlementLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Recomputes every member's balance within an open transaction
    ///
    /// Takes the trip lock, so concurrent recalculations of one trip run
    /// one after the other and each sees the other's committed splits.
    /// Splits whose member has left the trip are skipped.
    pub async fn recalculate_in(
        tx: &mut dyn LedgerTransaction,
        trip_id: TripId,
    ) -> Result<Aggregation, LedgerError> {
        tx.lock_trip(trip_id).await?;
        let members = tx.load_members(trip_id).await?;
        let splits = tx.load_splits(trip_id).await?;

        let aggregation = aggregate(&members, &splits);
        if !aggregation.orphaned.is_empty() {
            warn!(
                %trip_id,
                orphaned = aggregation.orphaned.len(),
                "Ignoring splits of members no longer in the trip"
            );
        }

        tx.upsert_settlements(trip_id, &aggregation.balances).await?;

        info!(
            %trip_id,
            members = aggregation.balances.len(),
            splits = splits.len(),
            total = %aggregation.total(),
            "Settlements recalculated"
        );
        Ok(aggregation)
    }

    /// Recomputes a trip's settlements in a transaction of its own
    #[instrument(skip(self), fields(trip_id = %trip_id))]
    pub async fn recalculate(&self, trip_id: TripId) -> Result<Aggregation, LedgerError> {
        let mut tx = self.store.begin().await?;
        let aggregation = Self::recalculate_in(tx.as_mut(), trip_id).await?;
        tx.commit().await?;
        Ok(aggregation)
    }

    /// Persisted settlements, largest balance first
    #[instrument(skip(self), fields(trip_id = %trip_id))]
    pub async fn settlements(&self, trip_id: TripId) -> Result<Vec<Settlement>, LedgerError> {
        let mut settlements = self.store.list_settlements(trip_id).await?;
        sort_by_amount_desc(&mut settlements);
        Ok(settlements)
    }

    /// One member's settlement and the splits behind it, newest first
    ///
    /// # Errors
    ///
    /// `LedgerError::NotFound` if the member has no settlement row
    #[instrument(skip(self), fields(trip_id = %trip_id, member_id = %member_id))]
    pub async fn settlement_detail(
        &self,
        trip_id: TripId,
        member_id: MemberId,
    ) -> Result<(Settlement, Vec<SplitContribution>), LedgerError> {
        let settlement = self
            .store
            .get_settlement(trip_id, member_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Settlement", member_id))?;

        let mut contributions = self
            .store
            .member_contributions(trip_id, member_id)
            .await?;
        sort_by_date_desc(&mut contributions);

        Ok((settlement, contributions))
    }
}

impl std::fmt::Debug for SettlementLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementLedger").finish_non_exhaustive()
    }
}
