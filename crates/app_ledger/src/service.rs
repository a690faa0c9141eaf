//! Ledger Service
//!
//! Entry point for expense writes and settlement queries. Every expense
//! mutation follows the same path:
//!
//! 1. Load the trip snapshot through the cache and check access.
//! 2. Open a ledger transaction and lock the trip.
//! 3. For updates and deletes, re-read the expense under the lock and check
//!    the principal may change it.
//! 4. Compute and validate the splits against the current member list.
//! 5. Persist the expense with its splits.
//! 6. Recalculate the trip's settlements and commit.
//!
//! Any failure before the commit drops the transaction, so a rejected or
//! interrupted write never leaves splits without matching settlements.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use core_kernel::{ExpenseId, MemberId, Money, TripId};
use domain_expense::{
    calculate, Aggregation, Expense, ExpenseChanges, LedgerStore, LedgerTransaction, NewExpense,
    Settlement, SplitContribution, SplitKind, SplitStrategy,
};
use domain_trip::{AccessPolicy, Principal, TripAccessPolicy, TripSnapshot};

use crate::error::LedgerError;
use crate::ledger::SettlementLedger;
use crate::notify::{dispatch, LedgerEvent, Notifier};
use crate::snapshots::SnapshotLoader;

/// A settlement with the member's display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementRow {
    #[serde(flatten)]
    pub settlement: Settlement,
    /// `None` when the member is missing from the snapshot
    pub member_name: Option<String>,
}

/// All settlements of a trip, largest balance first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementSummary {
    pub trip_id: TripId,
    pub rows: Vec<SettlementRow>,
    pub total: Money,
}

/// One member's settlement with the splits that make it up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementDetail {
    pub settlement: Settlement,
    pub member_name: Option<String>,
    pub contributions: Vec<SplitContribution>,
}

/// Expense and settlement operations
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    snapshots: SnapshotLoader,
    ledger: SettlementLedger,
    policy: Arc<dyn AccessPolicy>,
    notifier: Arc<dyn Notifier>,
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        snapshots: SnapshotLoader,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            ledger: SettlementLedger::new(Arc::clone(&store)),
            store,
            snapshots,
            policy: Arc::new(TripAccessPolicy),
            notifier,
        }
    }

    /// Replaces the access policy
    pub fn with_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn ledger(&self) -> &SettlementLedger {
        &self.ledger
    }

    /// Records an expense and recalculates the trip's settlements
    ///
    /// The principal becomes the expense's recorder and must hold a member
    /// record in the trip.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the trip or the payer does not exist
    /// - `Forbidden` if the principal has no member record in the trip
    /// - `InvalidSplit` / `DegenerateInput` if the splits cannot be computed
    #[instrument(skip(self, principal, input), fields(trip_id = %trip_id, user_id = %principal.user_id))]
    pub async fn create_expense(
        &self,
        principal: &Principal,
        trip_id: TripId,
        input: NewExpense,
    ) -> Result<Expense, LedgerError> {
        let snapshot = self.snapshots.load(trip_id).await?;
        let recorder = self.recorder_id(principal, &snapshot)?;

        let mut tx = self.store.begin().await?;
        tx.lock_trip(trip_id).await?;
        let members = tx.load_members(trip_id).await?;
        ensure_member(&members, input.payer_id)?;

        let computed = calculate(input.amount, &input.strategy, &members)?;
        let expense = Expense::new(trip_id, recorder, &input, computed);
        tx.insert_expense(&expense).await?;

        let aggregation = SettlementLedger::recalculate_in(tx.as_mut(), trip_id).await?;
        tx.commit().await?;

        debug!(expense_id = %expense.id, splits = expense.splits.len(), "Expense recorded");
        self.announce(LedgerEvent::ExpenseRecorded {
            trip_id,
            expense_id: expense.id,
            amount: expense.amount,
        });
        self.announce_recalculation(trip_id, &aggregation);
        Ok(expense)
    }

    /// Applies a partial update to an expense
    ///
    /// Splits are recomputed when the amount or the strategy changes. An
    /// equal split follows a new amount on its own; exact and percentage
    /// splits need a new strategy.
    #[instrument(skip(self, principal, changes), fields(expense_id = %expense_id, user_id = %principal.user_id))]
    pub async fn update_expense(
        &self,
        principal: &Principal,
        expense_id: ExpenseId,
        changes: ExpenseChanges,
    ) -> Result<Expense, LedgerError> {
        let snapshot = self.expense_snapshot(principal, expense_id).await?;
        let trip_id = snapshot.trip_id();

        let mut tx = self.store.begin().await?;
        tx.lock_trip(trip_id).await?;
        let mut expense = self
            .locked_expense(tx.as_mut(), principal, &snapshot, expense_id)
            .await?;

        let strategy = if changes.resplits() {
            Some(resplit_strategy(&expense, &changes)?)
        } else {
            None
        };

        let members = tx.load_members(trip_id).await?;
        if let Some(payer_id) = changes.payer_id {
            ensure_member(&members, payer_id)?;
        }

        changes.apply_fields(&mut expense);
        if let Some(strategy) = strategy {
            let computed = calculate(expense.amount, &strategy, &members)?;
            expense.replace_splits(strategy.kind(), computed);
        }
        tx.replace_expense(&expense).await?;

        let aggregation = SettlementLedger::recalculate_in(tx.as_mut(), trip_id).await?;
        tx.commit().await?;

        self.announce(LedgerEvent::ExpenseUpdated {
            trip_id,
            expense_id,
        });
        self.announce_recalculation(trip_id, &aggregation);
        Ok(expense)
    }

    /// Deletes an expense and recalculates the trip's settlements
    #[instrument(skip(self, principal), fields(expense_id = %expense_id, user_id = %principal.user_id))]
    pub async fn delete_expense(
        &self,
        principal: &Principal,
        expense_id: ExpenseId,
    ) -> Result<(), LedgerError> {
        let snapshot = self.expense_snapshot(principal, expense_id).await?;
        let trip_id = snapshot.trip_id();

        let mut tx = self.store.begin().await?;
        tx.lock_trip(trip_id).await?;
        self.locked_expense(tx.as_mut(), principal, &snapshot, expense_id)
            .await?;
        tx.delete_expense(expense_id).await?;
        let aggregation = SettlementLedger::recalculate_in(tx.as_mut(), trip_id).await?;
        tx.commit().await?;

        self.announce(LedgerEvent::ExpenseDeleted {
            trip_id,
            expense_id,
        });
        self.announce_recalculation(trip_id, &aggregation);
        Ok(())
    }

    /// Loads one expense visible to the principal
    #[instrument(skip(self, principal), fields(expense_id = %expense_id))]
    pub async fn get_expense(
        &self,
        principal: &Principal,
        expense_id: ExpenseId,
    ) -> Result<Expense, LedgerError> {
        let expense = self.find_expense(expense_id).await?;
        let snapshot = self.snapshots.load(expense.trip_id).await?;
        self.require_access(principal, &snapshot)?;
        Ok(expense)
    }

    /// Lists a trip's expenses, most recent expense date first
    #[instrument(skip(self, principal), fields(trip_id = %trip_id))]
    pub async fn list_expenses(
        &self,
        principal: &Principal,
        trip_id: TripId,
    ) -> Result<Vec<Expense>, LedgerError> {
        let snapshot = self.snapshots.load(trip_id).await?;
        self.require_access(principal, &snapshot)?;
        Ok(self.store.list_expenses(trip_id).await?)
    }

    /// Current settlements of a trip with member names and their total
    #[instrument(skip(self), fields(trip_id = %trip_id))]
    pub async fn get_settlements(&self, trip_id: TripId) -> Result<SettlementSummary, LedgerError> {
        self.ensure_trip(trip_id).await?;
        let snapshot = self.snapshots.load(trip_id).await?;

        let settlements = self.ledger.settlements(trip_id).await?;
        let total = settlements.iter().map(|s| s.amount).sum();
        let rows = settlements
            .into_iter()
            .map(|settlement| SettlementRow {
                member_name: member_name(&snapshot, settlement.member_id),
                settlement,
            })
            .collect();

        Ok(SettlementSummary {
            trip_id,
            rows,
            total,
        })
    }

    /// One member's settlement and its breakdown
    #[instrument(skip(self), fields(trip_id = %trip_id, member_id = %member_id))]
    pub async fn get_settlement_detail(
        &self,
        trip_id: TripId,
        member_id: MemberId,
    ) -> Result<SettlementDetail, LedgerError> {
        self.ensure_trip(trip_id).await?;
        let (settlement, contributions) =
            self.ledger.settlement_detail(trip_id, member_id).await?;
        let snapshot = self.snapshots.load(trip_id).await?;

        Ok(SettlementDetail {
            member_name: member_name(&snapshot, member_id),
            settlement,
            contributions,
        })
    }

    /// Rebuilds a trip's settlements from its splits
    #[instrument(skip(self), fields(trip_id = %trip_id))]
    pub async fn recalculate_settlements(
        &self,
        trip_id: TripId,
    ) -> Result<Aggregation, LedgerError> {
        self.ensure_trip(trip_id).await?;
        let aggregation = self.ledger.recalculate(trip_id).await?;
        self.announce_recalculation(trip_id, &aggregation);
        Ok(aggregation)
    }

    async fn ensure_trip(&self, trip_id: TripId) -> Result<(), LedgerError> {
        if self.store.trip_exists(trip_id).await? {
            Ok(())
        } else {
            Err(LedgerError::not_found("Trip", trip_id))
        }
    }

    async fn find_expense(&self, expense_id: ExpenseId) -> Result<Expense, LedgerError> {
        self.store
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Expense", expense_id))
    }

    /// Snapshot of the trip owning an expense, for a principal with access
    async fn expense_snapshot(
        &self,
        principal: &Principal,
        expense_id: ExpenseId,
    ) -> Result<TripSnapshot, LedgerError> {
        let expense = self.find_expense(expense_id).await?;
        let snapshot = self.snapshots.load(expense.trip_id).await?;
        self.require_access(principal, &snapshot)?;
        Ok(snapshot)
    }

    /// Re-reads an expense under the trip lock and checks that the
    /// principal may change it
    ///
    /// Changes are applied to this copy, so a concurrent update that
    /// committed before the lock was taken is never overwritten.
    async fn locked_expense(
        &self,
        tx: &mut dyn LedgerTransaction,
        principal: &Principal,
        snapshot: &TripSnapshot,
        expense_id: ExpenseId,
    ) -> Result<Expense, LedgerError> {
        let expense = tx
            .load_expense(expense_id)
            .await?
            .filter(|e| e.trip_id == snapshot.trip_id())
            .ok_or_else(|| LedgerError::not_found("Expense", expense_id))?;

        if !self
            .policy
            .can_modify_owned_resource(principal, snapshot, expense.created_by)
        {
            return Err(LedgerError::forbidden(
                "Only the trip creator or the member who recorded the expense can change it",
            ));
        }
        Ok(expense)
    }

    fn require_access(
        &self,
        principal: &Principal,
        snapshot: &TripSnapshot,
    ) -> Result<(), LedgerError> {
        if self.policy.evaluate_access(principal, snapshot).can_access {
            Ok(())
        } else {
            Err(LedgerError::forbidden("You do not have access to this trip"))
        }
    }

    /// The principal's member id, required to record expenses
    ///
    /// Matched by email first, then by the user id linked to a member row.
    fn recorder_id(
        &self,
        principal: &Principal,
        snapshot: &TripSnapshot,
    ) -> Result<MemberId, LedgerError> {
        self.require_access(principal, snapshot)?;
        self.policy
            .resolve_member_id(&principal.email, &snapshot.members)
            .or_else(|| {
                snapshot
                    .members
                    .iter()
                    .find(|m| m.user_id == Some(principal.user_id))
                    .map(|m| m.id)
            })
            .ok_or_else(|| LedgerError::forbidden("You are not a member of this trip"))
    }

    fn announce(&self, event: LedgerEvent) {
        dispatch(self.notifier.as_ref(), event);
    }

    fn announce_recalculation(&self, trip_id: TripId, aggregation: &Aggregation) {
        self.announce(LedgerEvent::SettlementsRecalculated {
            trip_id,
            members: aggregation.balances.len(),
            total: aggregation.total(),
        });
    }
}

impl std::fmt::Debug for LedgerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerService")
            .field("snapshots", &self.snapshots)
            .finish_non_exhaustive()
    }
}

fn ensure_member(members: &[MemberId], member_id: MemberId) -> Result<(), LedgerError> {
    if members.contains(&member_id) {
        Ok(())
    } else {
        Err(LedgerError::not_found("Member", member_id))
    }
}

/// The strategy used to recompute splits after an update
fn resplit_strategy(
    expense: &Expense,
    changes: &ExpenseChanges,
) -> Result<SplitStrategy, LedgerError> {
    match (&changes.strategy, expense.split_kind) {
        (Some(strategy), _) => Ok(strategy.clone()),
        (None, SplitKind::Equal) => Ok(SplitStrategy::Equal),
        (None, kind) => Err(LedgerError::invalid_split(format!(
            "Changing the amount of a {} expense requires new splits",
            kind.as_str()
        ))),
    }
}

fn member_name(snapshot: &TripSnapshot, member_id: MemberId) -> Option<String> {
    snapshot.member(member_id).map(|m| m.name.clone())
}
