//! In-memory ledger store for testing
//!
//! `MockLedgerStore` implements both [`TripStore`] and [`LedgerStore`]
//! over one shared state so services can be exercised without a database.
//! A transaction takes the state's write lock for its whole lifetime and
//! works on a private copy; `commit` swaps the copy in and dropping the
//! transaction discards it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use core_kernel::{
    DomainPort, ExpenseId, HealthCheckResult, HealthCheckable, InvitationId, MemberId, PortError,
    TripId,
};
use domain_trip::{Invitation, InvitationStatus, Member, Trip, TripSnapshot, TripStore};

use crate::expense::{Expense, Split};
use crate::ports::{LedgerStore, LedgerTransaction};
use crate::settlement::{sort_by_date_desc, Settlement, SettlementBalance, SplitContribution};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    trips: HashMap<TripId, Trip>,
    /// All members of all trips, in join order
    members: Vec<Member>,
    invitations: Vec<Invitation>,
    expenses: HashMap<ExpenseId, Expense>,
    settlements: HashMap<(TripId, MemberId), Settlement>,
}

impl LedgerState {
    fn trip_members(&self, trip_id: TripId) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(move |m| m.trip_id == trip_id)
    }

    fn invitation_mut(&mut self, invitation_id: InvitationId) -> Option<&mut Invitation> {
        self.invitations.iter_mut().find(|i| i.id == invitation_id)
    }

    fn trip_expenses(&self, trip_id: TripId) -> impl Iterator<Item = &Expense> {
        self.expenses.values().filter(move |e| e.trip_id == trip_id)
    }
}

/// In-memory implementation of the trip and ledger stores
#[derive(Debug, Clone, Default)]
pub struct MockLedgerStore {
    state: Arc<RwLock<LedgerState>>,
    fail_settlement_writes: Arc<AtomicBool>,
    snapshot_reads: Arc<AtomicUsize>,
}

impl MockLedgerStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with trips and their members
    pub async fn with_snapshots(snapshots: Vec<TripSnapshot>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write().await;
            for snapshot in snapshots {
                state.trips.insert(snapshot.trip.id, snapshot.trip);
                state.members.extend(snapshot.members);
            }
        }
        store
    }

    /// Makes every subsequent settlement write fail until reset
    pub fn fail_settlement_writes(&self, fail: bool) {
        self.fail_settlement_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of snapshot reads served so far
    pub fn snapshot_reads(&self) -> usize {
        self.snapshot_reads.load(Ordering::SeqCst)
    }

    /// Number of expenses across all trips
    pub async fn expense_count(&self) -> usize {
        self.state.read().await.expenses.len()
    }
}

impl DomainPort for MockLedgerStore {}

#[async_trait]
impl HealthCheckable for MockLedgerStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("mock-ledger-store", 0)
    }
}

#[async_trait]
impl TripStore for MockLedgerStore {
    async fn fetch_snapshot(&self, trip_id: TripId) -> Result<Option<TripSnapshot>, PortError> {
        self.snapshot_reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        Ok(state.trips.get(&trip_id).map(|trip| {
            TripSnapshot::new(trip.clone(), state.trip_members(trip_id).cloned().collect())
        }))
    }

    async fn create_trip(&self, trip: &Trip, creator: &Member) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        if state.trips.contains_key(&trip.id) {
            return Err(PortError::conflict(format!("Trip {} already exists", trip.id)));
        }
        state.trips.insert(trip.id, trip.clone());
        state.members.push(creator.clone());
        Ok(())
    }

    async fn update_trip(&self, trip: &Trip) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        let stored = state
            .trips
            .get_mut(&trip.id)
            .ok_or_else(|| PortError::not_found("Trip", trip.id))?;
        *stored = trip.clone();
        Ok(())
    }

    async fn delete_trip(&self, trip_id: TripId) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        if state.trips.remove(&trip_id).is_none() {
            return Err(PortError::not_found("Trip", trip_id));
        }
        state.members.retain(|m| m.trip_id != trip_id);
        state.invitations.retain(|i| i.trip_id != trip_id);
        state.expenses.retain(|_, e| e.trip_id != trip_id);
        state.settlements.retain(|(trip, _), _| *trip != trip_id);
        Ok(())
    }

    async fn remove_member(&self, trip_id: TripId, member_id: MemberId) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        let email = state
            .trip_members(trip_id)
            .find(|m| m.id == member_id)
            .map(|m| m.email.clone())
            .ok_or_else(|| PortError::not_found("Member", member_id))?;
        if state.trip_expenses(trip_id).any(|e| e.references(member_id)) {
            return Err(PortError::conflict(format!(
                "Member {} is referenced by expenses",
                member_id
            )));
        }
        state.invitations.retain(|i| !(i.trip_id == trip_id && i.is_for(&email)));
        state.members.retain(|m| m.id != member_id);
        state.settlements.remove(&(trip_id, member_id));
        Ok(())
    }

    async fn insert_invitation(
        &self,
        invitation: &Invitation,
        member: Option<&Member>,
    ) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        if !state.trips.contains_key(&invitation.trip_id) {
            return Err(PortError::not_found("Trip", invitation.trip_id));
        }
        if state
            .invitations
            .iter()
            .any(|i| i.trip_id == invitation.trip_id && i.is_for(&invitation.email))
        {
            return Err(PortError::conflict(format!(
                "An invitation for {} already exists in this trip",
                invitation.email
            )));
        }
        if let Some(member) = member {
            if state.trip_members(member.trip_id).any(|m| m.has_email(&member.email)) {
                return Err(PortError::conflict(format!(
                    "A member with email {} already exists in this trip",
                    member.email
                )));
            }
            state.members.push(member.clone());
        }
        state.invitations.push(invitation.clone());
        Ok(())
    }

    async fn find_invitation(
        &self,
        trip_id: TripId,
        email: &str,
    ) -> Result<Option<Invitation>, PortError> {
        let state = self.state.read().await;
        Ok(state
            .invitations
            .iter()
            .find(|i| i.trip_id == trip_id && i.is_for(email))
            .cloned())
    }

    async fn pending_invitations(&self, trip_id: TripId) -> Result<Vec<Invitation>, PortError> {
        let state = self.state.read().await;
        Ok(state
            .invitations
            .iter()
            .filter(|i| i.trip_id == trip_id && i.is_pending())
            .cloned()
            .collect())
    }

    async fn invitations_for_email(&self, email: &str) -> Result<Vec<Invitation>, PortError> {
        let state = self.state.read().await;
        Ok(state
            .invitations
            .iter()
            .filter(|i| i.is_for(email) && i.is_pending())
            .cloned()
            .collect())
    }

    async fn accept_invitation(
        &self,
        invitation: &Invitation,
        member: &Member,
    ) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        if state
            .trip_members(member.trip_id)
            .any(|m| m.id != member.id && m.has_email(&member.email))
        {
            return Err(PortError::conflict(format!(
                "A member with email {} already exists in this trip",
                member.email
            )));
        }

        let stored = state
            .invitation_mut(invitation.id)
            .ok_or_else(|| PortError::not_found("Invitation", invitation.id))?;
        if stored.status != InvitationStatus::Pending {
            return Err(PortError::conflict(format!(
                "Invitation {} is {}",
                invitation.id, stored.status
            )));
        }
        *stored = invitation.clone();

        match state.members.iter_mut().find(|m| m.id == member.id) {
            Some(existing) => *existing = member.clone(),
            None => state.members.push(member.clone()),
        }
        Ok(())
    }

    async fn reject_invitation(&self, invitation: &Invitation) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        let stored = state
            .invitation_mut(invitation.id)
            .ok_or_else(|| PortError::not_found("Invitation", invitation.id))?;
        if stored.status != InvitationStatus::Pending {
            return Err(PortError::conflict(format!(
                "Invitation {} is {}",
                invitation.id, stored.status
            )));
        }
        *stored = invitation.clone();
        Ok(())
    }

    async fn delete_invitation(&self, invitation_id: InvitationId) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        let before = state.invitations.len();
        state.invitations.retain(|i| i.id != invitation_id);
        if state.invitations.len() == before {
            return Err(PortError::not_found("Invitation", invitation_id));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MockLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, PortError> {
        let guard = Arc::clone(&self.state).write_owned().await;
        let staged = LedgerState::clone(&guard);
        Ok(Box::new(MockTransaction {
            guard,
            staged,
            fail_settlement_writes: self.fail_settlement_writes.load(Ordering::SeqCst),
        }))
    }

    async fn trip_exists(&self, trip_id: TripId) -> Result<bool, PortError> {
        Ok(self.state.read().await.trips.contains_key(&trip_id))
    }

    async fn get_expense(&self, expense_id: ExpenseId) -> Result<Option<Expense>, PortError> {
        Ok(self.state.read().await.expenses.get(&expense_id).cloned())
    }

    async fn list_expenses(&self, trip_id: TripId) -> Result<Vec<Expense>, PortError> {
        let state = self.state.read().await;
        let mut expenses: Vec<Expense> = state.trip_expenses(trip_id).cloned().collect();
        expenses.sort_by(|a, b| {
            b.expense_date
                .cmp(&a.expense_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(expenses)
    }

    async fn list_settlements(&self, trip_id: TripId) -> Result<Vec<Settlement>, PortError> {
        let state = self.state.read().await;
        Ok(state
            .settlements
            .values()
            .filter(|s| s.trip_id == trip_id)
            .cloned()
            .collect())
    }

    async fn get_settlement(
        &self,
        trip_id: TripId,
        member_id: MemberId,
    ) -> Result<Option<Settlement>, PortError> {
        Ok(self
            .state
            .read()
            .await
            .settlements
            .get(&(trip_id, member_id))
            .cloned())
    }

    async fn member_contributions(
        &self,
        trip_id: TripId,
        member_id: MemberId,
    ) -> Result<Vec<SplitContribution>, PortError> {
        let state = self.state.read().await;
        let mut contributions: Vec<SplitContribution> = state
            .trip_expenses(trip_id)
            .flat_map(move |expense| {
                expense
                    .splits
                    .iter()
                    .filter(move |s| s.member_id == member_id)
                    .map(move |s| SplitContribution {
                        expense_id: expense.id,
                        description: expense.description.clone(),
                        amount: s.amount,
                        split_kind: expense.split_kind,
                        expense_date: expense.expense_date,
                    })
            })
            .collect();
        sort_by_date_desc(&mut contributions);
        Ok(contributions)
    }
}

struct MockTransaction {
    guard: OwnedRwLockWriteGuard<LedgerState>,
    staged: LedgerState,
    fail_settlement_writes: bool,
}

#[async_trait]
impl LedgerTransaction for MockTransaction {
    async fn lock_trip(&mut self, trip_id: TripId) -> Result<(), PortError> {
        // The write guard already serializes every transaction.
        if self.staged.trips.contains_key(&trip_id) {
            Ok(())
        } else {
            Err(PortError::not_found("Trip", trip_id))
        }
    }

    async fn load_expense(&mut self, expense_id: ExpenseId) -> Result<Option<Expense>, PortError> {
        Ok(self.staged.expenses.get(&expense_id).cloned())
    }

    async fn insert_expense(&mut self, expense: &Expense) -> Result<(), PortError> {
        if self.staged.expenses.contains_key(&expense.id) {
            return Err(PortError::conflict(format!("Expense {} already exists", expense.id)));
        }
        self.staged.expenses.insert(expense.id, expense.clone());
        Ok(())
    }

    async fn replace_expense(&mut self, expense: &Expense) -> Result<(), PortError> {
        let stored = self
            .staged
            .expenses
            .get_mut(&expense.id)
            .ok_or_else(|| PortError::not_found("Expense", expense.id))?;
        *stored = expense.clone();
        Ok(())
    }

    async fn delete_expense(&mut self, expense_id: ExpenseId) -> Result<(), PortError> {
        self.staged
            .expenses
            .remove(&expense_id)
            .map(|_| ())
            .ok_or_else(|| PortError::not_found("Expense", expense_id))
    }

    async fn load_members(&mut self, trip_id: TripId) -> Result<Vec<MemberId>, PortError> {
        Ok(self.staged.trip_members(trip_id).map(|m| m.id).collect())
    }

    async fn load_splits(&mut self, trip_id: TripId) -> Result<Vec<Split>, PortError> {
        Ok(self
            .staged
            .trip_expenses(trip_id)
            .flat_map(|e| e.splits.iter().cloned())
            .collect())
    }

    async fn upsert_settlements(
        &mut self,
        trip_id: TripId,
        balances: &[SettlementBalance],
    ) -> Result<(), PortError> {
        if self.fail_settlement_writes {
            return Err(PortError::internal("Injected settlement write failure"));
        }

        let now = Utc::now();
        for balance in balances {
            self.staged
                .settlements
                .entry((trip_id, balance.member_id))
                .and_modify(|s| {
                    s.amount = balance.amount;
                    s.updated_at = now;
                })
                .or_insert_with(|| Settlement::new(trip_id, balance.member_id, balance.amount));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        let MockTransaction {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }
}
