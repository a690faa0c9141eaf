//! Expense Domain Ports
//!
//! The ledger is written through short-lived transactions: an expense
//! mutation and the settlement recalculation that follows it must commit
//! together or not at all. `LedgerStore::begin` opens a
//! [`LedgerTransaction`]; dropping it without calling
//! [`LedgerTransaction::commit`] rolls every staged write back, which is
//! also what happens when the surrounding future is cancelled.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut tx = store.begin().await?;
//! tx.lock_trip(expense.trip_id).await?;
//! tx.insert_expense(&expense).await?;
//! let members = tx.load_members(expense.trip_id).await?;
//! let splits = tx.load_splits(expense.trip_id).await?;
//! tx.upsert_settlements(expense.trip_id, &aggregate(&members, &splits).balances).await?;
//! tx.commit().await?;
//! ```

use async_trait::async_trait;

use core_kernel::{DomainPort, ExpenseId, HealthCheckable, MemberId, PortError, TripId};

use crate::expense::{Expense, Split};
use crate::settlement::{Settlement, SettlementBalance, SplitContribution};

/// Read access to the ledger and the entry point for transactional writes
#[async_trait]
pub trait LedgerStore: DomainPort + HealthCheckable {
    /// Opens a transaction
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, PortError>;

    /// Returns true if the trip exists
    async fn trip_exists(&self, trip_id: TripId) -> Result<bool, PortError>;

    /// Loads an expense with its splits
    async fn get_expense(&self, expense_id: ExpenseId) -> Result<Option<Expense>, PortError>;

    /// Lists a trip's expenses with their splits, most recent expense date
    /// first
    async fn list_expenses(&self, trip_id: TripId) -> Result<Vec<Expense>, PortError>;

    /// Lists the persisted settlements of a trip, in no particular order
    async fn list_settlements(&self, trip_id: TripId) -> Result<Vec<Settlement>, PortError>;

    /// Loads the settlement of one member
    async fn get_settlement(
        &self,
        trip_id: TripId,
        member_id: MemberId,
    ) -> Result<Option<Settlement>, PortError>;

    /// Lists the splits assigned to a member together with their expenses
    async fn member_contributions(
        &self,
        trip_id: TripId,
        member_id: MemberId,
    ) -> Result<Vec<SplitContribution>, PortError>;
}

/// A unit of ledger writes that commits atomically
///
/// Reads issued through the transaction observe its own staged writes.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Serializes ledger writes for one trip until the transaction ends
    ///
    /// # Errors
    ///
    /// `PortError::NotFound` if the trip does not exist
    async fn lock_trip(&mut self, trip_id: TripId) -> Result<(), PortError>;

    /// Reads an expense with its splits as the transaction sees it
    ///
    /// Taken after [`LedgerTransaction::lock_trip`], the result cannot be
    /// changed by another writer before this transaction ends.
    async fn load_expense(&mut self, expense_id: ExpenseId) -> Result<Option<Expense>, PortError>;

    /// Inserts an expense and its splits
    async fn insert_expense(&mut self, expense: &Expense) -> Result<(), PortError>;

    /// Overwrites an expense and replaces all of its splits
    async fn replace_expense(&mut self, expense: &Expense) -> Result<(), PortError>;

    /// Deletes an expense and its splits
    ///
    /// # Errors
    ///
    /// `PortError::NotFound` if the expense does not exist
    async fn delete_expense(&mut self, expense_id: ExpenseId) -> Result<(), PortError>;

    /// Lists the ids of the trip's members in join order
    async fn load_members(&mut self, trip_id: TripId) -> Result<Vec<MemberId>, PortError>;

    /// Lists every split of every expense in the trip
    async fn load_splits(&mut self, trip_id: TripId) -> Result<Vec<Split>, PortError>;

    /// Writes one settlement per balance
    ///
    /// Existing rows keep their id and creation time; only the amount and
    /// `updated_at` change.
    async fn upsert_settlements(
        &mut self,
        trip_id: TripId,
        balances: &[SettlementBalance],
    ) -> Result<(), PortError>;

    /// Makes every staged write visible
    async fn commit(self: Box<Self>) -> Result<(), PortError>;
}
