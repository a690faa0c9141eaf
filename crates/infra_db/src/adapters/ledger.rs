//! PostgreSQL Ledger Adapter
//!
//! Implements both the trip store and the ledger store on one connection
//! pool. Trip writes that touch several rows run in their own transaction;
//! ledger writes run in a [`PgLedgerTransaction`] owned by the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use infra_db::adapters::PostgresLedgerStore;
//!
//! let store = Arc::new(PostgresLedgerStore::new(pool));
//! let snapshot = store.fetch_snapshot(trip_id).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    DateRange, DomainPort, ExpenseId, HealthCheckResult, HealthCheckable, InvitationId, MemberId,
    Money, PortError, SettlementId, SplitId, TripId, UserId,
};
use domain_expense::{
    Expense, ExpenseCategory, LedgerStore, LedgerTransaction, Settlement, SettlementBalance,
    Split, SplitContribution, SplitKind,
};
use domain_trip::{Invitation, InvitationStatus, Member, Trip, TripSnapshot, TripStore};

use crate::error::{db_to_port_error, DatabaseError};
use crate::repositories::{
    expense, invitation, settlement, trip, ContributionRow, DbExpenseCategory,
    DbInvitationStatus, DbSplitKind, ExpenseRow, InvitationRow, MemberRow, SettlementRow,
    SplitRow, TripRow,
};

const ADAPTER_ID: &str = "postgres-ledger-store";

/// PostgreSQL-backed trip and ledger store
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn acquire(&self) -> Result<sqlx::pool::PoolConnection<Postgres>, PortError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| db_to_port_error(e.into()))
    }

    async fn begin_tx(&self) -> Result<Transaction<'static, Postgres>, PortError> {
        self.pool
            .begin()
            .await
            .map_err(|e| db_to_port_error(DatabaseError::TransactionFailed(e.to_string())))
    }
}

impl DomainPort for PostgresLedgerStore {}

#[async_trait]
impl HealthCheckable for PostgresLedgerStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy(ADAPTER_ID, latency_ms),
            Err(e) => {
                HealthCheckResult::unhealthy(ADAPTER_ID, latency_ms, format!("Database error: {}", e))
            }
        }
    }
}

#[async_trait]
impl TripStore for PostgresLedgerStore {
    #[instrument(skip(self), fields(trip_id = %trip_id))]
    async fn fetch_snapshot(&self, trip_id: TripId) -> Result<Option<TripSnapshot>, PortError> {
        debug!("Fetching trip snapshot");
        let mut conn = self.acquire().await?;

        let Some(trip_row) = trip::find_trip(&mut conn, *trip_id.as_uuid())
            .await
            .map_err(db_to_port_error)?
        else {
            return Ok(None);
        };
        let members = trip::list_members(&mut conn, trip_row.trip_id)
            .await
            .map_err(db_to_port_error)?;

        Ok(Some(TripSnapshot::new(
            row_to_trip(trip_row)?,
            members.into_iter().map(row_to_member).collect(),
        )))
    }

    #[instrument(skip(self, trip, creator), fields(trip_id = %trip.id))]
    async fn create_trip(&self, trip: &Trip, creator: &Member) -> Result<(), PortError> {
        let mut tx = self.begin_tx().await?;
        trip::insert_trip(&mut tx, &trip_to_row(trip))
            .await
            .map_err(db_to_port_error)?;
        trip::insert_member(&mut tx, &member_to_row(creator))
            .await
            .map_err(db_to_port_error)?;
        commit(tx).await?;

        debug!("Trip created with creator member");
        Ok(())
    }

    #[instrument(skip(self, trip), fields(trip_id = %trip.id))]
    async fn update_trip(&self, trip: &Trip) -> Result<(), PortError> {
        let mut conn = self.acquire().await?;
        trip::update_trip(&mut conn, &trip_to_row(trip))
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self), fields(trip_id = %trip_id))]
    async fn delete_trip(&self, trip_id: TripId) -> Result<(), PortError> {
        let mut conn = self.acquire().await?;
        trip::delete_trip(&mut conn, *trip_id.as_uuid())
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self), fields(trip_id = %trip_id, member_id = %member_id))]
    async fn remove_member(&self, trip_id: TripId, member_id: MemberId) -> Result<(), PortError> {
        let mut tx = self.begin_tx().await?;
        let email = trip::delete_member(&mut tx, *trip_id.as_uuid(), *member_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        invitation::delete_for_email(&mut tx, *trip_id.as_uuid(), &email)
            .await
            .map_err(db_to_port_error)?;
        commit(tx).await
    }

    #[instrument(skip(self, invitation, member), fields(trip_id = %invitation.trip_id, invitation_id = %invitation.id))]
    async fn insert_invitation(
        &self,
        invitation: &Invitation,
        member: Option<&Member>,
    ) -> Result<(), PortError> {
        let mut tx = self.begin_tx().await?;
        let exists = trip::trip_exists(&mut tx, *invitation.trip_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        if !exists {
            return Err(PortError::not_found("Trip", invitation.trip_id));
        }

        if let Some(member) = member {
            trip::insert_member(&mut tx, &member_to_row(member))
                .await
                .map_err(db_to_port_error)?;
        }
        invitation::insert_invitation(&mut tx, &invitation_to_row(invitation))
            .await
            .map_err(db_to_port_error)?;
        commit(tx).await?;

        debug!(with_member = member.is_some(), "Invitation stored");
        Ok(())
    }

    #[instrument(skip(self, email), fields(trip_id = %trip_id))]
    async fn find_invitation(
        &self,
        trip_id: TripId,
        email: &str,
    ) -> Result<Option<Invitation>, PortError> {
        let mut conn = self.acquire().await?;
        let row = invitation::find_invitation(&mut conn, *trip_id.as_uuid(), email)
            .await
            .map_err(db_to_port_error)?;
        Ok(row.map(row_to_invitation))
    }

    #[instrument(skip(self), fields(trip_id = %trip_id))]
    async fn pending_invitations(&self, trip_id: TripId) -> Result<Vec<Invitation>, PortError> {
        let mut conn = self.acquire().await?;
        let rows = invitation::list_pending_for_trip(&mut conn, *trip_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        Ok(rows.into_iter().map(row_to_invitation).collect())
    }

    #[instrument(skip(self, email))]
    async fn invitations_for_email(&self, email: &str) -> Result<Vec<Invitation>, PortError> {
        let mut conn = self.acquire().await?;
        let rows = invitation::list_pending_for_email(&mut conn, email)
            .await
            .map_err(db_to_port_error)?;
        Ok(rows.into_iter().map(row_to_invitation).collect())
    }

    #[instrument(skip(self, invitation, member), fields(invitation_id = %invitation.id, member_id = %member.id))]
    async fn accept_invitation(
        &self,
        invitation: &Invitation,
        member: &Member,
    ) -> Result<(), PortError> {
        let mut tx = self.begin_tx().await?;
        invitation::respond(
            &mut tx,
            *invitation.id.as_uuid(),
            DbInvitationStatus::Accepted,
            invitation.responded_at.unwrap_or_else(Utc::now),
        )
        .await
        .map_err(db_to_port_error)?;
        trip::upsert_member(&mut tx, &member_to_row(member))
            .await
            .map_err(db_to_port_error)?;
        commit(tx).await
    }

    #[instrument(skip(self, invitation), fields(invitation_id = %invitation.id))]
    async fn reject_invitation(&self, invitation: &Invitation) -> Result<(), PortError> {
        let mut conn = self.acquire().await?;
        invitation::respond(
            &mut conn,
            *invitation.id.as_uuid(),
            DbInvitationStatus::Rejected,
            invitation.responded_at.unwrap_or_else(Utc::now),
        )
        .await
        .map_err(db_to_port_error)
    }

    #[instrument(skip(self), fields(invitation_id = %invitation_id))]
    async fn delete_invitation(&self, invitation_id: InvitationId) -> Result<(), PortError> {
        let mut conn = self.acquire().await?;
        invitation::delete_invitation(&mut conn, *invitation_id.as_uuid())
            .await
            .map_err(db_to_port_error)
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, PortError> {
        Ok(Box::new(PgLedgerTransaction {
            tx: self.begin_tx().await?,
        }))
    }

    #[instrument(skip(self), fields(trip_id = %trip_id))]
    async fn trip_exists(&self, trip_id: TripId) -> Result<bool, PortError> {
        let mut conn = self.acquire().await?;
        trip::trip_exists(&mut conn, *trip_id.as_uuid())
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self), fields(expense_id = %expense_id))]
    async fn get_expense(&self, expense_id: ExpenseId) -> Result<Option<Expense>, PortError> {
        let mut conn = self.acquire().await?;
        let Some(row) = expense::find_expense(&mut conn, *expense_id.as_uuid())
            .await
            .map_err(db_to_port_error)?
        else {
            return Ok(None);
        };

        let splits = expense::list_splits(&mut conn, &[row.expense_id])
            .await
            .map_err(db_to_port_error)?;

        Ok(Some(row_to_expense(row, splits)))
    }

    #[instrument(skip(self), fields(trip_id = %trip_id))]
    async fn list_expenses(&self, trip_id: TripId) -> Result<Vec<Expense>, PortError> {
        let mut conn = self.acquire().await?;
        let rows = expense::list_expenses(&mut conn, *trip_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.expense_id).collect();
        let mut splits_by_expense: HashMap<Uuid, Vec<SplitRow>> = HashMap::new();
        for split in expense::list_splits(&mut conn, &ids)
            .await
            .map_err(db_to_port_error)?
        {
            splits_by_expense.entry(split.expense_id).or_default().push(split);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let splits = splits_by_expense.remove(&row.expense_id).unwrap_or_default();
                row_to_expense(row, splits)
            })
            .collect())
    }

    #[instrument(skip(self), fields(trip_id = %trip_id))]
    async fn list_settlements(&self, trip_id: TripId) -> Result<Vec<Settlement>, PortError> {
        let mut conn = self.acquire().await?;
        let rows = settlement::list_settlements(&mut conn, *trip_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;

        Ok(rows.into_iter().map(row_to_settlement).collect())
    }

    #[instrument(skip(self), fields(trip_id = %trip_id, member_id = %member_id))]
    async fn get_settlement(
        &self,
        trip_id: TripId,
        member_id: MemberId,
    ) -> Result<Option<Settlement>, PortError> {
        let mut conn = self.acquire().await?;
        let row = settlement::find_settlement(&mut conn, *trip_id.as_uuid(), *member_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;

        Ok(row.map(row_to_settlement))
    }

    #[instrument(skip(self), fields(trip_id = %trip_id, member_id = %member_id))]
    async fn member_contributions(
        &self,
        trip_id: TripId,
        member_id: MemberId,
    ) -> Result<Vec<SplitContribution>, PortError> {
        let mut conn = self.acquire().await?;
        let rows = expense::list_contributions(&mut conn, *trip_id.as_uuid(), *member_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;

        Ok(rows.into_iter().map(row_to_contribution).collect())
    }
}

/// A ledger transaction on one PostgreSQL transaction
///
/// Dropping it without committing rolls back.
pub struct PgLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTransaction for PgLedgerTransaction {
    async fn lock_trip(&mut self, trip_id: TripId) -> Result<(), PortError> {
        trip::lock_trip(&mut self.tx, *trip_id.as_uuid())
            .await
            .map_err(db_to_port_error)
    }

    async fn load_expense(&mut self, expense_id: ExpenseId) -> Result<Option<Expense>, PortError> {
        let Some(row) = expense::find_expense(&mut self.tx, *expense_id.as_uuid())
            .await
            .map_err(db_to_port_error)?
        else {
            return Ok(None);
        };
        let splits = expense::list_splits(&mut self.tx, &[row.expense_id])
            .await
            .map_err(db_to_port_error)?;

        Ok(Some(row_to_expense(row, splits)))
    }

    async fn insert_expense(&mut self, expense: &Expense) -> Result<(), PortError> {
        let (row, splits) = expense_to_rows(expense);
        expense::insert_expense(&mut self.tx, &row)
            .await
            .map_err(db_to_port_error)?;
        expense::insert_splits(&mut self.tx, &splits)
            .await
            .map_err(db_to_port_error)
    }

    async fn replace_expense(&mut self, expense: &Expense) -> Result<(), PortError> {
        let (row, splits) = expense_to_rows(expense);
        expense::update_expense(&mut self.tx, &row)
            .await
            .map_err(db_to_port_error)?;
        expense::delete_splits(&mut self.tx, row.expense_id)
            .await
            .map_err(db_to_port_error)?;
        expense::insert_splits(&mut self.tx, &splits)
            .await
            .map_err(db_to_port_error)
    }

    async fn delete_expense(&mut self, expense_id: ExpenseId) -> Result<(), PortError> {
        expense::delete_expense(&mut self.tx, *expense_id.as_uuid())
            .await
            .map_err(db_to_port_error)
    }

    async fn load_members(&mut self, trip_id: TripId) -> Result<Vec<MemberId>, PortError> {
        let rows = trip::list_members(&mut self.tx, *trip_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        Ok(rows.into_iter().map(|r| MemberId::from_uuid(r.member_id)).collect())
    }

    async fn load_splits(&mut self, trip_id: TripId) -> Result<Vec<Split>, PortError> {
        let rows = expense::list_trip_splits(&mut self.tx, *trip_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        Ok(rows.into_iter().map(row_to_split).collect())
    }

    async fn upsert_settlements(
        &mut self,
        trip_id: TripId,
        balances: &[SettlementBalance],
    ) -> Result<(), PortError> {
        let now = Utc::now();
        for balance in balances {
            settlement::upsert_settlement(
                &mut self.tx,
                *trip_id.as_uuid(),
                *balance.member_id.as_uuid(),
                balance.amount.amount(),
                now,
            )
            .await
            .map_err(db_to_port_error)?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        commit(self.tx).await
    }
}

async fn commit(tx: Transaction<'static, Postgres>) -> Result<(), PortError> {
    tx.commit()
        .await
        .map_err(|e| db_to_port_error(DatabaseError::TransactionFailed(e.to_string())))
}

// ============================================================================
// Row conversions
// ============================================================================

fn trip_to_row(trip: &Trip) -> TripRow {
    TripRow {
        trip_id: *trip.id.as_uuid(),
        owner_id: *trip.owner_id.as_uuid(),
        name: trip.name.clone(),
        location: trip.location.clone(),
        description: trip.description.clone(),
        start_date: trip.dates.start(),
        end_date: trip.dates.end(),
        created_at: trip.created_at,
        updated_at: trip.updated_at,
    }
}

fn row_to_trip(row: TripRow) -> Result<Trip, PortError> {
    let dates = DateRange::new(row.start_date, row.end_date)
        .map_err(|e| PortError::transformation(e.to_string()))?;
    Ok(Trip {
        id: TripId::from_uuid(row.trip_id),
        owner_id: UserId::from_uuid(row.owner_id),
        name: row.name,
        location: row.location,
        description: row.description,
        dates,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn member_to_row(member: &Member) -> MemberRow {
    MemberRow {
        member_id: *member.id.as_uuid(),
        trip_id: *member.trip_id.as_uuid(),
        user_id: member.user_id.map(|u| *u.as_uuid()),
        email: member.email.clone(),
        name: member.name.clone(),
        joined_at: member.joined_at,
    }
}

fn row_to_member(row: MemberRow) -> Member {
    Member {
        id: MemberId::from_uuid(row.member_id),
        trip_id: TripId::from_uuid(row.trip_id),
        user_id: row.user_id.map(UserId::from_uuid),
        email: row.email,
        name: row.name,
        joined_at: row.joined_at,
    }
}

fn invitation_to_row(invitation: &Invitation) -> InvitationRow {
    InvitationRow {
        invitation_id: *invitation.id.as_uuid(),
        trip_id: *invitation.trip_id.as_uuid(),
        email: invitation.email.clone(),
        invited_by: *invitation.invited_by.as_uuid(),
        status: match invitation.status {
            InvitationStatus::Pending => DbInvitationStatus::Pending,
            InvitationStatus::Accepted => DbInvitationStatus::Accepted,
            InvitationStatus::Rejected => DbInvitationStatus::Rejected,
        },
        created_at: invitation.created_at,
        responded_at: invitation.responded_at,
    }
}

fn row_to_invitation(row: InvitationRow) -> Invitation {
    Invitation {
        id: InvitationId::from_uuid(row.invitation_id),
        trip_id: TripId::from_uuid(row.trip_id),
        email: row.email,
        invited_by: UserId::from_uuid(row.invited_by),
        status: match row.status {
            DbInvitationStatus::Pending => InvitationStatus::Pending,
            DbInvitationStatus::Accepted => InvitationStatus::Accepted,
            DbInvitationStatus::Rejected => InvitationStatus::Rejected,
        },
        created_at: row.created_at,
        responded_at: row.responded_at,
    }
}

fn expense_to_rows(expense: &Expense) -> (ExpenseRow, Vec<SplitRow>) {
    let row = ExpenseRow {
        expense_id: *expense.id.as_uuid(),
        trip_id: *expense.trip_id.as_uuid(),
        payer_id: *expense.payer_id.as_uuid(),
        created_by: expense.created_by.map(|m| *m.as_uuid()),
        amount: expense.amount.amount(),
        description: expense.description.clone(),
        category: category_to_db(expense.category),
        expense_date: expense.expense_date,
        split_kind: split_kind_to_db(expense.split_kind),
        created_at: expense.created_at,
        updated_at: expense.updated_at,
    };
    let splits = expense
        .splits
        .iter()
        .map(|s| SplitRow {
            split_id: *s.id.as_uuid(),
            expense_id: *expense.id.as_uuid(),
            member_id: *s.member_id.as_uuid(),
            amount: s.amount.amount(),
            percentage: s.percentage,
        })
        .collect();
    (row, splits)
}

fn row_to_expense(row: ExpenseRow, splits: Vec<SplitRow>) -> Expense {
    Expense {
        id: ExpenseId::from_uuid(row.expense_id),
        trip_id: TripId::from_uuid(row.trip_id),
        payer_id: MemberId::from_uuid(row.payer_id),
        created_by: row.created_by.map(MemberId::from_uuid),
        amount: Money::new(row.amount),
        description: row.description,
        category: category_from_db(row.category),
        expense_date: row.expense_date,
        split_kind: split_kind_from_db(row.split_kind),
        splits: splits.into_iter().map(row_to_split).collect(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn row_to_split(row: SplitRow) -> Split {
    Split {
        id: SplitId::from_uuid(row.split_id),
        expense_id: ExpenseId::from_uuid(row.expense_id),
        member_id: MemberId::from_uuid(row.member_id),
        amount: Money::new(row.amount),
        percentage: row.percentage,
    }
}

fn row_to_settlement(row: SettlementRow) -> Settlement {
    Settlement {
        id: SettlementId::from_uuid(row.settlement_id),
        trip_id: TripId::from_uuid(row.trip_id),
        member_id: MemberId::from_uuid(row.member_id),
        amount: Money::new(row.amount),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn row_to_contribution(row: ContributionRow) -> SplitContribution {
    SplitContribution {
        expense_id: ExpenseId::from_uuid(row.expense_id),
        description: row.description,
        amount: Money::new(row.amount),
        split_kind: split_kind_from_db(row.split_kind),
        expense_date: row.expense_date,
    }
}

fn split_kind_to_db(kind: SplitKind) -> DbSplitKind {
    match kind {
        SplitKind::Equal => DbSplitKind::Equal,
        SplitKind::Exact => DbSplitKind::Exact,
        SplitKind::Percentage => DbSplitKind::Percentage,
    }
}

fn split_kind_from_db(kind: DbSplitKind) -> SplitKind {
    match kind {
        DbSplitKind::Equal => SplitKind::Equal,
        DbSplitKind::Exact => SplitKind::Exact,
        DbSplitKind::Percentage => SplitKind::Percentage,
    }
}

fn category_to_db(category: ExpenseCategory) -> DbExpenseCategory {
    match category {
        ExpenseCategory::Food => DbExpenseCategory::Food,
        ExpenseCategory::Transport => DbExpenseCategory::Transport,
        ExpenseCategory::Accommodation => DbExpenseCategory::Accommodation,
        ExpenseCategory::Entertainment => DbExpenseCategory::Entertainment,
        ExpenseCategory::Other => DbExpenseCategory::Other,
    }
}

fn category_from_db(category: DbExpenseCategory) -> ExpenseCategory {
    match category {
        DbExpenseCategory::Food => ExpenseCategory::Food,
        DbExpenseCategory::Transport => ExpenseCategory::Transport,
        DbExpenseCategory::Accommodation => ExpenseCategory::Accommodation,
        DbExpenseCategory::Entertainment => ExpenseCategory::Entertainment,
        DbExpenseCategory::Other => ExpenseCategory::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use domain_expense::{calculate, NewExpense, SplitStrategy};
    use rust_decimal_macros::dec;

    fn sample_trip() -> Trip {
        let dates = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 8, 4).unwrap(),
        )
        .unwrap();
        Trip::new(UserId::new(), "Coast", dates)
            .unwrap()
            .with_location("Algarve")
    }

    #[test]
    fn test_trip_row_conversion_preserves_fields() {
        let trip = sample_trip();
        let restored = row_to_trip(trip_to_row(&trip)).unwrap();
        assert_eq!(restored, trip);
    }

    #[test]
    fn test_inverted_dates_in_row_are_rejected() {
        let mut row = trip_to_row(&sample_trip());
        row.end_date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();

        assert!(matches!(row_to_trip(row), Err(PortError::Transformation { .. })));
    }

    #[test]
    fn test_member_row_conversion_keeps_link() {
        let trip = sample_trip();
        let member = Member::linked(trip.id, trip.owner_id, "me@example.com", "Me").unwrap();
        assert_eq!(row_to_member(member_to_row(&member)), member);
    }

    #[test]
    fn test_invitation_row_conversion_keeps_status() {
        let trip = sample_trip();
        let mut pending = Invitation::new(trip.id, "Guest@Example.com", trip.owner_id).unwrap();
        pending.reject().unwrap();

        let row = invitation_to_row(&pending);
        assert_eq!(row.status, DbInvitationStatus::Rejected);
        assert_eq!(row.email, "guest@example.com");
        assert_eq!(row_to_invitation(row), pending);
    }

    #[test]
    fn test_expense_rows_carry_every_split() {
        let trip = sample_trip();
        let members = vec![MemberId::new(), MemberId::new(), MemberId::new()];
        let input = NewExpense {
            payer_id: members[0],
            amount: Money::new(dec!(100.00)),
            description: "Boat".to_string(),
            category: ExpenseCategory::Entertainment,
            expense_date: NaiveDate::from_ymd_opt(2024, 8, 2).unwrap(),
            strategy: SplitStrategy::Equal,
        };
        let computed = calculate(input.amount, &input.strategy, &members).unwrap();
        let expense = Expense::new(trip.id, members[0], &input, computed);

        let (row, splits) = expense_to_rows(&expense);
        assert_eq!(row.split_kind, DbSplitKind::Equal);
        assert_eq!(row.category, DbExpenseCategory::Entertainment);
        assert_eq!(splits.len(), 3);

        let restored = row_to_expense(row, splits);
        assert_eq!(restored, expense);
    }
}
