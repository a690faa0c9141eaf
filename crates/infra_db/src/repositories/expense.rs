//! Expense and split persistence

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::DatabaseError;

/// How an expense is split
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "split_kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DbSplitKind {
    Equal,
    Exact,
    Percentage,
}

/// Expense category
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "expense_category", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DbExpenseCategory {
    Food,
    Transport,
    Accommodation,
    Entertainment,
    Other,
}

/// Database row for an expense
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExpenseRow {
    pub expense_id: Uuid,
    pub trip_id: Uuid,
    pub payer_id: Uuid,
    pub created_by: Option<Uuid>,
    pub amount: Decimal,
    pub description: String,
    pub category: DbExpenseCategory,
    pub expense_date: NaiveDate,
    pub split_kind: DbSplitKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for a split
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SplitRow {
    pub split_id: Uuid,
    pub expense_id: Uuid,
    pub member_id: Uuid,
    pub amount: Decimal,
    pub percentage: Decimal,
}

/// A split joined with the expense it belongs to
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContributionRow {
    pub expense_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub split_kind: DbSplitKind,
    pub expense_date: NaiveDate,
}

const EXPENSE_COLUMNS: &str = "expense_id, trip_id, payer_id, created_by, amount, description, \
     category, expense_date, split_kind, created_at, updated_at";

pub async fn find_expense(
    conn: &mut PgConnection,
    expense_id: Uuid,
) -> Result<Option<ExpenseRow>, DatabaseError> {
    let sql = format!("SELECT {} FROM expenses WHERE expense_id = $1", EXPENSE_COLUMNS);
    let row = sqlx::query_as::<_, ExpenseRow>(&sql)
        .bind(expense_id)
        .fetch_optional(conn)
        .await?;

    Ok(row)
}

/// Lists a trip's expenses, most recent expense date first
pub async fn list_expenses(
    conn: &mut PgConnection,
    trip_id: Uuid,
) -> Result<Vec<ExpenseRow>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM expenses WHERE trip_id = $1 ORDER BY expense_date DESC, created_at DESC",
        EXPENSE_COLUMNS
    );
    let rows = sqlx::query_as::<_, ExpenseRow>(&sql)
        .bind(trip_id)
        .fetch_all(conn)
        .await?;

    Ok(rows)
}

/// Lists the splits of the given expenses
pub async fn list_splits(
    conn: &mut PgConnection,
    expense_ids: &[Uuid],
) -> Result<Vec<SplitRow>, DatabaseError> {
    let rows = sqlx::query_as::<_, SplitRow>(
        r#"
        SELECT split_id, expense_id, member_id, amount, percentage
        FROM expense_splits
        WHERE expense_id = ANY($1)
        "#,
    )
    .bind(expense_ids)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Lists every split of every expense in a trip
pub async fn list_trip_splits(
    conn: &mut PgConnection,
    trip_id: Uuid,
) -> Result<Vec<SplitRow>, DatabaseError> {
    let rows = sqlx::query_as::<_, SplitRow>(
        r#"
        SELECT s.split_id, s.expense_id, s.member_id, s.amount, s.percentage
        FROM expense_splits s
        JOIN expenses e ON e.expense_id = s.expense_id
        WHERE e.trip_id = $1
        "#,
    )
    .bind(trip_id)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Lists a member's splits with their expenses, most recent first
pub async fn list_contributions(
    conn: &mut PgConnection,
    trip_id: Uuid,
    member_id: Uuid,
) -> Result<Vec<ContributionRow>, DatabaseError> {
    let rows = sqlx::query_as::<_, ContributionRow>(
        r#"
        SELECT e.expense_id, e.description, s.amount, e.split_kind, e.expense_date
        FROM expense_splits s
        JOIN expenses e ON e.expense_id = s.expense_id
        WHERE e.trip_id = $1 AND s.member_id = $2
        ORDER BY e.expense_date DESC, e.created_at DESC
        "#,
    )
    .bind(trip_id)
    .bind(member_id)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

pub async fn insert_expense(conn: &mut PgConnection, row: &ExpenseRow) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO expenses (expense_id, trip_id, payer_id, created_by, amount, description,
                              category, expense_date, split_kind, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(row.expense_id)
    .bind(row.trip_id)
    .bind(row.payer_id)
    .bind(row.created_by)
    .bind(row.amount)
    .bind(&row.description)
    .bind(row.category)
    .bind(row.expense_date)
    .bind(row.split_kind)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn update_expense(conn: &mut PgConnection, row: &ExpenseRow) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE expenses
        SET payer_id = $2, amount = $3, description = $4, category = $5,
            expense_date = $6, split_kind = $7, updated_at = $8
        WHERE expense_id = $1
        "#,
    )
    .bind(row.expense_id)
    .bind(row.payer_id)
    .bind(row.amount)
    .bind(&row.description)
    .bind(row.category)
    .bind(row.expense_date)
    .bind(row.split_kind)
    .bind(row.updated_at)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Expense", row.expense_id));
    }
    Ok(())
}

/// Deletes an expense; its splits cascade
pub async fn delete_expense(conn: &mut PgConnection, expense_id: Uuid) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM expenses WHERE expense_id = $1")
        .bind(expense_id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Expense", expense_id));
    }
    Ok(())
}

pub async fn delete_splits(conn: &mut PgConnection, expense_id: Uuid) -> Result<(), DatabaseError> {
    sqlx::query("DELETE FROM expense_splits WHERE expense_id = $1")
        .bind(expense_id)
        .execute(conn)
        .await?;

    Ok(())
}

pub async fn insert_splits(conn: &mut PgConnection, rows: &[SplitRow]) -> Result<(), DatabaseError> {
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO expense_splits (split_id, expense_id, member_id, amount, percentage)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(row.split_id)
        .bind(row.expense_id)
        .bind(row.member_id)
        .bind(row.amount)
        .bind(row.percentage)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
