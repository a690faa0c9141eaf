//! Settlement persistence

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Database row for a settlement
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SettlementRow {
    pub settlement_id: Uuid,
    pub trip_id: Uuid,
    pub member_id: Uuid,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn list_settlements(
    conn: &mut PgConnection,
    trip_id: Uuid,
) -> Result<Vec<SettlementRow>, DatabaseError> {
    let rows = sqlx::query_as::<_, SettlementRow>(
        r#"
        SELECT settlement_id, trip_id, member_id, amount, created_at, updated_at
        FROM settlements
        WHERE trip_id = $1
        "#,
    )
    .bind(trip_id)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

pub async fn find_settlement(
    conn: &mut PgConnection,
    trip_id: Uuid,
    member_id: Uuid,
) -> Result<Option<SettlementRow>, DatabaseError> {
    let row = sqlx::query_as::<_, SettlementRow>(
        r#"
        SELECT settlement_id, trip_id, member_id, amount, created_at, updated_at
        FROM settlements
        WHERE trip_id = $1 AND member_id = $2
        "#,
    )
    .bind(trip_id)
    .bind(member_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Writes a member's balance, keeping the id and creation time of an
/// existing row
pub async fn upsert_settlement(
    conn: &mut PgConnection,
    trip_id: Uuid,
    member_id: Uuid,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO settlements (settlement_id, trip_id, member_id, amount, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $5)
        ON CONFLICT (trip_id, member_id)
        DO UPDATE SET amount = EXCLUDED.amount, updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(trip_id)
    .bind(member_id)
    .bind(amount)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}
