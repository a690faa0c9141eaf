//! Trip and member persistence

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Database row for a trip
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TripRow {
    pub trip_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for a trip member
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemberRow {
    pub member_id: Uuid,
    pub trip_id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub name: String,
    pub joined_at: DateTime<Utc>,
}

pub async fn find_trip(conn: &mut PgConnection, trip_id: Uuid) -> Result<Option<TripRow>, DatabaseError> {
    let row = sqlx::query_as::<_, TripRow>(
        r#"
        SELECT trip_id, owner_id, name, location, description,
               start_date, end_date, created_at, updated_at
        FROM trips
        WHERE trip_id = $1
        "#,
    )
    .bind(trip_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

pub async fn trip_exists(conn: &mut PgConnection, trip_id: Uuid) -> Result<bool, DatabaseError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM trips WHERE trip_id = $1)")
        .bind(trip_id)
        .fetch_one(conn)
        .await?;

    Ok(exists)
}

/// Takes a row lock on the trip until the surrounding transaction ends
pub async fn lock_trip(conn: &mut PgConnection, trip_id: Uuid) -> Result<(), DatabaseError> {
    sqlx::query_scalar::<_, Uuid>("SELECT trip_id FROM trips WHERE trip_id = $1 FOR UPDATE")
        .bind(trip_id)
        .fetch_optional(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| DatabaseError::not_found("Trip", trip_id))
}

pub async fn insert_trip(conn: &mut PgConnection, row: &TripRow) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO trips (trip_id, owner_id, name, location, description,
                           start_date, end_date, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(row.trip_id)
    .bind(row.owner_id)
    .bind(&row.name)
    .bind(&row.location)
    .bind(&row.description)
    .bind(row.start_date)
    .bind(row.end_date)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn update_trip(conn: &mut PgConnection, row: &TripRow) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE trips
        SET name = $2, location = $3, description = $4,
            start_date = $5, end_date = $6, updated_at = $7
        WHERE trip_id = $1
        "#,
    )
    .bind(row.trip_id)
    .bind(&row.name)
    .bind(&row.location)
    .bind(&row.description)
    .bind(row.start_date)
    .bind(row.end_date)
    .bind(row.updated_at)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Trip", row.trip_id));
    }
    Ok(())
}

/// Deletes a trip; members, expenses, splits and settlements cascade
pub async fn delete_trip(conn: &mut PgConnection, trip_id: Uuid) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM trips WHERE trip_id = $1")
        .bind(trip_id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Trip", trip_id));
    }
    Ok(())
}

/// Lists a trip's members in join order
pub async fn list_members(conn: &mut PgConnection, trip_id: Uuid) -> Result<Vec<MemberRow>, DatabaseError> {
    let rows = sqlx::query_as::<_, MemberRow>(
        r#"
        SELECT member_id, trip_id, user_id, email, name, joined_at
        FROM trip_members
        WHERE trip_id = $1
        ORDER BY join_seq
        "#,
    )
    .bind(trip_id)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Inserts a member; a second member with the same email in the trip
/// fails with `DuplicateEntry`
pub async fn insert_member(conn: &mut PgConnection, row: &MemberRow) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO trip_members (member_id, trip_id, user_id, email, name, joined_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(row.member_id)
    .bind(row.trip_id)
    .bind(row.user_id)
    .bind(&row.email)
    .bind(&row.name)
    .bind(row.joined_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Inserts a member, or updates the link and name of an existing row with
/// the same id
pub async fn upsert_member(conn: &mut PgConnection, row: &MemberRow) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO trip_members (member_id, trip_id, user_id, email, name, joined_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (member_id)
        DO UPDATE SET user_id = EXCLUDED.user_id, name = EXCLUDED.name
        "#,
    )
    .bind(row.member_id)
    .bind(row.trip_id)
    .bind(row.user_id)
    .bind(&row.email)
    .bind(&row.name)
    .bind(row.joined_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Deletes a member and returns its email; fails with `ForeignKeyViolation`
/// while any expense or split still references it
pub async fn delete_member(
    conn: &mut PgConnection,
    trip_id: Uuid,
    member_id: Uuid,
) -> Result<String, DatabaseError> {
    sqlx::query_scalar::<_, String>(
        "DELETE FROM trip_members WHERE trip_id = $1 AND member_id = $2 RETURNING email",
    )
    .bind(trip_id)
    .bind(member_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Member", member_id))
}
