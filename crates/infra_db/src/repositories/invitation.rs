//! Invitation persistence

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DbInvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Database row for an invitation
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvitationRow {
    pub invitation_id: Uuid,
    pub trip_id: Uuid,
    pub email: String,
    pub invited_by: Uuid,
    pub status: DbInvitationStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

const INVITATION_COLUMNS: &str =
    "invitation_id, trip_id, email, invited_by, status, created_at, responded_at";

pub async fn insert_invitation(conn: &mut PgConnection, row: &InvitationRow) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO trip_invitations (invitation_id, trip_id, email, invited_by,
                                      status, created_at, responded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(row.invitation_id)
    .bind(row.trip_id)
    .bind(&row.email)
    .bind(row.invited_by)
    .bind(row.status)
    .bind(row.created_at)
    .bind(row.responded_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn find_invitation(
    conn: &mut PgConnection,
    trip_id: Uuid,
    email: &str,
) -> Result<Option<InvitationRow>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM trip_invitations WHERE trip_id = $1 AND email = lower($2)",
        INVITATION_COLUMNS
    );
    let row = sqlx::query_as::<_, InvitationRow>(&sql)
        .bind(trip_id)
        .bind(email.trim())
        .fetch_optional(conn)
        .await?;

    Ok(row)
}

/// Pending invitations of a trip, oldest first
pub async fn list_pending_for_trip(
    conn: &mut PgConnection,
    trip_id: Uuid,
) -> Result<Vec<InvitationRow>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM trip_invitations WHERE trip_id = $1 AND status = 'PENDING' ORDER BY created_at",
        INVITATION_COLUMNS
    );
    let rows = sqlx::query_as::<_, InvitationRow>(&sql)
        .bind(trip_id)
        .fetch_all(conn)
        .await?;

    Ok(rows)
}

/// Pending invitations issued to an email across trips, newest first
pub async fn list_pending_for_email(
    conn: &mut PgConnection,
    email: &str,
) -> Result<Vec<InvitationRow>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM trip_invitations WHERE email = lower($1) AND status = 'PENDING' \
         ORDER BY created_at DESC",
        INVITATION_COLUMNS
    );
    let rows = sqlx::query_as::<_, InvitationRow>(&sql)
        .bind(email.trim())
        .fetch_all(conn)
        .await?;

    Ok(rows)
}

/// Moves a pending invitation to `status`
///
/// Fails with `StaleWrite` when the invitation was already answered, so
/// two concurrent answers cannot both succeed.
pub async fn respond(
    conn: &mut PgConnection,
    invitation_id: Uuid,
    status: DbInvitationStatus,
    responded_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE trip_invitations
        SET status = $2, responded_at = $3
        WHERE invitation_id = $1 AND status = 'PENDING'
        "#,
    )
    .bind(invitation_id)
    .bind(status)
    .bind(responded_at)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::StaleWrite(format!(
            "Invitation {} is no longer pending",
            invitation_id
        )));
    }
    Ok(())
}

pub async fn delete_invitation(conn: &mut PgConnection, invitation_id: Uuid) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM trip_invitations WHERE invitation_id = $1")
        .bind(invitation_id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Invitation", invitation_id));
    }
    Ok(())
}

/// Removes every invitation for an email in a trip
pub async fn delete_for_email(
    conn: &mut PgConnection,
    trip_id: Uuid,
    email: &str,
) -> Result<(), DatabaseError> {
    sqlx::query("DELETE FROM trip_invitations WHERE trip_id = $1 AND email = lower($2)")
        .bind(trip_id)
        .bind(email.trim())
        .execute(conn)
        .await?;

    Ok(())
}
