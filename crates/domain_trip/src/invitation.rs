//! Trip invitations
//!
//! An invitation lets one email address join one trip. It is keyed on the
//! trip and the lowercased email, so a trip holds at most one invitation per
//! address. Only a pending invitation can be accepted or rejected.
//!
//! ```text
//!   Pending ──accept──▶ Accepted
//!      │
//!      └────reject──▶ Rejected   (the creator may re-invite, which replaces it)
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{InvitationId, TripId, UserId};

use crate::error::TripError;
use crate::member::{emails_match, is_plausible_email};

/// Where an invitation stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "PENDING",
            InvitationStatus::Accepted => "ACCEPTED",
            InvitationStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An invitation for one email address to join a trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub trip_id: TripId,
    /// Lowercased and trimmed
    pub email: String,
    pub invited_by: UserId,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Invitation {
    /// Creates a pending invitation
    ///
    /// # Errors
    ///
    /// Returns `TripError::InvalidData` for a malformed email
    pub fn new(trip_id: TripId, email: &str, invited_by: UserId) -> Result<Self, TripError> {
        let email = email.trim().to_lowercase();
        if !is_plausible_email(&email) {
            return Err(TripError::invalid(format!("Invalid invitation email '{}'", email)));
        }

        Ok(Self {
            id: InvitationId::new_v7(),
            trip_id,
            email,
            invited_by,
            status: InvitationStatus::Pending,
            created_at: Utc::now(),
            responded_at: None,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    /// Returns true if the invitation was issued to `email`
    pub fn is_for(&self, email: &str) -> bool {
        emails_match(&self.email, email)
    }

    /// Marks the invitation accepted
    ///
    /// # Errors
    ///
    /// `TripError::InvitationNotPending` unless the invitation is pending
    pub fn accept(&mut self) -> Result<(), TripError> {
        self.respond(InvitationStatus::Accepted)
    }

    /// Marks the invitation rejected
    ///
    /// # Errors
    ///
    /// `TripError::InvitationNotPending` unless the invitation is pending
    pub fn reject(&mut self) -> Result<(), TripError> {
        self.respond(InvitationStatus::Rejected)
    }

    fn respond(&mut self, status: InvitationStatus) -> Result<(), TripError> {
        if !self.is_pending() {
            return Err(TripError::InvitationNotPending {
                email: self.email.clone(),
                status: self.status,
            });
        }
        self.status = status;
        self.responded_at = Some(Utc::now());
        Ok(())
    }
}
