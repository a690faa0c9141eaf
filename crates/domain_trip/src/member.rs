//! Trip members
//!
//! A member is a participant in one trip. Email is the identity key within
//! a trip and is compared case-insensitively; a trip holds at most one
//! member per email. The creator is a member like any other, linked to the
//! creator's user account from the moment the trip is created. Other
//! members stay unlinked until they accept an invitation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{MemberId, TripId, UserId};
use crate::error::TripError;

/// Compares two email addresses the way member identity requires
pub fn emails_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// A participant in a trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub trip_id: TripId,
    /// Linked user account; `None` until an invitation is accepted
    pub user_id: Option<UserId>,
    pub email: String,
    pub name: String,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    /// Creates an unlinked member
    ///
    /// # Errors
    ///
    /// Returns `TripError::InvalidData` for a blank name or a malformed email
    pub fn new(
        trip_id: TripId,
        email: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, TripError> {
        let email = email.into().trim().to_string();
        let name = name.into();

        if !is_plausible_email(&email) {
            return Err(TripError::invalid(format!("Invalid member email '{}'", email)));
        }
        if name.trim().is_empty() {
            return Err(TripError::invalid("Member name must not be blank"));
        }

        Ok(Self {
            id: MemberId::new_v7(),
            trip_id,
            user_id: None,
            email,
            name,
            joined_at: Utc::now(),
        })
    }

    /// Creates a member already linked to a user account
    pub fn linked(
        trip_id: TripId,
        user_id: UserId,
        email: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, TripError> {
        let mut member = Self::new(trip_id, email, name)?;
        member.user_id = Some(user_id);
        Ok(member)
    }

    /// Returns true if the member has accepted an invitation
    pub fn is_linked(&self) -> bool {
        self.user_id.is_some()
    }

    /// Links the member to the user account that accepted its invitation
    pub fn link(&mut self, user_id: UserId) {
        self.user_id = Some(user_id);
    }

    /// Returns true if this member is identified by `email`
    pub fn has_email(&self, email: &str) -> bool {
        emails_match(&self.email, email)
    }
}

pub(crate) fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
