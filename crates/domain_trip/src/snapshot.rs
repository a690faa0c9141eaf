//! Trip snapshots and principals
//!
//! A `TripSnapshot` is the trip together with its full member list, the
//! only input the access policy needs. Snapshots are what the cache holds.

use serde::{Deserialize, Serialize};

use core_kernel::{MemberId, TripId, UserId};
use crate::member::Member;
use crate::trip::Trip;

/// The authenticated caller of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
}

impl Principal {
    pub fn new(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }
}

/// A trip and its members as read at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripSnapshot {
    pub trip: Trip,
    /// Members in join order
    pub members: Vec<Member>,
}

impl TripSnapshot {
    pub fn new(trip: Trip, members: Vec<Member>) -> Self {
        Self { trip, members }
    }

    pub fn trip_id(&self) -> TripId {
        self.trip.id
    }

    pub fn owner_id(&self) -> UserId {
        self.trip.owner_id
    }

    /// Looks up a member by id
    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Returns true if `id` is a member of this trip
    pub fn has_member(&self, id: MemberId) -> bool {
        self.member(id).is_some()
    }

    /// Looks up a member by email; first match wins
    pub fn member_by_email(&self, email: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.has_email(email))
    }
}
