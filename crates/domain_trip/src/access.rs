//! Trip access policy
//!
//! Every trip-scoped mutation is gated by the caller's role in the trip:
//!
//! - **Creator**: the user whose id matches the trip's owner id. Creator
//!   rights are decided by user id, never by email.
//! - **Member**: any principal whose email matches a member row,
//!   compared case-insensitively.
//! - **Stranger**: everyone else. Strangers are denied.
//!
//! The creator may modify anything in the trip. A member may modify only
//! resources recorded under their own member id. Decisions never fail;
//! absence is expressed as `false` or `None` and callers convert that into
//! forbidden or not-found errors.
//!
//! # Examples
//!
//! ```rust
//! use chrono::NaiveDate;
//! use core_kernel::{DateRange, UserId};
//! use domain_trip::{evaluate_access, AccessRole, Member, Principal, Trip, TripSnapshot};
//!
//! let owner = UserId::new();
//! let dates = DateRange::new(
//!     NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 7, 10).unwrap(),
//! ).unwrap();
//! let trip = Trip::new(owner, "Lisbon", dates).unwrap();
//! let guest = Member::new(trip.id, "Guest@Example.com", "Guest").unwrap();
//! let snapshot = TripSnapshot::new(trip, vec![guest]);
//!
//! let decision = evaluate_access(&Principal::new(UserId::new(), "guest@example.com"), &snapshot);
//! assert!(decision.can_access);
//! assert_eq!(decision.role, AccessRole::Member);
//! ```

use serde::{Deserialize, Serialize};

use core_kernel::{MemberId, UserId};
use crate::member::Member;
use crate::snapshot::{Principal, TripSnapshot};

/// The caller's role within a trip, derived on every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRole {
    Creator,
    Member,
    #[serde(rename = "none")]
    Stranger,
}

/// Outcome of an access evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub can_access: bool,
    pub role: AccessRole,
}

impl AccessDecision {
    fn granted(role: AccessRole) -> Self {
        Self {
            can_access: true,
            role,
        }
    }

    fn denied() -> Self {
        Self {
            can_access: false,
            role: AccessRole::Stranger,
        }
    }

    /// Returns true if the caller is the trip's creator
    pub fn is_creator(&self) -> bool {
        self.role == AccessRole::Creator
    }
}

/// Evaluates the principal's role in the trip
pub fn evaluate_access(principal: &Principal, snapshot: &TripSnapshot) -> AccessDecision {
    if snapshot.owner_id() == principal.user_id {
        return AccessDecision::granted(AccessRole::Creator);
    }

    if snapshot.member_by_email(&principal.email).is_some() {
        return AccessDecision::granted(AccessRole::Member);
    }

    AccessDecision::denied()
}

/// Returns true only for the trip's creator
pub fn can_modify_trip(user_id: UserId, snapshot: &TripSnapshot) -> bool {
    snapshot.owner_id() == user_id
}

/// Decides whether the principal may change a resource recorded by
/// `resource_creator`
///
/// The trip creator may change anything. Anyone else must hold a member
/// record whose id equals the resource's recorder. A resource without a
/// recorder can only be changed by the creator.
pub fn can_modify_owned_resource(
    principal: &Principal,
    snapshot: &TripSnapshot,
    resource_creator: Option<MemberId>,
) -> bool {
    if can_modify_trip(principal.user_id, snapshot) {
        return true;
    }

    match (resource_creator, resolve_member_id(&principal.email, &snapshot.members)) {
        (Some(creator), Some(own)) => creator == own,
        _ => false,
    }
}

/// Finds the member id registered under `email`; first match wins
pub fn resolve_member_id(email: &str, members: &[Member]) -> Option<MemberId> {
    members.iter().find(|m| m.has_email(email)).map(|m| m.id)
}

/// Authorization decisions over a trip snapshot
///
/// Implementations must be synchronous and free of side effects so they can
/// run on every request without I/O.
pub trait AccessPolicy: Send + Sync {
    fn evaluate_access(&self, principal: &Principal, snapshot: &TripSnapshot) -> AccessDecision;

    fn can_modify_trip(&self, user_id: UserId, snapshot: &TripSnapshot) -> bool;

    fn can_modify_owned_resource(
        &self,
        principal: &Principal,
        snapshot: &TripSnapshot,
        resource_creator: Option<MemberId>,
    ) -> bool;

    fn resolve_member_id(&self, email: &str, members: &[Member]) -> Option<MemberId>;
}

/// The creator/member/stranger policy
#[derive(Debug, Clone, Copy, Default)]
pub struct TripAccessPolicy;

impl AccessPolicy for TripAccessPolicy {
    fn evaluate_access(&self, principal: &Principal, snapshot: &TripSnapshot) -> AccessDecision {
        evaluate_access(principal, snapshot)
    }

    fn can_modify_trip(&self, user_id: UserId, snapshot: &TripSnapshot) -> bool {
        can_modify_trip(user_id, snapshot)
    }

    fn can_modify_owned_resource(
        &self,
        principal: &Principal,
        snapshot: &TripSnapshot,
        resource_creator: Option<MemberId>,
    ) -> bool {
        can_modify_owned_resource(principal, snapshot, resource_creator)
    }

    fn resolve_member_id(&self, email: &str, members: &[Member]) -> Option<MemberId> {
        resolve_member_id(email, members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stranger_serializes_as_none() {
        assert_eq!(serde_json::to_string(&AccessRole::Stranger).unwrap(), "\"none\"");
        assert_eq!(serde_json::to_string(&AccessRole::Creator).unwrap(), "\"creator\"");
    }

    #[test]
    fn test_resolve_member_id_first_match_wins() {
        let trip_id = core_kernel::TripId::new();
        let first = Member::new(trip_id, "dup@example.com", "First").unwrap();
        let second = Member::new(trip_id, "DUP@example.com", "Second").unwrap();
        let members = vec![first.clone(), second];

        assert_eq!(resolve_member_id("Dup@Example.com", &members), Some(first.id));
        assert_eq!(resolve_member_id("other@example.com", &members), None);
    }
}
