//! Trip Domain
//!
//! Trips, their members, and the access policy that decides what a caller
//! may see or change in a trip.
//!
//! # Roles
//!
//! Every trip has exactly one creator, identified by user id. The creator
//! also holds a regular member row so that expenses, splits and settlements
//! reference every participant uniformly. Other participants are members
//! identified by email until they accept an invitation.
//!
//! # Invitations
//!
//! The creator invites an email address; the holder of that address may
//! then accept (becoming a linked member) or reject. An [`Invitation`] is
//! the only way for someone other than the creator to gain a member row
//! linked to their account.
//!
//! # Snapshots
//!
//! A [`TripSnapshot`] bundles a trip with its members. It is the only input
//! the access policy needs and the unit the snapshot cache stores.

pub mod access;
pub mod error;
pub mod invitation;
pub mod member;
pub mod ports;
pub mod snapshot;
pub mod trip;

pub use access::{
    can_modify_owned_resource, can_modify_trip, evaluate_access, resolve_member_id,
    AccessDecision, AccessPolicy, AccessRole, TripAccessPolicy,
};
pub use error::TripError;
pub use invitation::{Invitation, InvitationStatus};
pub use member::{emails_match, Member};
pub use ports::TripStore;
pub use snapshot::{Principal, TripSnapshot};
pub use trip::{Trip, TripChanges, TripStatus};
