//! Trip Domain Ports
//!
//! The `TripStore` trait is the source of truth for trips, their members
//! and their invitations. Snapshots read here are what the snapshot cache
//! holds, so every successful write through this port must be followed by a
//! cache invalidation for the affected trip.
//!
//! Implementations:
//!
//! - **PostgreSQL**: `infra_db::PostgresLedgerStore`
//! - **In-memory**: `domain_expense::mock::MockLedgerStore` (feature `mock`)

use async_trait::async_trait;

use core_kernel::{DomainPort, HealthCheckable, InvitationId, MemberId, PortError, TripId};

use crate::invitation::Invitation;
use crate::member::Member;
use crate::snapshot::TripSnapshot;
use crate::trip::Trip;

/// Persistence operations for trips, members and invitations
#[async_trait]
pub trait TripStore: DomainPort + HealthCheckable {
    /// Loads a trip with all of its members
    ///
    /// # Returns
    ///
    /// `None` if the trip does not exist
    async fn fetch_snapshot(&self, trip_id: TripId) -> Result<Option<TripSnapshot>, PortError>;

    /// Creates a trip together with its creator's member row
    ///
    /// Both rows are written atomically.
    async fn create_trip(&self, trip: &Trip, creator: &Member) -> Result<(), PortError>;

    /// Overwrites a trip's own fields
    ///
    /// # Errors
    ///
    /// `PortError::NotFound` if the trip does not exist
    async fn update_trip(&self, trip: &Trip) -> Result<(), PortError>;

    /// Deletes a trip with its members, invitations, expenses, splits and
    /// settlements
    ///
    /// # Errors
    ///
    /// `PortError::NotFound` if the trip does not exist
    async fn delete_trip(&self, trip_id: TripId) -> Result<(), PortError>;

    /// Removes a member from a trip, together with any invitation issued to
    /// the member's email
    ///
    /// # Errors
    ///
    /// - `PortError::NotFound` if the member does not belong to the trip
    /// - `PortError::Conflict` while any expense references the member as
    ///   payer, recorder or split participant
    async fn remove_member(&self, trip_id: TripId, member_id: MemberId) -> Result<(), PortError>;

    /// Stores a pending invitation, and optionally the unlinked member row
    /// it will claim, in one write
    ///
    /// # Errors
    ///
    /// - `PortError::NotFound` if the trip does not exist
    /// - `PortError::Conflict` if the trip already holds an invitation for
    ///   the email, or a member with the same email
    async fn insert_invitation(
        &self,
        invitation: &Invitation,
        member: Option<&Member>,
    ) -> Result<(), PortError>;

    /// Finds the invitation for an email in a trip, in any status
    async fn find_invitation(
        &self,
        trip_id: TripId,
        email: &str,
    ) -> Result<Option<Invitation>, PortError>;

    /// Lists a trip's pending invitations, oldest first
    async fn pending_invitations(&self, trip_id: TripId) -> Result<Vec<Invitation>, PortError>;

    /// Lists pending invitations issued to an email across all trips
    async fn invitations_for_email(&self, email: &str) -> Result<Vec<Invitation>, PortError>;

    /// Records an accepted invitation and writes the member it links
    ///
    /// `member` is inserted, or updated in place when a row with its id
    /// already exists. Both writes happen atomically.
    ///
    /// # Errors
    ///
    /// `PortError::Conflict` if the stored invitation is no longer pending
    async fn accept_invitation(&self, invitation: &Invitation, member: &Member) -> Result<(), PortError>;

    /// Records a rejected invitation
    ///
    /// # Errors
    ///
    /// `PortError::Conflict` if the stored invitation is no longer pending
    async fn reject_invitation(&self, invitation: &Invitation) -> Result<(), PortError>;

    /// Deletes an invitation
    ///
    /// # Errors
    ///
    /// `PortError::NotFound` if it does not exist
    async fn delete_invitation(&self, invitation_id: InvitationId) -> Result<(), PortError>;
}
