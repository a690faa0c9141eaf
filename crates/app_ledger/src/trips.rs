//! Trip, membership and invitation writes
//!
//! Every write that changes the trip or its member set ends by
//! invalidating the trip's cached snapshot before it is announced. Joining
//! a trip takes a pending invitation for the joining principal's email.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use core_kernel::{DateRange, MemberId, TripId};
use domain_trip::{
    emails_match, AccessPolicy, Invitation, InvitationStatus, Member, Principal, Trip,
    TripAccessPolicy, TripChanges, TripError, TripSnapshot, TripStore,
};

use crate::error::LedgerError;
use crate::notify::{dispatch, LedgerEvent, Notifier};
use crate::snapshots::SnapshotLoader;

/// Input for creating a trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrip {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub location: Option<String>,
    pub description: Option<String>,
    /// Display name of the creator's member row
    pub creator_name: String,
}

/// Trip lifecycle and membership operations
pub struct TripService {
    trips: Arc<dyn TripStore>,
    snapshots: SnapshotLoader,
    policy: Arc<dyn AccessPolicy>,
    notifier: Arc<dyn Notifier>,
}

impl TripService {
    pub fn new(snapshots: SnapshotLoader, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            trips: Arc::clone(snapshots.trips()),
            snapshots,
            policy: Arc::new(TripAccessPolicy),
            notifier,
        }
    }

    /// Replaces the access policy
    pub fn with_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Creates a trip with the principal as creator and first member
    #[instrument(skip(self, principal, input), fields(user_id = %principal.user_id))]
    pub async fn create_trip(
        &self,
        principal: &Principal,
        input: NewTrip,
    ) -> Result<TripSnapshot, LedgerError> {
        let dates = DateRange::new(input.start_date, input.end_date).map_err(TripError::from)?;
        let mut trip = Trip::new(principal.user_id, input.name, dates)?;
        trip.location = input.location;
        trip.description = input.description;

        let creator = Member::linked(
            trip.id,
            principal.user_id,
            principal.email.clone(),
            input.creator_name,
        )?;

        self.trips.create_trip(&trip, &creator).await?;
        self.snapshots.invalidate(trip.id).await?;

        info!(trip_id = %trip.id, "Trip created");
        self.announce(LedgerEvent::TripCreated {
            trip_id: trip.id,
            owner_id: trip.owner_id,
        });
        Ok(TripSnapshot::new(trip, vec![creator]))
    }

    /// Changes the trip's own fields; creator only
    #[instrument(skip(self, principal, changes), fields(trip_id = %trip_id))]
    pub async fn update_trip(
        &self,
        principal: &Principal,
        trip_id: TripId,
        changes: TripChanges,
    ) -> Result<Trip, LedgerError> {
        let snapshot = self.creator_snapshot(principal, trip_id).await?;
        let mut trip = snapshot.trip;
        trip.apply(changes)?;

        self.trips.update_trip(&trip).await?;
        self.snapshots.invalidate(trip_id).await?;

        self.announce(LedgerEvent::TripUpdated { trip_id });
        Ok(trip)
    }

    /// Deletes the trip with everything it owns; creator only
    #[instrument(skip(self, principal), fields(trip_id = %trip_id))]
    pub async fn delete_trip(&self, principal: &Principal, trip_id: TripId) -> Result<(), LedgerError> {
        self.creator_snapshot(principal, trip_id).await?;

        self.trips.delete_trip(trip_id).await?;
        self.snapshots.invalidate(trip_id).await?;

        info!("Trip deleted");
        self.announce(LedgerEvent::TripDeleted { trip_id });
        Ok(())
    }

    /// Adds a member row for someone not yet signed up, with a pending
    /// invitation they can accept later; creator only
    ///
    /// # Errors
    ///
    /// `LedgerError::Conflict` if a member with the same email exists or the
    /// email already holds an open invitation
    #[instrument(skip(self, principal, email, name), fields(trip_id = %trip_id))]
    pub async fn add_member(
        &self,
        principal: &Principal,
        trip_id: TripId,
        email: &str,
        name: &str,
    ) -> Result<Member, LedgerError> {
        let snapshot = self.creator_snapshot(principal, trip_id).await?;
        if snapshot.member_by_email(email).is_some() {
            return Err(TripError::DuplicateMember(email.to_string()).into());
        }
        self.clear_rejected_invitation(trip_id, email).await?;

        let member = Member::new(trip_id, email, name)?;
        let invitation = Invitation::new(trip_id, email, principal.user_id)?;
        self.trips.insert_invitation(&invitation, Some(&member)).await?;
        self.snapshots.invalidate(trip_id).await?;

        info!(member_id = %member.id, "Member added with pending invitation");
        self.announce(LedgerEvent::InvitationSent {
            trip_id,
            email: invitation.email,
        });
        Ok(member)
    }

    /// Invites an email address to join; creator only
    ///
    /// A previously rejected invitation for the same address is replaced.
    ///
    /// # Errors
    ///
    /// - `LedgerError::DegenerateInput` when the creator invites themselves
    /// - `LedgerError::Conflict` if the email already belongs to a joined
    ///   member or holds a pending or accepted invitation
    #[instrument(skip(self, principal, email), fields(trip_id = %trip_id))]
    pub async fn invite_member(
        &self,
        principal: &Principal,
        trip_id: TripId,
        email: &str,
    ) -> Result<Invitation, LedgerError> {
        let snapshot = self.creator_snapshot(principal, trip_id).await?;
        if emails_match(email, &principal.email) {
            return Err(TripError::invalid("You cannot invite yourself").into());
        }
        if snapshot.member_by_email(email).is_some_and(Member::is_linked) {
            return Err(TripError::DuplicateMember(email.to_string()).into());
        }
        self.clear_rejected_invitation(trip_id, email).await?;

        let invitation = Invitation::new(trip_id, email, principal.user_id)?;
        self.trips.insert_invitation(&invitation, None).await?;

        info!(invitation_id = %invitation.id, "Invitation sent");
        self.announce(LedgerEvent::InvitationSent {
            trip_id,
            email: invitation.email.clone(),
        });
        Ok(invitation)
    }

    /// Accepts the principal's pending invitation to a trip
    ///
    /// The member row the creator added for the principal's email is linked
    /// to the principal's user id; without one, a new linked row named
    /// `name` is created.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotFound` if no invitation was issued to the
    ///   principal's email
    /// - `LedgerError::Conflict` if the invitation was already answered or
    ///   the email already belongs to a joined member
    #[instrument(skip(self, principal, name), fields(trip_id = %trip_id, user_id = %principal.user_id))]
    pub async fn accept_invitation(
        &self,
        principal: &Principal,
        trip_id: TripId,
        name: &str,
    ) -> Result<Member, LedgerError> {
        let snapshot = self.snapshots.load(trip_id).await?;
        let mut invitation = self.principal_invitation(principal, trip_id).await?;
        invitation.accept()?;

        let member = match snapshot.member_by_email(&principal.email) {
            Some(existing) if existing.is_linked() => {
                return Err(TripError::DuplicateMember(principal.email.clone()).into());
            }
            Some(existing) => {
                let mut member = existing.clone();
                member.link(principal.user_id);
                member
            }
            None => Member::linked(trip_id, principal.user_id, principal.email.clone(), name)?,
        };

        self.trips.accept_invitation(&invitation, &member).await?;
        self.snapshots.invalidate(trip_id).await?;

        info!(member_id = %member.id, "Invitation accepted");
        self.announce(LedgerEvent::MemberJoined {
            trip_id,
            member_id: member.id,
            email: member.email.clone(),
        });
        Ok(member)
    }

    /// Declines the principal's pending invitation to a trip
    #[instrument(skip(self, principal), fields(trip_id = %trip_id, user_id = %principal.user_id))]
    pub async fn reject_invitation(
        &self,
        principal: &Principal,
        trip_id: TripId,
    ) -> Result<Invitation, LedgerError> {
        let mut invitation = self.principal_invitation(principal, trip_id).await?;
        invitation.reject()?;

        self.trips.reject_invitation(&invitation).await?;
        self.snapshots.invalidate(trip_id).await?;

        self.announce(LedgerEvent::InvitationRejected {
            trip_id,
            email: invitation.email.clone(),
        });
        Ok(invitation)
    }

    /// Withdraws a pending invitation; creator only
    #[instrument(skip(self, principal, email), fields(trip_id = %trip_id))]
    pub async fn cancel_invitation(
        &self,
        principal: &Principal,
        trip_id: TripId,
        email: &str,
    ) -> Result<(), LedgerError> {
        self.creator_snapshot(principal, trip_id).await?;
        let invitation = self
            .trips
            .find_invitation(trip_id, email)
            .await?
            .ok_or_else(|| LedgerError::not_found("Invitation", email))?;
        if !invitation.is_pending() {
            return Err(TripError::InvitationNotPending {
                email: invitation.email,
                status: invitation.status,
            }
            .into());
        }

        self.trips.delete_invitation(invitation.id).await?;
        self.snapshots.invalidate(trip_id).await?;

        self.announce(LedgerEvent::InvitationCancelled {
            trip_id,
            email: invitation.email,
        });
        Ok(())
    }

    /// Open invitations of a trip; creator only
    pub async fn pending_invitations(
        &self,
        principal: &Principal,
        trip_id: TripId,
    ) -> Result<Vec<Invitation>, LedgerError> {
        self.creator_snapshot(principal, trip_id).await?;
        Ok(self.trips.pending_invitations(trip_id).await?)
    }

    /// Open invitations addressed to the principal, across trips
    pub async fn my_invitations(&self, principal: &Principal) -> Result<Vec<Invitation>, LedgerError> {
        Ok(self.trips.invitations_for_email(&principal.email).await?)
    }

    /// Removes a member who is not referenced by any expense; creator only
    ///
    /// The creator's own member row cannot be removed.
    #[instrument(skip(self, principal), fields(trip_id = %trip_id, member_id = %member_id))]
    pub async fn remove_member(
        &self,
        principal: &Principal,
        trip_id: TripId,
        member_id: MemberId,
    ) -> Result<(), LedgerError> {
        let snapshot = self.creator_snapshot(principal, trip_id).await?;
        if let Some(member) = snapshot.member(member_id) {
            if member.user_id == Some(snapshot.owner_id()) {
                return Err(LedgerError::conflict("The trip creator cannot be removed"));
            }
        }

        self.trips.remove_member(trip_id, member_id).await?;
        self.snapshots.invalidate(trip_id).await?;

        self.announce(LedgerEvent::MemberRemoved { trip_id, member_id });
        Ok(())
    }

    /// The trip with its members, for anyone with access
    #[instrument(skip(self, principal), fields(trip_id = %trip_id))]
    pub async fn get_trip(
        &self,
        principal: &Principal,
        trip_id: TripId,
    ) -> Result<TripSnapshot, LedgerError> {
        let snapshot = self.snapshots.load(trip_id).await?;
        if !self.policy.evaluate_access(principal, &snapshot).can_access {
            return Err(LedgerError::forbidden("You do not have access to this trip"));
        }
        Ok(snapshot)
    }

    async fn principal_invitation(
        &self,
        principal: &Principal,
        trip_id: TripId,
    ) -> Result<Invitation, LedgerError> {
        self.trips
            .find_invitation(trip_id, &principal.email)
            .await?
            .ok_or_else(|| LedgerError::not_found("Invitation", &principal.email))
    }

    /// Deletes a rejected invitation so the address can be invited again
    async fn clear_rejected_invitation(
        &self,
        trip_id: TripId,
        email: &str,
    ) -> Result<(), LedgerError> {
        match self.trips.find_invitation(trip_id, email).await? {
            Some(previous) if previous.status == InvitationStatus::Rejected => {
                self.trips.delete_invitation(previous.id).await?;
                Ok(())
            }
            Some(previous) => Err(TripError::DuplicateInvitation(previous.email).into()),
            None => Ok(()),
        }
    }

    async fn creator_snapshot(
        &self,
        principal: &Principal,
        trip_id: TripId,
    ) -> Result<TripSnapshot, LedgerError> {
        let snapshot = self.snapshots.load(trip_id).await?;
        if !self.policy.can_modify_trip(principal.user_id, &snapshot) {
            return Err(LedgerError::forbidden("Only the trip creator can do this"));
        }
        Ok(snapshot)
    }

    fn announce(&self, event: LedgerEvent) {
        dispatch(self.notifier.as_ref(), event);
    }
}

impl std::fmt::Debug for TripService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TripService")
            .field("snapshots", &self.snapshots)
            .finish_non_exhaustive()
    }
}
