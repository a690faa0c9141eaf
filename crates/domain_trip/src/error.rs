//! Trip domain errors

use core_kernel::TemporalError;
use thiserror::Error;

use crate::invitation::InvitationStatus;

/// Errors that can occur in the trip domain
#[derive(Debug, Error)]
pub enum TripError {
    /// The trip's start date is after its end date
    #[error("Invalid trip dates: {0}")]
    InvalidDates(#[from] TemporalError),

    /// Invalid trip, member or invitation data provided
    #[error("Invalid trip data: {0}")]
    InvalidData(String),

    /// A member with the same email already belongs to the trip
    #[error("Duplicate member: {0}")]
    DuplicateMember(String),

    /// The email already holds an open or accepted invitation to the trip
    #[error("Invitation for {0} already exists")]
    DuplicateInvitation(String),

    /// The invitation was already answered
    #[error("Invitation for {email} is {status}")]
    InvitationNotPending {
        email: String,
        status: InvitationStatus,
    },
}

impl TripError {
    /// Creates an InvalidData error with a message
    pub fn invalid(message: impl Into<String>) -> Self {
        TripError::InvalidData(message.into())
    }
}
