//! Ledger error taxonomy
//!
//! Every failure surfaced by the services maps to one [`ErrorKind`] with a
//! stable status code, so callers can branch on the kind without parsing
//! messages.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use core_kernel::PortError;
use domain_expense::SplitError;
use domain_trip::TripError;
use infra_cache::CacheError;

/// Stable classification of ledger errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidSplit,
    DegenerateInput,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InvalidSplit => "invalid_split",
            ErrorKind::DegenerateInput => "degenerate_input",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal_error",
        }
    }

    /// Outward status for the kind, HTTP-compatible
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Forbidden => 403,
            ErrorKind::InvalidSplit => 422,
            ErrorKind::DegenerateInput => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the ledger and trip services
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid split: {reason}")]
    InvalidSplit {
        reason: String,
        expected: Option<Decimal>,
        actual: Option<Decimal>,
    },

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(#[source] PortError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl LedgerError {
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        LedgerError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        LedgerError::Conflict(message.into())
    }

    pub fn invalid_split(reason: impl Into<String>) -> Self {
        LedgerError::InvalidSplit {
            reason: reason.into(),
            expected: None,
            actual: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::Forbidden(_) => ErrorKind::Forbidden,
            LedgerError::InvalidSplit { .. } => ErrorKind::InvalidSplit,
            LedgerError::DegenerateInput(_) => ErrorKind::DegenerateInput,
            LedgerError::Conflict(_) => ErrorKind::Conflict,
            LedgerError::Store(_) | LedgerError::Cache(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_forbidden(&self) -> bool {
        self.kind() == ErrorKind::Forbidden
    }
}

impl From<PortError> for LedgerError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => LedgerError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Conflict { message } => LedgerError::Conflict(message),
            PortError::Validation { message, .. } => LedgerError::DegenerateInput(message),
            other => LedgerError::Store(other),
        }
    }
}

impl From<SplitError> for LedgerError {
    fn from(error: SplitError) -> Self {
        match error {
            SplitError::InvalidSplit {
                reason,
                expected,
                actual,
            } => LedgerError::InvalidSplit {
                reason,
                expected,
                actual,
            },
            SplitError::Degenerate(reason) => LedgerError::DegenerateInput(reason),
        }
    }
}

impl From<TripError> for LedgerError {
    fn from(error: TripError) -> Self {
        match error {
            TripError::InvalidDates(e) => LedgerError::DegenerateInput(e.to_string()),
            TripError::InvalidData(message) => LedgerError::DegenerateInput(message),
            TripError::DuplicateMember(email) => {
                LedgerError::Conflict(format!("A member with email {} already exists", email))
            }
            TripError::DuplicateInvitation(email) => {
                LedgerError::Conflict(format!("An invitation for {} already exists", email))
            }
            e @ TripError::InvitationNotPending { .. } => LedgerError::Conflict(e.to_string()),
        }
    }
}
