//! Strongly-typed identifiers for domain entities
//!
//! Newtype wrappers around UUIDs keep a `MemberId` from being passed where an
//! `ExpenseId` is expected. Display form is `<PREFIX>-<uuid>`; parsing accepts
//! both the prefixed and the bare UUID form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Trip domain identifiers
define_id!(TripId, "TRP");
define_id!(MemberId, "MBR");
define_id!(InvitationId, "INV");

// Expense domain identifiers
define_id!(ExpenseId, "EXP");
define_id!(SplitId, "SPL");
define_id!(SettlementId, "STL");

// Principal identifiers, issued by the authentication collaborator
define_id!(UserId, "USR");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_id_display() {
        let id = TripId::new();
        let display = id.to_string();
        assert!(display.starts_with("TRP-"));
    }

    #[test]
    fn test_id_parsing() {
        let original = ExpenseId::new();
        let parsed: ExpenseId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);

        let bare: ExpenseId = original.as_uuid().to_string().parse().unwrap();
        assert_eq!(original, bare);
    }

    #[test]
    fn test_uuid_conversion() {
        let uuid = Uuid::new_v4();
        let member_id = MemberId::from(uuid);
        let back: Uuid = member_id.into();
        assert_eq!(uuid, back);
    }
}
