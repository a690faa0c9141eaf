//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for trips, members and principals.
//! These fixtures are consistent and predictable across test runs.

use chrono::NaiveDate;
use core_kernel::{DateRange, TripId, UserId};
use domain_trip::{Member, Principal, TripSnapshot};
use uuid::Uuid;

/// Fixture for trip dates
pub struct DateFixtures;

impl DateFixtures {
    /// First day of the standard trip (Jul 1, 2024)
    pub fn trip_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    /// Last day of the standard trip (Jul 10, 2024)
    pub fn trip_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 10).unwrap()
    }

    /// The standard trip's date range
    pub fn trip_dates() -> DateRange {
        DateRange::new(Self::trip_start(), Self::trip_end()).unwrap()
    }

    /// A day inside the standard trip
    pub fn expense_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 3).unwrap()
    }

    /// A later day inside the standard trip
    pub fn later_expense_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 8).unwrap()
    }
}

/// Fixture for member emails and names
pub struct PeopleFixtures;

impl PeopleFixtures {
    pub fn owner_email() -> &'static str {
        "olivia@example.com"
    }

    pub fn owner_name() -> &'static str {
        "Olivia"
    }

    pub fn guest_email() -> &'static str {
        "gabriel@example.com"
    }

    pub fn guest_name() -> &'static str {
        "Gabriel"
    }

    pub fn third_email() -> &'static str {
        "hana@example.com"
    }

    pub fn third_name() -> &'static str {
        "Hana"
    }

    pub fn stranger_email() -> &'static str {
        "stranger@example.com"
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    /// Creates a deterministic trip ID for testing
    pub fn trip_id() -> TripId {
        TripId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap())
    }

    /// Creates a deterministic owner user ID for testing
    pub fn owner_user_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440002").unwrap())
    }
}

/// Principals acting on a snapshot
pub struct PrincipalFixtures;

impl PrincipalFixtures {
    /// The trip creator, using the creator's member email
    pub fn creator(snapshot: &TripSnapshot) -> Principal {
        let email = snapshot
            .members
            .iter()
            .find(|m| m.user_id == Some(snapshot.owner_id()))
            .map(|m| m.email.clone())
            .unwrap_or_else(|| PeopleFixtures::owner_email().to_string());
        Principal::new(snapshot.owner_id(), email)
    }

    /// A principal identified by a member's email
    ///
    /// Unlinked members get a fresh user id.
    pub fn member(member: &Member) -> Principal {
        Principal::new(member.user_id.unwrap_or_else(UserId::new), member.email.clone())
    }

    /// Someone with no role in any trip
    pub fn stranger() -> Principal {
        Principal::new(UserId::new(), PeopleFixtures::stranger_email())
    }
}
