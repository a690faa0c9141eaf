//! Trip entity and lifecycle status
//!
//! A Trip is the top-level planning unit owned by exactly one creator user.
//! It owns its members, expenses, and settlements; deleting a trip cascades
//! to all of them.
//!
//! # Status
//!
//! Status is derived from the trip's dates relative to a given day and is
//! never treated as authoritative when stored:
//!
//! - **Upcoming**: the day is before the start date
//! - **Ongoing**: the day is within the trip (both ends inclusive)
//! - **Completed**: the day is after the end date
//!
//! # Examples
//!
//! ```rust
//! use chrono::NaiveDate;
//! use core_kernel::{DateRange, UserId};
//! use domain_trip::trip::{Trip, TripStatus};
//!
//! let dates = DateRange::new(
//!     NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 7, 10).unwrap(),
//! ).unwrap();
//! let trip = Trip::new(UserId::new(), "Lisbon", dates).unwrap();
//!
//! let day = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
//! assert_eq!(trip.status_on(day), TripStatus::Ongoing);
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DateRange, RangePosition, TripId, UserId};
use crate::error::TripError;

/// Lifecycle status of a trip, derived from its dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Upcoming,
    Ongoing,
    Completed,
}

impl TripStatus {
    /// Returns the stored representation of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Upcoming => "UPCOMING",
            TripStatus::Ongoing => "ONGOING",
            TripStatus::Completed => "COMPLETED",
        }
    }
}

/// A shared trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    /// Unique identifier
    pub id: TripId,
    /// The creator's user account; authoritative for creator rights
    pub owner_id: UserId,
    /// Display name
    pub name: String,
    /// Destination
    pub location: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Planned dates, inclusive
    pub dates: DateRange,
    /// When the trip was created
    pub created_at: DateTime<Utc>,
    /// When the trip was last changed
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// Creates a new trip owned by `owner_id`
    ///
    /// # Errors
    ///
    /// Returns `TripError::InvalidData` if the name is blank
    pub fn new(owner_id: UserId, name: impl Into<String>, dates: DateRange) -> Result<Self, TripError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TripError::invalid("Trip name must not be blank"));
        }

        let now = Utc::now();
        Ok(Self {
            id: TripId::new_v7(),
            owner_id,
            name,
            location: None,
            description: None,
            dates,
            created_at: now,
            updated_at: now,
        })
    }

    /// Sets the destination
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Derives the status of the trip on the given day
    pub fn status_on(&self, day: NaiveDate) -> TripStatus {
        match self.dates.position(day) {
            RangePosition::Before => TripStatus::Upcoming,
            RangePosition::Within => TripStatus::Ongoing,
            RangePosition::After => TripStatus::Completed,
        }
    }

    /// Derives the status of the trip today (UTC)
    pub fn status(&self) -> TripStatus {
        self.status_on(Utc::now().date_naive())
    }

    /// Applies a partial update
    ///
    /// Date changes are validated against each other after merging, so a
    /// trip can be moved by changing both ends at once.
    ///
    /// # Errors
    ///
    /// - `TripError::InvalidData` if the new name is blank
    /// - `TripError::InvalidDates` if the merged range is inverted
    pub fn apply(&mut self, changes: TripChanges) -> Result<(), TripError> {
        if let Some(name) = &changes.name {
            if name.trim().is_empty() {
                return Err(TripError::invalid("Trip name must not be blank"));
            }
        }

        let start = changes.start_date.unwrap_or(self.dates.start());
        let end = changes.end_date.unwrap_or(self.dates.end());
        let dates = DateRange::new(start, end)?;

        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(location) = changes.location {
            self.location = Some(location);
        }
        if let Some(description) = changes.description {
            self.description = Some(description);
        }
        self.dates = dates;
        self.updated_at = Utc::now();

        Ok(())
    }
}

/// A partial update to a trip's own fields
#[derive(Debug, Clone, Default)]
pub struct TripChanges {
    pub name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TripChanges {
    /// Returns true if the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.location.is_none()
            && self.description.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }
}
