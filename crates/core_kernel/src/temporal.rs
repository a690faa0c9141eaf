//! Calendar date ranges
//!
//! Trips are planned over whole days. A `DateRange` is inclusive at both
//! ends and is used to derive where a given day falls relative to a trip.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },
}

/// Where a day falls relative to a date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePosition {
    Before,
    Within,
    After,
}

/// An inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting an end that precedes the start
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        if end < start {
            return Err(TemporalError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, counting both ends
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Returns true if `day` lies inside the range
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.position(day) == RangePosition::Within
    }

    /// Classifies `day` against the range
    pub fn position(&self, day: NaiveDate) -> RangePosition {
        if day < self.start {
            RangePosition::Before
        } else if day > self.end {
            RangePosition::After
        } else {
            RangePosition::Within
        }
    }
}
