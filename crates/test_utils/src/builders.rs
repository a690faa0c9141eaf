//! Test Data Builders
//!
//! Provides builder patterns for constructing trips and expense inputs with
//! sensible defaults. Tests specify only the fields they care about.

use chrono::NaiveDate;
use core_kernel::{DateRange, MemberId, Money, UserId};
use domain_expense::{
    ExpenseCategory, MemberAmount, MemberPercentage, NewExpense, SplitStrategy,
};
use domain_trip::{Member, Trip, TripSnapshot};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::{DateFixtures, PeopleFixtures};

struct PendingMember {
    email: String,
    name: String,
    user_id: Option<UserId>,
}

/// Builder for a trip snapshot
///
/// The creator's member row is always the first member.
pub struct TripSnapshotBuilder {
    owner_id: UserId,
    owner_email: String,
    owner_name: String,
    name: String,
    dates: DateRange,
    location: Option<String>,
    members: Vec<PendingMember>,
}

impl Default for TripSnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TripSnapshotBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            owner_id: UserId::new(),
            owner_email: PeopleFixtures::owner_email().to_string(),
            owner_name: PeopleFixtures::owner_name().to_string(),
            name: "Summer in Lisbon".to_string(),
            dates: DateFixtures::trip_dates(),
            location: None,
            members: Vec::new(),
        }
    }

    /// Sets the creator
    pub fn with_owner(mut self, owner_id: UserId, email: impl Into<String>) -> Self {
        self.owner_id = owner_id;
        self.owner_email = email.into();
        self
    }

    /// Sets the trip name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the trip dates
    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.dates = DateRange::new(start, end).unwrap();
        self
    }

    /// Sets the destination
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Adds an invited member who has not accepted yet
    pub fn with_member(mut self, email: impl Into<String>, name: impl Into<String>) -> Self {
        self.members.push(PendingMember {
            email: email.into(),
            name: name.into(),
            user_id: None,
        });
        self
    }

    /// Adds a member linked to a user account
    pub fn with_linked_member(
        mut self,
        user_id: UserId,
        email: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.members.push(PendingMember {
            email: email.into(),
            name: name.into(),
            user_id: Some(user_id),
        });
        self
    }

    /// Adds the standard guest
    pub fn with_guest(self) -> Self {
        self.with_member(PeopleFixtures::guest_email(), PeopleFixtures::guest_name())
    }

    /// Adds the standard third member
    pub fn with_third(self) -> Self {
        self.with_member(PeopleFixtures::third_email(), PeopleFixtures::third_name())
    }

    /// Builds the snapshot
    pub fn build(self) -> TripSnapshot {
        let mut trip = Trip::new(self.owner_id, self.name, self.dates).unwrap();
        trip.location = self.location;

        let mut members = vec![
            Member::linked(trip.id, self.owner_id, self.owner_email, self.owner_name).unwrap(),
        ];
        for pending in self.members {
            let member = match pending.user_id {
                Some(user_id) => Member::linked(trip.id, user_id, pending.email, pending.name),
                None => Member::new(trip.id, pending.email, pending.name),
            };
            members.push(member.unwrap());
        }

        TripSnapshot::new(trip, members)
    }
}

/// Builder for expense input
pub struct NewExpenseBuilder {
    payer_id: MemberId,
    amount: Money,
    description: String,
    category: ExpenseCategory,
    expense_date: NaiveDate,
    strategy: SplitStrategy,
}

impl NewExpenseBuilder {
    /// Creates an equal split of 100.00 paid by `payer_id`
    pub fn new(payer_id: MemberId) -> Self {
        Self {
            payer_id,
            amount: Money::new(dec!(100.00)),
            description: "Dinner".to_string(),
            category: ExpenseCategory::Food,
            expense_date: DateFixtures::expense_date(),
            strategy: SplitStrategy::Equal,
        }
    }

    /// Sets the amount
    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Money::new(amount);
        self
    }

    /// Sets the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the category
    pub fn category(mut self, category: ExpenseCategory) -> Self {
        self.category = category;
        self
    }

    /// Sets the expense date
    pub fn on(mut self, date: NaiveDate) -> Self {
        self.expense_date = date;
        self
    }

    /// Splits by explicit amounts
    pub fn exact(mut self, shares: &[(MemberId, Decimal)]) -> Self {
        self.strategy = SplitStrategy::Exact(
            shares
                .iter()
                .map(|(id, amount)| MemberAmount::new(*id, *amount))
                .collect(),
        );
        self
    }

    /// Splits by explicit percentages
    pub fn percentage(mut self, shares: &[(MemberId, Decimal)]) -> Self {
        self.strategy = SplitStrategy::Percentage(
            shares
                .iter()
                .map(|(id, pct)| MemberPercentage::new(*id, *pct))
                .collect(),
        );
        self
    }

    /// Builds the input
    pub fn build(self) -> NewExpense {
        NewExpense {
            payer_id: self.payer_id,
            amount: self.amount,
            description: self.description,
            category: self.category,
            expense_date: self.expense_date,
            strategy: self.strategy,
        }
    }
}
