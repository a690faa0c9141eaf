//! Settlement aggregation
//!
//! A settlement is one signed net balance per member per trip: the sum of
//! every split assigned to that member across all of the trip's expenses.
//! Settlements are a materialized aggregate. They are recomputed from
//! scratch on every expense mutation and upserted wholesale, never adjusted
//! by deltas, so repeated recalculation over the same splits is idempotent.
//!
//! Resolving who owes whom from the net totals is left to callers.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ExpenseId, MemberId, Money, SettlementId, SplitId, TripId};
use crate::expense::Split;
use crate::split::SplitKind;

/// A persisted net balance for one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub trip_id: TripId,
    pub member_id: MemberId,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Settlement {
    pub fn new(trip_id: TripId, member_id: MemberId, amount: Money) -> Self {
        let now = Utc::now();
        Self {
            id: SettlementId::new_v7(),
            trip_id,
            member_id,
            amount,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A freshly computed balance, before it is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementBalance {
    pub member_id: MemberId,
    pub amount: Money,
}

/// Result of aggregating a trip's splits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    /// One balance per trip member, in member order
    pub balances: Vec<SettlementBalance>,
    /// Splits whose member is no longer part of the trip
    pub orphaned: Vec<SplitId>,
}

impl Aggregation {
    /// Total of all member balances
    pub fn total(&self) -> Money {
        self.balances.iter().map(|b| b.amount).sum()
    }
}

/// Aggregates `splits` into one balance per member
///
/// Every member starts at zero so members without splits still receive a
/// settlement row. Splits referencing a member outside `members` are left
/// out of the balances and reported in [`Aggregation::orphaned`].
pub fn aggregate(members: &[MemberId], splits: &[Split]) -> Aggregation {
    let mut totals: HashMap<MemberId, Money> =
        members.iter().map(|id| (*id, Money::zero())).collect();
    let mut orphaned = Vec::new();

    for split in splits {
        match totals.get_mut(&split.member_id) {
            Some(total) => *total += split.amount,
            None => orphaned.push(split.id),
        }
    }

    let balances = members
        .iter()
        .map(|id| SettlementBalance {
            member_id: *id,
            amount: totals.get(id).copied().unwrap_or_default(),
        })
        .collect();

    Aggregation { balances, orphaned }
}

/// Orders settlements by amount, largest first
pub fn sort_by_amount_desc(settlements: &mut [Settlement]) {
    settlements.sort_by(|a, b| b.amount.cmp(&a.amount));
}

/// One split that contributes to a member's settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitContribution {
    pub expense_id: ExpenseId,
    pub description: String,
    /// The member's share of the expense
    pub amount: Money,
    pub split_kind: SplitKind,
    pub expense_date: NaiveDate,
}

/// Orders contributions by expense date, most recent first
pub fn sort_by_date_desc(contributions: &mut [SplitContribution]) {
    contributions.sort_by(|a, b| b.expense_date.cmp(&a.expense_date));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn split(member_id: MemberId, amount: Money) -> Split {
        Split {
            id: SplitId::new(),
            expense_id: ExpenseId::new(),
            member_id,
            amount,
            percentage: dec!(0),
        }
    }

    #[test]
    fn test_members_without_splits_get_zero() {
        let members = vec![MemberId::new(), MemberId::new()];
        let result = aggregate(&members, &[]);

        assert_eq!(result.balances.len(), 2);
        assert!(result.balances.iter().all(|b| b.amount.is_zero()));
        assert!(result.total().is_zero());
    }

    #[test]
    fn test_splits_accumulate_per_member() {
        let members = vec![MemberId::new(), MemberId::new()];
        let splits = vec![
            split(members[0], Money::new(dec!(10.00))),
            split(members[1], Money::new(dec!(5.50))),
            split(members[0], Money::new(dec!(2.25))),
        ];

        let result = aggregate(&members, &splits);
        assert_eq!(result.balances[0].amount, Money::new(dec!(12.25)));
        assert_eq!(result.balances[1].amount, Money::new(dec!(5.50)));
        assert_eq!(result.total(), Money::new(dec!(17.75)));
    }

    #[test]
    fn test_orphaned_splits_are_reported() {
        let members = vec![MemberId::new()];
        let stray = split(MemberId::new(), Money::new(dec!(3.00)));
        let stray_id = stray.id;

        let result = aggregate(&members, &[stray]);
        assert_eq!(result.orphaned, vec![stray_id]);
        assert!(result.total().is_zero());
    }

    #[test]
    fn test_sort_by_amount_desc() {
        let trip = TripId::new();
        let mut rows = vec![
            Settlement::new(trip, MemberId::new(), Money::new(dec!(1))),
            Settlement::new(trip, MemberId::new(), Money::new(dec!(30))),
            Settlement::new(trip, MemberId::new(), Money::new(dec!(-4))),
        ];
        sort_by_amount_desc(&mut rows);

        let amounts: Vec<_> = rows.iter().map(|r| r.amount.amount()).collect();
        assert_eq!(amounts, vec![dec!(30), dec!(1), dec!(-4)]);
    }
}
