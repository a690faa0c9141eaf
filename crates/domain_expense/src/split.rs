//! Split calculator
//!
//! Turns an expense amount and a split strategy into one share per member.
//! The shares of every accepted split sum to the expense amount exactly;
//! rounding residue is always assigned to one designated split rather than
//! dropped.
//!
//! # Strategies
//!
//! - **Equal**: divides the amount among all trip members. The first member
//!   in iteration order absorbs the residue, which must not leave that
//!   member with a negative share.
//! - **Exact**: explicit amounts whose total may differ from the expense by
//!   at most one cent. The difference is added to the last split.
//! - **Percentage**: explicit percentages summing to 100 within 0.1. Every
//!   split except the last is `amount * pct / 100` rounded to cents; the
//!   last receives whatever remains.
//!
//! # Examples
//!
//! ```rust
//! use core_kernel::{MemberId, Money};
//! use domain_expense::split::{calculate, SplitStrategy};
//! use rust_decimal_macros::dec;
//!
//! let members = vec![MemberId::new(), MemberId::new(), MemberId::new()];
//! let splits = calculate(Money::new(dec!(100.00)), &SplitStrategy::Equal, &members).unwrap();
//!
//! let amounts: Vec<_> = splits.iter().map(|s| s.amount.amount()).collect();
//! assert_eq!(amounts, vec![dec!(33.34), dec!(33.33), dec!(33.33)]);
//! ```

use std::collections::HashSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{MemberId, Money, CENT_TOLERANCE, PERCENT_TOLERANCE};
use crate::error::SplitError;

/// How an expense was divided, as stored on the expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitKind {
    Equal,
    Exact,
    Percentage,
}

impl SplitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitKind::Equal => "EQUAL",
            SplitKind::Exact => "EXACT",
            SplitKind::Percentage => "PERCENTAGE",
        }
    }
}

/// An explicit amount owed by one member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberAmount {
    pub member_id: MemberId,
    pub amount: Decimal,
}

impl MemberAmount {
    pub fn new(member_id: MemberId, amount: Decimal) -> Self {
        Self { member_id, amount }
    }
}

/// An explicit percentage owed by one member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPercentage {
    pub member_id: MemberId,
    pub percentage: Decimal,
}

impl MemberPercentage {
    pub fn new(member_id: MemberId, percentage: Decimal) -> Self {
        Self { member_id, percentage }
    }
}

/// How to divide an expense among members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "splits", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitStrategy {
    Equal,
    Exact(Vec<MemberAmount>),
    Percentage(Vec<MemberPercentage>),
}

impl SplitStrategy {
    pub fn kind(&self) -> SplitKind {
        match self {
            SplitStrategy::Equal => SplitKind::Equal,
            SplitStrategy::Exact(_) => SplitKind::Exact,
            SplitStrategy::Percentage(_) => SplitKind::Percentage,
        }
    }
}

/// One member's computed share of an expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedSplit {
    pub member_id: MemberId,
    pub amount: Money,
    /// Share of the expense in percent; informational only
    pub percentage: Decimal,
}

/// Computes the splits of `amount` among `members` under `strategy`
///
/// `members` is the trip's member list in iteration order. Equal splits
/// cover every member; explicit splits may cover any subset of them.
///
/// # Errors
///
/// - `SplitError::Degenerate` if the amount is not positive or the trip has
///   no members
/// - `SplitError::InvalidSplit` if explicit splits are missing, reference a
///   member outside the trip, repeat a member, carry a negative value, or
///   miss their total by more than the tolerance
pub fn calculate(
    amount: Money,
    strategy: &SplitStrategy,
    members: &[MemberId],
) -> Result<Vec<ComputedSplit>, SplitError> {
    if !amount.is_positive() {
        return Err(SplitError::degenerate(format!(
            "Expense amount must be positive, got {}",
            amount
        )));
    }
    if members.is_empty() {
        return Err(SplitError::degenerate("Trip has no members to split expense"));
    }

    match strategy {
        SplitStrategy::Equal => split_equal(amount, members),
        SplitStrategy::Exact(shares) => split_exact(amount, shares, members),
        SplitStrategy::Percentage(shares) => split_percentage(amount, shares, members),
    }
}

fn split_equal(amount: Money, members: &[MemberId]) -> Result<Vec<ComputedSplit>, SplitError> {
    let per_person = amount
        .per_part(members.len())
        .map_err(|e| SplitError::degenerate(e.to_string()))?;
    let residue = amount - per_person.times(members.len());
    if (per_person + residue).is_negative() {
        return Err(SplitError::degenerate(format!(
            "{} cannot be divided among {} members without a negative share",
            amount,
            members.len()
        )));
    }

    members
        .iter()
        .enumerate()
        .map(|(index, member_id)| {
            let share = if index == 0 { per_person + residue } else { per_person };
            computed(*member_id, share, amount)
        })
        .collect()
}

fn split_exact(
    amount: Money,
    shares: &[MemberAmount],
    members: &[MemberId],
) -> Result<Vec<ComputedSplit>, SplitError> {
    check_participants(shares.iter().map(|s| s.member_id), members)?;

    if let Some(negative) = shares.iter().find(|s| s.amount.is_sign_negative() && !s.amount.is_zero()) {
        return Err(SplitError::invalid(format!(
            "Split amount for member {} must not be negative",
            negative.member_id
        )));
    }

    let mut amounts = shares
        .iter()
        .map(|s| Money::exact(s.amount).map_err(|e| SplitError::invalid(e.to_string())))
        .collect::<Result<Vec<Money>, SplitError>>()?;
    let total: Money = amounts.iter().sum();

    if !total.within(&amount, CENT_TOLERANCE) {
        return Err(SplitError::mismatch(
            format!("Split amounts total {} but expense amount is {}", total, amount),
            amount.amount(),
            total.amount(),
        ));
    }

    if let Some(last) = amounts.last_mut() {
        *last += amount - total;
    }
    reject_negative_residue(&amounts)?;

    shares
        .iter()
        .zip(amounts)
        .map(|(share, value)| computed(share.member_id, value, amount))
        .collect()
}

fn split_percentage(
    amount: Money,
    shares: &[MemberPercentage],
    members: &[MemberId],
) -> Result<Vec<ComputedSplit>, SplitError> {
    check_participants(shares.iter().map(|s| s.member_id), members)?;

    if let Some(negative) = shares
        .iter()
        .find(|s| s.percentage.is_sign_negative() && !s.percentage.is_zero())
    {
        return Err(SplitError::invalid(format!(
            "Split percentage for member {} must not be negative",
            negative.member_id
        )));
    }

    let total: Decimal = shares.iter().map(|s| s.percentage).sum();
    if (total - dec!(100)).abs() > PERCENT_TOLERANCE {
        return Err(SplitError::mismatch(
            format!("Split percentages total {}% but must total 100%", total),
            dec!(100),
            total,
        ));
    }

    let last = shares.len() - 1;
    let mut allocated = Money::zero();
    let mut amounts = Vec::with_capacity(shares.len());
    for (index, share) in shares.iter().enumerate() {
        let value = if index == last {
            amount - allocated
        } else {
            amount.percent(share.percentage)
        };
        allocated += value;
        amounts.push(value);
    }
    reject_negative_residue(&amounts)?;

    Ok(shares
        .iter()
        .zip(amounts)
        .map(|(share, value)| ComputedSplit {
            member_id: share.member_id,
            amount: value,
            percentage: core_kernel::round_cents(share.percentage),
        })
        .collect())
}

/// Rejects empty, foreign and repeated participants
fn check_participants(
    participants: impl Iterator<Item = MemberId>,
    members: &[MemberId],
) -> Result<(), SplitError> {
    let trip_members: HashSet<MemberId> = members.iter().copied().collect();
    let mut seen = HashSet::new();

    for member_id in participants {
        if !trip_members.contains(&member_id) {
            return Err(SplitError::invalid(format!(
                "Member {} does not belong to this trip",
                member_id
            )));
        }
        if !seen.insert(member_id) {
            return Err(SplitError::invalid(format!(
                "Member {} appears more than once in the splits",
                member_id
            )));
        }
    }

    if seen.is_empty() {
        return Err(SplitError::invalid("Splits are required for this split type"));
    }
    Ok(())
}

fn reject_negative_residue(amounts: &[Money]) -> Result<(), SplitError> {
    if amounts.iter().any(Money::is_negative) {
        return Err(SplitError::invalid(
            "Rounding residue would leave a negative split",
        ));
    }
    Ok(())
}

fn computed(member_id: MemberId, share: Money, amount: Money) -> Result<ComputedSplit, SplitError> {
    let percentage = share
        .share_of(&amount)
        .map_err(|e| SplitError::degenerate(e.to_string()))?;
    Ok(ComputedSplit {
        member_id,
        amount: share,
        percentage,
    })
}
