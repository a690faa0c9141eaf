//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data that keeps
//! the ledger's invariants.

use core_kernel::{MemberId, Money};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for positive amounts in cents
pub fn positive_cents_strategy() -> impl Strategy<Value = i64> {
    1i64..10_000_000i64
}

/// Strategy for positive Money values
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    positive_cents_strategy().prop_map(Money::from_cents)
}

/// Strategy for a trip's member ids
pub fn members_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<MemberId>> {
    (min..=max).prop_map(|n| (0..n).map(|_| MemberId::new()).collect())
}

/// Strategy for `count` percentages with two decimals summing to exactly 100
pub fn percentages_strategy(count: usize) -> impl Strategy<Value = Vec<Decimal>> {
    proptest::collection::vec(1u32..1000u32, count..=count).prop_map(|weights| {
        let total: u32 = weights.iter().sum();
        let mut pcts: Vec<Decimal> = weights
            .iter()
            .map(|w| {
                (Decimal::from(*w) * Decimal::ONE_HUNDRED / Decimal::from(total))
                    .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::ToZero)
            })
            .collect();
        let assigned: Decimal = pcts.iter().take(pcts.len().saturating_sub(1)).sum();
        if let Some(last) = pcts.last_mut() {
            *last = Decimal::ONE_HUNDRED - assigned;
        }
        pcts
    })
}
