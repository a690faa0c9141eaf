//! Custom Test Assertions
//!
//! Provides assertion helpers for ledger invariants that give more
//! meaningful failure messages than plain `assert_eq!`.

use core_kernel::Money;
use domain_expense::{Expense, Settlement, Split};
use rust_decimal::Decimal;

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the amounts differ by more than `tolerance`
pub fn assert_money_approx_eq(actual: Money, expected: Money, tolerance: Decimal) {
    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual,
        expected,
        diff,
        tolerance
    );
}

/// Asserts that split amounts add up exactly to `total`
pub fn assert_splits_sum_to(splits: &[Split], total: Money) {
    let sum: Money = splits.iter().map(|s| s.amount).sum();
    assert_eq!(
        sum, total,
        "Sum of splits ({}) doesn't equal the expense amount ({})",
        sum, total
    );
}

/// Asserts that an expense's splits add up exactly to its amount
pub fn assert_expense_balanced(expense: &Expense) {
    assert_splits_sum_to(&expense.splits, expense.amount);
}

/// Asserts that settlements account for every expense exactly
pub fn assert_settlements_balance(settlements: &[Settlement], expenses: &[Expense]) {
    let settled: Money = settlements.iter().map(|s| s.amount).sum();
    let spent: Money = expenses.iter().map(|e| e.amount).sum();
    assert_eq!(
        settled, spent,
        "Settlements total ({}) doesn't equal expenses total ({})",
        settled, spent
    );
}

/// Asserts that every settlement is zero
pub fn assert_settlements_zero(settlements: &[Settlement]) {
    for settlement in settlements {
        assert!(
            settlement.amount.is_zero(),
            "Expected zero settlement for {}, got {}",
            settlement.member_id,
            settlement.amount
        );
    }
}
