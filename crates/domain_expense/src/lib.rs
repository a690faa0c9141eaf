//! Expense Domain
//!
//! Expenses, the split calculator that divides them among members, and the
//! settlement aggregation that folds all splits of a trip into one net
//! balance per member.
//!
//! # Invariants
//!
//! - The splits of every accepted expense sum to its amount exactly
//! - After recalculation the settlements of a trip sum to the total of its
//!   splits
//! - Recalculation is a full recompute and therefore idempotent
//!
//! # Examples
//!
//! ```rust
//! use core_kernel::{MemberId, Money};
//! use domain_expense::{calculate, MemberPercentage, SplitStrategy};
//! use rust_decimal_macros::dec;
//!
//! let members = vec![MemberId::new(), MemberId::new(), MemberId::new()];
//! let strategy = SplitStrategy::Percentage(vec![
//!     MemberPercentage::new(members[0], dec!(30)),
//!     MemberPercentage::new(members[1], dec!(30)),
//!     MemberPercentage::new(members[2], dec!(40)),
//! ]);
//!
//! let splits = calculate(Money::new(dec!(99.99)), &strategy, &members).unwrap();
//! assert_eq!(splits[2].amount, Money::new(dec!(39.99)));
//! ```

pub mod error;
pub mod expense;
pub mod ports;
pub mod settlement;
pub mod split;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::SplitError;
pub use expense::{Expense, ExpenseCategory, ExpenseChanges, NewExpense, Split};
pub use ports::{LedgerStore, LedgerTransaction};
pub use settlement::{
    aggregate, sort_by_amount_desc, sort_by_date_desc, Aggregation, Settlement,
    SettlementBalance, SplitContribution,
};
pub use split::{
    calculate, ComputedSplit, MemberAmount, MemberPercentage, SplitKind, SplitStrategy,
};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockLedgerStore;
