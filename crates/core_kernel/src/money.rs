//! Money types with precise decimal arithmetic
//!
//! A trip is kept in a single currency, so `Money` carries only an amount.
//! Every value is held at two decimal places and every rounding step in the
//! ledger goes through [`round_cents`], which rounds half away from zero.
//! Exactness of split totals comes from residue correction in the split
//! calculator; the rounding mode is only required to be uniform.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use thiserror::Error;

/// Number of decimal places kept for every amount
pub const CENT_PLACES: u32 = 2;

/// Maximum difference tolerated between a split total and its expense amount
pub const CENT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum difference tolerated between a percentage total and 100
pub const PERCENT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// Rounds a decimal to cents, half away from zero
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CENT_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Amount {0} has more than two decimal places")]
    ExcessPrecision(Decimal),
}

/// A monetary amount in the trip's currency, held at cent precision
///
/// Deserialization goes through [`Money::exact`], so amounts arriving from
/// outside with sub-cent digits are rejected instead of rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct Money {
    amount: Decimal,
}

impl Money {
    /// Creates a new Money value, rounding to cents
    pub fn new(amount: Decimal) -> Self {
        Self {
            amount: round_cents(amount),
        }
    }

    /// Creates Money from an amount that must already be at cent precision
    ///
    /// Trailing zeros are ignored, so `40.000` is accepted and `40.004` is not.
    pub fn exact(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.normalize().scale() > CENT_PLACES {
            return Err(MoneyError::ExcessPrecision(amount));
        }
        Ok(Self::new(amount))
    }

    /// Creates Money from an integer amount in cents
    pub fn from_cents(cents: i64) -> Self {
        Self {
            amount: Decimal::new(cents, CENT_PLACES),
        }
    }

    /// Creates a zero amount
    pub fn zero() -> Self {
        Self { amount: dec!(0.00) }
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    /// Returns true if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Returns the absolute value
    pub fn abs(&self) -> Self {
        Self {
            amount: self.amount.abs(),
        }
    }

    /// Divides the amount into `parts` and rounds the quotient to cents
    ///
    /// The result times `parts` generally differs from the original amount
    /// by a few cents; callers that need an exact partition must assign the
    /// residue themselves.
    pub fn per_part(&self, parts: usize) -> Result<Self, MoneyError> {
        if parts == 0 {
            return Err(MoneyError::DivisionByZero);
        }
        Ok(Self::new(self.amount / Decimal::from(parts)))
    }

    /// Multiplies by an integer count without rounding loss
    pub fn times(&self, count: usize) -> Self {
        Self::new(self.amount * Decimal::from(count))
    }

    /// Returns `percentage` percent of this amount, rounded to cents
    pub fn percent(&self, percentage: Decimal) -> Self {
        Self::new(self.amount * percentage / dec!(100))
    }

    /// Returns what share of `whole` this amount represents, in percent
    /// rounded to two decimal places
    pub fn share_of(&self, whole: &Money) -> Result<Decimal, MoneyError> {
        if whole.is_zero() {
            return Err(MoneyError::DivisionByZero);
        }
        Ok(round_cents(self.amount / whole.amount * dec!(100)))
    }

    /// Returns true if the two amounts differ by no more than `tolerance`
    pub fn within(&self, other: &Money, tolerance: Decimal) -> bool {
        (self.amount - other.amount).abs() <= tolerance
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.amount)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Money::exact(amount).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.amount + other.amount)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.amount - other.amount)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.amount)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn per_part_residue_is_smaller_than_parts_in_cents(
            cents in 1i64..1_000_000_000i64,
            parts in 1usize..50usize
        ) {
            let money = Money::from_cents(cents);
            let part = money.per_part(parts).unwrap();
            let residue = (money - part.times(parts)).abs();

            prop_assert!(residue.amount() <= Decimal::new(parts as i64, CENT_PLACES));
        }

        #[test]
        fn money_arithmetic_is_associative(
            a in -1_000_000i64..1_000_000i64,
            b in -1_000_000i64..1_000_000i64,
            c in -1_000_000i64..1_000_000i64
        ) {
            let ma = Money::from_cents(a);
            let mb = Money::from_cents(b);
            let mc = Money::from_cents(c);

            prop_assert_eq!((ma + mb) + mc, ma + (mb + mc));
        }
    }
}
