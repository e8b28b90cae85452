//! # Money Module
//!
//! Provides the `Money` type for every price, cost, total and ledger amount.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Ledger balances are compared for equality ("is it paid?").            │
//! │  With floats, 1000.00 − 400.10 − 599.90 is not exactly 0.              │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (cents)                             │
//! │    100000 − 40010 − 59990 = 0   (exact)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockroom_core::money::Money;
//!
//! let cost = Money::from_cents(500);                            // 5.00
//! let line = cost.checked_multiply_quantity(10, "lineTotal")?;  // 50.00
//! assert_eq!(line.cents(), 5000);
//!
//! // Payments are applied in whole units
//! assert_eq!(Money::from_cents(40_049).round_to_whole_units().cents(), 40_000);
//! # Ok::<(), stockroom_core::CoreError>(())
//! ```
//!
//! Totals built from request input go through the `checked_*` methods,
//! which report [`CoreError::AmountOutOfRange`] instead of overflowing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::MAX_AMOUNT_CENTS;

/// Number of minor units in one whole currency unit.
pub const MINOR_PER_UNIT: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Signed so intermediate results (e.g. `subtotal - discount`) can go below
/// zero before being floored by the owning aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * MINOR_PER_UNIT - minor)
        } else {
            Money(major * MINOR_PER_UNIT + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / MINOR_PER_UNIT
    }

    /// Returns the minor-unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % MINOR_PER_UNIT).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    ///
    /// Used for purchase order and bill totals, and ledger balances,
    /// none of which may go below zero.
    #[inline]
    pub const fn floor_at_zero(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// PO line: 10 × 5.00
    ///      │
    ///      ▼
    /// checked_multiply_quantity(10) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line Total: 50.00
    /// ```
    ///
    /// `field` names the value in the error when the product overflows.
    pub fn checked_multiply_quantity(&self, qty: i64, field: &str) -> CoreResult<Self> {
        self.0
            .checked_mul(qty)
            .map(Money)
            .ok_or_else(|| out_of_range(field))
    }

    /// Multiplies by a quantity, clamping at the `i64` limits.
    ///
    /// For read-side figures such as inventory value.
    #[inline]
    pub const fn saturating_multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    pub fn checked_add(&self, other: Money, field: &str) -> CoreResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| out_of_range(field))
    }

    pub fn checked_sub(&self, other: Money, field: &str) -> CoreResult<Self> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or_else(|| out_of_range(field))
    }

    /// Fails when the amount exceeds [`MAX_AMOUNT_CENTS`].
    pub fn ensure_within_limit(self, field: &str) -> CoreResult<Self> {
        if self.0 > MAX_AMOUNT_CENTS {
            return Err(out_of_range(field));
        }
        Ok(self)
    }

    #[inline]
    pub const fn saturating_add(&self, other: Money) -> Self {
        Money(self.0.saturating_add(other.0))
    }

    /// Sums amounts, failing instead of overflowing.
    pub fn checked_sum<I>(amounts: I, field: &str) -> CoreResult<Self>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m, field))
    }

    /// Rounds to the nearest whole currency unit, halves away from zero.
    ///
    /// ## Where This Is Used
    /// The credit ledger applies payments in whole units: a payment of
    /// 400.49 is applied as 400.00, a balance of 599.60 compares as 600.00.
    ///
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(40_050).round_to_whole_units().cents(), 40_100);
    /// assert_eq!(Money::from_cents(-150).round_to_whole_units().cents(), -200);
    /// ```
    pub const fn round_to_whole_units(&self) -> Self {
        let half = MINOR_PER_UNIT / 2;
        let units = if self.0 >= 0 {
            self.0.saturating_add(half) / MINOR_PER_UNIT
        } else {
            self.0.saturating_sub(half) / MINOR_PER_UNIT
        };
        Money(units * MINOR_PER_UNIT)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering (`1099` → `10.99`); the client owns currency symbols.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

fn out_of_range(field: &str) -> CoreError {
    CoreError::AmountOutOfRange {
        field: field.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(a.checked_multiply_quantity(3, "total").unwrap().cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_floor_at_zero() {
        assert_eq!(Money::from_cents(-1).floor_at_zero(), Money::zero());
        assert_eq!(Money::from_cents(42).floor_at_zero().cents(), 42);
    }

    #[test]
    fn test_round_to_whole_units() {
        assert_eq!(Money::from_cents(40_000).round_to_whole_units().cents(), 40_000);
        assert_eq!(Money::from_cents(40_049).round_to_whole_units().cents(), 40_000);
        assert_eq!(Money::from_cents(40_050).round_to_whole_units().cents(), 40_100);
        assert_eq!(Money::from_cents(59_960).round_to_whole_units().cents(), 60_000);
        assert_eq!(Money::from_cents(30).round_to_whole_units().cents(), 0);
        assert_eq!(Money::from_cents(-149).round_to_whole_units().cents(), -100);
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let huge = Money::from_cents(i64::MAX / 2 + 1);
        assert!(matches!(
            huge.checked_multiply_quantity(2, "lineTotal"),
            Err(CoreError::AmountOutOfRange { field }) if field == "lineTotal"
        ));
        assert!(huge.checked_add(huge, "subtotal").is_err());
        assert!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1), "total").is_err());
        assert!(Money::checked_sum(vec![huge, huge], "subtotal").is_err());
        assert_eq!(
            Money::checked_sum(vec![Money::from_cents(1), Money::from_cents(2)], "subtotal")
                .unwrap()
                .cents(),
            3
        );
        assert_eq!(huge.saturating_multiply_quantity(4).cents(), i64::MAX);
        assert!(Money::from_cents(MAX_AMOUNT_CENTS).ensure_within_limit("total").is_ok());
        assert!(Money::from_cents(MAX_AMOUNT_CENTS + 1).ensure_within_limit("total").is_err());
    }

    #[test]
    fn test_round_to_whole_units_at_limits() {
        assert_eq!(
            Money::from_cents(i64::MAX).round_to_whole_units().cents(),
            i64::MAX / 100 * 100
        );
        assert_eq!(
            Money::from_cents(i64::MIN).round_to_whole_units().cents(),
            i64::MIN / 100 * 100
        );
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
        assert_eq!(Money::from_cents(-550).abs().cents(), 550);
    }
}
