//! # Money Module
//!
//! Provides the `Money` type used for prices, costs and ledger amounts.
//!
//! ## Integer Cents
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every amount is an i64 count of the smallest currency unit.            │
//! │                                                                         │
//! │    Red Rose unit price .......... 250 cents                             │
//! │    × 12 stems ................... 3000 cents                            │
//! │    Shrinkage of 15 stems @ 90 ... 1350 cents (expense)                 │
//! │                                                                         │
//! │  No floats anywhere: sums of line totals are exact.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use petal_core::money::Money;
//!
//! let stem_price = Money::from_cents(250);
//! let line = stem_price.checked_multiply_quantity(12);
//! assert_eq!(line, Some(Money::from_cents(3000)));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Signed so that summaries can express a negative net; amounts written to
/// the transaction log are always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit amount by a quantity (stems, lines, arrangements).
    /// `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use petal_core::money::Money;
    ///
    /// let cost = Money::from_cents(90);
    /// assert_eq!(cost.checked_multiply_quantity(15).map(|m| m.cents()), Some(1350));
    /// assert_eq!(cost.checked_multiply_quantity(i64::MAX), None);
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Formats the amount with a currency symbol and a fixed number of
    /// decimals, e.g. `format_with("R$", 2)` → `R$12.50`.
    pub fn format_with(&self, symbol: &str, decimals: u8) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        if decimals == 0 {
            return format!("{}{}{}", sign, symbol, abs);
        }
        let divisor = 10_u64.pow(decimals as u32);
        format!(
            "{}{}{}.{:0width$}",
            sign,
            symbol,
            abs / divisor,
            abs % divisor,
            width = decimals as usize
        )
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly display with two decimals and no symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with("", 2))
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

/// Cart totals are a plain sum of line totals.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
