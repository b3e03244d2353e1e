//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  The storefront used to add JavaScript numbers:                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │    undefined * 60 = NaN             ❌ NaN reached the payable amount   │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    Stored amounts are i64 minor units (poisha, cents).                  │
//! │    Conversions run in Decimal and are rounded ONCE at the boundary.     │
//! │    A Money can never be NaN.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cartwright_core::money::Money;
//!
//! let price = Money::from_major(500);        // 500.00
//! let total = price + Money::from_minor(50); // 500.50
//! assert_eq!(total.minor(), 50_050);
//! ```

use std::fmt;
use std::ops::{Add, Sub};

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Number of minor units in one major unit.
pub const MINOR_PER_MAJOR: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest unit of its currency.
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate differences may go negative; every
///   amount leaving the pricing aggregator is clamped to zero or above
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **No currency field**: a `CartLine` carries its currency code; every
///   total is in the configured base currency
///
/// ## Where Money is Used
/// ```text
/// CartLine.unit_price ──► amount in base ──► subtotal ──┐
///                                                       ├─► payable
/// Coupon discount ──────────────────────► discount ─────┤
/// Rate table ───────────────────────────► shipping ─────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use cartwright_core::money::Money;
    ///
    /// let price = Money::from_minor(1099);
    /// assert_eq!(price.minor(), 1099);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Creates a Money value from whole major units.
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * MINOR_PER_MAJOR)
    }

    /// Creates a Money value from a floating major-unit amount supplied by
    /// configuration or a rate table.
    ///
    /// Non-finite and negative inputs become zero: no monetary field may
    /// ever be NaN or negative.
    ///
    /// ## Example
    /// ```rust
    /// use cartwright_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_f64(60.0), Money::from_major(60));
    /// assert_eq!(Money::from_major_f64(f64::NAN), Money::zero());
    /// assert_eq!(Money::from_major_f64(-5.0), Money::zero());
    /// ```
    pub fn from_major_f64(major: f64) -> Self {
        if !major.is_finite() || major <= 0.0 {
            return Money::zero();
        }
        Decimal::from_f64(major)
            .map(|d| Money::from_decimal_minor(d * Decimal::from(MINOR_PER_MAJOR)))
            .unwrap_or_else(Money::zero)
    }

    /// Rounds a decimal amount of minor units to the nearest minor unit
    /// (half away from zero).
    ///
    /// This is the single rounding point of the engine.
    pub fn from_decimal_minor(minor: Decimal) -> Self {
        let rounded = minor.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let value = rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        });
        Money(value)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the value in minor units as a Decimal, for exact intermediate math.
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from(self.0)
    }

    /// Returns the whole major-unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / MINOR_PER_MAJOR
    }

    /// Returns the minor-unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % MINOR_PER_MAJOR).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative values to zero.
    #[inline]
    pub const fn non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Clamps the value into `[min, max]`.
    #[inline]
    pub fn clamp_to(self, min: Money, max: Money) -> Self {
        if self < min {
            min
        } else if self > max {
            max
        } else {
            self
        }
    }

    /// Subtraction that floors at zero.
    ///
    /// ## Example
    /// ```rust
    /// use cartwright_core::money::Money;
    ///
    /// let rest = Money::from_major(100).saturating_sub_to_zero(Money::from_major(250));
    /// assert!(rest.is_zero());
    /// ```
    #[inline]
    pub const fn saturating_sub_to_zero(self, other: Money) -> Self {
        Money(self.0.saturating_sub(other.0)).non_negative()
    }

    /// Addition that stops at `i64::MAX` instead of wrapping.
    #[inline]
    pub const fn saturating_add(self, other: Money) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the amount with two decimals and no currency symbol.
/// Symbol placement is a storefront concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
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

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_from_minor_and_major() {
        let money = Money::from_minor(1099);
        assert_eq!(money.minor(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
        assert_eq!(Money::from_major(500).minor(), 50_000);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(1099).to_string(), "10.99");
        assert_eq!(Money::from_major(60).to_string(), "60.00");
        assert_eq!(Money::from_minor(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
    }

    #[test]
    fn test_saturating_add_stops_at_max() {
        let big = Money::from_minor(i64::MAX - 10);
        assert_eq!(big.saturating_add(Money::from_minor(6_000)).minor(), i64::MAX);
        assert_eq!(
            Money::from_minor(100).saturating_add(Money::from_minor(50)),
            Money::from_minor(150)
        );
    }

    #[test]
    fn test_rounding_happens_half_away_from_zero() {
        assert_eq!(Money::from_decimal_minor(Decimal::new(1005, 1)).minor(), 101); // 100.5
        assert_eq!(Money::from_decimal_minor(Decimal::new(1004, 1)).minor(), 100); // 100.4
        assert_eq!(Money::from_decimal_minor(Decimal::new(-1005, 1)).minor(), -101);
    }

    #[test]
    fn test_from_major_f64_is_never_nan_or_negative() {
        assert_eq!(Money::from_major_f64(60.0).minor(), 6000);
        assert_eq!(Money::from_major_f64(12.5).minor(), 1250);
        assert!(Money::from_major_f64(f64::NAN).is_zero());
        assert!(Money::from_major_f64(f64::INFINITY).is_zero());
        assert!(Money::from_major_f64(-1.0).is_zero());
    }

    #[test]
    fn test_clamps() {
        assert!(Money::from_minor(-5).non_negative().is_zero());
        assert_eq!(
            Money::from_minor(500).clamp_to(Money::zero(), Money::from_minor(200)),
            Money::from_minor(200)
        );
        assert!(Money::from_minor(100)
            .saturating_sub_to_zero(Money::from_minor(300))
            .is_zero());
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_negative());
        assert!(Money::from_minor(-100).is_negative());
    }
}
