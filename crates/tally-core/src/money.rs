//! # Money Module
//!
//! Provides the `Money` and `Quantity` types for handling sale arithmetic safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    Money     = i64 cents            (2 fractional digits)               │
//! │    Quantity  = i64 milli-units      (3 fractional digits)               │
//! │                                                                         │
//! │  The ONLY place rounding happens is quantity × unit price, and it is    │
//! │  always round-half-up to the cent.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::{Money, Quantity};
//!
//! let price: Money = "120".parse().unwrap();
//! let qty = Quantity::from_units(2);
//! assert_eq!(price.times_quantity(qty).unwrap().cents(), 24000);
//!
//! // Weight-based goods: 0.375 kg at 12.99/kg = 4.87125 → 4.87
//! let kilo_price = Money::from_cents(1299);
//! let weight: Quantity = "0.375".parse().unwrap();
//! assert_eq!(kilo_price.times_quantity(weight).unwrap().cents(), 487);
//! ```
//!
//! ## Bounds
//! Every amount a sale stores (prices, line totals, sale totals, payments)
//! stays within `±MAX_MONEY_CENTS`. Arithmetic that could leave that range
//! returns a `ValidationError::OutOfRange` instead of wrapping.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

/// Largest amount, in cents, any single value or sale total may hold
/// (9 999 999 999.99).
pub const MAX_MONEY_CENTS: i64 = 999_999_999_999;

fn out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: Money::from_cents(-MAX_MONEY_CENTS).to_string(),
        max: Money::from_cents(MAX_MONEY_CENTS).to_string(),
    }
}

/// Narrows an i128 intermediate to cents, refusing anything past the ceiling.
fn bounded_cents(field: &str, value: i128) -> Result<Money, ValidationError> {
    i64::try_from(value)
        .ok()
        .filter(|cents| cents.abs() <= MAX_MONEY_CENTS)
        .map(Money)
        .ok_or_else(|| out_of_range(field))
}

/// Divides with round-half-up (half away from zero) semantics.
///
/// `denominator` must be positive.
fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        -((-numerator + half) / denominator)
    }
}

/// Parses a plain decimal literal (`"12"`, `"12.5"`, `"-0.75"`) into an
/// integer scaled by `10^scale`.
///
/// Digits beyond `scale` are either rounded half-up (`round_excess = true`)
/// or rejected.
fn parse_scaled(
    field: &str,
    input: &str,
    scale: u32,
    round_excess: bool,
) -> Result<i64, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: reason.to_string(),
    };

    let text = input.trim();
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid("must be a decimal number"));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid("must be a decimal number"));
    }

    let scale_usize = scale as usize;
    if frac_part.len() > scale_usize && !round_excess {
        return Err(invalid(&format!("at most {} fractional digits allowed", scale)));
    }

    let factor = 10i128.pow(scale);
    let mut value: i128 = 0;
    for c in int_part.chars() {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(c as i128 - '0' as i128))
            .ok_or_else(|| invalid("value is too large"))?;
        if value > i64::MAX as i128 {
            return Err(invalid("value is too large"));
        }
    }
    value *= factor;

    let kept: String = frac_part.chars().take(scale_usize).collect();
    let mut frac_value: i128 = 0;
    for (i, c) in kept.chars().enumerate() {
        frac_value += (c as i128 - '0' as i128) * 10i128.pow(scale - 1 - i as u32);
    }
    value += frac_value;

    // Half-up only needs the first discarded digit
    if let Some(next) = frac_part.chars().nth(scale_usize) {
        if next >= '5' {
            value += 1;
        }
    }

    if value > i64::MAX as i128 {
        return Err(invalid("value is too large"));
    }

    let value = value as i64;
    Ok(if negative { -value } else { value })
}

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in cents (the smallest currency unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate differences (`paid - net`) can be negative;
///   everything persisted on a sale is clamped to `>= 0`
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serde**: serialized as integer cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units * 100)
    }

    /// Parses a decimal amount, rounding half-up to 2 fractional digits.
    ///
    /// `field` names the input in the resulting validation error.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::parse("amount", "240").unwrap().cents(), 24000);
    /// assert_eq!(Money::parse("amount", "0.125").unwrap().cents(), 13);
    /// assert!(Money::parse("amount", "12,50").is_err());
    /// assert!(Money::parse("amount", "10000000000").is_err());
    /// ```
    pub fn parse(field: &str, input: &str) -> Result<Self, ValidationError> {
        let cents = parse_scaled(field, input, 2, true)?;
        bounded_cents(field, i128::from(cents))
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
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

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Checks that the value lies within `±MAX_MONEY_CENTS`.
    #[inline]
    pub const fn is_within_limit(&self) -> bool {
        self.0 >= -MAX_MONEY_CENTS && self.0 <= MAX_MONEY_CENTS
    }

    /// Adds two amounts, failing when the result leaves the money range.
    pub fn checked_add(self, other: Money, field: &str) -> Result<Money, ValidationError> {
        bounded_cents(field, i128::from(self.0) + i128::from(other.0))
    }

    /// Sums amounts, failing as soon as the running total leaves the money range.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::{Money, MAX_MONEY_CENTS};
    ///
    /// let parts = [Money::from_cents(150), Money::from_cents(250)];
    /// assert_eq!(Money::checked_sum("total_paid", parts).unwrap().cents(), 400);
    ///
    /// let huge = [Money::from_cents(MAX_MONEY_CENTS), Money::from_cents(1)];
    /// assert!(Money::checked_sum("total_paid", huge).is_err());
    /// ```
    pub fn checked_sum(
        field: &str,
        amounts: impl IntoIterator<Item = Money>,
    ) -> Result<Money, ValidationError> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m, field))
    }

    /// Returns `max(0, self)`.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Multiplies a unit price by a fractional quantity.
    ///
    /// ## Rounding
    /// ```text
    /// cents × milli-units / 1000  →  round half up  →  cents
    ///
    /// 12.99 × 0.375 = 4.87125  → 4.87
    /// 0.01  × 0.500 = 0.005    → 0.01
    /// ```
    ///
    /// ## Errors
    /// `OutOfRange` on `gross_total` when the product leaves the money range.
    pub fn times_quantity(&self, qty: Quantity) -> Result<Money, ValidationError> {
        let raw = i128::from(self.0) * i128::from(qty.milli());
        bounded_cents(
            "gross_total",
            div_round_half_up(raw, i128::from(Quantity::SCALE)),
        )
    }

    /// Calculates tax on this amount, rounding half-up to the cent.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::types::TaxRate;
    ///
    /// let base = Money::from_cents(1000); // 10.00
    /// let rate = TaxRate::from_bps(825);  // 8.25%
    ///
    /// // 10.00 × 8.25% = 0.825 → 0.83
    /// assert_eq!(base.calculate_tax(rate).unwrap().cents(), 83);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Result<Money, ValidationError> {
        let raw = i128::from(self.0) * i128::from(rate.bps());
        bounded_cents("tax_value", div_round_half_up(raw, 10_000))
    }
}

/// Shows money as a plain two-decimal number (`"235.00"`, `"-5.50"`).
///
/// ## Note
/// Currency symbols are a presentation concern (receipt options).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse("amount", s)
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
// Quantity Type
// =============================================================================

/// A line quantity with 3 fractional digits, stored as milli-units.
///
/// ## Examples
/// ```text
/// 2 units      → Quantity(2000)
/// 0.375 kg     → Quantity(375)
/// 1.5 m        → Quantity(1500)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    /// Milli-units per whole unit.
    pub const SCALE: i64 = 1000;

    /// Creates a quantity from milli-units.
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Creates a quantity from whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * Self::SCALE)
    }

    /// Parses a decimal quantity with at most 3 fractional digits.
    pub fn parse(field: &str, input: &str) -> Result<Self, ValidationError> {
        parse_scaled(field, input, 3, false).map(Quantity)
    }

    /// Returns the value in milli-units.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    /// Checks if the quantity is positive.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

/// Shows the shortest exact form: `2`, `1.5`, `0.375`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / Self::SCALE;
        let frac = abs % Self::SCALE;
        if frac == 0 {
            return write!(f, "{}{}", sign, whole);
        }
        let digits = format!("{:03}", frac);
        write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quantity::parse("quantity", s)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
