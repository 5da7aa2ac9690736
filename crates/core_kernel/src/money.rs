//! Money and per-unit rate types with precise decimal arithmetic
//!
//! This module provides a type-safe representation of monetary values
//! using rust_decimal for precise calculations without floating-point errors.
//! Values travel over the wire as JSON numbers.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

use crate::energy::Kwh;

/// Number of decimal places in the minor currency unit
pub const MINOR_UNIT_PLACES: u32 = 2;

/// Internal precision for stored amounts
const STORAGE_PLACES: u32 = 4;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Overflow during calculation")]
    Overflow,
}

/// Parses a user-supplied decimal number.
///
/// Accepts plain and scientific notation, trims surrounding whitespace and
/// rejects empty input as well as `NaN`/`inf` spellings.
pub fn parse_decimal(raw: &str) -> Result<Decimal, MoneyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MoneyError::InvalidAmount("empty value".to_string()));
    }

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| MoneyError::InvalidAmount(trimmed.to_string()))
}

/// Rounds half away from zero at the minor currency unit
pub fn round_to_minor(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MINOR_UNIT_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// A monetary amount in the ledger's single currency
///
/// Amounts are stored with 4 decimal places internally so that derived
/// values can be rounded exactly once, at the minor unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Money {
    /// Zero amount
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Creates a new Money value
    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp(STORAGE_PLACES))
    }

    /// Creates Money from an integer amount in minor units (e.g., agorot, cents)
    pub fn from_minor(minor_units: i64) -> Self {
        Self::new(Decimal::new(minor_units, MINOR_UNIT_PLACES))
    }

    /// Parses an amount from user input
    pub fn parse(raw: &str) -> Result<Self, MoneyError> {
        parse_decimal(raw).map(Self::new)
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns true if the amount is strictly negative
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Rounds half away from zero to the minor unit
    pub fn round_to_minor(&self) -> Self {
        Self(round_to_minor(self.0))
    }

    /// Checked addition
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }

    /// Checked subtraction
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.0
            .checked_sub(other.0)
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }

    /// Divides by a count, e.g. for per-bill averages
    pub fn divide(&self, divisor: Decimal) -> Result<Self, MoneyError> {
        if divisor.is_zero() {
            return Err(MoneyError::DivisionByZero);
        }
        self.0
            .checked_div(divisor)
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", round_to_minor(self.0))
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
        Self::new(self.0.saturating_add(other.0))
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.0.saturating_sub(other.0))
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

/// Price per kilowatt-hour for a billing period
///
/// Kept at full precision; only the costs derived from it are rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Rate {
    /// A rate of zero, used when a period has no aggregate consumption
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// Creates a rate from a decimal price per kWh
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Derives the price per kWh of a bill.
    ///
    /// Zero (or negative) consumption yields [`Rate::ZERO`] instead of an error
    /// so a vacant period never breaks downstream cost math.
    pub fn per_kwh(amount: Money, kwh: Kwh) -> Self {
        if kwh.value() <= Decimal::ZERO {
            return Self::ZERO;
        }
        amount
            .amount()
            .checked_div(kwh.value())
            .map(Self)
            .unwrap_or(Self::ZERO)
    }

    /// Returns the rate as a decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns true for the zero rate
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Applies this rate to a quantity, without rounding.
    ///
    /// Saturates at the bounds of `Decimal`; see [`Rate::checked_apply`].
    pub fn apply(&self, kwh: Kwh) -> Decimal {
        self.0.saturating_mul(kwh.value())
    }

    /// Applies this rate to a quantity, `None` if the product overflows
    pub fn checked_apply(&self, kwh: Kwh) -> Option<Decimal> {
        self.0.checked_mul(kwh.value())
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/kWh", self.0.round_dp(4).normalize())
    }
}

/// Whole-number percentage of `part` within `total`, zero when `total` is not positive
pub fn percentage_of(part: Decimal, total: Decimal) -> Decimal {
    if total <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let ratio = part.checked_div(total).map(|r| r.saturating_mul(dec!(100)));
    let ratio = ratio.unwrap_or(if part.is_sign_negative() { Decimal::MIN } else { Decimal::MAX });
    ratio.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}
