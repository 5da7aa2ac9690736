//! Energy quantities measured in kilowatt-hours
//!
//! `Kwh` is used both for cumulative meter readings and for the consumption
//! deltas derived from them. Deltas may be negative; readings never should be.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};

use crate::money::{parse_decimal, MoneyError};

/// A quantity of electrical energy in kWh
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kwh(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Kwh {
    /// Creates a new quantity
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Zero kWh
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Parses a quantity from user input
    pub fn parse(raw: &str) -> Result<Self, MoneyError> {
        parse_decimal(raw).map(Self)
    }

    /// Returns the underlying decimal
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns true when the quantity is strictly negative
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns true when the quantity is strictly positive
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Clamps negative quantities to zero
    pub fn clamp_non_negative(&self) -> Self {
        Self(self.0.max(Decimal::ZERO))
    }

    pub fn checked_add(&self, other: Kwh) -> Option<Kwh> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Kwh) -> Option<Kwh> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl fmt::Display for Kwh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kWh", self.0.normalize())
    }
}

impl From<Decimal> for Kwh {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Add for Kwh {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Sub for Kwh {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Neg for Kwh {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Kwh {
    fn sum<I: Iterator<Item = Kwh>>(iter: I) -> Self {
        iter.fold(Kwh::zero(), |acc, k| acc + k)
    }
}
