//! Money types with precise decimal arithmetic
//!
//! The engine works in a single currency. `Money` wraps a `rust_decimal`
//! amount normalized to two fractional digits (cents), so every value that
//! crosses a boundary is already at the precision it is stored and
//! serialized with. Intermediate products (amount x percentage) are computed
//! on raw decimals and rounded once through [`Money::new`].

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits carried by every monetary amount
pub const MONEY_SCALE: u32 = 2;

/// Largest amount accepted from callers, the capacity of a NUMERIC(14,2) column
pub const MAX_AMOUNT: Decimal = dec!(999999999999.99);

/// Number of fractional digits a coverage percentage may carry
pub const PERCENTAGE_SCALE: u32 = 2;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount must not be negative: {0}")]
    Negative(Decimal),

    #[error("Amount must be greater than zero: {0}")]
    NotPositive(Decimal),

    #[error("Amount exceeds the maximum of 999999999999.99: {0}")]
    TooLarge(Decimal),

    #[error("Percentage must be within [0, 100]: {0}")]
    PercentageOutOfRange(Decimal),

    #[error("Percentage must have at most two decimal places: {0}")]
    PercentagePrecision(Decimal),
}

/// A monetary amount in the engine's single currency
///
/// Amounts are rounded half away from zero to cents on construction and
/// always carry a scale of two, which makes `Display` and serde output
/// `"700.00"` rather than `"700"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Money(Decimal);

impl Money {
    /// Creates a new Money value, rounding to cents
    pub fn new(amount: Decimal) -> Self {
        let mut rounded = amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(MONEY_SCALE);
        Self(rounded)
    }

    /// Creates a non-negative amount, rejecting negative input and
    /// anything above [`MAX_AMOUNT`]
    pub fn non_negative(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        Self::bounded(amount)
    }

    /// Creates a strictly positive amount (invoice totals), capped at [`MAX_AMOUNT`]
    pub fn positive(amount: Decimal) -> Result<Self, MoneyError> {
        let money = Self::bounded(amount)?;
        if !money.is_positive() {
            return Err(MoneyError::NotPositive(amount));
        }
        Ok(money)
    }

    fn bounded(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.abs() > MAX_AMOUNT {
            return Err(MoneyError::TooLarge(amount));
        }
        Ok(Self::new(amount))
    }

    /// Creates Money from an integer amount in cents
    pub fn from_minor(minor_units: i64) -> Self {
        Self::new(Decimal::new(minor_units, MONEY_SCALE))
    }

    /// Returns a zero amount
    pub fn zero() -> Self {
        Self::new(dec!(0))
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is positive
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Returns true if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Clamps negative amounts to zero
    pub fn floor_zero(self) -> Self {
        if self.is_negative() {
            Self::zero()
        } else {
            self
        }
    }

    /// Subtraction that never goes below zero
    pub fn saturating_sub(self, other: Money) -> Money {
        (self - other).floor_zero()
    }

    /// Applies a coverage percentage, rounding the product to cents
    pub fn percentage_of(&self, percentage: Percentage) -> Money {
        Money::new(percentage.apply(self.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Money::new)
            .map_err(|e| MoneyError::InvalidAmount(format!("{}: {}", s, e)))
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Decimal {
        money.0
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // rust_decimal accepts both JSON strings and numbers
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Money::bounded(amount).map_err(serde::de::Error::custom)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.0 + other.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.0 - other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// A coverage percentage in the closed range [0, 100]
///
/// Values carry exactly two fractional digits, matching the NUMERIC(5,2)
/// column they are stored in, so `80` serializes as `"80.00"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percentage(Decimal);

impl Percentage {
    /// Creates a percentage, rejecting values outside [0, 100] or with
    /// more than two decimal places
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        if value < dec!(0) || value > dec!(100) {
            return Err(MoneyError::PercentageOutOfRange(value));
        }
        let mut scaled = value.normalize();
        if scaled.scale() > PERCENTAGE_SCALE {
            return Err(MoneyError::PercentagePrecision(value));
        }
        scaled.rescale(PERCENTAGE_SCALE);
        Ok(Self(scaled))
    }

    /// Returns the percentage value (e.g. 70 for 70%)
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns the percentage as a fraction (e.g. 0.7 for 70%)
    pub fn as_fraction(&self) -> Decimal {
        self.0 / dec!(100)
    }

    /// Applies this percentage to a raw decimal amount
    pub fn apply(&self, amount: Decimal) -> Decimal {
        amount * self.0 / dec!(100)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl TryFrom<Decimal> for Percentage {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Percentage::new(value)
    }
}

impl Serialize for Percentage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Serialize::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Percentage::new(value).map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn money_addition_is_exact_on_cents(
            a in 0i64..1_000_000_000i64,
            b in 0i64..1_000_000_000i64
        ) {
            let sum = Money::from_minor(a) + Money::from_minor(b);
            prop_assert_eq!(sum, Money::from_minor(a + b));
        }

        #[test]
        fn percentage_share_never_exceeds_amount(
            cents in 1i64..100_000_000i64,
            pct in 0u32..=100u32
        ) {
            let amount = Money::from_minor(cents);
            let share = amount.percentage_of(Percentage::new(Decimal::from(pct)).unwrap());
            prop_assert!(share <= amount);
            prop_assert!(!share.is_negative());
        }
    }
}
