//! Fixed-point amounts with exactly two decimal places.
//!
//! Prices are held in cents and stock quantities in hundredths of a unit so
//! that arithmetic never goes through floating point.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced when parsing or combining fixed-point amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount '{0}' is not a decimal number")]
    Malformed(String),

    #[error("amount '{0}' has more than two decimal places")]
    TooPrecise(String),

    #[error("amount '{0}' is negative")]
    Negative(String),

    #[error("amount overflow")]
    Overflow,
}

/// Parses a non-negative decimal string into hundredths.
///
/// Accepts `"12"`, `"12.5"` and `"12.50"`; rejects `"12.505"`, `"-1"`, `"1e3"`.
fn parse_hundredths(input: &str) -> Result<i64, AmountError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(AmountError::Empty);
    }
    if s.starts_with('-') {
        return Err(AmountError::Negative(s.to_string()));
    }
    let s = s.strip_prefix('+').unwrap_or(s);

    let (whole, frac) = match s.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (s, ""),
    };

    let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !is_digits(whole) || !is_digits(frac) {
        return Err(AmountError::Malformed(input.to_string()));
    }
    if frac.len() > 2 {
        return Err(AmountError::TooPrecise(input.to_string()));
    }

    let whole: i64 = whole.parse().map_err(|_| AmountError::Overflow)?;
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|_| AmountError::Overflow)? * 10,
        _ => frac.parse().map_err(|_| AmountError::Overflow)?,
    };

    whole
        .checked_mul(100)
        .and_then(|v| v.checked_add(frac))
        .ok_or(AmountError::Overflow)
}

fn write_hundredths(f: &mut std::fmt::Formatter<'_>, value: i64) -> std::fmt::Result {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Parses a decimal string such as `"12.50"`.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        parse_hundredths(input).map(Self::from_cents)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Multiplies a unit price by a fractional quantity.
    ///
    /// The product of cents and hundredths carries four decimal places; it is
    /// rounded half-up back to cents.
    pub fn times(&self, quantity: Quantity) -> Result<Money, AmountError> {
        let raw = i128::from(self.cents) * i128::from(quantity.hundredths());
        let rounded = (raw + 50).div_euclid(100);
        i64::try_from(rounded)
            .map(Money::from_cents)
            .map_err(|_| AmountError::Overflow)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_hundredths(f, self.cents)
    }
}

impl std::str::FromStr for Money {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Money::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A stock or order quantity in hundredths of a [`Unit`](crate::Unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity {
    hundredths: i64,
}

impl Quantity {
    /// Creates a quantity from hundredths of a unit.
    pub fn from_hundredths(hundredths: i64) -> Self {
        Self { hundredths }
    }

    /// Creates a quantity of whole units.
    pub fn from_units(units: i64) -> Self {
        Self {
            hundredths: units * 100,
        }
    }

    pub fn zero() -> Self {
        Self { hundredths: 0 }
    }

    /// Parses a decimal string such as `"2.5"`.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        parse_hundredths(input).map(Self::from_hundredths)
    }

    pub fn hundredths(&self) -> i64 {
        self.hundredths
    }

    pub fn is_zero(&self) -> bool {
        self.hundredths == 0
    }

    pub fn is_positive(&self) -> bool {
        self.hundredths > 0
    }

    pub fn checked_add(self, rhs: Quantity) -> Option<Quantity> {
        self.hundredths.checked_add(rhs.hundredths).map(Self::from_hundredths)
    }

    /// Subtracts, returning `None` if the result would be negative.
    pub fn checked_sub(self, rhs: Quantity) -> Option<Quantity> {
        self.hundredths
            .checked_sub(rhs.hundredths)
            .filter(|v| *v >= 0)
            .map(Self::from_hundredths)
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_hundredths(f, self.hundredths)
    }
}

impl std::str::FromStr for Quantity {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Quantity::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(Money::parse("12").unwrap().cents(), 1200);
        assert_eq!(Money::parse("12.5").unwrap().cents(), 1250);
        assert_eq!(Money::parse("12.05").unwrap().cents(), 1205);
        assert_eq!(Money::parse(" 0.99 ").unwrap().cents(), 99);
        assert_eq!(Quantity::parse("2.50").unwrap().hundredths(), 250);
    }

    #[test]
    fn rejects_more_than_two_decimals() {
        assert_eq!(
            Money::parse("1.005"),
            Err(AmountError::TooPrecise("1.005".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_and_negative_input() {
        assert_eq!(Money::parse(""), Err(AmountError::Empty));
        assert!(matches!(Money::parse("abc"), Err(AmountError::Malformed(_))));
        assert!(matches!(Money::parse(".5"), Err(AmountError::Malformed(_))));
        assert!(matches!(Money::parse("1e3"), Err(AmountError::Malformed(_))));
        assert!(matches!(Quantity::parse("-3"), Err(AmountError::Negative(_))));
        assert_eq!(
            Money::parse("99999999999999999999"),
            Err(AmountError::Overflow)
        );
    }

    #[test]
    fn display_always_has_two_decimals() {
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Quantity::from_units(6).to_string(), "6.00");
    }

    #[test]
    fn price_times_quantity() {
        let price = Money::parse("2.50").unwrap();
        assert_eq!(price.times(Quantity::from_units(6)).unwrap().cents(), 1500);
        // 0.33 * 1.50 = 0.495 -> 0.50
        let price = Money::parse("0.33").unwrap();
        let qty = Quantity::parse("1.5").unwrap();
        assert_eq!(price.times(qty).unwrap().cents(), 50);
    }

    #[test]
    fn quantity_subtraction_never_goes_negative() {
        let stock = Quantity::from_units(3);
        assert_eq!(
            stock.checked_sub(Quantity::from_units(3)),
            Some(Quantity::zero())
        );
        assert_eq!(stock.checked_sub(Quantity::from_units(4)), None);
    }

    #[test]
    fn serializes_as_decimal_string() {
        let json = serde_json::to_string(&Money::from_cents(1999)).unwrap();
        assert_eq!(json, "\"19.99\"");
        let qty: Quantity = serde_json::from_str("\"4.25\"").unwrap();
        assert_eq!(qty.hundredths(), 425);
        assert!(serde_json::from_str::<Money>("\"4.255\"").is_err());
    }
}
