//! Decimal values paired with a unit
//!
//! Every constructor normalizes the unit, so a [`Quantity`] handed to a
//! caller always carries a canonical unit and equality can compare units
//! structurally.
//!
//! The decimal exponent is tracked next to the value. `rust_decimal` only
//! stores non-negative scales, so `42E1` keeps exponent `1` here while its
//! `Decimal` holds `420`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::Unit;
use crate::error::{Error, Result};

/// Largest scale the decimal backend can hold
const MAX_SCALE: i32 = 28;

/// An immutable decimal value with a canonical unit
///
/// Equality and hashing are numeric: `42E1 m == 420 m`.
#[derive(Debug, Clone)]
pub struct Quantity {
    value: Decimal,
    /// `-value.scale()` when non-positive; otherwise `value` is a whole
    /// multiple of `10^exponent` with scale 0
    exponent: i32,
    unit: Unit,
}

/// Right-hand side of [`Quantity::checked_mul`] and [`Quantity::checked_div`]
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A bare number, treated as dimensionless
    Scalar(Decimal),
    Quantity(Quantity),
}

impl From<Decimal> for Operand {
    fn from(value: Decimal) -> Self {
        Operand::Scalar(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Scalar(Decimal::from(value))
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Scalar(Decimal::from(value))
    }
}

impl From<u32> for Operand {
    fn from(value: u32) -> Self {
        Operand::Scalar(Decimal::from(value))
    }
}

impl From<Quantity> for Operand {
    fn from(value: Quantity) -> Self {
        Operand::Quantity(value)
    }
}

impl From<&Quantity> for Operand {
    fn from(value: &Quantity) -> Self {
        Operand::Quantity(value.clone())
    }
}

impl Quantity {
    /// Create a quantity, normalizing the unit
    pub fn new(value: Decimal, unit: impl Into<Unit>) -> Self {
        Self {
            value,
            exponent: scale_exponent(value),
            unit: unit.into().normalize(),
        }
    }

    /// Dimensionless quantity
    pub fn dimensionless(value: Decimal) -> Self {
        Self::new(value, Unit::One)
    }

    /// `coefficient * 10^exponent` in `unit`
    pub fn from_parts(coefficient: i64, exponent: i32, unit: impl Into<Unit>) -> Result<Self> {
        Self::from_coefficient(i128::from(coefficient), exponent, unit)
    }

    pub(crate) fn from_coefficient(
        coefficient: i128,
        exponent: i32,
        unit: impl Into<Unit>,
    ) -> Result<Self> {
        let value = decimal_from_parts(coefficient, exponent)?;
        Ok(Self {
            value,
            exponent,
            unit: unit.into().normalize(),
        })
    }

    /// Create from a decimal literal, rejecting `inf` and `nan`
    pub fn try_new(value: &str, unit: impl Into<Unit>) -> Result<Self> {
        let (coefficient, exponent) = crate::parser::parse_parts(value)?;
        Self::from_coefficient(coefficient, exponent, unit)
    }

    /// Create from a float, rejecting infinities and NaN
    pub fn from_f64(value: f64, unit: impl Into<Unit>) -> Result<Self> {
        if !value.is_finite() {
            tracing::debug!(value, "rejected non-finite float");
            return Err(Error::NonFiniteValue(value.to_string()));
        }
        let value = Decimal::from_f64(value).ok_or(Error::Overflow)?;
        Ok(Self::new(value, unit))
    }

    /// Zero at the given decimal exponent, e.g. `zero(-2, DKK)` is `0.00 DKK`
    pub fn zero(exponent: i32, unit: impl Into<Unit>) -> Result<Self> {
        Self::from_coefficient(0, exponent, unit)
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Integer coefficient, so that `value = coefficient * 10^exponent`
    pub fn coefficient(&self) -> i128 {
        let mut coefficient = self.value.mantissa();
        for _ in 0..self.exponent.max(0) {
            if coefficient == 0 {
                break;
            }
            coefficient /= 10;
        }
        coefficient
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn into_parts(self) -> (Decimal, Unit) {
        (self.value, self.unit)
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.value > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.value < Decimal::ZERO
    }

    /// Zero with the same exponent and unit
    pub fn zeroed(&self) -> Self {
        let mut value = Decimal::ZERO;
        // Scale came from an existing decimal, so it is always valid
        let _ = value.set_scale(self.value.scale());
        Self {
            value,
            exponent: self.exponent,
            unit: self.unit.clone(),
        }
    }

    /// Sum of two quantities in the same unit
    pub fn checked_add(&self, other: &Quantity) -> Result<Quantity> {
        self.ensure_same_unit(other)?;
        let value = self
            .value
            .checked_add(other.value)
            .ok_or(Error::Overflow)?;
        Ok(self.with_value(value, self.exponent.min(other.exponent)))
    }

    /// Difference of two quantities in the same unit
    pub fn checked_sub(&self, other: &Quantity) -> Result<Quantity> {
        self.ensure_same_unit(other)?;
        let value = self
            .value
            .checked_sub(other.value)
            .ok_or(Error::Overflow)?;
        Ok(self.with_value(value, self.exponent.min(other.exponent)))
    }

    /// Left fold of [`Quantity::checked_add`]; fails on an empty input
    pub fn checked_sum<I>(quantities: I) -> Result<Quantity>
    where
        I: IntoIterator<Item = Quantity>,
    {
        let mut iter = quantities.into_iter();
        let first = iter.next().ok_or(Error::EmptyInput)?;
        iter.try_fold(first, |acc, q| acc.checked_add(&q))
    }

    /// Like [`Quantity::checked_sum`], but an empty input gives zero at
    /// `exponent` in `unit`
    pub fn sum_or<I>(quantities: I, exponent: i32, unit: impl Into<Unit>) -> Result<Quantity>
    where
        I: IntoIterator<Item = Quantity>,
    {
        match Self::checked_sum(quantities) {
            Err(Error::EmptyInput) => Self::zero(exponent, unit),
            other => other,
        }
    }

    /// Product; the unit is normalized
    pub fn checked_mul(&self, other: impl Into<Operand>) -> Result<Quantity> {
        match other.into() {
            Operand::Scalar(n) => {
                let value = self.value.checked_mul(n).ok_or(Error::Overflow)?;
                Ok(self.with_value(value, self.exponent + scale_exponent(n)))
            }
            Operand::Quantity(other) => {
                let value = self
                    .value
                    .checked_mul(other.value)
                    .ok_or(Error::Overflow)?;
                Ok(Quantity {
                    value,
                    exponent: settle_exponent(value, self.exponent + other.exponent),
                    unit: self.unit.times(&other.unit),
                })
            }
        }
    }

    /// Quotient; the unit is normalized. Dividing by a scalar keeps the unit.
    pub fn checked_div(&self, other: impl Into<Operand>) -> Result<Quantity> {
        match other.into() {
            Operand::Scalar(n) => {
                let value = divide(self.value, n)?;
                Ok(self.with_value(value, scale_exponent(value)))
            }
            Operand::Quantity(other) => {
                let value = divide(self.value, other.value)?;
                Ok(Quantity {
                    value,
                    exponent: scale_exponent(value),
                    unit: self.unit.per(&other.unit),
                })
            }
        }
    }

    /// `1 / self`
    pub fn inverse(&self) -> Result<Quantity> {
        Quantity::dimensionless(Decimal::ONE).checked_div(self)
    }

    /// Round half up to exactly `places` fractional digits
    pub fn round(&self, places: u32) -> Quantity {
        let mut value = self
            .value
            .round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(places.min(MAX_SCALE as u32));
        self.with_value(value, scale_exponent(value))
    }

    pub fn abs(&self) -> Quantity {
        self.with_value(self.value.abs(), self.exponent)
    }

    /// Order by value; only defined for identical units
    pub fn compare(&self, other: &Quantity) -> Result<Ordering> {
        self.ensure_same_unit(other)?;
        Ok(self.value.cmp(&other.value))
    }

    /// Relabel with a new atomic unit, keeping the coefficient and shifting
    /// the decimal exponent: `1500 kWh` with shift `-3` is `1.500 MWh`.
    ///
    /// `symbol` must be a single unit symbol; `km/h` or `a*b` are rejected.
    pub fn convert_unit(&self, symbol: &str, exponent_shift: i32) -> Result<Quantity> {
        let unit = Unit::try_atom(symbol)?;
        let exponent = self
            .exponent
            .checked_add(exponent_shift)
            .ok_or(Error::ExponentOutOfRange(i32::MAX))?;
        Self::from_coefficient(self.coefficient(), exponent, unit)
    }

    fn with_value(&self, value: Decimal, preferred_exponent: i32) -> Quantity {
        Quantity {
            value,
            exponent: settle_exponent(value, preferred_exponent),
            unit: self.unit.clone(),
        }
    }

    fn ensure_same_unit(&self, other: &Quantity) -> Result<()> {
        if self.unit == other.unit {
            Ok(())
        } else {
            tracing::debug!(left = %self.unit, right = %other.unit, "unit mismatch");
            Err(Error::UnitMismatch {
                left: self.unit.clone(),
                right: other.unit.clone(),
            })
        }
    }
}

fn scale_exponent(value: Decimal) -> i32 {
    -(value.scale() as i32)
}

/// Keep a positive exponent only while the value is a whole multiple of it
fn settle_exponent(value: Decimal, preferred: i32) -> i32 {
    if preferred <= 0 || value.scale() != 0 {
        return scale_exponent(value);
    }
    let mut mantissa = value.mantissa();
    for _ in 0..preferred {
        if mantissa == 0 {
            break;
        }
        if mantissa % 10 != 0 {
            return 0;
        }
        mantissa /= 10;
    }
    preferred
}

fn divide(numerator: Decimal, denominator: Decimal) -> Result<Decimal> {
    if denominator.is_zero() {
        tracing::debug!(%numerator, "division by zero");
        return Err(Error::DivisionByZero);
    }
    numerator.checked_div(denominator).ok_or(Error::Overflow)
}

/// Build `coefficient * 10^exponent`. Non-positive exponents become the
/// scale; positive ones are multiplied into the coefficient.
pub(crate) fn decimal_from_parts(coefficient: i128, exponent: i32) -> Result<Decimal> {
    if exponent <= 0 {
        if exponent < -MAX_SCALE {
            return Err(Error::ExponentOutOfRange(exponent));
        }
        return Decimal::try_from_i128_with_scale(coefficient, exponent.unsigned_abs())
            .map_err(|_| Error::Overflow);
    }

    let mut value =
        Decimal::try_from_i128_with_scale(coefficient, 0).map_err(|_| Error::Overflow)?;
    for _ in 0..exponent {
        if value.is_zero() {
            break;
        }
        value = value.checked_mul(Decimal::TEN).ok_or(Error::Overflow)?;
    }
    Ok(value)
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.unit == other.unit
    }
}

impl Eq for Quantity {}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
        self.unit.hash(state);
    }
}

impl PartialOrd for Quantity {
    /// `None` when the units differ
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other).ok()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exponent > 0 {
            write!(f, "{}E{}", self.coefficient(), self.exponent)?;
        } else {
            write!(f, "{}", self.value)?;
        }
        if !self.unit.is_one() {
            write!(f, " {}", self.unit)?;
        }
        Ok(())
    }
}

impl FromStr for Quantity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        crate::parser::parse_quantity(s)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Panics on a unit mismatch; use [`Quantity::checked_add`] otherwise
impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        self.checked_add(&rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

/// Panics on a unit mismatch; use [`Quantity::checked_sub`] otherwise
impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Quantity {
        self.checked_sub(&rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

/// Panics on overflow
impl<T: Into<Operand>> Mul<T> for Quantity {
    type Output = Quantity;

    fn mul(self, rhs: T) -> Quantity {
        self.checked_mul(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

/// Panics on division by zero or overflow
impl<T: Into<Operand>> Div<T> for Quantity {
    type Output = Quantity;

    fn div(self, rhs: T) -> Quantity {
        self.checked_div(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Quantity {
        Quantity {
            value: -self.value,
            exponent: self.exponent,
            unit: self.unit,
        }
    }
}

/// Panics on an empty iterator or a unit mismatch; use
/// [`Quantity::checked_sum`] or [`Quantity::sum_or`] otherwise
impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Quantity {
        Quantity::checked_sum(iter).unwrap_or_else(|e| panic!("{e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_exponent_and_coefficient() {
        let q = Quantity::new(dec("4.20"), Unit::atom("m"));
        assert_eq!(q.coefficient(), 420);
        assert_eq!(q.exponent(), -2);
    }

    #[test]
    fn test_from_parts_positive_exponent() {
        let q = Quantity::from_parts(42, 1, Unit::atom("m")).unwrap();
        assert_eq!(q.value(), Decimal::from(420));
        assert_eq!(q.coefficient(), 42);
        assert_eq!(q.exponent(), 1);
        assert_eq!(q.to_string(), "42E1 m");
    }

    #[test]
    fn test_positive_exponent_survives_add_and_mul() {
        let a = Quantity::from_parts(42, 1, Unit::atom("m")).unwrap();
        let b = Quantity::from_parts(3, 2, Unit::atom("m")).unwrap();
        assert_eq!(a.checked_add(&b).unwrap().to_string(), "72E1 m");
        assert_eq!(a.checked_mul(&b).unwrap().to_string(), "126E3 m*m");
        assert_eq!((-a.clone()).to_string(), "-42E1 m");
        assert_eq!(a.zeroed().to_string(), "0E1 m");
    }

    #[test]
    fn test_equality_ignores_exponent() {
        let a = Quantity::from_parts(42, 1, Unit::atom("m")).unwrap();
        let b = Quantity::from_parts(420, 0, Unit::atom("m")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_parts_exponent_out_of_range() {
        let err = Quantity::from_parts(1, -29, Unit::One).unwrap_err();
        assert_eq!(err, Error::ExponentOutOfRange(-29));
    }

    #[test]
    fn test_zero_keeps_exponent() {
        let q = Quantity::zero(-2, Unit::atom("DKK")).unwrap();
        assert_eq!(q.to_string(), "0.00 DKK");
        assert_eq!(q.exponent(), -2);
    }

    #[test]
    fn test_zeroed() {
        let q = Quantity::new(dec("12.345"), Unit::atom("kg"));
        assert_eq!(q.zeroed().to_string(), "0.000 kg");
    }

    #[test]
    fn test_from_f64_rejects_non_finite() {
        for v in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let err = Quantity::from_f64(v, Unit::One).unwrap_err();
            assert!(matches!(err, Error::NonFiniteValue(_)));
        }
        assert!(Quantity::from_f64(1.5, Unit::One).is_ok());
    }

    #[test]
    fn test_new_normalizes() {
        let unit = Unit::div(Unit::mult(Unit::atom("m"), Unit::atom("s")), Unit::atom("s"));
        let q = Quantity::new(Decimal::ONE, unit);
        assert_eq!(q.unit(), &Unit::atom("m"));
    }

    #[test]
    fn test_scalar_division_keeps_unit() {
        let q = Quantity::new(Decimal::from(10), Unit::div(Unit::atom("km"), Unit::atom("h")));
        let half = q.checked_div(4).unwrap();
        assert_eq!(half.to_string(), "2.5 km/h");
    }

    #[test]
    fn test_division_by_zero() {
        let q = Quantity::new(Decimal::ONE, Unit::atom("m"));
        assert_eq!(q.checked_div(0), Err(Error::DivisionByZero));
        assert_eq!(q.zeroed().inverse(), Err(Error::DivisionByZero));
    }

    #[test]
    fn test_round_half_up() {
        let q = Quantity::new(dec("2.345"), Unit::atom("m"));
        assert_eq!(q.round(2).value(), dec("2.35"));
        let q = Quantity::new(dec("-2.345"), Unit::atom("m"));
        assert_eq!(q.round(2).value(), dec("-2.35"));
    }

    #[test]
    fn test_round_pads_to_places() {
        let q = Quantity::new(Decimal::ONE, Unit::atom("m"));
        assert_eq!(q.round(2).to_string(), "1.00 m");
        assert_eq!(q.round(2).exponent(), -2);
        let q = Quantity::from_parts(42, 1, Unit::atom("m")).unwrap();
        assert_eq!(q.round(1).to_string(), "420.0 m");
    }

    #[test]
    fn test_partial_cmp_mismatch_is_none() {
        let a = Quantity::new(Decimal::ONE, Unit::atom("apple"));
        let b = Quantity::new(Decimal::ONE, Unit::atom("banana"));
        assert_eq!(a.partial_cmp(&b), None);
        assert!(a.compare(&b).unwrap_err().is_unit_mismatch());
    }

    #[test]
    fn test_convert_unit_shifts_exponent() {
        let q = Quantity::new(Decimal::from(1500), Unit::atom("kWh"));
        let converted = q.convert_unit("MWh", -3).unwrap();
        assert_eq!(converted.to_string(), "1.500 MWh");
        assert_eq!(converted.coefficient(), 1500);

        let back = converted.convert_unit("kWh", 3).unwrap();
        assert_eq!(back, q);
        assert_eq!(q.convert_unit("GWh", 3).unwrap().to_string(), "1500E3 GWh");
    }

    #[test]
    fn test_convert_unit_rejects_composite_symbols() {
        let q = Quantity::new(Decimal::from(12), Unit::atom("kph"));
        for symbol in ["km/h", "a*b", "(", "k m", "", "1"] {
            let err = q.convert_unit(symbol, 0).unwrap_err();
            assert!(matches!(err, Error::Parse { .. }), "{symbol}: {err}");
        }
    }
}
