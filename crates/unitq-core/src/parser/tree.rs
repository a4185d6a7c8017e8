//! Build values from parsed pairs

use pest::iterators::Pair;

use super::Rule;
use crate::error::{Error, Result};
use crate::types::{decimal_from_parts, Quantity, Unit};

pub(super) fn build_quantity(pair: Pair<'_, Rule>, input: &str) -> Result<Quantity> {
    let mut parts = None;
    let mut unit = Unit::One;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::decimal | Rule::non_finite => parts = Some(build_parts(inner)?),
            Rule::unit_expr => unit = build_unit_expr(inner)?,
            _ => {}
        }
    }

    let (coefficient, exponent) =
        parts.ok_or_else(|| Error::parse(input, "expected a decimal value"))?;
    Quantity::from_coefficient(coefficient, exponent, unit)
        .map_err(|e| Error::parse(input, e.to_string()))
}

/// Split a decimal literal into an integer coefficient and a base-10
/// exponent. Digits are never rounded away: a literal that does not fit
/// exactly is an error.
pub(super) fn build_parts(pair: Pair<'_, Rule>) -> Result<(i128, i32)> {
    let text = pair.as_str();
    match pair.as_rule() {
        Rule::non_finite => {
            tracing::debug!(text, "rejected non-finite decimal");
            Err(Error::NonFiniteValue(text.to_string()))
        }
        Rule::decimal => split_decimal(text),
        rule => Err(Error::parse(text, format!("unexpected rule: {rule:?}"))),
    }
}

fn split_decimal(text: &str) -> Result<(i128, i32)> {
    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let (digits, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((digits, exponent)) => {
            let exponent = exponent
                .parse::<i32>()
                .map_err(|e| Error::parse(text, format!("exponent: {e}")))?;
            (digits, exponent)
        }
        None => (unsigned, 0),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

    let mut coefficient: i128 = 0;
    for digit in whole.bytes().chain(fraction.bytes()) {
        coefficient = coefficient
            .checked_mul(10)
            .and_then(|c| c.checked_add(i128::from(digit - b'0')))
            .ok_or_else(|| Error::parse(text, "too many digits"))?;
    }
    if negative {
        coefficient = -coefficient;
    }

    let exponent = i32::try_from(fraction.len())
        .ok()
        .and_then(|len| exponent.checked_sub(len))
        .ok_or_else(|| Error::parse(text, "exponent out of range"))?;

    // Reject literals the decimal backend cannot hold without rounding
    decimal_from_parts(coefficient, exponent).map_err(|e| Error::parse(text, e.to_string()))?;
    Ok((coefficient, exponent))
}

/// `chain ["/" chain]`, kept exactly as written
pub(super) fn build_unit_expr(pair: Pair<'_, Rule>) -> Result<Unit> {
    let text = pair.as_str();
    let mut chains = pair.into_inner();
    let numerator = chains
        .next()
        .ok_or_else(|| Error::parse(text, "expected a unit"))
        .and_then(build_chain)?;

    match chains.next() {
        Some(denominator) => Ok(Unit::div(numerator, build_chain(denominator)?)),
        None => Ok(numerator),
    }
}

/// `a*b*c` becomes `a*(b*c)`
fn build_chain(pair: Pair<'_, Rule>) -> Result<Unit> {
    let text = pair.as_str();
    let factors = pair
        .into_inner()
        .map(build_factor)
        .collect::<Result<Vec<_>>>()?;

    factors
        .into_iter()
        .rev()
        .reduce(|acc, factor| Unit::mult(factor, acc))
        .ok_or_else(|| Error::parse(text, "empty product"))
}

fn build_factor(pair: Pair<'_, Rule>) -> Result<Unit> {
    match pair.as_rule() {
        Rule::one => Ok(Unit::One),
        Rule::symbol => Ok(Unit::atom(pair.as_str())),
        Rule::group => {
            let text = pair.as_str();
            let inner = pair
                .into_inner()
                .next()
                .ok_or_else(|| Error::parse(text, "empty group"))?;
            build_unit_expr(inner)
        }
        rule => Err(Error::parse(pair.as_str(), format!("unexpected rule: {rule:?}"))),
    }
}
