//! Quantity and unit parser using pest

mod tree;

use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::types::{decimal_from_parts, Quantity, Unit};

#[derive(Parser)]
#[grammar = "parser/grammar.pest"]
pub struct QuantityParser;

/// Parse `"<decimal> [unit]"`. The unit is normalized.
pub fn parse_quantity(input: &str) -> Result<Quantity> {
    let input = input.trim();
    let pair = parse_rule(Rule::quantity, input)?;
    tree::build_quantity(pair, input)
}

/// Parse a unit expression without normalizing it
pub fn parse_unit(input: &str) -> Result<Unit> {
    let input = input.trim();
    let pair = parse_rule(Rule::unit, input)?;
    let expr = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::unit_expr)
        .ok_or_else(|| Error::parse(input, "expected a unit"))?;
    tree::build_unit_expr(expr)
}

/// Parse a decimal literal, rejecting `inf` and `nan`
pub fn parse_decimal(input: &str) -> Result<Decimal> {
    let (coefficient, exponent) = parse_parts(input)?;
    decimal_from_parts(coefficient, exponent)
}

/// Parse a decimal literal into `(coefficient, exponent)`, so that
/// `42E1` keeps its exponent
pub(crate) fn parse_parts(input: &str) -> Result<(i128, i32)> {
    let input = input.trim();
    let pair = parse_rule(Rule::decimal_literal, input)?;
    let value = pair
        .into_inner()
        .find(|p| matches!(p.as_rule(), Rule::decimal | Rule::non_finite))
        .ok_or_else(|| Error::parse(input, "expected a decimal value"))?;
    tree::build_parts(value)
}

fn parse_rule(rule: Rule, input: &str) -> Result<Pair<'_, Rule>> {
    let mut pairs = QuantityParser::parse(rule, input).map_err(|e| {
        let col = match e.line_col {
            LineColLocation::Pos((_, col)) | LineColLocation::Span((_, col), _) => col,
        };
        Error::parse(input, format!("at column {col}: {}", e.variant.message()))
    })?;
    pairs
        .next()
        .ok_or_else(|| Error::parse(input, "empty input"))
}
