//! Quantity operations exposed on the command line
//!
//! Each [`Operation`] maps to one arithmetic entrypoint of `unitq-core`.
//! Lines in file/pipe mode use the same names: `<op> <arg> | <arg> ...`.

use std::cmp::Ordering;

use anyhow::{anyhow, bail, Context, Result};
use clap::Subcommand;
use serde::Serialize;
use unitq_core::{Quantity, Unit};

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Operation {
    /// Reduce a unit expression to canonical form
    Normalize { unit: Unit },
    /// Multiply two quantities
    Mul {
        #[arg(allow_hyphen_values = true)]
        left: Quantity,
        #[arg(allow_hyphen_values = true)]
        right: Quantity,
    },
    /// Divide two quantities
    Div {
        #[arg(allow_hyphen_values = true)]
        left: Quantity,
        #[arg(allow_hyphen_values = true)]
        right: Quantity,
    },
    /// Add two quantities in the same unit
    Add {
        #[arg(allow_hyphen_values = true)]
        left: Quantity,
        #[arg(allow_hyphen_values = true)]
        right: Quantity,
    },
    /// Subtract two quantities in the same unit
    Sub {
        #[arg(allow_hyphen_values = true)]
        left: Quantity,
        #[arg(allow_hyphen_values = true)]
        right: Quantity,
    },
    /// Sum quantities in the same unit
    Sum {
        #[arg(allow_hyphen_values = true)]
        quantities: Vec<Quantity>,
        /// Exponent of the zero returned for an empty list
        #[arg(long, requires = "unit", allow_hyphen_values = true)]
        exponent: Option<i32>,
        /// Unit of the zero returned for an empty list
        #[arg(long)]
        unit: Option<Unit>,
    },
    /// Invert a quantity
    Inverse {
        #[arg(allow_hyphen_values = true)]
        quantity: Quantity,
    },
    /// Round half up to a number of fractional digits
    Round {
        #[arg(allow_hyphen_values = true)]
        quantity: Quantity,
        places: u32,
    },
    /// Absolute value
    Abs {
        #[arg(allow_hyphen_values = true)]
        quantity: Quantity,
    },
    /// Compare two quantities in the same unit
    Compare {
        #[arg(allow_hyphen_values = true)]
        left: Quantity,
        #[arg(allow_hyphen_values = true)]
        right: Quantity,
    },
    /// Relabel with a new unit symbol, shifting the decimal exponent
    Convert {
        #[arg(allow_hyphen_values = true)]
        quantity: Quantity,
        symbol: String,
        #[arg(allow_hyphen_values = true)]
        shift: i32,
    },
}

/// Result of an operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outcome {
    Quantity { value: Quantity },
    Unit { value: Unit },
    Ordering { value: &'static str },
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Quantity { value } => write!(f, "{value}"),
            Outcome::Unit { value } => write!(f, "{value}"),
            Outcome::Ordering { value } => write!(f, "{value}"),
        }
    }
}

pub fn run(op: Operation) -> Result<Outcome> {
    tracing::debug!(?op, "running operation");
    let quantity = |q: unitq_core::Result<Quantity>| -> Result<Outcome> {
        Ok(Outcome::Quantity { value: q? })
    };

    match op {
        Operation::Normalize { unit } => Ok(Outcome::Unit {
            value: unit.normalize(),
        }),
        Operation::Mul { left, right } => quantity(left.checked_mul(&right)),
        Operation::Div { left, right } => quantity(left.checked_div(&right)),
        Operation::Add { left, right } => quantity(left.checked_add(&right)),
        Operation::Sub { left, right } => quantity(left.checked_sub(&right)),
        Operation::Sum {
            quantities,
            exponent,
            unit,
        } => match (exponent, unit) {
            (Some(exponent), Some(unit)) => quantity(Quantity::sum_or(quantities, exponent, unit)),
            (None, Some(unit)) => quantity(Quantity::sum_or(quantities, 0, unit)),
            _ => quantity(Quantity::checked_sum(quantities)),
        },
        Operation::Inverse { quantity: q } => quantity(q.inverse()),
        Operation::Round { quantity: q, places } => quantity(Ok(q.round(places))),
        Operation::Abs { quantity: q } => quantity(Ok(q.abs())),
        Operation::Compare { left, right } => {
            let value = match left.compare(&right)? {
                Ordering::Less => "less",
                Ordering::Equal => "equal",
                Ordering::Greater => "greater",
            };
            Ok(Outcome::Ordering { value })
        }
        Operation::Convert {
            quantity: q,
            symbol,
            shift,
        } => quantity(q.convert_unit(&symbol, shift)),
    }
}

/// Parse a file/pipe line such as `mul 12 s | 3 1/s`.
///
/// Returns `None` for blank lines and `#` comments.
pub fn parse_line(line: &str) -> Result<Option<Operation>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let args: Vec<&str> = if rest.trim().is_empty() {
        Vec::new()
    } else {
        rest.split('|').map(str::trim).collect()
    };

    let text = |i: usize| arg(&args, name, i);
    let quantity = |i: usize| -> Result<Quantity> {
        text(i)?
            .parse::<Quantity>()
            .with_context(|| format!("argument {} of '{name}'", i + 1))
    };

    let op = match name.to_lowercase().as_str() {
        "normalize" => Operation::Normalize {
            unit: text(0)?.parse::<Unit>().context("unit of 'normalize'")?,
        },
        "mul" => Operation::Mul {
            left: quantity(0)?,
            right: quantity(1)?,
        },
        "div" => Operation::Div {
            left: quantity(0)?,
            right: quantity(1)?,
        },
        "add" => Operation::Add {
            left: quantity(0)?,
            right: quantity(1)?,
        },
        "sub" => Operation::Sub {
            left: quantity(0)?,
            right: quantity(1)?,
        },
        "sum" => Operation::Sum {
            quantities: (0..args.len()).map(&quantity).collect::<Result<_>>()?,
            exponent: None,
            unit: None,
        },
        "inverse" => Operation::Inverse {
            quantity: quantity(0)?,
        },
        "round" => Operation::Round {
            quantity: quantity(0)?,
            places: text(1)?.parse::<u32>().context("places of 'round'")?,
        },
        "abs" => Operation::Abs {
            quantity: quantity(0)?,
        },
        "compare" => Operation::Compare {
            left: quantity(0)?,
            right: quantity(1)?,
        },
        "convert" => Operation::Convert {
            quantity: quantity(0)?,
            symbol: text(1)?.to_string(),
            shift: text(2)?.parse::<i32>().context("shift of 'convert'")?,
        },
        other => bail!("unknown operation '{other}'"),
    };

    Ok(Some(op))
}

fn arg<'a>(args: &[&'a str], name: &str, i: usize) -> Result<&'a str> {
    args.get(i)
        .copied()
        .ok_or_else(|| anyhow!("'{name}' expects an argument at position {}", i + 1))
}
