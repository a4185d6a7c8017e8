//! unitq-core: decimal quantities with symbolic units
//!
//! A [`Quantity`] pairs a [`rust_decimal::Decimal`] with a [`Unit`] built
//! from opaque symbols. Multiplication, division and inversion propagate
//! units algebraically and normalize the result, cancelling symbols that
//! appear on both sides of the fraction bar. Addition, subtraction and
//! comparison require identical units.
//!
//! # Example
//!
//! ```
//! use unitq_core::q;
//!
//! let distance = q("100 km");
//! let time = q("2 h");
//! let speed = distance.checked_div(&time).unwrap();
//! assert_eq!(speed.to_string(), "50 km/h");
//!
//! // Units cancel with multiplicity
//! let back = speed.checked_mul(&time).unwrap();
//! assert_eq!(back, q("100 km"));
//!
//! // Different units never add
//! assert!(q("1 apple").checked_add(&q("1 banana")).is_err());
//! ```

pub mod error;
pub mod parser;
pub mod types;

pub use error::{Error, Result};
pub use parser::{parse_decimal, parse_quantity, parse_unit};
pub use types::{Factors, Operand, Quantity, Unit};

/// Parse a quantity literal, panicking if it is malformed.
///
/// Meant for tests and constants; use [`parse_quantity`] for user input.
pub fn q(literal: &str) -> Quantity {
    parse_quantity(literal).unwrap_or_else(|e| panic!("invalid quantity literal: {e}"))
}
