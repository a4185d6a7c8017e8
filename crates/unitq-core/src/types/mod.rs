//! Value types for unitq calculations

mod quantity;
pub mod unit;

pub use quantity::{Operand, Quantity};
pub(crate) use quantity::decimal_from_parts;
pub use unit::{Factors, Unit};
