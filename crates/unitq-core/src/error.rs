//! Error type shared by the parser and quantity arithmetic

use thiserror::Error;

use crate::types::Unit;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed textual input
    #[error("cannot parse '{input}': {message}")]
    Parse { input: String, message: String },

    /// Add, subtract, sum or compare across different units
    #[error("unit mismatch: '{left}' vs '{right}'")]
    UnitMismatch { left: Unit, right: Unit },

    #[error("cannot sum an empty list without a fallback")]
    EmptyInput,

    /// Infinity or NaN used where a finite decimal is required
    #[error("non-finite value '{0}' has no quantity interpretation")]
    NonFiniteValue(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("numeric overflow")]
    Overflow,

    #[error("decimal exponent {0} is out of range")]
    ExponentOutOfRange(i32),
}

impl Error {
    pub(crate) fn parse(input: &str, message: impl Into<String>) -> Self {
        Error::Parse {
            input: input.to_string(),
            message: message.into(),
        }
    }

    /// True for the mismatch produced by add/sub/sum/compare
    pub fn is_unit_mismatch(&self) -> bool {
        matches!(self, Error::UnitMismatch { .. })
    }
}
