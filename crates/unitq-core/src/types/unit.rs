//! Symbolic units and the unit algebra
//!
//! A [`Unit`] is a tree of atomic symbols joined by multiplication and
//! division. Arithmetic on quantities builds raw trees such as
//! `(km/h)/(km/h*h)`; [`Unit::normalize`] reduces them to a canonical
//! form by treating units as a free abelian group over their symbols:
//! every atom is counted in the numerator or the denominator, matching
//! occurrences cancel, and what remains is sorted and folded back.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A unit expression
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Unit {
    /// The dimensionless unit, rendered as `1`
    #[default]
    One,
    /// An opaque, non-empty unit symbol (`"m"`, `"banana"`, `"$"`)
    Atom(String),
    /// Product of two sub-expressions
    Mult(Box<Unit>, Box<Unit>),
    /// Quotient: numerator, denominator
    Div(Box<Unit>, Box<Unit>),
}

impl Unit {
    /// An atomic unit. An empty symbol or the literal `"1"` is the
    /// dimensionless unit. The symbol is not checked; see [`Unit::try_atom`].
    pub fn atom(symbol: impl Into<String>) -> Unit {
        let symbol = symbol.into();
        if symbol.is_empty() || symbol == "1" {
            Unit::One
        } else {
            Unit::Atom(symbol)
        }
    }

    /// An atomic unit whose symbol must parse back as a single atom, so
    /// `km/h`, `a*b` or `1` are rejected
    pub fn try_atom(symbol: &str) -> Result<Unit, Error> {
        match crate::parser::parse_unit(symbol)? {
            atom @ Unit::Atom(_) => Ok(atom),
            _ => Err(Error::parse(symbol, "expected a single unit symbol")),
        }
    }

    /// Raw product, not normalized
    pub fn mult(left: Unit, right: Unit) -> Unit {
        Unit::Mult(Box::new(left), Box::new(right))
    }

    /// Raw quotient, not normalized
    pub fn div(numerator: Unit, denominator: Unit) -> Unit {
        Unit::Div(Box::new(numerator), Box::new(denominator))
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Unit::One)
    }

    /// Flatten into numerator/denominator multisets
    pub fn isolate(&self) -> Factors {
        let mut factors = Factors::default();
        factors.collect(self, false);
        factors
    }

    /// Reduce to canonical form
    pub fn normalize(&self) -> Unit {
        let normalized = self.isolate().rebuild();
        tracing::trace!(input = %self, output = %normalized, "normalized unit");
        normalized
    }

    /// Canonical `1/self`
    pub fn inverse(&self) -> Unit {
        Unit::div(Unit::One, self.clone()).normalize()
    }

    /// Canonical `self * other`
    pub fn times(&self, other: &Unit) -> Unit {
        Unit::mult(self.clone(), other.clone()).normalize()
    }

    /// Canonical `self / other`
    pub fn per(&self, other: &Unit) -> Unit {
        Unit::div(self.clone(), other.clone()).normalize()
    }

    /// Whether the tree already has the shape [`Unit::normalize`] produces
    pub fn is_canonical(&self) -> bool {
        *self == self.normalize()
    }

    /// Equivalent under the unit algebra, regardless of tree shape
    pub fn equivalent(&self, other: &Unit) -> bool {
        self.normalize() == other.normalize()
    }
}

/// Atomic factors of a unit, counted per symbol on each side of the
/// fraction bar. Symbols are kept sorted by the map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Factors {
    pub numerator: BTreeMap<String, usize>,
    pub denominator: BTreeMap<String, usize>,
}

impl Factors {
    fn collect(&mut self, unit: &Unit, flipped: bool) {
        match unit {
            Unit::One => {}
            Unit::Atom(symbol) => {
                let side = if flipped {
                    &mut self.denominator
                } else {
                    &mut self.numerator
                };
                *side.entry(symbol.clone()).or_insert(0) += 1;
            }
            Unit::Mult(left, right) => {
                self.collect(left, flipped);
                self.collect(right, flipped);
            }
            // A denominator of a denominator lands back in the numerator
            Unit::Div(numerator, denominator) => {
                self.collect(numerator, flipped);
                self.collect(denominator, !flipped);
            }
        }
    }

    /// Remove matching occurrences from both sides, keeping the surplus
    pub fn cancel(mut self) -> Factors {
        for (symbol, den_count) in self.denominator.iter_mut() {
            if let Some(num_count) = self.numerator.get_mut(symbol) {
                let common = (*num_count).min(*den_count);
                *num_count -= common;
                *den_count -= common;
            }
        }
        self.numerator.retain(|_, count| *count > 0);
        self.denominator.retain(|_, count| *count > 0);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.numerator.is_empty() && self.denominator.is_empty()
    }

    /// Cancel, then fold back into a canonical tree
    pub fn rebuild(self) -> Unit {
        let Factors {
            numerator,
            denominator,
        } = self.cancel();

        match (fold(numerator), fold(denominator)) {
            (None, None) => Unit::One,
            (Some(numerator), None) => numerator,
            (None, Some(denominator)) => Unit::div(Unit::One, denominator),
            (Some(numerator), Some(denominator)) => Unit::div(numerator, denominator),
        }
    }
}

/// Right-associated product of the sorted, repeated factors
fn fold(counts: BTreeMap<String, usize>) -> Option<Unit> {
    let factors: Vec<Unit> = counts
        .into_iter()
        .flat_map(|(symbol, count)| std::iter::repeat(symbol).take(count))
        .map(Unit::Atom)
        .collect();

    factors
        .into_iter()
        .rev()
        .reduce(|acc, factor| Unit::mult(factor, acc))
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::One => write!(f, "1"),
            Unit::Atom(symbol) => write!(f, "{symbol}"),
            // Products parse right-nested, so a product on the left is grouped
            Unit::Mult(left, right) => {
                write_grouped(f, left, matches!(**left, Unit::Div(..) | Unit::Mult(..)))?;
                write!(f, "*")?;
                write_grouped(f, right, matches!(**right, Unit::Div(..)))
            }
            // The grammar reads everything after `/` as one product, so
            // only a nested quotient needs parentheses.
            Unit::Div(numerator, denominator) => {
                write_grouped(f, numerator, matches!(**numerator, Unit::Div(..)))?;
                write!(f, "/")?;
                write_grouped(f, denominator, matches!(**denominator, Unit::Div(..)))
            }
        }
    }
}

fn write_grouped(f: &mut fmt::Formatter<'_>, unit: &Unit, grouped: bool) -> fmt::Result {
    if grouped {
        write!(f, "({unit})")
    } else {
        write!(f, "{unit}")
    }
}

impl FromStr for Unit {
    type Err = Error;

    /// Parse a unit expression as written, without normalizing it
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parser::parse_unit(s)
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<Unit>()
            .map(|unit| unit.normalize())
            .map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(s: &str) -> Unit {
        Unit::atom(s)
    }

    #[test]
    fn test_isolate_flips_nested_denominators() {
        // a / (b / c) == a*c / b
        let unit = Unit::div(atom("a"), Unit::div(atom("b"), atom("c")));
        let factors = unit.isolate();
        assert_eq!(factors.numerator.get("a"), Some(&1));
        assert_eq!(factors.numerator.get("c"), Some(&1));
        assert_eq!(factors.denominator.get("b"), Some(&1));
        assert_eq!(factors.denominator.len(), 1);
    }

    #[test]
    fn test_isolate_ignores_dimensionless() {
        let unit = Unit::mult(Unit::One, Unit::div(Unit::One, Unit::One));
        assert!(unit.isolate().is_empty());
    }

    #[test]
    fn test_cancel_is_multiplicity_aware() {
        let unit = Unit::div(Unit::mult(atom("banana"), atom("banana")), atom("banana"));
        assert_eq!(unit.normalize(), atom("banana"));
    }

    #[test]
    fn test_full_cancellation_is_dimensionless() {
        let unit = Unit::mult(atom("s"), Unit::div(Unit::One, atom("s")));
        assert_eq!(unit.normalize(), Unit::One);
    }

    #[test]
    fn test_empty_numerator_keeps_one() {
        let unit = Unit::div(atom("s"), Unit::mult(atom("s"), atom("banana")));
        assert_eq!(unit.normalize(), Unit::div(Unit::One, atom("banana")));
        assert_eq!(unit.normalize().to_string(), "1/banana");
    }

    #[test]
    fn test_rebuild_sorts_and_right_folds() {
        let unit = Unit::mult(Unit::mult(atom("c"), atom("a")), atom("b"));
        let expected = Unit::mult(atom("a"), Unit::mult(atom("b"), atom("c")));
        assert_eq!(unit.normalize(), expected);
    }

    #[test]
    fn test_inverse_of_inverse() {
        let unit = Unit::div(atom("km"), atom("h"));
        assert_eq!(unit.inverse().to_string(), "h/km");
        assert_eq!(unit.inverse().inverse(), unit);
    }

    #[test]
    fn test_display_groups_nested_quotients() {
        let unit = Unit::mult(Unit::div(atom("a"), atom("b")), atom("c"));
        assert_eq!(unit.to_string(), "(a/b)*c");
        let unit = Unit::div(atom("a"), Unit::div(atom("b"), atom("c")));
        assert_eq!(unit.to_string(), "a/(b/c)");
    }

    #[test]
    fn test_display_groups_left_nested_products() {
        let unit = Unit::mult(Unit::mult(atom("a"), atom("b")), atom("c"));
        assert_eq!(unit.to_string(), "(a*b)*c");
        assert_eq!(unit.to_string().parse::<Unit>().unwrap(), unit);

        let right = Unit::mult(atom("a"), Unit::mult(atom("b"), atom("c")));
        assert_eq!(right.to_string(), "a*b*c");
        let per = Unit::div(atom("x"), unit);
        assert_eq!(per.to_string().parse::<Unit>().unwrap(), per);
    }

    #[test]
    fn test_try_atom() {
        assert_eq!(Unit::try_atom("MWh").unwrap(), atom("MWh"));
        for symbol in ["km/h", "a*b", "1", "", "k m"] {
            assert!(Unit::try_atom(symbol).is_err(), "{symbol}");
        }
    }

    #[test]
    fn test_atom_literal_one() {
        assert_eq!(Unit::atom("1"), Unit::One);
        assert_eq!(Unit::atom(""), Unit::One);
    }

    #[test]
    fn test_equivalent_ignores_shape() {
        let a = Unit::div(Unit::mult(atom("m"), atom("s")), atom("s"));
        assert!(a.equivalent(&atom("m")));
        assert!(!a.is_canonical());
        assert!(atom("m").is_canonical());
    }
}
