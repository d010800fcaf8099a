//! Literal value filters.
//!
//! A filter restricts which literals may appear in a position. Filters are
//! attached to query variables and forwarded to sources as object-position
//! constraints on bulk selects.

use std::cmp::Ordering;
use std::fmt;

use crate::types::Literal;

/// A predicate over literal values.
pub trait LiteralFilter: fmt::Debug + Send + Sync {
    /// Check if the literal passes the filter.
    fn matches(&self, literal: &Literal) -> bool;
}

/// Comparison operator used by the comparison filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl CompareOp {
    /// Check if `ordering` (value compared to the filter's operand) satisfies the operator.
    #[must_use]
    pub const fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Equal => matches!(ordering, Ordering::Equal),
            Self::NotEqual => !matches!(ordering, Ordering::Equal),
            Self::LessThan => matches!(ordering, Ordering::Less),
            Self::LessThanOrEqual => !matches!(ordering, Ordering::Greater),
            Self::GreaterThan => matches!(ordering, Ordering::Greater),
            Self::GreaterThanOrEqual => !matches!(ordering, Ordering::Less),
        }
    }
}

/// Lexical comparison of the literal value against a fixed string.
#[derive(Debug)]
pub struct StringCompareFilter {
    pattern: String,
    op: CompareOp,
}

impl StringCompareFilter {
    #[must_use]
    pub fn new(pattern: impl Into<String>, op: CompareOp) -> Self {
        Self {
            pattern: pattern.into(),
            op,
        }
    }
}

impl LiteralFilter for StringCompareFilter {
    fn matches(&self, literal: &Literal) -> bool {
        self.op.accepts(literal.value().cmp(self.pattern.as_str()))
    }
}

/// Substring test on the literal value.
#[derive(Debug)]
pub struct StringContainsFilter {
    pattern: String,
}

impl StringContainsFilter {
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl LiteralFilter for StringContainsFilter {
    fn matches(&self, literal: &Literal) -> bool {
        literal.value().contains(self.pattern.as_str())
    }
}

/// Numeric comparison of the literal value against a fixed number.
///
/// Literals whose value does not parse as a number never match.
#[derive(Debug)]
pub struct NumericCompareFilter {
    number: f64,
    op: CompareOp,
}

impl NumericCompareFilter {
    #[must_use]
    pub const fn new(number: f64, op: CompareOp) -> Self {
        Self { number, op }
    }
}

impl LiteralFilter for NumericCompareFilter {
    fn matches(&self, literal: &Literal) -> bool {
        let Ok(value) = literal.value().trim().parse::<f64>() else {
            return false;
        };
        value
            .partial_cmp(&self.number)
            .is_some_and(|ordering| self.op.accepts(ordering))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_op() {
        assert!(CompareOp::LessThanOrEqual.accepts(Ordering::Equal));
        assert!(CompareOp::LessThanOrEqual.accepts(Ordering::Less));
        assert!(!CompareOp::LessThan.accepts(Ordering::Equal));
        assert!(CompareOp::NotEqual.accepts(Ordering::Greater));
    }

    #[test]
    fn test_string_compare() {
        let filter = StringCompareFilter::new("m", CompareOp::LessThan);
        assert!(filter.matches(&Literal::new("alice")));
        assert!(!filter.matches(&Literal::new("zed")));
    }

    #[test]
    fn test_string_contains() {
        let filter = StringContainsFilter::new("@example.org");
        assert!(filter.matches(&Literal::new("bob@example.org")));
        assert!(!filter.matches(&Literal::new("bob@example.com")));
    }

    #[test]
    fn test_numeric_compare() {
        let filter = NumericCompareFilter::new(26.0, CompareOp::GreaterThan);
        assert!(filter.matches(&Literal::new("30")));
        assert!(filter.matches(&Literal::typed(
            "26.5",
            "http://www.w3.org/2001/XMLSchema#decimal"
        )));
        assert!(!filter.matches(&Literal::new("25")));
        assert!(!filter.matches(&Literal::new("not a number")));
        assert!(!filter.matches(&Literal::new("NaN")));
    }
}
