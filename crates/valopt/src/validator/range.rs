use std::cmp::Ordering;
use std::fmt;

use prost_reflect::Kind;

use crate::error::SchemaError;
use crate::validator::numeric::Number;

/// One edge of a numeric range.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Bound {
    pub value: Number,
    pub inclusive: bool,
}

/// A numeric interval with optional edges.
///
/// The `(valopt.range)` option spells both edges in interval notation,
/// `"<L><low>..<high><R>"` with `<L>` one of `[` `(` and `<R>` one of `]`
/// `)`; square brackets are closed (inclusive) edges, parentheses open
/// (exclusive) ones. The min/max option family produces single-edged
/// intervals through [`NumericRange::at_least`] and [`NumericRange::at_most`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct NumericRange {
    pub low: Option<Bound>,
    pub high: Option<Bound>,
}

impl NumericRange {
    pub fn at_least(bound: Bound) -> Self {
        Self {
            low: Some(bound),
            high: None,
        }
    }

    pub fn at_most(bound: Bound) -> Self {
        Self {
            low: None,
            high: Some(bound),
        }
    }

    /// Parse interval notation, with both bound texts read in the target
    /// field's numeric kind.
    ///
    /// # Errors
    ///
    /// Malformed syntax, bounds that do not parse in `kind`, and reversed
    /// bounds are schema errors.
    pub fn parse(text: &str, kind: &Kind) -> Result<Self, SchemaError> {
        let malformed = |detail: &str| SchemaError {
            cause: format!(
                "malformed range `{text}`: {detail}; expected the form `[low..high)` \
                 with `[`/`]` for closed and `(`/`)` for open edges"
            ),
        };

        let trimmed = text.trim();
        let mut chars = trimmed.chars();
        let low_inclusive = match chars.next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(malformed("missing opening `[` or `(`")),
        };
        let high_inclusive = match chars.next_back() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(malformed("missing closing `]` or `)`")),
        };

        let interior = chars.as_str();
        let Some((low_text, high_text)) = interior.split_once("..") else {
            return Err(malformed("missing the `..` separator"));
        };
        if low_text.is_empty() || high_text.is_empty() {
            return Err(malformed("both bounds must be present"));
        }

        let low = Number::parse(low_text, kind)?;
        let high = Number::parse(high_text, kind)?;
        match low.partial_cmp(high)? {
            Some(Ordering::Less | Ordering::Equal) => {}
            _ => {
                return Err(SchemaError {
                    cause: format!(
                        "reversed range `{text}`: the low bound must not exceed the high bound"
                    ),
                });
            }
        }

        Ok(Self {
            low: Some(Bound {
                value: low,
                inclusive: low_inclusive,
            }),
            high: Some(Bound {
                value: high,
                inclusive: high_inclusive,
            }),
        })
    }

    /// Whether a value lies within the interval.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when the value's numeric family does not
    /// match the bounds'.
    pub fn admits(&self, value: Number) -> Result<bool, SchemaError> {
        if let Some(low) = self.low {
            match value.partial_cmp(low.value)? {
                Some(Ordering::Greater) => {}
                Some(Ordering::Equal) if low.inclusive => {}
                _ => return Ok(false),
            }
        }
        if let Some(high) = self.high {
            match value.partial_cmp(high.value)? {
                Some(Ordering::Less) => {}
                Some(Ordering::Equal) if high.inclusive => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.low, self.high) {
            (Some(low), Some(high)) => write!(
                f,
                "{}{}..{}{}",
                if low.inclusive { '[' } else { '(' },
                low.value,
                high.value,
                if high.inclusive { ']' } else { ')' },
            ),
            (Some(low), None) => write!(
                f,
                "{} {}",
                if low.inclusive { ">=" } else { ">" },
                low.value
            ),
            (None, Some(high)) => write!(
                f,
                "{} {}",
                if high.inclusive { "<=" } else { "<" },
                high.value
            ),
            (None, None) => write!(f, "(..)"),
        }
    }
}
