use std::cmp::Ordering;
use std::fmt;

use prost_reflect::{Kind, Value};

use crate::error::SchemaError;
use crate::validator::lookups;

/// A numeric field value or option bound, tagged with its storage kind.
///
/// Comparisons widen safely: all integer kinds compare through `i128`, both
/// float kinds through `f64`. An integer compared against a float is a
/// [`SchemaError`] — the conversion can silently lose precision, so the
/// schema author must pick one numeric family per constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
}

impl Number {
    /// Extract a number from a live field value. `None` for non-numeric
    /// values.
    pub fn from_value(value: &Value) -> Option<Number> {
        match value {
            Value::I32(v) => Some(Number::Int(i64::from(*v))),
            Value::I64(v) => Some(Number::Int(*v)),
            Value::U32(v) => Some(Number::UInt(u64::from(*v))),
            Value::U64(v) => Some(Number::UInt(*v)),
            Value::F32(v) => Some(Number::Float(*v)),
            Value::F64(v) => Some(Number::Double(*v)),
            _ => None,
        }
    }

    /// Parse the decimal text of an option bound in the target field's kind.
    ///
    /// A bound that does not fit the kind (`3.5` on an `int32` field, `2^40`
    /// on an `int32` field) is a schema error.
    pub fn parse(text: &str, kind: &Kind) -> Result<Number, SchemaError> {
        let text = text.trim();
        match kind {
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => text
                .parse::<i32>()
                .map(|v| Number::Int(i64::from(v)))
                .map_err(|_| unparsable(text, kind)),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => text
                .parse::<i64>()
                .map(Number::Int)
                .map_err(|_| unparsable(text, kind)),
            Kind::Uint32 | Kind::Fixed32 => text
                .parse::<u32>()
                .map(|v| Number::UInt(u64::from(v)))
                .map_err(|_| unparsable(text, kind)),
            Kind::Uint64 | Kind::Fixed64 => text
                .parse::<u64>()
                .map(Number::UInt)
                .map_err(|_| unparsable(text, kind)),
            Kind::Float => text
                .parse::<f32>()
                .map(Number::Float)
                .map_err(|_| unparsable(text, kind)),
            Kind::Double => text
                .parse::<f64>()
                .map(Number::Double)
                .map_err(|_| unparsable(text, kind)),
            other => Err(SchemaError {
                cause: format!(
                    "numeric bounds do not apply to the {} kind",
                    lookups::kind_label(other)
                ),
            }),
        }
    }

    fn family(self) -> NumericFamily {
        match self {
            Number::Int(_) | Number::UInt(_) => NumericFamily::Integer,
            Number::Float(_) | Number::Double(_) => NumericFamily::Floating,
        }
    }

    fn as_i128(self) -> i128 {
        match self {
            Number::Int(v) => i128::from(v),
            Number::UInt(v) => i128::from(v),
            Number::Float(_) | Number::Double(_) => unreachable!("integer widening of a float"),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Float(v) => f64::from(v),
            Number::Double(v) => v,
            Number::Int(_) | Number::UInt(_) => unreachable!("float widening of an integer"),
        }
    }

    /// Compare two numbers after safe widening.
    ///
    /// `Ok(None)` when the comparison is undefined (a NaN operand).
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when the operands belong to different
    /// numeric families.
    pub fn partial_cmp(self, other: Number) -> Result<Option<Ordering>, SchemaError> {
        match (self.family(), other.family()) {
            (NumericFamily::Integer, NumericFamily::Integer) => {
                Ok(Some(self.as_i128().cmp(&other.as_i128())))
            }
            (NumericFamily::Floating, NumericFamily::Floating) => {
                Ok(self.as_f64().partial_cmp(&other.as_f64()))
            }
            _ => Err(SchemaError {
                cause: format!(
                    "cannot safely compare {self} with {other}: integer and floating-point \
                     values do not share a lossless widening"
                ),
            }),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum NumericFamily {
    Integer,
    Floating,
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            Number::UInt(v) => write!(f, "{v}"),
            Number::Float(v) => write!(f, "{v}"),
            Number::Double(v) => write!(f, "{v}"),
        }
    }
}

fn unparsable(text: &str, kind: &Kind) -> SchemaError {
    SchemaError {
        cause: format!(
            "the bound `{text}` cannot be parsed as {}",
            lookups::kind_label(kind)
        ),
    }
}

/// Count the whole and fraction decimal digits of a number's absolute value.
///
/// The decimal text representation is split on `.`; the substring lengths are
/// the digit counts. Integers report a zero-length fraction; a non-finite
/// float has no digits to count.
pub(crate) fn decimal_digits(number: Number) -> (usize, usize) {
    let text = match number {
        Number::Int(v) => v.unsigned_abs().to_string(),
        Number::UInt(v) => v.to_string(),
        Number::Float(v) if !v.is_finite() => String::from("0"),
        Number::Float(v) => v.abs().to_string(),
        Number::Double(v) if !v.is_finite() => String::from("0"),
        Number::Double(v) => v.abs().to_string(),
    };
    match text.split_once('.') {
        Some((whole, fraction)) => (whole.len(), fraction.len()),
        None => (text.len(), 0),
    }
}
