use std::fmt;

use crate::violation::Violation;

/// Top-level error type returned by validation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// One or more validation constraints were violated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A constraint could not be assembled from the schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Returned when one or more validation constraints are violated.
#[derive(Debug)]
pub struct ValidationError {
    /// The list of constraint violations found during validation.
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.violations.len() {
            0 => Ok(()),
            1 => write!(f, "validation error: {}", self.violations[0]),
            _ => {
                write!(f, "validation errors:")?;
                for v in &self.violations {
                    write!(f, "\n - {v}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub(crate) fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Convert to the wire-compatible list of `valopt.ConstraintViolation`
    /// messages.
    #[must_use]
    pub fn to_proto(&self) -> Vec<valopt_types::ConstraintViolation> {
        self.violations.iter().map(Violation::to_proto).collect()
    }
}

/// Returned when the schema carries an option the engine cannot turn into a
/// constraint: malformed range or combinator syntax, an option applied to a
/// field kind it does not support, a bound that cannot be compared safely, or
/// an external constraint that does not match its target structurally.
///
/// Schema errors surface at constraint assembly time and abort validation;
/// they are never reported as per-message violations.
#[derive(Debug, Clone, thiserror::Error)]
#[error("schema error: {cause}")]
pub struct SchemaError {
    /// Description of why the constraint failed to assemble.
    pub cause: String,
}

impl From<valopt_types::OptionDecodeError> for SchemaError {
    fn from(err: valopt_types::OptionDecodeError) -> Self {
        Self {
            cause: err.to_string(),
        }
    }
}

/// Merge violations from a sub-evaluation into an accumulator.
///
/// Returns `(should_continue, accumulated_error)`.
/// If `fail_fast` is true, stops on the first violation.
pub(crate) fn merge_violations(
    acc: Option<Error>,
    new_err: Result<(), Error>,
    fail_fast: bool,
) -> (bool, Option<Error>) {
    let new_err = match new_err {
        Ok(()) => return (true, acc),
        Err(e) => e,
    };

    match new_err {
        Error::Schema(_) => (false, Some(new_err)),
        Error::Validation(new_val) => {
            if fail_fast {
                return (false, Some(Error::Validation(new_val)));
            }
            match acc {
                Some(Error::Validation(mut existing)) => {
                    existing.violations.extend(new_val.violations);
                    (true, Some(Error::Validation(existing)))
                }
                _ => (true, Some(Error::Validation(new_val))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, SchemaError, ValidationError, merge_violations};
    use crate::violation::Violation;

    fn validation_error(template: &str) -> Error {
        let mut violation = Violation::new(template, Vec::new());
        violation.set_field_path("field");
        Error::Validation(ValidationError::new(vec![violation]))
    }

    #[test]
    fn validation_error_display_matches_single_and_multiple_formats() {
        let mut first = Violation::new("The value of %s is wrong.", vec!["one".to_string()]);
        first.set_field_path("one.two");
        let single = ValidationError::new(vec![first.clone()]);
        assert_eq!(
            single.to_string(),
            "validation error: one.two: The value of one is wrong."
        );

        let mut second = Violation::new("A value must be set.", Vec::new());
        second.set_field_path("one.three");
        let multiple = ValidationError::new(vec![first, second]);
        assert_eq!(
            multiple.to_string(),
            "validation errors:\n - one.two: The value of one is wrong.\n - one.three: A value must be set."
        );
    }

    #[test]
    fn merge_violations_handles_schema_and_validation_paths() {
        let (cont, acc) = merge_violations(None, Ok(()), true);
        assert!(cont);
        assert!(acc.is_none());

        let schema = Error::Schema(SchemaError {
            cause: "bad option".to_string(),
        });
        let (cont, acc) = merge_violations(None, Err(schema), false);
        assert!(!cont);
        assert!(matches!(acc, Some(Error::Schema(_))));

        let (cont, acc) = merge_violations(None, Err(validation_error("first")), true);
        assert!(!cont);
        let Some(Error::Validation(err)) = acc else {
            panic!("expected validation error");
        };
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].msg_format(), "first");

        let base = Some(validation_error("first"));
        let (cont, acc) = merge_violations(base, Err(validation_error("second")), false);
        assert!(cont);
        let Some(Error::Validation(err)) = acc else {
            panic!("expected merged validation error");
        };
        assert_eq!(err.violations.len(), 2);
        assert_eq!(err.violations[0].msg_format(), "first");
        assert_eq!(err.violations[1].msg_format(), "second");
    }
}
