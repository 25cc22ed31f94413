use std::sync::Arc;

use prost_reflect::{FieldDescriptor, OneofDescriptor};
use regex::Regex;

use crate::validator::combinator::RequiredFieldExpression;
use crate::validator::options::CustomRule;
use crate::validator::range::NumericRange;

/// The constraints assembled for one message type under one field context.
///
/// Sets are immutable once built and shared between concurrent validations
/// through the assembly cache.
pub(crate) struct ConstraintSet {
    type_name: String,
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    pub fn new(type_name: impl Into<String>, constraints: Vec<Constraint>) -> Self {
        Self {
            type_name: type_name.into(),
            constraints,
        }
    }

    /// Qualified name of the message type the set was assembled for.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Constraint> {
        self.constraints.iter()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }
}

impl std::fmt::Debug for ConstraintSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintSet")
            .field("type_name", &self.type_name)
            .field("constraints", &self.constraints.len())
            .finish()
    }
}

/// An assembled validation rule, one of a closed set of kinds.
///
/// Each variant carries its precompiled machinery (parsed bounds, compiled
/// regex, checked combinator expression) so evaluation never re-reads the
/// schema. New kinds extend the enum and the evaluator's match.
pub(crate) enum Constraint {
    Required(RequiredConstraint),
    Range(RangeConstraint),
    Digits(DigitsConstraint),
    Pattern(PatternConstraint),
    Distinct(DistinctConstraint),
    GoesWith(GoesWithConstraint),
    Validate(ValidateConstraint),
    SetOnce(SetOnceConstraint),
    RequiredField(RequiredFieldConstraint),
    RequiredOneof(RequiredOneofConstraint),
    Custom(CustomConstraint),
}

/// The field must have a non-default value.
pub(crate) struct RequiredConstraint {
    pub field: FieldDescriptor,
    pub error_template: String,
}

/// Every value of the field must lie in a numeric interval. Assembled from
/// the `range` option as well as the `min`/`max`/`decimal_min`/`decimal_max`
/// family, which produce single-edged intervals.
pub(crate) struct RangeConstraint {
    pub field: FieldDescriptor,
    pub range: NumericRange,
    pub error_template: String,
    pub params: Vec<String>,
}

/// Decimal digit counts of every value must stay within the configured
/// maxima. A zero maximum leaves that part unconstrained.
pub(crate) struct DigitsConstraint {
    pub field: FieldDescriptor,
    pub whole_max: u32,
    pub fraction_max: u32,
    pub error_template: String,
}

/// Every non-empty string value must match the regular expression.
pub(crate) struct PatternConstraint {
    pub field: FieldDescriptor,
    pub regex: Regex,
    pub error_template: String,
}

/// The values of a repeated or map field must be pairwise distinct.
pub(crate) struct DistinctConstraint {
    pub field: FieldDescriptor,
    pub error_template: String,
}

/// The field may only be set while its companion field is also set.
pub(crate) struct GoesWithConstraint {
    pub field: FieldDescriptor,
    pub companion: FieldDescriptor,
    pub error_template: String,
}

/// Non-default message values of the field are validated recursively, their
/// violations wrapped into one violation naming the field.
pub(crate) struct ValidateConstraint {
    pub field: FieldDescriptor,
    pub error_template: String,
}

/// Once the field holds a non-default value, a change-gated validation
/// rejects any different value.
pub(crate) struct SetOnceConstraint {
    pub field: FieldDescriptor,
    pub error_template: String,
}

/// Message-level combinator: at least one alternative of required fields
/// must be fully populated.
pub(crate) struct RequiredFieldConstraint {
    pub expression: RequiredFieldExpression,
    pub error_template: String,
}

/// Exactly one member of the oneof must be populated with a non-default
/// value.
pub(crate) struct RequiredOneofConstraint {
    pub oneof: OneofDescriptor,
    pub error_template: String,
}

/// A rule produced by a registered custom option.
pub(crate) struct CustomConstraint {
    pub field: FieldDescriptor,
    pub rule: Arc<dyn CustomRule>,
}
