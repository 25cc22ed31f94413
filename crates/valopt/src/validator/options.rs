use std::sync::Arc;

use prost_reflect::{FieldDescriptor, Kind, Value};
use regex::Regex;

use valopt_types::FieldOptionsExt;

use crate::error::SchemaError;
use crate::validator::constraint::{
    Constraint, CustomConstraint, DigitsConstraint, DistinctConstraint, GoesWithConstraint,
    PatternConstraint, RangeConstraint, RequiredConstraint, SetOnceConstraint, ValidateConstraint,
};
use crate::validator::lookups;
use crate::validator::range::{Bound, NumericRange};
use crate::validator::numeric::Number;
use crate::violation::Violation;

pub(crate) const REQUIRED_TEMPLATE: &str = "A value must be set.";
pub(crate) const MIN_INCLUSIVE_TEMPLATE: &str =
    "The number must be greater than or equal to %s.";
pub(crate) const MIN_EXCLUSIVE_TEMPLATE: &str = "The number must be greater than %s.";
pub(crate) const MAX_INCLUSIVE_TEMPLATE: &str = "The number must be less than or equal to %s.";
pub(crate) const MAX_EXCLUSIVE_TEMPLATE: &str = "The number must be less than %s.";
pub(crate) const RANGE_TEMPLATE: &str = "The number must lie in the range %s.";
pub(crate) const DIGITS_TEMPLATE: &str =
    "The number is out of bounds: expected at most %s whole digits and %s fraction digits.";
pub(crate) const PATTERN_TEMPLATE: &str = "The string must match the regular expression '%s'.";
pub(crate) const DISTINCT_TEMPLATE: &str = "The value %s appears more than once.";
pub(crate) const GOES_WITH_TEMPLATE: &str =
    "The field `%s` can only be set together with `%s`.";
pub(crate) const VALIDATE_TEMPLATE: &str = "The message must have valid properties.";
pub(crate) const SET_ONCE_TEMPLATE: &str =
    "The field `%s` already has the value `%s` and cannot be set to `%s`.";
pub(crate) const REQUIRED_FIELD_TEMPLATE: &str =
    "None of the required field combinations is set: `%s`.";
pub(crate) const REQUIRED_ONEOF_TEMPLATE: &str =
    "One of the fields of the group `%s` must be set.";

/// One entry of the validating option catalogue.
///
/// An option inspects a *declaring* field descriptor (the one carrying the
/// schema option) and produces a constraint bound to a *target* field. The
/// two are the same descriptor for options declared directly on the validated
/// type; they differ for external constraints, where the declaring field
/// belongs to the constraint message and the target to the constrained type.
pub(crate) trait ValidatingOption: Send + Sync {
    /// Short option name used in schema errors.
    fn name(&self) -> &'static str;

    /// Whether the schema explicitly sets this option on the declaring field.
    fn option_present_at(&self, declared: &FieldDescriptor) -> Result<bool, SchemaError>;

    /// Whether the option can be attached to fields of the target's kind.
    fn applicable_to(&self, field: &FieldDescriptor) -> bool;

    /// Build the constraint for a target field carrying the option.
    fn constraint_for(
        &self,
        field: &FieldDescriptor,
        declared: &FieldDescriptor,
    ) -> Result<Constraint, SchemaError>;

    /// Presence gated by applicability. An option present on a field kind it
    /// does not support is a schema error, not a per-message violation.
    fn should_validate(
        &self,
        field: &FieldDescriptor,
        declared: &FieldDescriptor,
    ) -> Result<bool, SchemaError> {
        if !self.option_present_at(declared)? {
            return Ok(false);
        }
        if !self.applicable_to(field) {
            return Err(SchemaError {
                cause: format!(
                    "the ({}) option does not apply to the {} field `{}`",
                    self.name(),
                    lookups::kind_label(&field.kind()),
                    field.full_name()
                ),
            });
        }
        Ok(true)
    }
}

/// Selects which partition of the option catalogue an assembly serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum OptionSelector {
    /// The built-in catalogue plus registered custom options.
    All,
    /// Registered custom options only.
    CustomOnly,
}

/// The registered option factories, partitioned into the built-in standard
/// set and custom additions.
///
/// Registration is an explicit call made while the validator is constructed;
/// there is no implicit discovery, so the catalogue's order and content are
/// deterministic and testable.
pub(crate) struct OptionRegistry {
    standard: Vec<Arc<dyn ValidatingOption>>,
    custom: Vec<Arc<dyn ValidatingOption>>,
}

impl OptionRegistry {
    /// The built-in catalogue, in assembly order.
    pub fn builtin() -> Self {
        Self {
            standard: vec![
                Arc::new(RequiredOption),
                Arc::new(MinOption),
                Arc::new(MaxOption),
                Arc::new(DecimalMinOption),
                Arc::new(DecimalMaxOption),
                Arc::new(RangeOption),
                Arc::new(DigitsOption),
                Arc::new(PatternOption),
                Arc::new(DistinctOption),
                Arc::new(GoesWithOption),
                Arc::new(ValidateOption),
                Arc::new(SetOnceOption),
            ],
            custom: Vec::new(),
        }
    }

    pub fn register_custom(&mut self, option: Arc<dyn CustomOption>) {
        self.custom.push(Arc::new(CustomOptionAdapter { inner: option }));
    }

    pub fn partition(
        &self,
        selector: OptionSelector,
    ) -> impl Iterator<Item = &Arc<dyn ValidatingOption>> {
        let standard: &[Arc<dyn ValidatingOption>] = match selector {
            OptionSelector::All => &self.standard,
            OptionSelector::CustomOnly => &[],
        };
        standard.iter().chain(self.custom.iter())
    }
}

/// A user-supplied validating option, registered through
/// [`ValidatorOption::CustomOption`](crate::ValidatorOption::CustomOption).
///
/// Custom options extend the catalogue without touching the built-in kinds:
/// the registry partitions them separately so callers can evaluate custom
/// constraints alone.
pub trait CustomOption: Send + Sync {
    /// Short option name used in schema errors.
    fn name(&self) -> &'static str;

    /// Whether this option applies to the given field declaration.
    fn option_present_at(&self, field: &FieldDescriptor) -> bool;

    /// Whether the option can be attached to fields of this kind. Defaults
    /// to accepting every kind.
    fn applicable_to(&self, field: &FieldDescriptor) -> bool {
        let _ = field;
        true
    }

    /// Build the rule evaluated against the field's values.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when the option's configuration cannot be
    /// turned into a rule.
    fn build(&self, field: &FieldDescriptor) -> Result<Arc<dyn CustomRule>, SchemaError>;
}

/// The evaluation half of a custom option: inspects a field's normalized
/// values and reports violations.
pub trait CustomRule: Send + Sync {
    /// Check the values of a field. Returned violations have their field
    /// path and owning type filled in by the evaluator unless already set.
    fn check(&self, field: &FieldDescriptor, values: &[Value]) -> Vec<Violation>;
}

struct CustomOptionAdapter {
    inner: Arc<dyn CustomOption>,
}

impl ValidatingOption for CustomOptionAdapter {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn option_present_at(&self, declared: &FieldDescriptor) -> Result<bool, SchemaError> {
        Ok(self.inner.option_present_at(declared))
    }

    fn applicable_to(&self, field: &FieldDescriptor) -> bool {
        self.inner.applicable_to(field)
    }

    fn constraint_for(
        &self,
        field: &FieldDescriptor,
        _declared: &FieldDescriptor,
    ) -> Result<Constraint, SchemaError> {
        Ok(Constraint::Custom(CustomConstraint {
            field: field.clone(),
            rule: self.inner.build(field)?,
        }))
    }
}

fn template_or(custom: Option<String>, default: &str) -> String {
    custom
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| default.to_string())
}

struct RequiredOption;

impl ValidatingOption for RequiredOption {
    fn name(&self) -> &'static str {
        "required"
    }

    fn option_present_at(&self, declared: &FieldDescriptor) -> Result<bool, SchemaError> {
        Ok(declared.required_option())
    }

    fn applicable_to(&self, _field: &FieldDescriptor) -> bool {
        true
    }

    fn constraint_for(
        &self,
        field: &FieldDescriptor,
        declared: &FieldDescriptor,
    ) -> Result<Constraint, SchemaError> {
        let template = declared.if_missing_option().map_err(SchemaError::from)?;
        Ok(Constraint::Required(RequiredConstraint {
            field: field.clone(),
            error_template: template_or(template.map(|t| t.error_msg), REQUIRED_TEMPLATE),
        }))
    }
}

struct MinOption;

impl ValidatingOption for MinOption {
    fn name(&self) -> &'static str {
        "min"
    }

    fn option_present_at(&self, declared: &FieldDescriptor) -> Result<bool, SchemaError> {
        Ok(declared.min_option().map_err(SchemaError::from)?.is_some())
    }

    fn applicable_to(&self, field: &FieldDescriptor) -> bool {
        lookups::is_numeric(&field.kind())
    }

    fn constraint_for(
        &self,
        field: &FieldDescriptor,
        declared: &FieldDescriptor,
    ) -> Result<Constraint, SchemaError> {
        let option = declared
            .min_option()
            .map_err(SchemaError::from)?
            .unwrap_or_default();
        let bound = Number::parse(&option.value, &field.kind())?;
        Ok(Constraint::Range(RangeConstraint {
            field: field.clone(),
            range: NumericRange::at_least(Bound {
                value: bound,
                inclusive: true,
            }),
            error_template: template_or(Some(option.error_msg), MIN_INCLUSIVE_TEMPLATE),
            params: vec![option.value],
        }))
    }
}

struct MaxOption;

impl ValidatingOption for MaxOption {
    fn name(&self) -> &'static str {
        "max"
    }

    fn option_present_at(&self, declared: &FieldDescriptor) -> Result<bool, SchemaError> {
        Ok(declared.max_option().map_err(SchemaError::from)?.is_some())
    }

    fn applicable_to(&self, field: &FieldDescriptor) -> bool {
        lookups::is_numeric(&field.kind())
    }

    fn constraint_for(
        &self,
        field: &FieldDescriptor,
        declared: &FieldDescriptor,
    ) -> Result<Constraint, SchemaError> {
        let option = declared
            .max_option()
            .map_err(SchemaError::from)?
            .unwrap_or_default();
        let bound = Number::parse(&option.value, &field.kind())?;
        Ok(Constraint::Range(RangeConstraint {
            field: field.clone(),
            range: NumericRange::at_most(Bound {
                value: bound,
                inclusive: true,
            }),
            error_template: template_or(Some(option.error_msg), MAX_INCLUSIVE_TEMPLATE),
            params: vec![option.value],
        }))
    }
}

struct DecimalMinOption;

impl ValidatingOption for DecimalMinOption {
    fn name(&self) -> &'static str {
        "decimal_min"
    }

    fn option_present_at(&self, declared: &FieldDescriptor) -> Result<bool, SchemaError> {
        Ok(declared
            .decimal_min_option()
            .map_err(SchemaError::from)?
            .is_some())
    }

    fn applicable_to(&self, field: &FieldDescriptor) -> bool {
        lookups::is_numeric(&field.kind())
    }

    fn constraint_for(
        &self,
        field: &FieldDescriptor,
        declared: &FieldDescriptor,
    ) -> Result<Constraint, SchemaError> {
        let option = declared
            .decimal_min_option()
            .map_err(SchemaError::from)?
            .unwrap_or_default();
        let bound = Number::parse(&option.value, &field.kind())?;
        let default_template = if option.inclusive {
            MIN_INCLUSIVE_TEMPLATE
        } else {
            MIN_EXCLUSIVE_TEMPLATE
        };
        Ok(Constraint::Range(RangeConstraint {
            field: field.clone(),
            range: NumericRange::at_least(Bound {
                value: bound,
                inclusive: option.inclusive,
            }),
            error_template: template_or(Some(option.error_msg), default_template),
            params: vec![option.value],
        }))
    }
}

struct DecimalMaxOption;

impl ValidatingOption for DecimalMaxOption {
    fn name(&self) -> &'static str {
        "decimal_max"
    }

    fn option_present_at(&self, declared: &FieldDescriptor) -> Result<bool, SchemaError> {
        Ok(declared
            .decimal_max_option()
            .map_err(SchemaError::from)?
            .is_some())
    }

    fn applicable_to(&self, field: &FieldDescriptor) -> bool {
        lookups::is_numeric(&field.kind())
    }

    fn constraint_for(
        &self,
        field: &FieldDescriptor,
        declared: &FieldDescriptor,
    ) -> Result<Constraint, SchemaError> {
        let option = declared
            .decimal_max_option()
            .map_err(SchemaError::from)?
            .unwrap_or_default();
        let bound = Number::parse(&option.value, &field.kind())?;
        let default_template = if option.inclusive {
            MAX_INCLUSIVE_TEMPLATE
        } else {
            MAX_EXCLUSIVE_TEMPLATE
        };
        Ok(Constraint::Range(RangeConstraint {
            field: field.clone(),
            range: NumericRange::at_most(Bound {
                value: bound,
                inclusive: option.inclusive,
            }),
            error_template: template_or(Some(option.error_msg), default_template),
            params: vec![option.value],
        }))
    }
}

struct RangeOption;

impl ValidatingOption for RangeOption {
    fn name(&self) -> &'static str {
        "range"
    }

    fn option_present_at(&self, declared: &FieldDescriptor) -> Result<bool, SchemaError> {
        Ok(declared.range_option().is_some())
    }

    fn applicable_to(&self, field: &FieldDescriptor) -> bool {
        lookups::is_numeric(&field.kind())
    }

    fn constraint_for(
        &self,
        field: &FieldDescriptor,
        declared: &FieldDescriptor,
    ) -> Result<Constraint, SchemaError> {
        let text = declared.range_option().unwrap_or_default();
        let range = NumericRange::parse(&text, &field.kind())?;
        Ok(Constraint::Range(RangeConstraint {
            field: field.clone(),
            range,
            error_template: RANGE_TEMPLATE.to_string(),
            params: vec![text],
        }))
    }
}

struct DigitsOption;

impl ValidatingOption for DigitsOption {
    fn name(&self) -> &'static str {
        "digits"
    }

    fn option_present_at(&self, declared: &FieldDescriptor) -> Result<bool, SchemaError> {
        Ok(declared
            .digits_option()
            .map_err(SchemaError::from)?
            .is_some_and(|option| option.integer_max > 0 || option.fraction_max > 0))
    }

    fn applicable_to(&self, field: &FieldDescriptor) -> bool {
        lookups::is_numeric(&field.kind())
    }

    fn constraint_for(
        &self,
        field: &FieldDescriptor,
        declared: &FieldDescriptor,
    ) -> Result<Constraint, SchemaError> {
        let option = declared
            .digits_option()
            .map_err(SchemaError::from)?
            .unwrap_or_default();
        Ok(Constraint::Digits(DigitsConstraint {
            field: field.clone(),
            whole_max: option.integer_max,
            fraction_max: option.fraction_max,
            error_template: template_or(Some(option.error_msg), DIGITS_TEMPLATE),
        }))
    }
}

struct PatternOption;

impl ValidatingOption for PatternOption {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn option_present_at(&self, declared: &FieldDescriptor) -> Result<bool, SchemaError> {
        Ok(declared.pattern_option().map_err(SchemaError::from)?.is_some())
    }

    fn applicable_to(&self, field: &FieldDescriptor) -> bool {
        matches!(field.kind(), Kind::String)
    }

    fn constraint_for(
        &self,
        field: &FieldDescriptor,
        declared: &FieldDescriptor,
    ) -> Result<Constraint, SchemaError> {
        let option = declared
            .pattern_option()
            .map_err(SchemaError::from)?
            .unwrap_or_default();
        let regex = Regex::new(&option.regex).map_err(|err| SchemaError {
            cause: format!(
                "the (pattern) regex `{}` on `{}` does not compile: {err}",
                option.regex,
                field.full_name()
            ),
        })?;
        Ok(Constraint::Pattern(PatternConstraint {
            field: field.clone(),
            regex,
            error_template: template_or(Some(option.error_msg), PATTERN_TEMPLATE),
        }))
    }
}

struct DistinctOption;

impl ValidatingOption for DistinctOption {
    fn name(&self) -> &'static str {
        "distinct"
    }

    fn option_present_at(&self, declared: &FieldDescriptor) -> Result<bool, SchemaError> {
        Ok(declared.distinct_option())
    }

    fn applicable_to(&self, field: &FieldDescriptor) -> bool {
        field.is_list() || field.is_map()
    }

    fn constraint_for(
        &self,
        field: &FieldDescriptor,
        _declared: &FieldDescriptor,
    ) -> Result<Constraint, SchemaError> {
        Ok(Constraint::Distinct(DistinctConstraint {
            field: field.clone(),
            error_template: DISTINCT_TEMPLATE.to_string(),
        }))
    }
}

struct GoesWithOption;

impl ValidatingOption for GoesWithOption {
    fn name(&self) -> &'static str {
        "goes_with"
    }

    fn option_present_at(&self, declared: &FieldDescriptor) -> Result<bool, SchemaError> {
        Ok(declared.goes_with_option().is_some())
    }

    fn applicable_to(&self, _field: &FieldDescriptor) -> bool {
        true
    }

    fn constraint_for(
        &self,
        field: &FieldDescriptor,
        declared: &FieldDescriptor,
    ) -> Result<Constraint, SchemaError> {
        let companion_name = declared.goes_with_option().unwrap_or_default();
        let companion = field
            .parent_message()
            .get_field_by_name(&companion_name)
            .ok_or_else(|| SchemaError {
                cause: format!(
                    "the (goes_with) option on `{}` names `{companion_name}`, which is not \
                     a field of `{}`",
                    field.full_name(),
                    field.parent_message().full_name()
                ),
            })?;
        Ok(Constraint::GoesWith(GoesWithConstraint {
            field: field.clone(),
            companion,
            error_template: GOES_WITH_TEMPLATE.to_string(),
        }))
    }
}

struct ValidateOption;

impl ValidatingOption for ValidateOption {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn option_present_at(&self, declared: &FieldDescriptor) -> Result<bool, SchemaError> {
        Ok(declared.validate_option())
    }

    fn applicable_to(&self, field: &FieldDescriptor) -> bool {
        lookups::validated_message_kind(field).is_some()
    }

    fn constraint_for(
        &self,
        field: &FieldDescriptor,
        declared: &FieldDescriptor,
    ) -> Result<Constraint, SchemaError> {
        let template = declared.if_invalid_option().map_err(SchemaError::from)?;
        Ok(Constraint::Validate(ValidateConstraint {
            field: field.clone(),
            error_template: template_or(template.map(|t| t.error_msg), VALIDATE_TEMPLATE),
        }))
    }
}

struct SetOnceOption;

impl ValidatingOption for SetOnceOption {
    fn name(&self) -> &'static str {
        "set_once"
    }

    fn option_present_at(&self, declared: &FieldDescriptor) -> Result<bool, SchemaError> {
        Ok(declared.set_once_option())
    }

    fn applicable_to(&self, _field: &FieldDescriptor) -> bool {
        true
    }

    fn constraint_for(
        &self,
        field: &FieldDescriptor,
        _declared: &FieldDescriptor,
    ) -> Result<Constraint, SchemaError> {
        Ok(Constraint::SetOnce(SetOnceConstraint {
            field: field.clone(),
            error_template: SET_ONCE_TEMPLATE.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use prost_reflect::{FieldDescriptor, Value};

    use super::{
        CustomOption, CustomRule, OptionRegistry, OptionSelector, RangeOption, RequiredOption,
        ValidatingOption,
    };
    use crate::error::SchemaError;
    use crate::validator::constraint::Constraint;
    use crate::validator::testing::sandbox_field;
    use crate::violation::Violation;

    #[test]
    fn option_on_an_unsupported_kind_is_a_schema_error() {
        let field = sandbox_field("valopt.sandbox.Mismatched", "code");
        let err = RangeOption
            .should_validate(&field, &field)
            .expect_err("a numeric option on a string field must fail assembly");
        assert!(err.cause.contains("(range)"));
        assert!(err.cause.contains("string field"));
        assert!(err.cause.contains("valopt.sandbox.Mismatched.code"));
    }

    #[test]
    fn absent_options_do_not_validate() {
        let field = sandbox_field("valopt.sandbox.Passport", "issued_by");
        assert!(!RequiredOption.should_validate(&field, &field).unwrap());
    }

    #[test]
    fn if_missing_overrides_the_required_template() {
        let field = sandbox_field("valopt.sandbox.Passport", "number");
        let constraint = RequiredOption.constraint_for(&field, &field).unwrap();
        let Constraint::Required(required) = constraint else {
            panic!("expected a required constraint");
        };
        assert_eq!(required.error_template, "Passport number must be provided.");
    }

    struct FlagOption {
        built: Arc<AtomicBool>,
    }

    struct NopRule;

    impl CustomRule for NopRule {
        fn check(&self, _field: &FieldDescriptor, _values: &[Value]) -> Vec<Violation> {
            Vec::new()
        }
    }

    impl CustomOption for FlagOption {
        fn name(&self) -> &'static str {
            "flag"
        }

        fn option_present_at(&self, field: &FieldDescriptor) -> bool {
            field.name() == "number"
        }

        fn build(&self, _field: &FieldDescriptor) -> Result<Arc<dyn CustomRule>, SchemaError> {
            self.built.store(true, Ordering::Relaxed);
            Ok(Arc::new(NopRule))
        }
    }

    #[test]
    fn custom_options_live_in_their_own_partition() {
        let built = Arc::new(AtomicBool::new(false));
        let mut registry = OptionRegistry::builtin();
        let standard_count = registry.partition(OptionSelector::All).count();
        registry.register_custom(Arc::new(FlagOption {
            built: Arc::clone(&built),
        }));

        assert_eq!(registry.partition(OptionSelector::All).count(), standard_count + 1);
        assert_eq!(registry.partition(OptionSelector::CustomOnly).count(), 1);

        let field = sandbox_field("valopt.sandbox.Passport", "number");
        let custom = registry
            .partition(OptionSelector::CustomOnly)
            .next()
            .expect("custom partition should hold the registered option");
        assert!(custom.should_validate(&field, &field).unwrap());
        let constraint = custom.constraint_for(&field, &field).unwrap();
        assert!(matches!(constraint, Constraint::Custom(_)));
        assert!(built.load(Ordering::Relaxed));
    }
}
