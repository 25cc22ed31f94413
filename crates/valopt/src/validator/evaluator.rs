use prost_reflect::{ReflectMessage, Value};

use crate::config::ValidationConfig;
use crate::error::{SchemaError, ValidationError};
use crate::validator::builder::Builder;
use crate::validator::constraint::{
    Constraint, CustomConstraint, DigitsConstraint, DistinctConstraint, GoesWithConstraint,
    PatternConstraint, RangeConstraint, RequiredConstraint, RequiredFieldConstraint,
    RequiredOneofConstraint, SetOnceConstraint, ValidateConstraint,
};
use crate::validator::context::FieldContext;
use crate::validator::numeric::{Number, decimal_digits};
use crate::validator::pack;
use crate::validator::value::{MessageValue, is_default_value};
use crate::violation::Violation;

/// Upper bound on nested `validate` recursion.
///
/// Schema type trees are finite, but a self-referential schema type can
/// carry an arbitrarily deep instance graph; past this depth the walk aborts
/// with a schema error naming the path instead of exhausting the stack.
const MAX_NESTING: usize = 64;

/// A stateful walk of one message against its assembled constraints.
///
/// Constructed per top-level message (nested `validate` recursion builds a
/// child evaluator per nested value), the evaluator fetches the constraint
/// set for the message's type and context, applies each constraint kind
/// through an exhaustive match, and accumulates violations. [`translate`]
/// yields the result; it is `None` exactly when nothing was violated.
///
/// [`translate`]: ConstraintEvaluator::translate
pub(crate) struct ConstraintEvaluator<'a> {
    builder: &'a Builder,
    config: ValidationConfig,
    context: FieldContext,
    depth: usize,
    violations: Vec<Violation>,
}

impl<'a> ConstraintEvaluator<'a> {
    pub fn new(builder: &'a Builder, config: ValidationConfig) -> Self {
        Self::in_context(builder, config, FieldContext::empty(), 0)
    }

    fn in_context(
        builder: &'a Builder,
        config: ValidationConfig,
        context: FieldContext,
        depth: usize,
    ) -> Self {
        Self {
            builder,
            config,
            context,
            depth,
            violations: Vec::new(),
        }
    }

    /// Evaluate every assembled constraint against the message.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when assembly fails or recursion exceeds
    /// [`MAX_NESTING`]; violations are not errors and accumulate instead.
    pub fn evaluate(&mut self, message: &MessageValue<'_>) -> Result<(), SchemaError> {
        if self.depth > MAX_NESTING {
            return Err(SchemaError {
                cause: format!(
                    "nested validation at `{}` exceeds {MAX_NESTING} levels; the instance \
                     graph of a self-referential schema type appears to be cyclic",
                    self.context.field_path()
                ),
            });
        }

        let descriptor = message.descriptor();
        let set = self
            .builder
            .assemble(&descriptor, &self.context, self.config.selector)?;
        for constraint in set.iter() {
            if self.config.fail_fast && !self.violations.is_empty() {
                break;
            }
            self.apply(constraint, message, set.type_name())?;
        }
        Ok(())
    }

    /// Evaluate only change-gated constraints for an update from `old` to
    /// `new`.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when assembly fails.
    pub fn evaluate_change(
        &mut self,
        old: &MessageValue<'_>,
        new: &MessageValue<'_>,
    ) -> Result<(), SchemaError> {
        let descriptor = new.descriptor();
        let set = self
            .builder
            .assemble(&descriptor, &self.context, self.config.selector)?;
        for constraint in set.iter() {
            if self.config.fail_fast && !self.violations.is_empty() {
                break;
            }
            if let Constraint::SetOnce(c) = constraint {
                self.check_set_once(c, old, new, set.type_name());
            }
        }
        Ok(())
    }

    /// The accumulated result: `None` iff no constraint was violated.
    pub fn translate(self) -> Option<ValidationError> {
        if self.violations.is_empty() {
            None
        } else {
            Some(ValidationError::new(self.violations))
        }
    }

    fn apply(
        &mut self,
        constraint: &Constraint,
        message: &MessageValue<'_>,
        type_name: &str,
    ) -> Result<(), SchemaError> {
        match constraint {
            Constraint::Required(c) => self.check_required(c, message, type_name),
            Constraint::Range(c) => self.check_range(c, message, type_name)?,
            Constraint::Digits(c) => self.check_digits(c, message, type_name),
            Constraint::Pattern(c) => self.check_pattern(c, message, type_name),
            Constraint::Distinct(c) => self.check_distinct(c, message, type_name),
            Constraint::GoesWith(c) => self.check_goes_with(c, message, type_name),
            Constraint::Validate(c) => self.check_nested(c, message, type_name)?,
            // Change-gated; a plain validation has no previous value.
            Constraint::SetOnce(_) => {}
            Constraint::RequiredField(c) => self.check_required_field(c, message, type_name),
            Constraint::RequiredOneof(c) => self.check_required_oneof(c, message, type_name),
            Constraint::Custom(c) => self.check_custom(c, message, type_name),
        }
        Ok(())
    }

    fn report(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    fn check_required(
        &mut self,
        c: &RequiredConstraint,
        message: &MessageValue<'_>,
        type_name: &str,
    ) {
        if message.value_of(&c.field).is_default() {
            self.report(
                Violation::new(c.error_template.clone(), Vec::new())
                    .with_field_path(c.field.name())
                    .with_type_name(type_name),
            );
        }
    }

    fn check_range(
        &mut self,
        c: &RangeConstraint,
        message: &MessageValue<'_>,
        type_name: &str,
    ) -> Result<(), SchemaError> {
        for value in message.value_of(&c.field).values() {
            let Some(number) = Number::from_value(value) else {
                continue;
            };
            if !c.range.admits(number)? {
                self.report(
                    Violation::new(c.error_template.clone(), c.params.clone())
                        .with_field_path(c.field.name())
                        .with_type_name(type_name)
                        .with_field_value(pack::pack_value(value)),
                );
            }
        }
        Ok(())
    }

    fn check_digits(&mut self, c: &DigitsConstraint, message: &MessageValue<'_>, type_name: &str) {
        for value in message.value_of(&c.field).values() {
            let Some(number) = Number::from_value(value) else {
                continue;
            };
            let (whole, fraction) = decimal_digits(number);
            let whole_over = c.whole_max > 0 && whole > c.whole_max as usize;
            let fraction_over = c.fraction_max > 0 && fraction > c.fraction_max as usize;
            if whole_over || fraction_over {
                self.report(
                    Violation::new(
                        c.error_template.clone(),
                        vec![c.whole_max.to_string(), c.fraction_max.to_string()],
                    )
                    .with_field_path(c.field.name())
                    .with_type_name(type_name)
                    .with_field_value(pack::pack_value(value)),
                );
            }
        }
    }

    fn check_pattern(&mut self, c: &PatternConstraint, message: &MessageValue<'_>, type_name: &str) {
        for value in message.value_of(&c.field).values() {
            let Some(text) = value.as_str() else {
                continue;
            };
            // An empty string is an unset field, not a mismatch; `required`
            // reports it when the schema demands a value.
            if text.is_empty() {
                continue;
            }
            if !c.regex.is_match(text) {
                self.report(
                    Violation::new(
                        c.error_template.clone(),
                        vec![c.regex.as_str().to_string()],
                    )
                    .with_field_path(c.field.name())
                    .with_type_name(type_name)
                    .with_field_value(pack::pack_value(value)),
                );
            }
        }
    }

    fn check_distinct(
        &mut self,
        c: &DistinctConstraint,
        message: &MessageValue<'_>,
        type_name: &str,
    ) {
        let field_value = message.value_of(&c.field);
        let values = field_value.values();
        let mut seen: Vec<&Value> = Vec::with_capacity(values.len());
        let mut reported: Vec<&Value> = Vec::new();
        for value in values {
            if seen.contains(&value) {
                if !reported.contains(&value) {
                    reported.push(value);
                    self.report(
                        Violation::new(
                            c.error_template.clone(),
                            vec![display_value(value)],
                        )
                        .with_field_path(c.field.name())
                        .with_type_name(type_name)
                        .with_field_value(pack::pack_value(value)),
                    );
                }
            } else {
                seen.push(value);
            }
        }
    }

    fn check_goes_with(
        &mut self,
        c: &GoesWithConstraint,
        message: &MessageValue<'_>,
        type_name: &str,
    ) {
        let value = message.value_of(&c.field);
        if value.is_default() {
            return;
        }
        if message.value_of(&c.companion).is_default() {
            self.report(
                Violation::new(
                    c.error_template.clone(),
                    vec![c.field.name().to_string(), c.companion.name().to_string()],
                )
                .with_field_path(c.field.name())
                .with_type_name(type_name),
            );
        }
    }

    fn check_nested(
        &mut self,
        c: &ValidateConstraint,
        message: &MessageValue<'_>,
        type_name: &str,
    ) -> Result<(), SchemaError> {
        for value in message.value_of(&c.field).values() {
            if self.config.fail_fast && !self.violations.is_empty() {
                break;
            }
            let Some(nested) = value.as_message() else {
                continue;
            };
            if is_default_value(value) {
                continue;
            }

            let mut child = ConstraintEvaluator::in_context(
                self.builder,
                self.config,
                self.context.nested(&c.field),
                self.depth + 1,
            );
            child.evaluate(&MessageValue::new(nested))?;
            if let Some(err) = child.translate() {
                let mut parent = Violation::new(c.error_template.clone(), Vec::new())
                    .with_field_path(c.field.name())
                    .with_type_name(type_name);
                for mut nested_violation in err.violations {
                    nested_violation.prepend_path(c.field.name());
                    parent.push_nested(nested_violation);
                }
                self.report(parent);
            }
        }
        Ok(())
    }

    fn check_set_once(
        &mut self,
        c: &SetOnceConstraint,
        old: &MessageValue<'_>,
        new: &MessageValue<'_>,
        type_name: &str,
    ) {
        let previous = old.value_of(&c.field);
        if previous.is_default() {
            return;
        }
        let current = new.value_of(&c.field);
        if previous.values() == current.values() {
            return;
        }
        self.report(
            Violation::new(
                c.error_template.clone(),
                vec![
                    c.field.name().to_string(),
                    display_values(previous.values()),
                    display_values(current.values()),
                ],
            )
            .with_field_path(c.field.name())
            .with_type_name(type_name),
        );
    }

    fn check_required_field(
        &mut self,
        c: &RequiredFieldConstraint,
        message: &MessageValue<'_>,
        type_name: &str,
    ) {
        if !c.expression.is_satisfied(message) {
            self.report(
                Violation::new(
                    c.error_template.clone(),
                    vec![c.expression.source().to_string()],
                )
                .with_type_name(type_name),
            );
        }
    }

    fn check_required_oneof(
        &mut self,
        c: &RequiredOneofConstraint,
        message: &MessageValue<'_>,
        type_name: &str,
    ) {
        let populated = message
            .value_of_oneof(&c.oneof)
            .is_some_and(|value| !value.is_default());
        if !populated {
            self.report(
                Violation::new(
                    c.error_template.clone(),
                    vec![c.oneof.name().to_string()],
                )
                .with_field_path(c.oneof.name())
                .with_type_name(type_name),
            );
        }
    }

    fn check_custom(&mut self, c: &CustomConstraint, message: &MessageValue<'_>, type_name: &str) {
        let value = message.value_of(&c.field);
        for mut violation in c.rule.check(&c.field, value.values()) {
            if violation.field_path().is_empty() {
                violation.set_field_path(c.field.name());
            }
            if violation.type_name().is_empty() {
                violation.set_type_name(type_name);
            }
            self.report(violation);
        }
    }
}

/// Short text of a value for violation parameters.
fn display_value(value: &Value) -> String {
    match value {
        Value::Bool(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::U32(v) => v.to_string(),
        Value::U64(v) => v.to_string(),
        Value::F32(v) => v.to_string(),
        Value::F64(v) => v.to_string(),
        Value::String(v) => v.clone(),
        Value::Bytes(v) => format!("{} bytes", v.len()),
        Value::EnumNumber(v) => v.to_string(),
        Value::Message(m) => m.descriptor().full_name().to_string(),
        Value::List(values) => display_values(values),
        Value::Map(values) => {
            let mut texts: Vec<_> = values.values().map(display_value).collect();
            texts.sort();
            texts.join(", ")
        }
    }
}

fn display_values(values: &[Value]) -> String {
    values.iter().map(display_value).collect::<Vec<_>>().join(", ")
}
