//! End-to-end validation of the sandbox fixture schema.

use std::sync::{Arc, LazyLock};

use pretty_assertions::assert_eq;
use prost_reflect::{
    DescriptorPool, DynamicMessage, FieldDescriptor, MapKey, ReflectMessage, Value,
};

use valopt::{
    CustomOption, CustomRule, Error, SchemaError, ValidationOption, Validator, ValidatorOption,
    Violation,
};

static SANDBOX_POOL: LazyLock<DescriptorPool> = LazyLock::new(|| {
    DescriptorPool::decode(
        include_bytes!(concat!(env!("OUT_DIR"), "/sandbox_descriptor_set.bin")).as_ref(),
    )
    .expect("sandbox descriptor set must decode")
});

fn message(name: &str) -> DynamicMessage {
    DynamicMessage::new(
        SANDBOX_POOL
            .get_message_by_name(name)
            .expect("sandbox message must exist"),
    )
}

fn set(message: &mut DynamicMessage, field: &str, value: Value) {
    let field = message
        .descriptor()
        .get_field_by_name(field)
        .expect("sandbox field must exist");
    message.set_field(&field, value);
}

fn violations(result: Result<(), Error>) -> Vec<Violation> {
    match result {
        Err(Error::Validation(err)) => err.violations,
        other => panic!("expected violations, got {other:?}"),
    }
}

fn passport(number: &str, issued_by: &str) -> DynamicMessage {
    let mut passport = message("valopt.sandbox.Passport");
    if !number.is_empty() {
        set(&mut passport, "number", Value::String(number.to_string()));
    }
    if !issued_by.is_empty() {
        set(&mut passport, "issued_by", Value::String(issued_by.to_string()));
    }
    passport
}

fn measurement(bucket: i32, percent: i32, ratio: f64, price: f64) -> DynamicMessage {
    let mut measurement = message("valopt.sandbox.Measurement");
    set(&mut measurement, "bucket", Value::I32(bucket));
    set(&mut measurement, "percent", Value::I32(percent));
    set(&mut measurement, "ratio", Value::F64(ratio));
    set(&mut measurement, "price", Value::F64(price));
    measurement
}

#[test]
fn unset_required_field_yields_one_violation_at_its_path() {
    let validator = Validator::new();
    let traveler = message("valopt.sandbox.Traveler");

    let found = violations(validator.validate(&traveler));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field_path(), "name");
    assert_eq!(found[0].message(), "A value must be set.");
    assert_eq!(found[0].type_name(), "valopt.sandbox.Traveler");
}

#[test]
fn validation_is_deterministic_across_cached_assemblies() {
    let validator = Validator::new();
    let traveler = message("valopt.sandbox.Traveler");

    let first = violations(validator.validate(&traveler));
    let second = violations(validator.validate(&traveler));
    assert_eq!(first, second);
}

#[test]
fn half_open_range_admits_low_edge_and_rejects_high_edge() {
    let validator = Validator::new();

    for (bucket, valid) in [(2, false), (3, true), (4, true), (5, false)] {
        let result = validator.validate(&measurement(bucket, 50, 0.5, 1.0));
        if valid {
            assert!(result.is_ok(), "bucket {bucket} should pass");
        } else {
            let found = violations(result);
            assert_eq!(found.len(), 1, "bucket {bucket} should fail once");
            assert_eq!(found[0].field_path(), "bucket");
            assert_eq!(
                found[0].message(),
                "The number must lie in the range [3..5)."
            );
        }
    }
}

#[test]
fn min_and_max_bound_the_value_inclusively() {
    let validator = Validator::new();

    assert!(validator.validate(&measurement(3, 0, 0.5, 1.0)).is_ok());
    assert!(validator.validate(&measurement(3, 100, 0.5, 1.0)).is_ok());

    let low = violations(validator.validate(&measurement(3, -1, 0.5, 1.0)));
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].field_path(), "percent");
    assert_eq!(
        low[0].message(),
        "The number must be greater than or equal to 0."
    );

    let high = violations(validator.validate(&measurement(3, 101, 0.5, 1.0)));
    assert_eq!(high[0].message(), "The number must be less than or equal to 100.");
}

#[test]
fn decimal_bounds_honor_their_inclusivity() {
    let validator = Validator::new();

    assert!(validator.validate(&measurement(3, 50, 1.0, 1.0)).is_ok());

    let at_exclusive_bound = violations(validator.validate(&measurement(3, 50, 0.0, 1.0)));
    assert_eq!(at_exclusive_bound.len(), 1);
    assert_eq!(at_exclusive_bound[0].field_path(), "ratio");
    assert_eq!(
        at_exclusive_bound[0].message(),
        "The number must be greater than 0.0."
    );

    let above = violations(validator.validate(&measurement(3, 50, 1.5, 1.0)));
    assert_eq!(above[0].message(), "The number must be less than or equal to 1.0.");
}

#[test]
fn digit_limits_cover_whole_and_fraction_parts() {
    let validator = Validator::new();

    assert!(validator.validate(&measurement(3, 50, 0.5, 123.45)).is_ok());

    let whole = violations(validator.validate(&measurement(3, 50, 0.5, 1234.5)));
    assert_eq!(whole.len(), 1);
    assert_eq!(whole[0].field_path(), "price");
    assert_eq!(
        whole[0].message(),
        "The number is out of bounds: expected at most 3 whole digits and 2 fraction digits."
    );

    let fraction = violations(validator.validate(&measurement(3, 50, 0.5, 1.625)));
    assert_eq!(fraction[0].field_path(), "price");
}

#[test]
fn empty_string_is_unset_for_pattern_purposes() {
    let validator = Validator::new();
    let blank = message("valopt.sandbox.Tag");
    assert!(validator.validate(&blank).is_ok());

    let mut lower = message("valopt.sandbox.Tag");
    set(&mut lower, "label", Value::String("abc".to_string()));
    assert!(validator.validate(&lower).is_ok());

    let mut upper = message("valopt.sandbox.Tag");
    set(&mut upper, "label", Value::String("ABC".to_string()));
    let found = violations(validator.validate(&upper));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field_path(), "label");
    assert_eq!(
        found[0].message(),
        "The string must match the regular expression '^[a-z]+$'."
    );
    let echoed = found[0].field_value().expect("the offending string is echoed");
    assert_eq!(echoed.type_url, "type.googleapis.com/google.protobuf.StringValue");
}

#[test]
fn required_field_combinator_takes_any_satisfied_alternative() {
    let validator = Validator::new();

    let mut by_email = message("valopt.sandbox.Registration");
    set(&mut by_email, "email", Value::String("a@b.example".to_string()));
    assert!(validator.validate(&by_email).is_ok());

    let mut by_referral = message("valopt.sandbox.Registration");
    set(&mut by_referral, "nickname", Value::String("kai".to_string()));
    set(&mut by_referral, "referral", Value::String("r-9".to_string()));
    assert!(validator.validate(&by_referral).is_ok());

    let mut nickname_only = message("valopt.sandbox.Registration");
    set(&mut nickname_only, "nickname", Value::String("kai".to_string()));
    let found = violations(validator.validate(&nickname_only));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field_path(), "");
    assert_eq!(
        found[0].message(),
        "None of the required field combinations is set: `email | nickname & referral`."
    );
}

#[test]
fn distinct_reports_each_duplicated_value_once() {
    let validator = Validator::new();
    let mut roster = message("valopt.sandbox.Roster");
    set(
        &mut roster,
        "codes",
        Value::List(vec![Value::I32(1), Value::I32(2), Value::I32(2), Value::I32(3)]),
    );

    let found = violations(validator.validate(&roster));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field_path(), "codes");
    assert_eq!(found[0].message(), "The value 2 appears more than once.");
    let echoed = found[0].field_value().expect("the duplicate value is echoed");
    assert_eq!(echoed.type_url, "type.googleapis.com/google.protobuf.Int32Value");
    assert_eq!(echoed.value, vec![0x08, 0x02]);
}

#[test]
fn distinct_applies_to_map_values_with_keys_dropped() {
    let validator = Validator::new();
    let mut roster = message("valopt.sandbox.Roster");
    let labels = [
        (MapKey::String("a".to_string()), Value::String("x".to_string())),
        (MapKey::String("b".to_string()), Value::String("x".to_string())),
    ]
    .into_iter()
    .collect();
    set(&mut roster, "labels", Value::Map(labels));

    let found = violations(validator.validate(&roster));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field_path(), "labels");
    assert_eq!(found[0].message(), "The value x appears more than once.");
}

#[test]
fn goes_with_requires_the_companion_field() {
    let validator = Validator::new();
    let mut orphaned = passport("AB1234567", "");
    set(&mut orphaned, "expires_on", Value::String("2030-01-01".to_string()));

    let found = violations(validator.validate(&orphaned));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field_path(), "expires_on");
    assert_eq!(
        found[0].message(),
        "The field `expires_on` can only be set together with `issued_by`."
    );

    let mut paired = passport("AB1234567", "gov");
    set(&mut paired, "expires_on", Value::String("2030-01-01".to_string()));
    assert!(validator.validate(&paired).is_ok());
}

#[test]
fn nested_validation_wraps_child_violations_into_one_parent() {
    let validator = Validator::new();
    let mut traveler = message("valopt.sandbox.Traveler");
    set(&mut traveler, "name", Value::String("Noor".to_string()));
    set(&mut traveler, "passport", Value::Message(passport("", "gov")));

    let found = violations(validator.validate(&traveler));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field_path(), "passport");
    assert_eq!(found[0].message(), "Travel documents must be valid.");

    let nested = found[0].nested();
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].field_path(), "passport.number");
    assert_eq!(nested[0].message(), "Passport number must be provided.");
}

#[test]
fn default_nested_values_are_not_validated() {
    let validator = Validator::new();
    let mut traveler = message("valopt.sandbox.Traveler");
    set(&mut traveler, "name", Value::String("Noor".to_string()));
    // The passport field stays unset; the validate option does not recurse
    // into a default instance.
    assert!(validator.validate(&traveler).is_ok());
}

#[test]
fn repeated_nested_values_are_validated_individually() {
    let validator = Validator::new();
    let mut traveler = message("valopt.sandbox.Traveler");
    set(&mut traveler, "name", Value::String("Noor".to_string()));
    set(
        &mut traveler,
        "old_passports",
        Value::List(vec![
            Value::Message(passport("AB1234567", "gov")),
            Value::Message(passport("", "gov")),
        ]),
    );

    let found = violations(validator.validate(&traveler));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field_path(), "old_passports");
    assert_eq!(found[0].nested().len(), 1);
    assert_eq!(found[0].nested()[0].field_path(), "old_passports.number");
}

#[test]
fn required_oneof_needs_a_populated_non_default_member() {
    let validator = Validator::new();

    let unpopulated = message("valopt.sandbox.Account");
    let found = violations(validator.validate(&unpopulated));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field_path(), "auth");
    assert_eq!(found[0].message(), "One of the fields of the group `auth` must be set.");

    // A populated member holding the default value does not satisfy the
    // group.
    let mut blank_token = message("valopt.sandbox.Account");
    set(&mut blank_token, "token", Value::String(String::new()));
    assert_eq!(violations(validator.validate(&blank_token)).len(), 1);

    let mut with_token = message("valopt.sandbox.Account");
    set(&mut with_token, "token", Value::String("t-1".to_string()));
    assert!(validator.validate(&with_token).is_ok());
}

#[test]
fn enum_fields_are_default_only_at_the_zero_value() {
    let validator = Validator::new();

    let unset = message("valopt.sandbox.Clearance");
    let found = violations(validator.validate(&unset));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field_path(), "level");

    let mut basic = message("valopt.sandbox.Clearance");
    set(&mut basic, "level", Value::EnumNumber(1));
    assert!(validator.validate(&basic).is_ok());
}

#[test]
fn recursion_into_a_cyclic_instance_graph_is_cut_off() {
    let validator = Validator::new();

    let mut shallow = message("valopt.sandbox.Chain");
    set(&mut shallow, "label", Value::String("end".to_string()));
    for _ in 0..5 {
        let mut outer = message("valopt.sandbox.Chain");
        set(&mut outer, "next", Value::Message(shallow));
        shallow = outer;
    }
    assert!(validator.validate(&shallow).is_ok());

    let mut deep = message("valopt.sandbox.Chain");
    set(&mut deep, "label", Value::String("end".to_string()));
    for _ in 0..70 {
        let mut outer = message("valopt.sandbox.Chain");
        set(&mut outer, "next", Value::Message(deep));
        deep = outer;
    }
    match validator.validate(&deep) {
        Err(Error::Schema(err)) => {
            assert!(err.cause.contains("levels"));
            assert!(err.cause.contains("next"));
        }
        other => panic!("expected the depth guard to trip, got {other:?}"),
    }
}

#[test]
fn set_once_admits_first_assignment_and_identical_values() {
    let validator = Validator::new();

    let mut old = message("valopt.sandbox.Account");
    set(&mut old, "token", Value::String("t-1".to_string()));

    let mut first_assignment = message("valopt.sandbox.Account");
    set(&mut first_assignment, "token", Value::String("t-1".to_string()));
    set(&mut first_assignment, "id", Value::String("A".to_string()));
    assert!(validator.validate_change(&old, &first_assignment).is_ok());

    assert!(
        validator
            .validate_change(&first_assignment, &first_assignment)
            .is_ok()
    );
}

#[test]
fn set_once_rejects_overwriting_with_a_different_value() {
    let validator = Validator::new();

    let mut old = message("valopt.sandbox.Account");
    set(&mut old, "token", Value::String("t-1".to_string()));
    set(&mut old, "id", Value::String("A".to_string()));

    let mut new = message("valopt.sandbox.Account");
    set(&mut new, "token", Value::String("t-1".to_string()));
    set(&mut new, "id", Value::String("B".to_string()));

    let found = violations(validator.validate_change(&old, &new));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field_path(), "id");
    assert_eq!(
        found[0].message(),
        "The field `id` already has the value `A` and cannot be set to `B`."
    );
}

#[test]
fn external_constraints_apply_to_the_targeted_context_only() {
    let external = Validator::with_options(&[ValidatorOption::ExternalConstraints(
        SANDBOX_POOL.clone(),
    )]);

    // Reached through Traveler.passport, the external pattern applies.
    let mut traveler = message("valopt.sandbox.Traveler");
    set(&mut traveler, "name", Value::String("Noor".to_string()));
    set(&mut traveler, "passport", Value::Message(passport("ab", "gov")));

    let found = violations(external.validate(&traveler));
    assert_eq!(found.len(), 1);
    let nested = found[0].nested();
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].field_path(), "passport.number");
    assert_eq!(
        nested[0].message(),
        "The string must match the regular expression '^[A-Z]{2}[0-9]{7}$'."
    );

    let mut conforming = message("valopt.sandbox.Traveler");
    set(&mut conforming, "name", Value::String("Noor".to_string()));
    set(
        &mut conforming,
        "passport",
        Value::Message(passport("AB1234567", "gov")),
    );
    assert!(external.validate(&conforming).is_ok());

    // A standalone Passport is not the targeted context; only its own
    // options apply.
    assert!(external.validate(&passport("ab", "gov")).is_ok());

    // Without the registration the engine never sees the external pattern.
    assert!(Validator::new().validate(&traveler).is_ok());
}

#[test]
fn external_constraints_can_be_registered_after_construction() {
    let validator = Validator::new();
    let mut traveler = message("valopt.sandbox.Traveler");
    set(&mut traveler, "name", Value::String("Noor".to_string()));
    set(&mut traveler, "passport", Value::Message(passport("ab", "gov")));

    assert!(validator.validate(&traveler).is_ok());

    validator
        .register_external_constraints(&SANDBOX_POOL)
        .expect("sandbox external constraints are well-formed");

    assert_eq!(violations(validator.validate(&traveler)).len(), 1);
}

#[test]
fn fail_fast_stops_after_the_first_violation() {
    let validator = Validator::new();
    let failing = measurement(2, -1, 0.0, 12345.678);

    assert_eq!(violations(validator.validate(&failing)).len(), 4);
    assert_eq!(
        violations(validator.validate_with(&failing, &[ValidationOption::FailFast])).len(),
        1
    );

    let fail_fast = Validator::with_options(&[ValidatorOption::FailFast]);
    assert_eq!(violations(fail_fast.validate(&failing)).len(), 1);
}

#[test]
fn misapplied_options_are_schema_errors_not_violations() {
    let validator = Validator::new();
    let mismatched = message("valopt.sandbox.Mismatched");

    match validator.validate(&mismatched) {
        Err(Error::Schema(err)) => {
            assert!(err.cause.contains("(range)"));
            assert!(err.cause.contains("valopt.sandbox.Mismatched.code"));
        }
        other => panic!("expected a schema error, got {other:?}"),
    }
}

struct ForbiddenLabelOption;

struct ForbiddenLabelRule;

impl CustomRule for ForbiddenLabelRule {
    fn check(&self, _field: &FieldDescriptor, values: &[Value]) -> Vec<Violation> {
        values
            .iter()
            .filter(|value| value.as_str() == Some("forbidden"))
            .map(|_| Violation::new("The label `%s` is reserved.", vec!["forbidden".to_string()]))
            .collect()
    }
}

impl CustomOption for ForbiddenLabelOption {
    fn name(&self) -> &'static str {
        "forbidden_label"
    }

    fn option_present_at(&self, field: &FieldDescriptor) -> bool {
        field.name() == "label"
    }

    fn build(&self, _field: &FieldDescriptor) -> Result<Arc<dyn CustomRule>, SchemaError> {
        Ok(Arc::new(ForbiddenLabelRule))
    }
}

#[test]
fn custom_options_extend_the_catalogue_and_serve_the_custom_partition() {
    let validator =
        Validator::with_options(&[ValidatorOption::CustomOption(Arc::new(ForbiddenLabelOption))]);

    let mut reserved = message("valopt.sandbox.Tag");
    set(&mut reserved, "label", Value::String("forbidden".to_string()));

    let found = violations(validator.validate(&reserved));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field_path(), "label");
    assert_eq!(found[0].type_name(), "valopt.sandbox.Tag");
    assert_eq!(found[0].message(), "The label `forbidden` is reserved.");

    // The custom-only partition skips the built-in catalogue entirely.
    let mut upper = message("valopt.sandbox.Tag");
    set(&mut upper, "label", Value::String("ABC".to_string()));
    assert!(
        validator
            .validate_with(&upper, &[ValidationOption::CustomOnly])
            .is_ok()
    );
    assert_eq!(violations(validator.validate(&upper)).len(), 1);
}

#[test]
fn violations_serialize_to_the_wire_record() {
    let validator = Validator::new();
    let traveler = message("valopt.sandbox.Traveler");

    let Err(Error::Validation(err)) = validator.validate(&traveler) else {
        panic!("expected violations");
    };
    let protos = err.to_proto();
    assert_eq!(protos.len(), 1);
    assert_eq!(protos[0].field_path, "name");
    assert_eq!(protos[0].msg_format, "A value must be set.");
}
