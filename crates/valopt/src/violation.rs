use std::fmt;

/// A single instance where a validation constraint was not met.
///
/// Wraps the wire-compatible `valopt.ConstraintViolation` message: an error
/// template with positional `%s` placeholders, the ordered parameters
/// substituted into it, the dotted path of the offending field, the qualified
/// name of the type declaring the constraint, an optional echo of the
/// offending value, and the violations of a nested message value when the
/// constraint validates recursively.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Wire-compatible payload and canonical source for all violation state.
    proto: valopt_types::ConstraintViolation,
}

impl Violation {
    /// Create a violation from an error template and its positional
    /// parameters.
    ///
    /// The field path and owning type name are filled in by the evaluator
    /// before the violation is reported.
    #[must_use]
    pub fn new(msg_format: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            proto: valopt_types::ConstraintViolation {
                msg_format: msg_format.into(),
                param: params,
                ..Default::default()
            },
        }
    }

    pub(crate) fn from_proto(proto: valopt_types::ConstraintViolation) -> Self {
        Self { proto }
    }

    /// Serialize this violation into the wire-compatible protobuf message.
    #[must_use]
    pub fn to_proto(&self) -> valopt_types::ConstraintViolation {
        self.proto.clone()
    }

    /// Returns the error template with its positional `%s` placeholders
    /// unsubstituted.
    #[must_use]
    pub fn msg_format(&self) -> &str {
        &self.proto.msg_format
    }

    /// Returns the parameters substituted into the template, in order.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.proto.param
    }

    /// Returns the template with all parameters substituted.
    #[must_use]
    pub fn message(&self) -> String {
        render_template(&self.proto.msg_format, &self.proto.param)
    }

    /// Returns the dotted path from the validated message to the offending
    /// field. Empty for message-level constraints.
    #[must_use]
    pub fn field_path(&self) -> &str {
        &self.proto.field_path
    }

    /// Returns the qualified name of the type declaring the violated
    /// constraint.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.proto.type_name
    }

    /// Returns the offending value, when it could be echoed.
    #[must_use]
    pub fn field_value(&self) -> Option<&prost_types::Any> {
        self.proto.field_value.as_ref()
    }

    /// Returns the violations of the nested message value, for constraints
    /// that validate recursively.
    #[must_use]
    pub fn nested(&self) -> Vec<Violation> {
        self.proto
            .violation
            .iter()
            .cloned()
            .map(Violation::from_proto)
            .collect()
    }

    /// Sets the dotted field path.
    pub fn set_field_path(&mut self, field_path: impl Into<String>) {
        self.proto.field_path = field_path.into();
    }

    /// Sets the qualified name of the type declaring the constraint.
    pub fn set_type_name(&mut self, type_name: impl Into<String>) {
        self.proto.type_name = type_name.into();
    }

    pub(crate) fn with_field_path(mut self, field_path: impl Into<String>) -> Self {
        self.set_field_path(field_path);
        self
    }

    pub(crate) fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.set_type_name(type_name);
        self
    }

    pub(crate) fn set_field_value(&mut self, value: prost_types::Any) {
        self.proto.field_value = Some(value);
    }

    pub(crate) fn with_field_value(mut self, value: Option<prost_types::Any>) -> Self {
        if let Some(value) = value {
            self.set_field_value(value);
        }
        self
    }

    pub(crate) fn push_nested(&mut self, violation: Violation) {
        self.proto.violation.push(violation.proto);
    }

    /// Prepend a parent field path element.
    pub(crate) fn prepend_path(&mut self, parent: &str) {
        if parent.is_empty() {
            return;
        }
        if self.proto.field_path.is_empty() {
            self.proto.field_path = parent.to_string();
        } else {
            self.proto.field_path = format!("{parent}.{}", self.proto.field_path);
        }
    }
}

/// Substitute positional `%s` placeholders with parameters, in order.
/// Placeholders without a matching parameter are left as-is.
fn render_template(format: &str, params: &[String]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut params = params.iter();
    let mut rest = format;
    while let Some(idx) = rest.find("%s") {
        out.push_str(&rest[..idx]);
        match params.next() {
            Some(param) => out.push_str(param),
            None => out.push_str("%s"),
        }
        rest = &rest[idx + 2..];
    }
    out.push_str(rest);
    out
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self.message();
        let message = if message.is_empty() {
            format!("[{}]", self.type_name())
        } else {
            message
        };
        if self.field_path().is_empty() {
            write!(f, "{message}")
        } else {
            write!(f, "{}: {message}", self.field_path())
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::collection::vec;
    use proptest::prelude::*;

    use super::{Violation, render_template};

    #[test]
    fn render_template_substitutes_params_in_order() {
        assert_eq!(
            render_template("expected %s, got %s", &["a".to_string(), "b".to_string()]),
            "expected a, got b"
        );
        assert_eq!(render_template("no placeholders", &["x".to_string()]), "no placeholders");
        assert_eq!(render_template("missing %s and %s", &["one".to_string()]), "missing one and %s");
    }

    #[test]
    fn display_prefixes_field_path_and_falls_back_to_type_name() {
        let mut violation = Violation::new("The string must match '%s'.", vec!["^a$".to_string()]);
        violation.set_field_path("name");
        assert_eq!(violation.to_string(), "name: The string must match '^a$'.");

        let mut bare = Violation::new("", Vec::new());
        bare.set_type_name("sandbox.Passport");
        assert_eq!(bare.to_string(), "[sandbox.Passport]");
    }

    #[test]
    fn prepend_path_joins_with_dots() {
        let mut violation = Violation::new("A value must be set.", Vec::new());
        violation.prepend_path("passport");
        assert_eq!(violation.field_path(), "passport");

        violation.set_field_path("number");
        violation.prepend_path("passport");
        assert_eq!(violation.field_path(), "passport.number");

        violation.prepend_path("traveler");
        assert_eq!(violation.field_path(), "traveler.passport.number");
    }

    #[test]
    fn nested_violations_round_trip_through_proto() {
        let child = Violation::new("A value must be set.", Vec::new()).with_field_path("number");
        let mut parent = Violation::new("The message must have valid properties.", Vec::new());
        parent.set_field_path("passport");
        parent.push_nested(child.clone());

        let proto = parent.to_proto();
        assert_eq!(proto.violation.len(), 1);
        assert_eq!(parent.nested(), vec![child]);
    }

    proptest! {
        #[test]
        fn params_survive_proto_round_trip(
            template in "[ -~]{0,40}",
            params in vec("[ -~]{0,12}", 0..4),
        ) {
            let violation = Violation::new(template.clone(), params.clone());
            let restored = Violation::from_proto(violation.to_proto());
            prop_assert_eq!(restored.msg_format(), template.as_str());
            prop_assert_eq!(restored.params(), params.as_slice());
        }

        #[test]
        fn rendered_message_consumes_at_most_all_params(
            params in vec("[a-z]{1,8}", 1..4),
        ) {
            let template = vec!["%s"; params.len()].join(", ");
            let violation = Violation::new(template, params.clone());
            prop_assert_eq!(violation.message(), params.join(", "));
        }
    }
}
