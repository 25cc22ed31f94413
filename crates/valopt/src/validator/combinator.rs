use prost_reflect::MessageDescriptor;

use crate::error::SchemaError;
use crate::validator::value::MessageValue;

/// The boolean field combination of a `(valopt.required_field)` option.
///
/// The expression is a disjunction of alternatives separated by `|`, each
/// alternative a conjunction of field names joined by `&`: `"a|b&c"` reads
/// *`a` is set* OR *(`b` is set AND `c` is set)*. `|` binds looser than `&`;
/// parentheses are not supported. Whitespace is insignificant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequiredFieldExpression {
    source: String,
    alternatives: Vec<Vec<String>>,
}

impl RequiredFieldExpression {
    /// Parse an expression. An empty (or all-whitespace) option string yields
    /// an expression with no alternatives, which is trivially satisfied.
    pub fn parse(source: &str) -> Self {
        let stripped: String = source.chars().filter(|c| !c.is_whitespace()).collect();
        let alternatives = if stripped.is_empty() {
            Vec::new()
        } else {
            stripped
                .split('|')
                .map(|alternative| alternative.split('&').map(str::to_owned).collect())
                .collect()
        };
        Self {
            source: source.to_string(),
            alternatives,
        }
    }

    /// Verify every named field exists on the message type.
    ///
    /// # Errors
    ///
    /// A name that does not resolve to a field is a schema error, reported at
    /// assembly time rather than per message.
    pub fn check_against(&self, message: &MessageDescriptor) -> Result<(), SchemaError> {
        for alternative in &self.alternatives {
            for name in alternative {
                if name.is_empty() {
                    return Err(SchemaError {
                        cause: format!(
                            "the required-field expression `{}` on `{}` contains an empty \
                             field name",
                            self.source,
                            message.full_name()
                        ),
                    });
                }
                if message.get_field_by_name(name).is_none() {
                    return Err(SchemaError {
                        cause: format!(
                            "the required-field expression `{}` names `{name}`, which is not \
                             a field of `{}`",
                            self.source,
                            message.full_name()
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Whether at least one alternative has all of its fields set to
    /// non-default values. An expression with no alternatives is satisfied.
    pub fn is_satisfied(&self, message: &MessageValue<'_>) -> bool {
        if self.alternatives.is_empty() {
            return true;
        }
        self.alternatives.iter().any(|alternative| {
            alternative.iter().all(|name| {
                message
                    .value_of_name(name)
                    .is_some_and(|value| !value.is_default())
            })
        })
    }

    /// The option string as written in the schema.
    pub fn source(&self) -> &str {
        &self.source
    }
}
