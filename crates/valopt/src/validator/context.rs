use std::fmt;
use std::hash::{Hash, Hasher};

use prost_reflect::FieldDescriptor;

/// An ordered chain of field identities from a root message down to a
/// (possibly nested) field.
///
/// Constraint assembly is keyed by the pair of a message type and the context
/// it is validated under, so equality and hashing cover the full chain, not
/// just the leaf. Rendering joins the field names with dots for reporting.
#[derive(Clone, Default)]
pub(crate) struct FieldContext {
    chain: Vec<FieldDescriptor>,
}

impl FieldContext {
    /// The context of a message validated at the root.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A context rooted at a single field, for validating a field value in
    /// isolation.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn of(field: FieldDescriptor) -> Self {
        Self { chain: vec![field] }
    }

    /// The context one field deeper than this one.
    pub fn nested(&self, field: &FieldDescriptor) -> Self {
        let mut chain = self.chain.clone();
        chain.push(field.clone());
        Self { chain }
    }

    /// The innermost field of the chain, if the context is not the root.
    pub fn leaf(&self) -> Option<&FieldDescriptor> {
        self.chain.last()
    }

    pub fn is_root(&self) -> bool {
        self.chain.is_empty()
    }

    /// Dotted path of field names from the root, e.g. `traveler.passport`.
    pub fn field_path(&self) -> String {
        self.chain
            .iter()
            .map(FieldDescriptor::name)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl PartialEq for FieldContext {
    fn eq(&self, other: &Self) -> bool {
        self.chain.len() == other.chain.len()
            && self
                .chain
                .iter()
                .zip(&other.chain)
                .all(|(a, b)| a.full_name() == b.full_name() && a.number() == b.number())
    }
}

impl Eq for FieldContext {}

impl Hash for FieldContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for field in &self.chain {
            field.full_name().hash(state);
            field.number().hash(state);
        }
    }
}

impl fmt::Debug for FieldContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldContext({})", self.field_path())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::FieldContext;
    use crate::validator::testing::sandbox_field;

    #[test]
    fn renders_dotted_path_from_root() {
        let passport = sandbox_field("valopt.sandbox.Traveler", "passport");
        let number = sandbox_field("valopt.sandbox.Passport", "number");

        let context = FieldContext::empty().nested(&passport).nested(&number);
        assert_eq!(context.field_path(), "passport.number");
        assert_eq!(context.leaf().map(|f| f.name().to_string()), Some("number".to_string()));
    }

    #[test]
    fn equality_covers_the_full_chain_not_just_the_leaf() {
        let passport = sandbox_field("valopt.sandbox.Traveler", "passport");
        let old_passports = sandbox_field("valopt.sandbox.Traveler", "old_passports");
        let number = sandbox_field("valopt.sandbox.Passport", "number");

        let through_current = FieldContext::empty().nested(&passport).nested(&number);
        let through_old = FieldContext::empty().nested(&old_passports).nested(&number);

        assert_eq!(through_current, FieldContext::empty().nested(&passport).nested(&number));
        assert_ne!(through_current, through_old);
        assert_ne!(FieldContext::of(number.clone()), through_current);
    }

    #[test]
    fn usable_as_a_cache_key() {
        let passport = sandbox_field("valopt.sandbox.Traveler", "passport");
        let mut cache = HashMap::new();
        cache.insert(FieldContext::empty(), "root");
        cache.insert(FieldContext::of(passport.clone()), "passport");

        assert_eq!(cache.get(&FieldContext::empty()), Some(&"root"));
        assert_eq!(cache.get(&FieldContext::of(passport)), Some(&"passport"));
    }
}
