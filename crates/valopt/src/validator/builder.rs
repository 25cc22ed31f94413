use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use prost_reflect::{DescriptorPool, MessageDescriptor};

use valopt_types::{MessageOptionsExt, OneofOptionsExt};

use crate::error::SchemaError;
use crate::validator::combinator::RequiredFieldExpression;
use crate::validator::constraint::{
    Constraint, ConstraintSet, RequiredFieldConstraint, RequiredOneofConstraint,
};
use crate::validator::context::FieldContext;
use crate::validator::external::ExternalConstraintRegistry;
use crate::validator::options::{
    OptionRegistry, OptionSelector, REQUIRED_FIELD_TEMPLATE, REQUIRED_ONEOF_TEMPLATE,
};

/// Key of the assembly caches: the validated type plus the field context it
/// is validated under. The option partition picks the cache, not the key.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ConstraintKey {
    type_name: String,
    context: FieldContext,
}

type ConstraintCache = HashMap<ConstraintKey, Arc<ConstraintSet>>;

/// Build-through cache of assembled constraint sets.
///
/// Assembly for a given key is pure, so results are memoized with
/// compute-once semantics: a fast read path under the `RwLock`, then the
/// build `Mutex` with a double-check so concurrent requesters never assemble
/// the same key twice and always observe the same `Arc`. The all-options and
/// custom-only partitions are cached independently. Assembly errors are not
/// cached; an erroring key fails the same way on every request.
pub(crate) struct Builder {
    /// Serializes cache writes.
    build_lock: Mutex<()>,
    all_cache: RwLock<ConstraintCache>,
    custom_cache: RwLock<ConstraintCache>,
    registry: OptionRegistry,
    external: ExternalConstraintRegistry,
}

impl Builder {
    pub fn new() -> Self {
        Self::with_registry(OptionRegistry::builtin())
    }

    pub fn with_registry(registry: OptionRegistry) -> Self {
        Self {
            build_lock: Mutex::new(()),
            all_cache: RwLock::new(HashMap::new()),
            custom_cache: RwLock::new(HashMap::new()),
            registry,
            external: ExternalConstraintRegistry::new(),
        }
    }

    fn cache(&self, selector: OptionSelector) -> &RwLock<ConstraintCache> {
        match selector {
            OptionSelector::All => &self.all_cache,
            OptionSelector::CustomOnly => &self.custom_cache,
        }
    }

    fn read_cache(
        &self,
        selector: OptionSelector,
    ) -> std::sync::RwLockReadGuard<'_, ConstraintCache> {
        self.cache(selector)
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_cache(
        &self,
        selector: OptionSelector,
    ) -> std::sync::RwLockWriteGuard<'_, ConstraintCache> {
        self.cache(selector)
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_build(&self) -> std::sync::MutexGuard<'_, ()> {
        self.build_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Load the cached constraint set for a `(type, context)` pair, or
    /// assemble and cache it.
    pub fn assemble(
        &self,
        descriptor: &MessageDescriptor,
        context: &FieldContext,
        selector: OptionSelector,
    ) -> Result<Arc<ConstraintSet>, SchemaError> {
        let key = ConstraintKey {
            type_name: descriptor.full_name().to_string(),
            context: context.clone(),
        };

        // Fast path
        {
            let cache = self.read_cache(selector);
            if let Some(set) = cache.get(&key) {
                return Ok(Arc::clone(set));
            }
        }

        // Slow path
        let _guard = self.lock_build();

        {
            let cache = self.read_cache(selector);
            if let Some(set) = cache.get(&key) {
                return Ok(Arc::clone(set));
            }
        }

        let set = Arc::new(self.build(descriptor, context, selector)?);
        self.write_cache(selector).insert(key, Arc::clone(&set));
        Ok(set)
    }

    fn build(
        &self,
        descriptor: &MessageDescriptor,
        context: &FieldContext,
        selector: OptionSelector,
    ) -> Result<ConstraintSet, SchemaError> {
        let mut constraints = Vec::new();

        for field in descriptor.fields() {
            for option in self.registry.partition(selector) {
                if option.should_validate(&field, &field)? {
                    constraints.push(option.constraint_for(&field, &field)?);
                }
            }
        }

        if selector == OptionSelector::All {
            if let Some(source) = descriptor.required_field_option() {
                let expression = RequiredFieldExpression::parse(&source);
                expression.check_against(descriptor)?;
                constraints.push(Constraint::RequiredField(RequiredFieldConstraint {
                    expression,
                    error_template: REQUIRED_FIELD_TEMPLATE.to_string(),
                }));
            }

            for oneof in descriptor.oneofs() {
                if oneof.is_synthetic() {
                    continue;
                }
                if oneof.is_required_option() {
                    constraints.push(Constraint::RequiredOneof(RequiredOneofConstraint {
                        oneof: oneof.clone(),
                        error_template: REQUIRED_ONEOF_TEMPLATE.to_string(),
                    }));
                }
            }
        }

        // External constraints declared for the field this type is validated
        // under. Structural compatibility was verified at registration, but
        // registration checked against a possibly different pool, so the
        // lookup failure is still reported rather than unwrapped.
        if let Some(leaf) = context.leaf() {
            let snapshot = self.external.snapshot();
            if let Some(externals) = snapshot.get(leaf.full_name()) {
                for external in externals {
                    for declared in external.constraint_type().fields() {
                        let target =
                            descriptor.get_field_by_name(declared.name()).ok_or_else(|| {
                                SchemaError {
                                    cause: format!(
                                        "external constraint `{}` declares `{}`, which is not \
                                         a field of `{}`",
                                        external.constraint_type().full_name(),
                                        declared.name(),
                                        descriptor.full_name()
                                    ),
                                }
                            })?;
                        for option in self.registry.partition(selector) {
                            if option.should_validate(&target, &declared)? {
                                constraints.push(option.constraint_for(&target, &declared)?);
                            }
                        }
                    }
                }
            }
        }

        Ok(ConstraintSet::new(descriptor.full_name(), constraints))
    }

    /// Merge the external constraints of a pool into the index and drop all
    /// cached assemblies, since any of them may now be incomplete.
    pub fn register_external(&self, pool: &DescriptorPool) -> Result<(), SchemaError> {
        self.external.load(pool)?;
        self.invalidate();
        Ok(())
    }

    fn invalidate(&self) {
        let _guard = self.lock_build();
        self.write_cache(OptionSelector::All).clear();
        self.write_cache(OptionSelector::CustomOnly).clear();
    }
}
