use prost_reflect::{DescriptorPool, ReflectMessage};
use std::sync::LazyLock;

use crate::config::{ValidationConfig, ValidationOption, ValidatorOption};
use crate::error::{Error, SchemaError};

mod builder;
mod combinator;
mod constraint;
mod context;
mod evaluator;
mod external;
mod lookups;
mod numeric;
mod options;
mod pack;
mod range;
mod value;

use builder::Builder;
use evaluator::ConstraintEvaluator;
use options::OptionRegistry;
use value::MessageValue;

pub use options::{CustomOption, CustomRule};
pub(crate) use options::OptionSelector;

/// Thread-safe validator for Protocol Buffer messages.
///
/// Validates messages against `valopt` options extracted from proto
/// descriptors. Constraints are assembled lazily per message type and cached
/// for reuse across calls.
pub struct Validator {
    builder: Builder,
    config: ValidationConfig,
    /// Construction-time registration error, surfaced on first use.
    init_err: Option<SchemaError>,
}

impl Validator {
    /// Create a new `Validator` with default options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: Builder::new(),
            config: ValidationConfig::default(),
            init_err: None,
        }
    }

    /// Create a new `Validator` with the given options.
    #[must_use]
    pub fn with_options(options: &[ValidatorOption]) -> Self {
        let mut fail_fast = false;
        let mut external_pools = Vec::new();
        let mut registry = OptionRegistry::builtin();

        for opt in options {
            match opt {
                ValidatorOption::FailFast => fail_fast = true,
                ValidatorOption::ExternalConstraints(pool) => external_pools.push(pool.clone()),
                ValidatorOption::CustomOption(option) => {
                    registry.register_custom(std::sync::Arc::clone(option));
                }
            }
        }

        let builder = Builder::with_registry(registry);
        let mut init_err = None;
        for pool in &external_pools {
            if let Err(err) = builder.register_external(pool) {
                init_err = Some(err);
                break;
            }
        }

        Self {
            builder,
            config: ValidationConfig {
                fail_fast,
                selector: OptionSelector::All,
            },
            init_err,
        }
    }

    fn check_init(&self) -> Result<(), Error> {
        match &self.init_err {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }

    /// Validate a message against its `valopt` options.
    ///
    /// # Errors
    ///
    /// Returns an `Error` containing all constraint violations found, or a
    /// schema error if constraint assembly fails.
    pub fn validate<M: ReflectMessage>(&self, msg: &M) -> Result<(), Error> {
        self.validate_with(msg, &[])
    }

    /// Validate a message with per-call validation options.
    ///
    /// # Errors
    ///
    /// Returns an `Error` containing all constraint violations found, or a
    /// schema error if constraint assembly fails.
    pub fn validate_with<M: ReflectMessage>(
        &self,
        msg: &M,
        options: &[ValidationOption],
    ) -> Result<(), Error> {
        self.check_init()?;
        let dynamic = msg.transcode_to_dynamic();
        let cfg = effective_config(self.config, options);
        let mut evaluator = ConstraintEvaluator::new(&self.builder, cfg);
        evaluator.evaluate(&MessageValue::new(&dynamic))?;
        match evaluator.translate() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Validate a change from `old` to `new`, additionally enforcing
    /// `set_once` options: a field already holding a non-default value may
    /// keep it, but not change it.
    ///
    /// # Errors
    ///
    /// Returns an `Error` containing all constraint violations found, or a
    /// schema error if constraint assembly fails or the two messages are of
    /// different types.
    pub fn validate_change<M: ReflectMessage>(&self, old: &M, new: &M) -> Result<(), Error> {
        self.check_init()?;
        let old_dynamic = old.transcode_to_dynamic();
        let new_dynamic = new.transcode_to_dynamic();
        if old_dynamic.descriptor().full_name() != new_dynamic.descriptor().full_name() {
            return Err(SchemaError {
                cause: format!(
                    "cannot validate a change from `{}` to `{}`: the messages must share a type",
                    old_dynamic.descriptor().full_name(),
                    new_dynamic.descriptor().full_name()
                ),
            }
            .into());
        }

        let old_value = MessageValue::new(&old_dynamic);
        let new_value = MessageValue::new(&new_dynamic);

        let mut change_eval = ConstraintEvaluator::new(&self.builder, self.config);
        change_eval.evaluate_change(&old_value, &new_value)?;
        let change_result = match change_eval.translate() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        };

        let (cont, mut acc) =
            crate::error::merge_violations(None, change_result, self.config.fail_fast);
        if cont {
            let mut evaluator = ConstraintEvaluator::new(&self.builder, self.config);
            evaluator.evaluate(&new_value)?;
            let result = match evaluator.translate() {
                Some(err) => Err(err.into()),
                None => Ok(()),
            };
            let (_cont, new_acc) =
                crate::error::merge_violations(acc, result, self.config.fail_fast);
            acc = new_acc;
        }

        match acc {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Register the external constraints declared in a descriptor pool.
    ///
    /// The merged index is published copy-on-write: in-flight validations
    /// keep their snapshot, later ones observe the update. Cached assemblies
    /// are invalidated.
    ///
    /// # Errors
    ///
    /// Returns a schema error when a constraint message does not structurally
    /// match its target; the index is left unchanged in that case.
    pub fn register_external_constraints(&self, pool: &DescriptorPool) -> Result<(), Error> {
        self.check_init()?;
        self.builder.register_external(pool).map_err(Error::from)
    }
}

fn effective_config(base: ValidationConfig, options: &[ValidationOption]) -> ValidationConfig {
    let mut cfg = base;
    for option in options {
        match option {
            ValidationOption::FailFast => cfg.fail_fast = true,
            ValidationOption::CustomOnly => cfg.selector = OptionSelector::CustomOnly,
        }
    }
    cfg
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_VALIDATOR: LazyLock<Validator> = LazyLock::new(Validator::new);

/// Validate a message using a global `Validator` instance.
///
/// This is a convenience function that uses a shared, lazily-initialized
/// validator. For repeated validations with custom or external constraints,
/// construct a dedicated `Validator` instead.
///
/// # Errors
///
/// Returns an `Error` containing all constraint violations found, or a
/// schema error if constraint assembly fails.
pub fn validate<M: ReflectMessage>(msg: &M) -> Result<(), Error> {
    GLOBAL_VALIDATOR.validate(msg)
}
