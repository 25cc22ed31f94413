use std::sync::Arc;

use prost_reflect::DescriptorPool;

use crate::validator::{CustomOption, OptionSelector};

/// Options for configuring the `Validator` at construction time.
#[non_exhaustive]
pub enum ValidatorOption {
    /// Stop validation on the first violation instead of collecting all.
    FailFast,

    /// Register the external constraints declared in this descriptor pool.
    ///
    /// Every message type in the pool carrying a `(valopt.constraint_for)`
    /// option is checked for structural compatibility with its target and
    /// merged into the validator's external constraint index.
    ExternalConstraints(DescriptorPool),

    /// Register a custom validating option.
    ///
    /// Custom options are assembled alongside the built-in catalogue and are
    /// additionally served by the custom-only partition used with
    /// [`ValidationOption::CustomOnly`].
    CustomOption(Arc<dyn CustomOption>),
}

/// Options for configuring a single `Validator::validate_with` call.
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub enum ValidationOption {
    /// Stop validation on the first violation instead of collecting all.
    FailFast,

    /// Evaluate only constraints produced by registered custom options,
    /// skipping the built-in catalogue.
    CustomOnly,
}

/// Runtime configuration passed to the evaluator during validation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ValidationConfig {
    pub fail_fast: bool,
    pub selector: OptionSelector,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            selector: OptionSelector::All,
        }
    }
}
