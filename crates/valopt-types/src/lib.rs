//! Generated Rust types for the `valopt` validation option schema, built with
//! `prost` and `prost-reflect`.
//!
//! This crate provides:
//!
//! - All message types from `valopt/options.proto` (option payloads such as
//!   [`MinOption`], [`PatternOption`], [`DigitsOption`], and the
//!   wire-compatible [`ConstraintViolation`] record).
//! - A shared [`DESCRIPTOR_POOL`] containing the file descriptor set for
//!   runtime reflection.
//! - Extension traits for extracting validation options from descriptors:
//!   - [`FieldOptionsExt`] — `valopt.*` field options on a
//!     [`FieldDescriptor`].
//!   - [`MessageOptionsExt`] — `valopt.required_field` and
//!     `valopt.constraint_for` on a [`MessageDescriptor`].
//!   - [`OneofOptionsExt`] — `valopt.is_required` on a [`OneofDescriptor`].
//!
//! Option extensions are resolved against the pool the inspected descriptor
//! belongs to, so the traits work both for the pool embedded in this crate and
//! for descriptor pools loaded by consumers, as long as those pools include
//! `valopt/options.proto`.
//!
//! # Usage
//!
//! Most users do not need this crate directly — the `valopt` crate re-exports
//! everything required for validation via its `types` module. Use this crate
//! when you only need the generated types or descriptor pool without the
//! evaluation engine.

#![warn(missing_docs)]

#[allow(
    missing_docs,
    clippy::len_without_is_empty,
    clippy::doc_lazy_continuation,
    clippy::doc_markdown,
    clippy::must_use_candidate
)]
mod proto;

use prost_reflect::{
    DescriptorPool, DynamicMessage, FieldDescriptor, MessageDescriptor, OneofDescriptor, Value,
};

pub use proto::*;

/// Returned when an option extension payload cannot be decoded into its
/// generated message type.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode option ({option}) on `{target}`: {cause}")]
pub struct OptionDecodeError {
    /// Short name of the option that failed to decode.
    pub option: &'static str,
    /// Fully qualified name of the declaration carrying the option.
    pub target: String,
    /// Description of the decode failure.
    pub cause: String,
}

/// Read an extension value off an options message, resolving the extension
/// descriptor in the given pool. Returns `None` when the pool does not know
/// the extension or the options message does not set it.
fn extension_value(options: &DynamicMessage, pool: &DescriptorPool, name: &str) -> Option<Value> {
    let ext = pool.get_extension_by_name(name)?;
    if !options.has_extension(&ext) {
        return None;
    }
    Some(options.get_extension(&ext).into_owned())
}

fn bool_extension(options: &DynamicMessage, pool: &DescriptorPool, name: &str) -> bool {
    extension_value(options, pool, name)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn string_extension(
    options: &DynamicMessage,
    pool: &DescriptorPool,
    name: &str,
) -> Option<String> {
    extension_value(options, pool, name)
        .and_then(|v| v.as_str().map(str::to_owned))
        .filter(|s| !s.is_empty())
}

fn message_extension<T: prost::Message + Default>(
    options: &DynamicMessage,
    pool: &DescriptorPool,
    name: &'static str,
    target: &str,
) -> Result<Option<T>, OptionDecodeError> {
    let Some(value) = extension_value(options, pool, name) else {
        return Ok(None);
    };
    let Some(message) = value.as_message() else {
        return Ok(None);
    };
    message
        .transcode_to::<T>()
        .map(Some)
        .map_err(|err| OptionDecodeError {
            option: name,
            target: target.to_string(),
            cause: err.to_string(),
        })
}

/// Extension trait for extracting `valopt.*` field options from a field
/// descriptor.
pub trait FieldOptionsExt {
    /// Returns true if the field carries `(valopt.required) = true`.
    fn required_option(&self) -> bool;

    /// Returns the `(valopt.if_missing)` template override, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension value cannot be transcoded.
    fn if_missing_option(&self) -> Result<Option<IfMissingOption>, OptionDecodeError>;

    /// Returns the `(valopt.min)` bound, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension value cannot be transcoded.
    fn min_option(&self) -> Result<Option<MinOption>, OptionDecodeError>;

    /// Returns the `(valopt.max)` bound, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension value cannot be transcoded.
    fn max_option(&self) -> Result<Option<MaxOption>, OptionDecodeError>;

    /// Returns the `(valopt.decimal_min)` bound, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension value cannot be transcoded.
    fn decimal_min_option(&self) -> Result<Option<DecimalMinOption>, OptionDecodeError>;

    /// Returns the `(valopt.decimal_max)` bound, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension value cannot be transcoded.
    fn decimal_max_option(&self) -> Result<Option<DecimalMaxOption>, OptionDecodeError>;

    /// Returns the `(valopt.digits)` limits, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension value cannot be transcoded.
    fn digits_option(&self) -> Result<Option<DigitsOption>, OptionDecodeError>;

    /// Returns the `(valopt.range)` interval expression, if any.
    fn range_option(&self) -> Option<String>;

    /// Returns the `(valopt.pattern)` regular expression, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension value cannot be transcoded.
    fn pattern_option(&self) -> Result<Option<PatternOption>, OptionDecodeError>;

    /// Returns true if the field carries `(valopt.distinct) = true`.
    fn distinct_option(&self) -> bool;

    /// Returns the `(valopt.goes_with)` companion field name, if any.
    fn goes_with_option(&self) -> Option<String>;

    /// Returns true if the field carries `(valopt.validate) = true`.
    fn validate_option(&self) -> bool;

    /// Returns the `(valopt.if_invalid)` template override, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension value cannot be transcoded.
    fn if_invalid_option(&self) -> Result<Option<IfInvalidOption>, OptionDecodeError>;

    /// Returns true if the field carries `(valopt.set_once) = true`.
    fn set_once_option(&self) -> bool;
}

impl FieldOptionsExt for FieldDescriptor {
    fn required_option(&self) -> bool {
        bool_extension(
            &self.options(),
            &self.parent_message().parent_pool(),
            "valopt.required",
        )
    }

    fn if_missing_option(&self) -> Result<Option<IfMissingOption>, OptionDecodeError> {
        message_extension(
            &self.options(),
            &self.parent_message().parent_pool(),
            "valopt.if_missing",
            self.full_name(),
        )
    }

    fn min_option(&self) -> Result<Option<MinOption>, OptionDecodeError> {
        message_extension(
            &self.options(),
            &self.parent_message().parent_pool(),
            "valopt.min",
            self.full_name(),
        )
    }

    fn max_option(&self) -> Result<Option<MaxOption>, OptionDecodeError> {
        message_extension(
            &self.options(),
            &self.parent_message().parent_pool(),
            "valopt.max",
            self.full_name(),
        )
    }

    fn decimal_min_option(&self) -> Result<Option<DecimalMinOption>, OptionDecodeError> {
        message_extension(
            &self.options(),
            &self.parent_message().parent_pool(),
            "valopt.decimal_min",
            self.full_name(),
        )
    }

    fn decimal_max_option(&self) -> Result<Option<DecimalMaxOption>, OptionDecodeError> {
        message_extension(
            &self.options(),
            &self.parent_message().parent_pool(),
            "valopt.decimal_max",
            self.full_name(),
        )
    }

    fn digits_option(&self) -> Result<Option<DigitsOption>, OptionDecodeError> {
        message_extension(
            &self.options(),
            &self.parent_message().parent_pool(),
            "valopt.digits",
            self.full_name(),
        )
    }

    fn range_option(&self) -> Option<String> {
        string_extension(
            &self.options(),
            &self.parent_message().parent_pool(),
            "valopt.range",
        )
    }

    fn pattern_option(&self) -> Result<Option<PatternOption>, OptionDecodeError> {
        message_extension(
            &self.options(),
            &self.parent_message().parent_pool(),
            "valopt.pattern",
            self.full_name(),
        )
    }

    fn distinct_option(&self) -> bool {
        bool_extension(
            &self.options(),
            &self.parent_message().parent_pool(),
            "valopt.distinct",
        )
    }

    fn goes_with_option(&self) -> Option<String> {
        string_extension(
            &self.options(),
            &self.parent_message().parent_pool(),
            "valopt.goes_with",
        )
    }

    fn validate_option(&self) -> bool {
        bool_extension(
            &self.options(),
            &self.parent_message().parent_pool(),
            "valopt.validate",
        )
    }

    fn if_invalid_option(&self) -> Result<Option<IfInvalidOption>, OptionDecodeError> {
        message_extension(
            &self.options(),
            &self.parent_message().parent_pool(),
            "valopt.if_invalid",
            self.full_name(),
        )
    }

    fn set_once_option(&self) -> bool {
        bool_extension(
            &self.options(),
            &self.parent_message().parent_pool(),
            "valopt.set_once",
        )
    }
}

/// Extension trait for extracting `valopt.*` message options from a message
/// descriptor.
pub trait MessageOptionsExt {
    /// Returns the `(valopt.required_field)` combinator expression, if any.
    fn required_field_option(&self) -> Option<String>;

    /// Returns the `(valopt.constraint_for)` target list, if any.
    fn constraint_for_option(&self) -> Option<String>;
}

impl MessageOptionsExt for MessageDescriptor {
    fn required_field_option(&self) -> Option<String> {
        string_extension(&self.options(), &self.parent_pool(), "valopt.required_field")
    }

    fn constraint_for_option(&self) -> Option<String> {
        string_extension(&self.options(), &self.parent_pool(), "valopt.constraint_for")
    }
}

/// Extension trait for extracting the `valopt.is_required` oneof option from
/// a oneof descriptor.
pub trait OneofOptionsExt {
    /// Returns true if exactly one member of the oneof must be populated.
    fn is_required_option(&self) -> bool;
}

impl OneofOptionsExt for OneofDescriptor {
    fn is_required_option(&self) -> bool {
        bool_extension(
            &self.options(),
            &self.parent_message().parent_pool(),
            "valopt.is_required",
        )
    }
}
