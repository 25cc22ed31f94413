//! Runtime validation for Protocol Buffer messages using `valopt` schema
//! options.
//!
//! This crate dynamically inspects `prost-reflect` message descriptors at
//! runtime, assembles constraints from `valopt.*` option annotations
//! (required fields, numeric ranges, string patterns, distinct collections,
//! recursive validation, and more), and evaluates them against concrete
//! message instances.
//!
//! # Quick start
//!
//! For one-off validation, use the [`validate`] convenience function:
//!
//! ```rust,no_run
//! use valopt::validate;
//! # fn example(msg: impl prost_reflect::ReflectMessage) {
//! match validate(&msg) {
//!     Ok(()) => { /* message is valid */ }
//!     Err(e) => eprintln!("validation failed: {e}"),
//! }
//! # }
//! ```
//!
//! For repeated validations, construct a [`Validator`] once to cache
//! assembled constraints across calls:
//!
//! ```rust,no_run
//! use valopt::Validator;
//! # fn example(msg: impl prost_reflect::ReflectMessage) {
//! let validator = Validator::new();
//! validator.validate(&msg).expect("message should be valid");
//! # }
//! ```
//!
//! Builders gating an update can additionally enforce `set_once` options
//! with [`Validator::validate_change`].
//!
//! # Error types
//!
//! | Type | When |
//! |------|------|
//! | [`ValidationError`] | One or more constraint violations detected |
//! | [`SchemaError`] | An option could not be assembled into a constraint |
//!
//! Both are unified under [`Error`]. Violations are data: the evaluator
//! always runs to completion and reports everything it found. Schema errors
//! are programmer errors and abort assembly immediately.
//!
//! # Re-exported types
//!
//! The [`types`] module re-exports `valopt-types` so consumers do not need
//! to depend on it directly.

#![warn(missing_docs)]

mod config;
mod error;
mod validator;
mod violation;

/// Re-export of `valopt-types` for accessing generated `valopt` proto types
/// and the descriptor pool.
pub use valopt_types as types;

pub use config::{ValidationOption, ValidatorOption};
pub use error::{Error, SchemaError, ValidationError};
pub use validator::{CustomOption, CustomRule, Validator, validate};
pub use violation::Violation;
