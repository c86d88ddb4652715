//! Error types for Jii.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`JiiError`] - Top-level error type for all Jii operations
//! - [`ConfigError`] - Invalid configuration (unknown types, ambiguous keys, ...)
//! - [`PropertyError`] - Dynamic property access failures
//!
//! Configuration and property errors are raised at the point of violation.
//! Routing failures are reported separately by the dispatch layer.

use parking_lot::RwLock;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Jii operations.
#[derive(Error, Debug)]
pub enum JiiError {
    /// The configuration could not be applied.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A dynamic property could not be read or written.
    #[error("{0}")]
    Property(#[from] PropertyError),

    /// An action could not be resolved to a runnable unit.
    #[error("invalid route: {0}")]
    InvalidRoute(String),

    /// A generic operational failure.
    #[error("application error: {0}")]
    Application(String),

    /// A custom error raised by user code.
    #[error(transparent)]
    Custom(BoxError),
}

impl JiiError {
    /// Wrap any error raised by user code.
    pub fn custom(err: impl Into<BoxError>) -> Self {
        JiiError::Custom(err.into())
    }

    /// Shorthand for [`JiiError::Application`].
    pub fn application(message: impl Into<String>) -> Self {
        JiiError::Application(message.into())
    }
}

/// Errors raised while turning configuration into live objects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No constructor is registered under the given name.
    #[error("unknown class: {0}")]
    UnknownClass(String),

    /// The name resolves, but not to a constructible of the requested kind.
    #[error("class `{class}` is not a constructible {kind}")]
    NotConstructible {
        /// The resolved class name.
        class: String,
        /// The product kind that was requested.
        kind: &'static str,
    },

    /// A configuration object without a `className` key was given where one is required.
    #[error("object configuration must contain a `className` key")]
    MissingClassName,

    /// The configuration value has the wrong shape.
    #[error("malformed configuration: {0}")]
    Malformed(String),

    /// Both a public field and a setter exist for the same key.
    #[error("`{type_name}` exposes both a field and a setter for `{property}`")]
    Ambiguous {
        /// Type being configured.
        type_name: String,
        /// Offending key.
        property: String,
    },

    /// The key names an existing method, which configuration may not override.
    #[error("cannot override method `{type_name}::{property}` through configuration")]
    MethodOverride {
        /// Type being configured.
        type_name: String,
        /// Offending key.
        property: String,
    },

    /// The key is not known to the target type.
    #[error("unknown configuration key `{property}` for `{type_name}`")]
    UnknownKey {
        /// Type being configured.
        type_name: String,
        /// Offending key.
        property: String,
    },

    /// An `@alias` could not be resolved.
    #[error("invalid path alias: {0}")]
    InvalidAlias(String),
}

/// Errors raised by dynamic property access on components.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// Neither an accessor nor a field exists under this name.
    #[error("unknown property: {type_name}::{property}")]
    Unknown {
        /// Type being accessed.
        type_name: String,
        /// Property name.
        property: String,
    },

    /// Only a getter exists.
    #[error("setting read-only property: {type_name}::{property}")]
    ReadOnly {
        /// Type being accessed.
        type_name: String,
        /// Property name.
        property: String,
    },

    /// Only a setter exists.
    #[error("getting write-only property: {type_name}::{property}")]
    WriteOnly {
        /// Type being accessed.
        type_name: String,
        /// Property name.
        property: String,
    },

    /// The value does not fit the property.
    #[error("invalid value for {type_name}::{property}: expected {expected}")]
    InvalidValue {
        /// Type being accessed.
        type_name: String,
        /// Property name.
        property: String,
        /// Human readable expectation.
        expected: &'static str,
    },
}

impl PropertyError {
    /// Build an [`PropertyError::Unknown`].
    pub fn unknown(type_name: &str, property: &str) -> Self {
        PropertyError::Unknown {
            type_name: type_name.to_string(),
            property: property.to_string(),
        }
    }

    /// Build an [`PropertyError::InvalidValue`].
    pub fn invalid(type_name: &str, property: &str, expected: &'static str) -> Self {
        PropertyError::InvalidValue {
            type_name: type_name.to_string(),
            property: property.to_string(),
            expected,
        }
    }
}

// Convenience conversions
impl From<BoxError> for JiiError {
    fn from(err: BoxError) -> Self {
        JiiError::Custom(err)
    }
}

// ============================================================================
// Catch handler
// ============================================================================

type CatchHandler = Arc<dyn Fn(&JiiError) + Send + Sync>;

static CATCH_HANDLER: LazyLock<RwLock<Option<CatchHandler>>> = LazyLock::new(Default::default);

/// Install the process-wide handler receiving errors intercepted during dispatch.
pub fn set_catch_handler<F>(handler: F)
where
    F: Fn(&JiiError) + Send + Sync + 'static,
{
    *CATCH_HANDLER.write() = Some(Arc::new(handler));
}

/// Restore the default catch handler, which logs through `tracing`.
pub fn reset_catch_handler() {
    *CATCH_HANDLER.write() = None;
}

/// Hand `err` to the process-wide catch handler.
pub fn report_error(err: &JiiError) {
    let handler = CATCH_HANDLER.read().clone();
    match handler {
        Some(handler) => handler(err),
        None => tracing::error!(error = %err, "unhandled error"),
    }
}
