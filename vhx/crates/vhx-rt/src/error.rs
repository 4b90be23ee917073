//! Error Module - variable handle error types
//!
//! Defines all error types surfaced by the runtime.
//!
//! # Error Categories
//!
//! ## Usage Errors
//! - `UnsupportedOperation` - access not legal for the handle's location
//! - `WrongMethodType` - arity or call-site signature mismatch
//! - `WrongType` - value of the wrong type for the element type
//! - `NullReceiver` - null receiver or array coordinate
//! - `ClassCast` - receiver or reference not assignable
//! - `IndexOutOfRange` - array index outside the live array
//!
//! ## Linkage Errors
//! - `InitializationFailure` - class initializer failed (cached)
//! - `IllegalAccess` - member not accessible from the lookup
//! - `ClassNotFound` - no class with that name in the loader chain
//! - `NoSuchField` - no field with that name and type
//! - `ClassFormat` - malformed class description bytes
//!
//! ## Configuration Errors
//! - `Configuration` - invalid runtime configuration

use std::sync::Arc;
use thiserror::Error;
use vhx_util::SymbolError;

/// Main error type for all runtime operations
///
/// # Examples
///
/// ```rust
/// use vhx_rt::error::VhError;
///
/// fn describe(err: &VhError) -> &'static str {
///     match err {
///         VhError::UnsupportedOperation { .. } => "illegal access",
///         VhError::InitializationFailure { .. } => "class is unusable",
///         _ => "other",
///     }
/// }
/// # let _ = describe;
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VhError {
    /// The access is not supported by the handle
    ///
    /// **When returned:** Invoking or adapting an (AccessMode, Ordering) pair
    /// outside the handle's supported set, e.g. `getAndAdd` on a boolean
    ///
    /// **Recovery strategy:** None; storage is left untouched
    #[error("Unsupported access mode {access} for {location}")]
    UnsupportedOperation { access: String, location: String },

    /// The call does not match the access method type
    ///
    /// **When returned:** Wrong number of arguments, or an exact invoker
    /// called with a call-site type different from the access type
    ///
    /// **Recovery strategy:** Fix the caller
    #[error("Wrong method type: expected {expected}, got {actual}")]
    WrongMethodType { expected: String, actual: String },

    /// An argument has the wrong type
    ///
    /// **When returned:** A value argument is not exactly the element type,
    /// or an array index is not an `int`
    ///
    /// **Recovery strategy:** Fix the caller; no implicit conversion is made
    #[error("Wrong type: expected {expected}, got {actual}")]
    WrongType { expected: String, actual: String },

    /// Null receiver or array coordinate
    #[error("Null receiver for {location}")]
    NullReceiver { location: String },

    /// A reference is not assignable to the expected class
    ///
    /// **When returned:** Receiver of the wrong class, a reference value not
    /// assignable to a reference element type, or class data requested with
    /// the wrong Rust type
    #[error("Class cast: {actual} cannot be cast to {expected}")]
    ClassCast { expected: String, actual: String },

    /// Array index outside `[0, length)`
    ///
    /// **When returned:** Every access mode, including both branches of the
    /// compare-based modes
    ///
    /// **Recovery strategy:** Validate the index before access
    #[error("Index {index} out of bounds for length {length}")]
    IndexOutOfRange { index: i64, length: usize },

    /// Class initializer failed
    ///
    /// **When returned:** The initializer returned an error or panicked. The
    /// failure is cached and every later access to the class reports the
    /// same cause.
    ///
    /// **Recovery strategy:** Cannot recover; the class is unusable
    #[error("Initialization of {class} failed: {cause}")]
    InitializationFailure { class: String, cause: Arc<str> },

    /// Member not accessible from the lookup
    ///
    /// **When returned:** Private member from a foreign lookup class,
    /// static/instance mismatch, or class data taken twice
    #[error("Illegal access: {0}")]
    IllegalAccess(String),

    /// No class with the given name in the loader chain
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    /// No field with the given name and type
    #[error("No such field: {class}.{name}")]
    NoSuchField { class: String, name: String },

    /// Malformed class description
    ///
    /// **When returned:** `define_class_bytes` could not decode its input, or
    /// a field descriptor names no known type
    #[error("Class format error: {0}")]
    ClassFormat(String),

    /// Configuration error
    ///
    /// **When returned:** Invalid runtime configuration detected
    ///
    /// **Recovery strategy:** Use default configuration or fail fast
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl VhError {
    /// Errors raised while resolving or initializing classes
    pub fn is_linkage_error(&self) -> bool {
        matches!(
            self,
            VhError::InitializationFailure { .. }
                | VhError::IllegalAccess(_)
                | VhError::ClassNotFound(_)
                | VhError::NoSuchField { .. }
                | VhError::ClassFormat(_)
        )
    }

    /// Errors caused by an ill-formed call through a handle
    ///
    /// None of these touch storage or trigger initialization.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            VhError::UnsupportedOperation { .. }
                | VhError::WrongMethodType { .. }
                | VhError::WrongType { .. }
                | VhError::NullReceiver { .. }
                | VhError::ClassCast { .. }
                | VhError::IndexOutOfRange { .. }
        )
    }

    pub(crate) fn wrong_type(expected: impl ToString, actual: impl ToString) -> Self {
        VhError::WrongType {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn wrong_method_type(expected: impl ToString, actual: impl ToString) -> Self {
        VhError::WrongMethodType {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn class_cast(expected: impl ToString, actual: impl ToString) -> Self {
        VhError::ClassCast {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl From<SymbolError> for VhError {
    fn from(err: SymbolError) -> Self {
        VhError::ClassFormat(err.to_string())
    }
}

impl From<serde_json::Error> for VhError {
    fn from(err: serde_json::Error) -> Self {
        VhError::ClassFormat(err.to_string())
    }
}

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, VhError>;

/// Ensure condition is true, otherwise return error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}
