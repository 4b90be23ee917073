//! Error handling module for the vhxt CLI.
//!
//! Runtime errors from `vhx-rt` are wrapped unchanged so their messages
//! reach the user as the runtime formats them.

use thiserror::Error;
use vhx_rt::VhError;

/// Main error type for the vhxt CLI application.
#[derive(Error, Debug)]
pub enum VhxtError {
    /// Error when a configuration file is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error when command-line input is invalid.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Error raised by the variable handle runtime.
    #[error("Runtime error: {0}")]
    Runtime(#[from] VhError),

    /// A check run by a command observed wrong behavior.
    ///
    /// Reported by `stress` on a lost or misdirected update and by `leak`
    /// when a loader stays reachable.
    #[error("Check failed: {0}")]
    CheckFailed(String),

    /// Error when IO operations fail.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error when JSON serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using VhxtError.
pub type Result<T> = std::result::Result<T, VhxtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = VhxtError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_validation_error_display() {
        let err = VhxtError::Validation("unknown type: quux".to_string());
        assert_eq!(err.to_string(), "Validation error: unknown type: quux");
    }

    #[test]
    fn test_runtime_error_conversion() {
        let err: VhxtError = VhError::IndexOutOfRange {
            index: 5,
            length: 2,
        }
        .into();
        assert!(matches!(err, VhxtError::Runtime(_)));
        assert_eq!(
            err.to_string(),
            "Runtime error: Index 5 out of bounds for length 2"
        );
    }

    #[test]
    fn test_check_failed_display() {
        let err = VhxtError::CheckFailed("lost 3 updates".to_string());
        assert_eq!(err.to_string(), "Check failed: lost 3 updates");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: VhxtError = io_err.into();
        assert!(matches!(err, VhxtError::Io(_)));
    }
}
