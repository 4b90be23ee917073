//! Core error types for vhx-util crate

use thiserror::Error;

/// Error type for symbol and descriptor operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SymbolError {
    /// Symbol not found in the interner
    #[error("Symbol not found: {0}")]
    NotFound(String),

    /// A type descriptor that names no known type
    #[error("Invalid descriptor: {0:?}")]
    InvalidDescriptor(String),
}

/// Result type alias for symbol operations
pub type SymbolResult<T> = std::result::Result<T, SymbolError>;
