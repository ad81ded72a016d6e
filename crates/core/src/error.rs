//! Core error type.

use thiserror::Error;

/// Result alias for primitive operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors raised by the chain primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A byte slice had the wrong length for a fixed-width value.
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    /// A textual representation could not be parsed.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Serialization failure.
    #[error(transparent)]
    Io(#[from] dbft_io::IoError),
}
