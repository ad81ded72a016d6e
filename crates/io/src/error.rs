//! Error type shared by the reader and writer.

use thiserror::Error;

/// Result alias for serialization operations.
pub type IoResult<T> = std::result::Result<T, IoError>;

/// Errors raised while encoding or decoding binary data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    /// The input ended before the requested number of bytes could be read.
    #[error("unexpected end of input: {needed} byte(s) needed at position {position}")]
    EndOfStream { needed: usize, position: usize },

    /// A decoded value violates the format.
    #[error("invalid {what}: {reason}")]
    InvalidData { what: &'static str, reason: String },

    /// A length or var-int exceeded the caller-supplied bound.
    #[error("value {value} exceeds the allowed maximum {max}")]
    OutOfRange { value: u64, max: u64 },
}

impl IoError {
    /// Shorthand for [`IoError::InvalidData`].
    pub fn invalid_data(what: &'static str, reason: impl Into<String>) -> Self {
        IoError::InvalidData {
            what,
            reason: reason.into(),
        }
    }
}
