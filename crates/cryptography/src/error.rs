//! Crypto error type.

use thiserror::Error;

/// Result alias for cryptographic operations.
pub type CryptoResult<T> = std::result::Result<T, CryptoError>;

/// Errors raised by key handling and script construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The bytes do not encode a point on secp256r1.
    #[error("invalid secp256r1 point")]
    InvalidPoint,

    /// The scalar is zero or not reduced modulo the curve order.
    #[error("invalid private key")]
    InvalidPrivateKey,

    /// The signature bytes are malformed.
    #[error("invalid signature encoding")]
    InvalidSignature,

    /// Redeem-script parameters are out of range.
    #[error("invalid contract parameters: {0}")]
    InvalidContract(String),
}
