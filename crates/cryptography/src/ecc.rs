//! secp256r1 public keys and signing key pairs.

use crate::error::{CryptoError, CryptoResult};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use std::fmt;

/// Length of a raw `r ‖ s` signature.
pub const SIGNATURE_SIZE: usize = 64;

/// Length of a compressed SEC1 point.
pub const POINT_SIZE: usize = 33;

/// A validator public key: a compressed secp256r1 point.
///
/// Ordering is byte-lexicographic over the compressed encoding, which is
/// the order multi-sig redeem scripts list their keys in.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EcPoint([u8; POINT_SIZE]);

impl EcPoint {
    /// Parses and validates a compressed point.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != POINT_SIZE {
            return Err(CryptoError::InvalidPoint);
        }
        VerifyingKey::from_sec1_bytes(bytes).map_err(|_| CryptoError::InvalidPoint)?;
        let mut encoded = [0u8; POINT_SIZE];
        encoded.copy_from_slice(bytes);
        Ok(Self(encoded))
    }

    /// The compressed encoding.
    pub fn as_bytes(&self) -> &[u8; POINT_SIZE] {
        &self.0
    }

    /// Verifies a raw 64-byte signature over `data`.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_sec1_bytes(&self.0) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(data, &signature).is_ok()
    }
}

impl fmt::Debug for EcPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EcPoint({})", hex::encode(self.0))
    }
}

impl fmt::Display for EcPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// A secp256r1 signing key together with its public point.
#[derive(Clone)]
pub struct KeyPair {
    secret: SigningKey,
    public: EcPoint,
}

impl KeyPair {
    /// Generates a fresh random key pair.
    pub fn generate() -> Self {
        let secret = SigningKey::random(&mut OsRng);
        Self::from_signing_key(secret)
    }

    /// Builds a key pair from a 32-byte private scalar.
    pub fn from_private_key(private_key: &[u8]) -> CryptoResult<Self> {
        let secret =
            SigningKey::from_slice(private_key).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self::from_signing_key(secret))
    }

    fn from_signing_key(secret: SigningKey) -> Self {
        let point = secret.verifying_key().to_encoded_point(true);
        let mut encoded = [0u8; POINT_SIZE];
        encoded.copy_from_slice(point.as_bytes());
        Self {
            secret,
            public: EcPoint(encoded),
        }
    }

    /// The public point of this pair.
    pub fn public_key(&self) -> &EcPoint {
        &self.public
    }

    /// Signs `data`, returning the raw 64-byte `r ‖ s` form.
    ///
    /// Signing is deterministic (RFC 6979), so repeated calls over the
    /// same data yield identical bytes.
    pub fn sign(&self, data: &[u8]) -> [u8; SIGNATURE_SIZE] {
        let signature: Signature = self.secret.sign(data);
        let signature = signature.normalize_s().unwrap_or(signature);
        let mut raw = [0u8; SIGNATURE_SIZE];
        raw.copy_from_slice(&signature.to_bytes());
        raw
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The secret scalar never appears in logs.
        write!(f, "KeyPair({})", self.public)
    }
}
