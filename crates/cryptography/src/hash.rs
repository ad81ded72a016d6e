//! Hash functions of the protocol.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Double SHA-256, the identity hash for blocks, transactions and payloads.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// RIPEMD-160 over SHA-256, the script-hash function.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(sha256(data)).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_vector() {
        // NIST vector for "abc".
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn hash256_is_double_sha() {
        assert_eq!(hash256(b"abc"), sha256(&sha256(b"abc")));
    }

    #[test]
    fn hash160_length_and_determinism() {
        let a = hash160(b"script");
        let b = hash160(b"script");
        assert_eq!(a, b);
        assert_ne!(a, hash160(b"other"));
    }
}
