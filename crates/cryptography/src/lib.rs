//! Cryptographic primitives used by the consensus context.
//!
//! Signatures are ECDSA over secp256r1 with SHA-256, encoded as the raw
//! 64-byte `r ‖ s` form. Script hashing is RIPEMD-160 over SHA-256, and
//! block/transaction identities are double SHA-256.

pub mod contract;
pub mod ecc;
pub mod error;
pub mod hash;
pub mod merkle;
pub mod script;

pub use contract::{
    bft_address, create_multisig_redeem_script, create_signature_redeem_script,
};
pub use ecc::{EcPoint, KeyPair, SIGNATURE_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use hash::{hash160, hash256, sha256};
pub use merkle::merkle_root;
pub use script::{OpCode, ScriptBuilder};
