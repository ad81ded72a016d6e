//! dBFT consensus context.
//!
//! This facade crate re-exports the public surface of the workspace:
//!
//! - [`io`]: little-endian binary serialization primitives
//! - [`crypto`]: secp256r1 keys, hashing, Merkle root, redeem scripts
//! - [`core`]: chain primitives (hashes, witnesses, transactions, blocks,
//!   extensible payloads)
//! - [`consensus`]: the round state machine itself
//!
//! The consensus context is the in-memory state of one round of block
//! production: which validator proposed what, which preparation,
//! pre-commit and commit messages have been collected, whether a view
//! change is in progress, and on what basis a final block may be
//! assembled. Message transport, mempool policy and ledger storage are
//! collaborators behind the traits in [`consensus::providers`].

pub use dbft_consensus as consensus;
pub use dbft_core as core;
pub use dbft_crypto as crypto;
pub use dbft_io as io;

pub use dbft_consensus::{
    ConsensusContext, ConsensusMessage, ConsensusSettings, Error, MessageBody, CONTEXT_KEY,
    PRIMARY_TIMER_MULTIPLIER,
};
