//! The dBFT consensus context.
//!
//! This crate is the in-memory state machine one round of block
//! production executes over: per-view, per-validator slots for
//! proposals, preparations, pre-commits, commits and change-views; the
//! derived predicates that drive the protocol; block assembly from
//! collected commit signatures; and checkpointing of the whole round
//! state across process restarts.
//!
//! The context is strictly single-threaded and never blocks: the outer
//! protocol driver feeds it decoded payloads and decides, from the
//! exposed predicates, when to emit messages, assemble a block or move
//! to the next view. Transport, mempool and ledger storage live behind
//! the traits in [`providers`].

pub mod cache;
pub mod context;
pub mod liveness;
pub mod messages;
pub mod proposal;
pub mod providers;
pub mod recovery;
pub mod settings;
pub mod validators;

mod block_builder;
mod checkpoint;
mod lifecycle;
mod payloads;

pub use cache::MessageCache;
pub use context::ConsensusContext;
pub use liveness::LivenessTracker;
pub use messages::{
    ChangeView, ChangeViewReason, Commit, ConsensusMessage, MessageBody, MessageType,
    PreCommit, PrepareRequest, PrepareResponse, RecoveryRequest,
};
pub use proposal::{Candidate, SenderFeeTracker, FALLBACK, PRIORITY};
pub use providers::{Ledger, LedgerSnapshot, Store, Wallet, WalletAccount};
pub use recovery::RecoveryMessage;
pub use settings::ConsensusSettings;
pub use validators::ValidatorSetView;

use dbft_core::UInt256;
use thiserror::Error;

/// Storage key under which the round state checkpoint is persisted.
pub const CONTEXT_KEY: u8 = 0xF4;

/// Category tag of consensus extensible payloads.
pub const PAYLOAD_CATEGORY: &str = "dBFT";

/// Scaling hook for the priority primary's timeout. Outer schedulers
/// multiply their base timeout by this; the fallback primary may use a
/// larger factor in future revisions.
pub const PRIMARY_TIMER_MULTIPLIER: f64 = 1.0;

/// Result alias for consensus operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the consensus context.
#[derive(Debug, Error)]
pub enum Error {
    /// Serialization failure.
    #[error(transparent)]
    Io(#[from] dbft_io::IoError),

    /// Key or script failure.
    #[error(transparent)]
    Crypto(#[from] dbft_crypto::CryptoError),

    /// Primitive failure.
    #[error(transparent)]
    Core(#[from] dbft_core::CoreError),

    /// The settings are not usable.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The ledger produced an empty validator list.
    #[error("the validator set is empty")]
    EmptyValidatorSet,

    /// A message named a validator outside the current set.
    #[error("validator index {index} out of range for a committee of {count}")]
    InvalidValidatorIndex { index: u8, count: usize },

    /// A message named a proposal id other than 0 or 1.
    #[error("unknown proposal id {0}")]
    InvalidProposal(u8),

    /// The fallback proposal only exists in view 0.
    #[error("fallback proposal is disabled after view 0")]
    FallbackDisabled,

    /// The node holds no validator key for this round.
    #[error("node is watch-only in this round")]
    WatchOnly,

    /// No prepare request has been seen or sent for the candidate.
    #[error("no proposal for this candidate")]
    NoProposal,

    /// Fewer than M commits with a matching view were available.
    #[error("insufficient commits: {collected} of {required}")]
    NoQuorum { collected: usize, required: usize },

    /// The candidate's transaction pool is missing a listed transaction.
    #[error("transaction {0} missing from the candidate pool")]
    MissingTransaction(UInt256),

    /// A persisted checkpoint does not match the chain tip.
    #[error("stale checkpoint: expected {expected}, found {found}")]
    StaleCheckpoint { expected: u32, found: u32 },
}
