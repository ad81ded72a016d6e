//! Collaborator interfaces the context consumes.
//!
//! The context never owns a database, a wallet or the chain: it sees
//! them through these traits. Implementations are free to be in-memory
//! test doubles or full node services.

use dbft_core::{Header, TrimmedBlock, UInt256};
use dbft_crypto::{EcPoint, KeyPair};

/// Source of consistent chain snapshots.
pub trait Ledger {
    /// Acquires a read-only view of the chain at its current tip. The
    /// context holds the returned handle until the next view-0 reset.
    fn snapshot(&self) -> Box<dyn LedgerSnapshot>;
}

/// A consistent read-only view of the chain.
pub trait LedgerSnapshot {
    /// Height of the tip block.
    fn current_index(&self) -> u32;

    /// Hash of the tip block.
    fn current_hash(&self) -> UInt256;

    /// Header lookup by block hash.
    fn header(&self, hash: &UInt256) -> Option<Header>;

    /// Trimmed-block lookup by block hash.
    fn trimmed_block(&self, hash: &UInt256) -> Option<TrimmedBlock>;

    /// The validator set already committed for the next block.
    fn next_block_validators(&self, count: usize) -> Vec<EcPoint>;

    /// The validator set recomputed from current stake tallies.
    fn compute_next_block_validators(&self, count: usize) -> Vec<EcPoint>;

    /// Whether the committee-refresh epoch applies at `height`.
    fn should_refresh_committee(&self, height: u32, committee_size: usize) -> bool;
}

/// Durable key-value store for checkpoints.
pub trait Store {
    /// Reads a value, `None` when absent.
    fn try_get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Writes a value and flushes it before returning.
    fn put_sync(&self, key: &[u8], value: &[u8]);
}

/// Read-only wallet lookup.
pub trait Wallet {
    /// The account holding `key`, if this wallet tracks it.
    fn account(&self, key: &EcPoint) -> Option<Box<dyn WalletAccount>>;
}

/// A single wallet account.
pub trait WalletAccount {
    /// Whether the private key is available (not watch-only).
    fn has_key(&self) -> bool;

    /// The private key, when available.
    fn key(&self) -> Option<KeyPair>;
}
