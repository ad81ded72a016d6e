//! Candidate proposals and their per-validator slot tables.

use dbft_core::{Block, ExtensiblePayload, Transaction, UInt160, UInt256};
use std::collections::HashMap;

/// Index of the priority candidate.
pub const PRIORITY: usize = 0;

/// Index of the fallback candidate, meaningful only in view 0.
pub const FALLBACK: usize = 1;

/// Accumulated sender fees of the transactions admitted to a
/// candidate, for admission policing by the outer layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderFeeTracker {
    fees: HashMap<UInt160, i64>,
}

impl SenderFeeTracker {
    /// An empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts for `transaction` being admitted.
    pub fn add(&mut self, transaction: &Transaction) {
        *self.fees.entry(transaction.sender).or_insert(0) += transaction.fee();
    }

    /// Reverses the accounting of `transaction`.
    pub fn remove(&mut self, transaction: &Transaction) {
        if let Some(total) = self.fees.get_mut(&transaction.sender) {
            *total -= transaction.fee();
            if *total <= 0 {
                self.fees.remove(&transaction.sender);
            }
        }
    }

    /// Total fees currently attributed to `sender`.
    pub fn sender_fee(&self, sender: &UInt160) -> i64 {
        self.fees.get(sender).copied().unwrap_or(0)
    }
}

/// One candidate proposal: a header draft, the proposed transactions,
/// and the per-validator payload slots collected for it.
///
/// A slot is `None` while no payload has been received from that
/// validator for this candidate. Writes overwrite; equivocation
/// detection is the upper layers' concern.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The block draft. `transactions` stays `None` until assembly.
    pub block: Block,
    /// Hashes of the proposed transactions; `None` until a prepare
    /// request has been received or sent.
    pub transaction_hashes: Option<Vec<UInt256>>,
    /// Full transactions, populated as they arrive.
    pub transactions: HashMap<UInt256, Transaction>,
    /// Accumulated sender fees of the admitted transactions.
    pub verification_context: SenderFeeTracker,
    /// Preparation payload per validator.
    pub preparation_payloads: Vec<Option<ExtensiblePayload>>,
    /// Pre-commit payload per validator.
    pub pre_commit_payloads: Vec<Option<ExtensiblePayload>>,
    /// Commit payload per validator.
    pub commit_payloads: Vec<Option<ExtensiblePayload>>,
    /// Merkle-root memo; `Some` once computed for the current hashes.
    pub(crate) merkle_root: Option<UInt256>,
}

impl Candidate {
    /// Creates a fresh candidate around `block` with slot tables sized
    /// for `validator_count` validators.
    pub fn new(block: Block, validator_count: usize) -> Self {
        Self {
            block,
            transaction_hashes: None,
            transactions: HashMap::new(),
            verification_context: SenderFeeTracker::new(),
            preparation_payloads: vec![None; validator_count],
            pre_commit_payloads: vec![None; validator_count],
            commit_payloads: vec![None; validator_count],
            merkle_root: None,
        }
    }

    /// Clears the per-view mutable state for a view transition.
    ///
    /// Identity fields (previous hash, index, next consensus) survive;
    /// pre-commit and commit slots survive too, since stale entries are
    /// excluded by their embedded view number at assembly time.
    pub fn clear_for_view(&mut self, primary_index: u8) {
        self.block.header.merkle_root = UInt256::zero();
        self.block.header.timestamp = 0;
        self.block.header.nonce = 0;
        self.block.header.primary_index = primary_index;
        self.block.transactions = None;
        self.transaction_hashes = None;
        self.transactions.clear();
        self.verification_context = SenderFeeTracker::new();
        for slot in &mut self.preparation_payloads {
            *slot = None;
        }
        self.merkle_root = None;
    }

    /// Number of non-null commit slots.
    pub fn count_commits(&self) -> usize {
        self.commit_payloads.iter().flatten().count()
    }

    /// Number of non-null preparation slots.
    pub fn count_preparations(&self) -> usize {
        self.preparation_payloads.iter().flatten().count()
    }
}
