//! The authoritative state of the current consensus round.

use crate::cache::MessageCache;
use crate::liveness::LivenessTracker;
use crate::messages::{ConsensusMessage, MessageBody};
use crate::proposal::{Candidate, SenderFeeTracker, FALLBACK, PRIORITY};
use crate::providers::{Ledger, LedgerSnapshot, Store, Wallet};
use crate::settings::ConsensusSettings;
use crate::validators::ValidatorSetView;
use crate::{Error, Result};
use dbft_core::{ExtensiblePayload, Transaction, UInt256};
use dbft_crypto::{EcPoint, KeyPair};
use std::sync::Arc;

/// The in-memory state machine of one round of block production.
///
/// Strictly single-threaded: the protocol driver is the only mutator,
/// predicates are pure reads over the current state, and no operation
/// suspends or blocks. A chain snapshot is acquired once per view-0
/// reset and held until the next one.
pub struct ConsensusContext {
    pub(crate) settings: ConsensusSettings,
    pub(crate) ledger: Arc<dyn Ledger>,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) wallet: Arc<dyn Wallet>,
    /// Scoped chain view; replaced (and the old one released) at reset.
    pub(crate) snapshot: Option<Box<dyn LedgerSnapshot>>,
    /// The two candidate proposals. `candidates[FALLBACK]` is `None`
    /// whenever the view is non-zero.
    pub candidates: [Option<Candidate>; 2],
    /// Latest change-view payload per validator, for the current view.
    pub change_view_payloads: Vec<Option<ExtensiblePayload>>,
    /// Change-view payloads carried over from the previous view, kept
    /// to justify recovery messages.
    pub last_change_view_payloads: Vec<Option<ExtensiblePayload>>,
    /// The current view.
    pub view_number: u8,
    pub(crate) validator_set: ValidatorSetView,
    /// This node's index in the validator set, or −1 when watch-only.
    pub my_index: i32,
    pub(crate) liveness: LivenessTracker,
    pub(crate) cache: MessageCache,
    pub(crate) key_pair: Option<KeyPair>,
    pub(crate) witness_size: usize,
}

impl ConsensusContext {
    /// The active settings.
    pub fn settings(&self) -> &ConsensusSettings {
        &self.settings
    }

    /// The ordered validator keys for the pending height.
    pub fn validators(&self) -> &[EcPoint] {
        self.validator_set.as_slice()
    }

    /// Number of validators, `N`.
    pub fn validator_count(&self) -> usize {
        self.validator_set.len()
    }

    /// Fault tolerance `F = (N − 1) / 3`.
    pub fn f(&self) -> usize {
        self.validator_set.f()
    }

    /// Quorum `M = N − F`.
    pub fn m(&self) -> usize {
        self.validator_set.m()
    }

    /// Height of the block being produced.
    pub fn block_index(&self) -> u32 {
        self.candidates[PRIORITY]
            .as_ref()
            .map(|candidate| candidate.block.header.index)
            .unwrap_or(0)
    }

    /// This node's public key, when it is a validator this round.
    pub fn my_public_key(&self) -> Option<&EcPoint> {
        usize::try_from(self.my_index)
            .ok()
            .and_then(|index| self.validator_set.get(index))
    }

    /// Serialized-size estimate of the block witness for the current
    /// validator set, for fee calculation by outer layers.
    pub fn witness_size(&self) -> usize {
        self.witness_size
    }

    /// The candidate at `index`, when it exists.
    pub fn candidate(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index).and_then(Option::as_ref)
    }

    /// Maps a wire proposal id onto a live candidate index.
    pub(crate) fn proposal_index(&self, proposal: u8) -> Result<usize> {
        match proposal as usize {
            PRIORITY => Ok(PRIORITY),
            FALLBACK if self.view_number == 0 => Ok(FALLBACK),
            FALLBACK => Err(Error::FallbackDisabled),
            _ => Err(Error::InvalidProposal(proposal)),
        }
    }

    pub(crate) fn candidate_mut(&mut self, index: usize) -> Result<&mut Candidate> {
        self.candidates
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(Error::FallbackDisabled)
    }

    /// Index of the priority primary for `view`: `(H − V) mod N`.
    pub fn priority_primary_index(&self, view: u8) -> u8 {
        let n = self.validator_count() as i64;
        let h = self.block_index() as i64;
        (h - view as i64).rem_euclid(n) as u8
    }

    /// Index of the fallback primary for `view`: `(H − V − 1) mod N`.
    /// Only meaningful while the view is 0.
    pub fn fallback_primary_index(&self, view: u8) -> u8 {
        let n = self.validator_count() as i64;
        let h = self.block_index() as i64;
        (h - view as i64 - 1).rem_euclid(n) as u8
    }

    /// Whether this node is the priority primary of the current view.
    pub fn is_priority_primary(&self) -> bool {
        self.my_index >= 0 && self.my_index == self.priority_primary_index(self.view_number) as i32
    }

    /// Whether this node is the fallback primary. Only meaningful while
    /// the view is 0.
    pub fn is_fallback_primary(&self) -> bool {
        self.my_index >= 0 && self.my_index == self.fallback_primary_index(self.view_number) as i32
    }

    /// Whether this node proposes in the current view: the priority
    /// primary always does, the fallback primary only in view 0.
    pub fn is_a_primary(&self) -> bool {
        self.is_priority_primary() || (self.view_number == 0 && self.is_fallback_primary())
    }

    /// A backup is a validator that is not the priority primary but is
    /// the fallback primary; all other non-primaries are plain
    /// validators.
    pub fn is_backup(&self) -> bool {
        self.my_index >= 0 && !self.is_priority_primary() && self.is_fallback_primary()
    }

    /// Whether this node holds no validator seat this round.
    pub fn watch_only(&self) -> bool {
        self.my_index < 0
    }

    /// Whether a prepare request has been seen (or sent) for either
    /// candidate of the current view.
    pub fn request_sent_or_received(&self) -> bool {
        let priority = self.priority_primary_index(self.view_number) as usize;
        if self.candidates[PRIORITY]
            .as_ref()
            .is_some_and(|candidate| candidate.preparation_payloads[priority].is_some())
        {
            return true;
        }
        if self.view_number == 0 {
            let fallback = self.fallback_primary_index(self.view_number) as usize;
            return self.candidates[FALLBACK]
                .as_ref()
                .is_some_and(|candidate| candidate.preparation_payloads[fallback].is_some());
        }
        false
    }

    /// Whether this node has sent its preparation for either candidate.
    pub fn response_sent(&self) -> bool {
        !self.watch_only() && self.my_slot_filled(|candidate| &candidate.preparation_payloads)
    }

    /// Whether this node has sent its commit for either candidate.
    pub fn commit_sent(&self) -> bool {
        !self.watch_only() && self.my_slot_filled(|candidate| &candidate.commit_payloads)
    }

    /// Whether a final block has been assembled this round. Terminal.
    pub fn block_sent(&self) -> bool {
        self.candidates
            .iter()
            .flatten()
            .any(|candidate| candidate.block.transactions.is_some())
    }

    /// Whether this node has asked to leave the current view.
    pub fn view_changing(&self) -> bool {
        if self.watch_only() {
            return false;
        }
        let Some(payload) = self
            .change_view_payloads
            .get(self.my_index as usize)
            .and_then(Option::as_ref)
        else {
            return false;
        };
        self.get_message(payload)
            .ok()
            .and_then(|message| message.change_view().map(|cv| cv.new_view_number))
            .is_some_and(|new_view| new_view > self.view_number)
    }

    /// Number of validators with a commit slot filled for either
    /// candidate.
    pub fn count_committed(&self) -> usize {
        (0..self.validator_count())
            .filter(|&index| {
                self.candidates
                    .iter()
                    .flatten()
                    .any(|candidate| candidate.commit_payloads[index].is_some())
            })
            .count()
    }

    /// Number of validators never heard from, or silent since before
    /// the previous block.
    pub fn count_failed(&self) -> usize {
        self.liveness
            .count_failed(self.validator_set.as_slice(), self.block_index())
    }

    /// Whether enough validators have committed or gone silent that a
    /// view change could strand late committers.
    pub fn more_than_f_nodes_committed_or_lost(&self) -> bool {
        self.count_committed() + self.count_failed() > self.f()
    }

    /// The safety valve: a node that wants to change view keeps
    /// rejecting payloads only while fewer than F+1 peers have
    /// committed or been lost; past that point it must accept them
    /// again to avoid splitting late committers from view-changers.
    pub fn not_accepting_payloads_due_to_view_changing(&self) -> bool {
        self.view_changing() && !self.more_than_f_nodes_committed_or_lost()
    }

    /// Whether the validator set committed at the tip differs from the
    /// one before it. Decides whether the liveness tracker is rebuilt.
    pub fn validators_changed(&self) -> bool {
        self.snapshot
            .as_deref()
            .is_some_and(validators_changed_at)
    }

    /// Decoded view of `payload`, memoized by payload hash.
    pub fn get_message(&self, payload: &ExtensiblePayload) -> Result<ConsensusMessage> {
        self.cache.get_or_decode(payload)
    }

    /// The liveness tracker's view of `validator`.
    pub fn last_seen_height(&self, validator: &EcPoint) -> Option<u32> {
        self.liveness.height_of(validator)
    }

    /// Records a delivered payload into the round state: decodes it
    /// (through the cache), updates the liveness tracker and writes the
    /// slot the message belongs in. Slot writes overwrite; legitimacy
    /// and equivocation checks are the driver's concern.
    pub fn record_payload(&mut self, payload: ExtensiblePayload) -> Result<ConsensusMessage> {
        let message = self.get_message(&payload)?;
        message.validate()?;

        let index = message.validator_index as usize;
        let count = self.validator_count();
        if index >= count {
            return Err(Error::InvalidValidatorIndex {
                index: message.validator_index,
                count,
            });
        }
        if let Some(sender) = self.validator_set.get(index).copied() {
            self.liveness.note(sender, message.block_index);
        }

        match &message.body {
            MessageBody::ChangeView(_) => {
                self.change_view_payloads[index] = Some(payload);
            }
            MessageBody::PrepareRequest(request) => {
                let request = request.clone();
                let slot = self.proposal_index(request.proposal)?;
                let candidate = self.candidate_mut(slot)?;
                candidate.block.header.timestamp = request.timestamp;
                candidate.block.header.nonce = request.nonce;
                candidate.transaction_hashes = Some(request.transaction_hashes);
                candidate.transactions.clear();
                candidate.verification_context = SenderFeeTracker::new();
                candidate.merkle_root = None;
                candidate.preparation_payloads[index] = Some(payload);
            }
            MessageBody::PrepareResponse(response) => {
                let slot = self.proposal_index(response.proposal)?;
                self.candidate_mut(slot)?.preparation_payloads[index] = Some(payload);
            }
            MessageBody::PreCommit(pre_commit) => {
                let slot = self.proposal_index(pre_commit.proposal)?;
                self.candidate_mut(slot)?.pre_commit_payloads[index] = Some(payload);
            }
            MessageBody::Commit(commit) => {
                let slot = self.proposal_index(commit.proposal)?;
                self.candidate_mut(slot)?.commit_payloads[index] = Some(payload);
            }
            // Recovery traffic carries no slot of its own; decoding has
            // already populated the cache and the liveness tracker.
            MessageBody::RecoveryRequest(_) | MessageBody::RecoveryMessage(_) => {}
        }
        Ok(message)
    }

    /// Admits a full transaction into a candidate's pool. Returns
    /// `false` when the candidate has a hash list and the transaction
    /// is not on it.
    pub fn add_transaction(&mut self, proposal: usize, transaction: Transaction) -> Result<bool> {
        let candidate = self
            .candidates
            .get_mut(proposal)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidProposal(proposal as u8))?;
        let hash = transaction.hash();
        if let Some(hashes) = &candidate.transaction_hashes {
            if !hashes.contains(&hash) {
                return Ok(false);
            }
        }
        candidate.verification_context.add(&transaction);
        candidate.transactions.insert(hash, transaction);
        Ok(true)
    }

    /// Whether every transaction named by the candidate's hash list is
    /// present in its pool.
    pub fn transactions_complete(&self, proposal: usize) -> bool {
        self.candidate(proposal).is_some_and(|candidate| {
            candidate.transaction_hashes.as_ref().is_some_and(|hashes| {
                hashes
                    .iter()
                    .all(|hash| candidate.transactions.contains_key(hash))
            })
        })
    }

    /// Hash of the primary's preparation payload for a candidate, once
    /// a request has been recorded.
    pub(crate) fn preparation_hash(&self, slot: usize) -> Option<UInt256> {
        let primary = match slot {
            PRIORITY => self.priority_primary_index(self.view_number),
            _ => self.fallback_primary_index(self.view_number),
        } as usize;
        self.candidate(slot)
            .and_then(|candidate| candidate.preparation_payloads[primary].as_ref())
            .map(ExtensiblePayload::hash)
    }

    fn my_slot_filled(
        &self,
        slots: impl Fn(&Candidate) -> &Vec<Option<ExtensiblePayload>>,
    ) -> bool {
        let Ok(index) = usize::try_from(self.my_index) else {
            return false;
        };
        self.candidates
            .iter()
            .flatten()
            .any(|candidate| slots(candidate)[index].is_some())
    }
}

/// Whether the tip block's `next_consensus` differs from its parent's.
pub(crate) fn validators_changed_at(snapshot: &dyn LedgerSnapshot) -> bool {
    if snapshot.current_index() == 0 {
        return false;
    }
    let Some(current) = snapshot.trimmed_block(&snapshot.current_hash()) else {
        return false;
    };
    let Some(previous) = snapshot.trimmed_block(&current.header.prev_hash) else {
        return false;
    };
    current.header.next_consensus != previous.header.next_consensus
}
