//! Fabrication of outbound messages and their signed envelopes.

use crate::context::ConsensusContext;
use crate::messages::{
    ChangeView, ChangeViewReason, Commit, ConsensusMessage, MessageBody, PreCommit,
    PrepareRequest, PrepareResponse, RecoveryRequest,
};
use crate::proposal::{SenderFeeTracker, FALLBACK, PRIORITY};
use crate::recovery::{
    ChangeViewPayloadCompact, CommitPayloadCompact, PreCommitPayloadCompact,
    PreparationPayloadCompact, RecoveryMessage,
};
use crate::{Error, Result, PAYLOAD_CATEGORY};
use dbft_core::{ExtensiblePayload, Transaction, UInt160, UInt256, Witness};
use dbft_crypto::{create_signature_redeem_script, ScriptBuilder};
use dbft_io::SerializableExt;

impl ConsensusContext {
    /// Stages a proposal on the candidate, then emits the signed
    /// prepare request. `timestamp` and `nonce` come from the driver;
    /// the core reads no clock.
    pub fn make_prepare_request(
        &mut self,
        proposal: usize,
        transactions: Vec<Transaction>,
        timestamp: u64,
        nonce: u64,
    ) -> Result<ExtensiblePayload> {
        let my_index = self.require_my_index()?;
        let slot = self.proposal_index(proposal as u8)?;

        let hashes: Vec<UInt256> = transactions.iter().map(Transaction::hash).collect();
        let (version, prev_hash) = {
            let candidate = self.candidate_mut(slot)?;
            candidate.block.header.timestamp = timestamp;
            candidate.block.header.nonce = nonce;
            candidate.transaction_hashes = Some(hashes.clone());
            let mut verification_context = SenderFeeTracker::new();
            for transaction in &transactions {
                verification_context.add(transaction);
            }
            candidate.verification_context = verification_context;
            candidate.transactions = transactions
                .into_iter()
                .map(|transaction| (transaction.hash(), transaction))
                .collect();
            candidate.merkle_root = None;
            (
                candidate.block.header.version,
                candidate.block.header.prev_hash,
            )
        };

        let message = self.envelope(MessageBody::PrepareRequest(PrepareRequest {
            proposal: slot as u8,
            version,
            prev_hash,
            timestamp,
            nonce,
            transaction_hashes: hashes,
        }));
        let payload = self.make_signed_payload(message)?;
        self.candidate_mut(slot)?.preparation_payloads[my_index] = Some(payload.clone());
        self.touch_self();
        Ok(payload)
    }

    /// Emits the signed acceptance of the candidate's recorded
    /// proposal.
    pub fn make_prepare_response(&mut self, proposal: usize) -> Result<ExtensiblePayload> {
        let my_index = self.require_my_index()?;
        let slot = self.proposal_index(proposal as u8)?;
        let preparation_hash = self.preparation_hash(slot).ok_or(Error::NoProposal)?;

        let message = self.envelope(MessageBody::PrepareResponse(PrepareResponse {
            proposal: slot as u8,
            preparation_hash,
        }));
        let payload = self.make_signed_payload(message)?;
        self.candidate_mut(slot)?.preparation_payloads[my_index] = Some(payload.clone());
        self.touch_self();
        Ok(payload)
    }

    /// Emits the signed acknowledgement that a preparation quorum was
    /// observed for the candidate.
    pub fn make_pre_commit(&mut self, proposal: usize) -> Result<ExtensiblePayload> {
        let my_index = self.require_my_index()?;
        let slot = self.proposal_index(proposal as u8)?;
        let preparation_hash = self.preparation_hash(slot).ok_or(Error::NoProposal)?;

        let message = self.envelope(MessageBody::PreCommit(PreCommit {
            proposal: slot as u8,
            preparation_hash,
        }));
        let payload = self.make_signed_payload(message)?;
        self.candidate_mut(slot)?.pre_commit_payloads[my_index] = Some(payload.clone());
        self.touch_self();
        Ok(payload)
    }

    /// Signs the candidate's finalized header and emits the commit.
    pub fn make_commit(&mut self, proposal: usize) -> Result<ExtensiblePayload> {
        let my_index = self.require_my_index()?;
        let slot = self.proposal_index(proposal as u8)?;
        let header = self.ensure_header(slot)?;

        let key = self.key_pair.as_ref().ok_or(Error::WatchOnly)?;
        let signature = key.sign(&header.sign_data(self.settings.network)).to_vec();

        let message = self.envelope(MessageBody::Commit(Commit {
            proposal: slot as u8,
            signature,
        }));
        let payload = self.make_signed_payload(message)?;
        self.candidate_mut(slot)?.commit_payloads[my_index] = Some(payload.clone());
        self.touch_self();
        Ok(payload)
    }

    /// Emits a signed request to advance past the current view.
    pub fn make_change_view(
        &mut self,
        reason: ChangeViewReason,
        timestamp: u64,
    ) -> Result<ExtensiblePayload> {
        let my_index = self.require_my_index()?;
        let message = self.envelope(MessageBody::ChangeView(ChangeView {
            new_view_number: self.view_number.saturating_add(1),
            timestamp,
            reason,
        }));
        let payload = self.make_signed_payload(message)?;
        self.change_view_payloads[my_index] = Some(payload.clone());
        self.touch_self();
        Ok(payload)
    }

    /// Emits a signed plea for peers to replay the round.
    pub fn make_recovery_request(&mut self, timestamp: u64) -> Result<ExtensiblePayload> {
        self.require_my_index()?;
        let message =
            self.envelope(MessageBody::RecoveryRequest(RecoveryRequest { timestamp }));
        let payload = self.make_signed_payload(message)?;
        self.touch_self();
        Ok(payload)
    }

    /// Compacts everything collected this round into a signed recovery
    /// message. Applying one on receipt is the driver's job.
    pub fn make_recovery_message(&mut self) -> Result<ExtensiblePayload> {
        self.require_my_index()?;

        let mut change_view_messages = Vec::new();
        for payload in self.change_view_payloads.iter().flatten() {
            let Ok(message) = self.get_message(payload) else {
                continue;
            };
            if let Some(change_view) = message.change_view() {
                change_view_messages.push(ChangeViewPayloadCompact {
                    validator_index: message.validator_index,
                    original_view_number: message.view_number,
                    timestamp: change_view.timestamp,
                    invocation_script: payload.witness.invocation_script.clone(),
                });
            }
        }

        let mut prepare_requests = [None, None];
        let mut preparation_hashes = [None, None];
        let mut preparation_messages = Vec::new();
        let mut pre_commit_messages = Vec::new();
        let mut commit_messages = Vec::new();

        for slot in [PRIORITY, FALLBACK] {
            let Some(candidate) = self.candidate(slot) else {
                continue;
            };
            for payload in candidate.preparation_payloads.iter().flatten() {
                let Ok(message) = self.get_message(payload) else {
                    continue;
                };
                match &message.body {
                    MessageBody::PrepareRequest(request) => {
                        prepare_requests[slot] = Some(request.clone());
                    }
                    MessageBody::PrepareResponse(_) => {
                        preparation_messages.push(PreparationPayloadCompact {
                            proposal: slot as u8,
                            validator_index: message.validator_index,
                            invocation_script: payload.witness.invocation_script.clone(),
                        });
                    }
                    _ => {}
                }
            }
            if prepare_requests[slot].is_none() {
                // No request on hand: point receivers at the payload
                // hash the responses agreed on instead.
                preparation_hashes[slot] = candidate
                    .preparation_payloads
                    .iter()
                    .flatten()
                    .find_map(|payload| {
                        self.get_message(payload)
                            .ok()
                            .and_then(|m| m.prepare_response().map(|r| r.preparation_hash))
                    });
            }
            for payload in candidate.pre_commit_payloads.iter().flatten() {
                let Ok(message) = self.get_message(payload) else {
                    continue;
                };
                if let Some(pre_commit) = message.pre_commit() {
                    pre_commit_messages.push(PreCommitPayloadCompact {
                        proposal: slot as u8,
                        validator_index: message.validator_index,
                        preparation_hash: pre_commit.preparation_hash,
                        invocation_script: payload.witness.invocation_script.clone(),
                    });
                }
            }
            for payload in candidate.commit_payloads.iter().flatten() {
                let Ok(message) = self.get_message(payload) else {
                    continue;
                };
                if let Some(commit) = message.commit() {
                    commit_messages.push(CommitPayloadCompact {
                        proposal: slot as u8,
                        validator_index: message.validator_index,
                        view_number: message.view_number,
                        signature: commit.signature.clone(),
                        invocation_script: payload.witness.invocation_script.clone(),
                    });
                }
            }
        }

        let message = self.envelope(MessageBody::RecoveryMessage(RecoveryMessage {
            change_view_messages,
            prepare_requests,
            preparation_hashes,
            preparation_messages,
            pre_commit_messages,
            commit_messages,
        }));
        self.make_signed_payload(message)
    }

    fn require_my_index(&self) -> Result<usize> {
        if self.my_index < 0 || self.key_pair.is_none() {
            return Err(Error::WatchOnly);
        }
        Ok(self.my_index as usize)
    }

    fn envelope(&self, body: MessageBody) -> ConsensusMessage {
        ConsensusMessage {
            block_index: self.block_index(),
            validator_index: self.my_index as u8,
            view_number: self.view_number,
            body,
        }
    }

    /// Wraps a message in the signed extensible-payload form: category
    /// `"dBFT"`, validity ending at the message's block index, sender
    /// derived from this validator's signature contract, and a witness
    /// over `network ‖ payload hash`. The message is memoized under the
    /// payload hash on the way out.
    fn make_signed_payload(&self, message: ConsensusMessage) -> Result<ExtensiblePayload> {
        let key = self.key_pair.as_ref().ok_or(Error::WatchOnly)?;
        let verification_script = create_signature_redeem_script(key.public_key());
        let mut payload = ExtensiblePayload {
            category: PAYLOAD_CATEGORY.to_string(),
            valid_block_start: 0,
            valid_block_end: message.block_index,
            sender: UInt160::from_script(&verification_script),
            data: message.to_array()?,
            witness: Witness::empty(),
        };
        let signature = key.sign(&payload.sign_data(self.settings.network));
        let mut invocation = ScriptBuilder::new();
        invocation.emit_push(&signature);
        payload.witness = Witness::new(invocation.into_bytes(), verification_script);
        self.cache.try_insert(payload.hash(), message);
        Ok(payload)
    }

    fn touch_self(&mut self) {
        if let Ok(index) = usize::try_from(self.my_index) {
            if let Some(me) = self.validator_set.get(index).copied() {
                self.liveness.note(me, self.block_index());
            }
        }
    }
}
