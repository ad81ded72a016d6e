//! Header finalization and final block assembly.

use crate::context::ConsensusContext;
use crate::{Error, Result};
use dbft_core::{Block, Header, UInt256, Witness};
use dbft_crypto::{
    create_multisig_redeem_script, merkle_root, EcPoint, ScriptBuilder, SIGNATURE_SIZE,
};
use dbft_io::Serializable;
use tracing::info;

impl ConsensusContext {
    /// Finalizes the candidate's header by filling in the Merkle root
    /// over its transaction hash list.
    ///
    /// The root is memoized: a second call returns a byte-identical
    /// header without recomputing anything. Fails with
    /// [`Error::NoProposal`] while the candidate has no hash list.
    pub fn ensure_header(&mut self, proposal: usize) -> Result<Header> {
        let slot = self.proposal_index(proposal as u8)?;
        let candidate = self.candidate_mut(slot)?;
        let hashes = candidate
            .transaction_hashes
            .as_ref()
            .ok_or(Error::NoProposal)?;
        let root = match candidate.merkle_root {
            Some(root) => root,
            None => {
                let leaves: Vec<[u8; 32]> = hashes.iter().map(UInt256::to_array).collect();
                let root = UInt256::from(merkle_root(&leaves));
                candidate.merkle_root = Some(root);
                root
            }
        };
        candidate.block.header.merkle_root = root;
        Ok(candidate.block.header.clone())
    }

    /// Assembles the final block for a candidate from the collected
    /// commits.
    ///
    /// At most M commit signatures are consumed, in ascending validator
    /// index; commits whose embedded view differs from the round's view
    /// are skipped without contributing. The resulting witness carries
    /// M signature pushes against the validator-set multi-sig redeem
    /// script. Fails with [`Error::NoQuorum`] below M matching commits
    /// and with [`Error::MissingTransaction`] if the candidate pool
    /// does not cover the hash list — the round must not emit a block
    /// it cannot back.
    pub fn create_block(&mut self, proposal: usize) -> Result<Block> {
        let slot = self.proposal_index(proposal as u8)?;
        self.ensure_header(slot)?;

        let required = self.m();
        let verification_script = create_multisig_redeem_script(required, self.validators())?;
        let view = self.view_number;

        let candidate = self.candidates[slot].as_ref().ok_or(Error::FallbackDisabled)?;
        let mut invocation = ScriptBuilder::new();
        let mut collected = 0usize;
        for index in 0..candidate.commit_payloads.len() {
            if collected == required {
                break;
            }
            let Some(payload) = candidate.commit_payloads[index].as_ref() else {
                continue;
            };
            let Ok(message) = self.get_message(payload) else {
                continue;
            };
            if message.view_number != view {
                continue;
            }
            let Some(commit) = message.commit() else {
                continue;
            };
            if commit.signature.len() != SIGNATURE_SIZE {
                continue;
            }
            invocation.emit_push(&commit.signature);
            collected += 1;
        }
        if collected < required {
            return Err(Error::NoQuorum {
                collected,
                required,
            });
        }

        let hashes = candidate
            .transaction_hashes
            .clone()
            .ok_or(Error::NoProposal)?;
        let mut transactions = Vec::with_capacity(hashes.len());
        for hash in &hashes {
            let transaction = candidate
                .transactions
                .get(hash)
                .cloned()
                .ok_or(Error::MissingTransaction(*hash))?;
            transactions.push(transaction);
        }

        let witness = Witness::new(invocation.into_bytes(), verification_script);
        let candidate = self.candidate_mut(slot)?;
        candidate.block.header.witness = witness;
        candidate.block.transactions = Some(transactions);
        let block = candidate.block.clone();
        info!(
            index = block.header.index,
            hash = %block.hash(),
            commits = collected,
            "block assembled"
        );
        Ok(block)
    }
}

/// Serialized-size estimate of a block witness whose invocation script
/// concatenates M signature pushes over the validator multi-sig redeem
/// script. An upper bound used by fee calculation outside the core.
pub(crate) fn estimate_witness_size(m: usize, validators: &[EcPoint]) -> Result<usize> {
    let verification_script = create_multisig_redeem_script(m, validators)?;
    let mut invocation = ScriptBuilder::new();
    for _ in 0..m {
        invocation.emit_push(&[0u8; SIGNATURE_SIZE]);
    }
    Ok(Witness::new(invocation.into_bytes(), verification_script).size())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbft_crypto::KeyPair;

    #[test]
    fn witness_estimate_grows_with_quorum() {
        let validators: Vec<EcPoint> = (1u8..=7)
            .map(|seed| *KeyPair::from_private_key(&[seed; 32]).unwrap().public_key())
            .collect();
        let small = estimate_witness_size(5, &validators).unwrap();
        let smaller = estimate_witness_size(4, &validators).unwrap();
        // Each extra signature costs one 64-byte push plus its prefix.
        assert_eq!(small - smaller, 2 + SIGNATURE_SIZE);
    }
}
