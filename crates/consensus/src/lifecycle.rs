//! Round lifecycle: construction and the `reset` transitions.

use crate::block_builder::estimate_witness_size;
use crate::cache::MessageCache;
use crate::context::{validators_changed_at, ConsensusContext};
use crate::liveness::LivenessTracker;
use crate::proposal::{Candidate, FALLBACK, PRIORITY};
use crate::providers::{Ledger, Store, Wallet};
use crate::settings::ConsensusSettings;
use crate::validators::ValidatorSetView;
use crate::{Error, Result};
use dbft_core::{Block, Header, UInt160, UInt256, Witness, BLOCK_VERSION};
use dbft_crypto::{bft_address, EcPoint};
use std::sync::Arc;
use tracing::debug;

impl ConsensusContext {
    /// Creates a context and initializes it for view 0 at the current
    /// chain tip.
    pub fn new(
        settings: ConsensusSettings,
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn Store>,
        wallet: Arc<dyn Wallet>,
    ) -> Result<Self> {
        settings.validate()?;
        let mut context = Self {
            settings,
            ledger,
            store,
            wallet,
            snapshot: None,
            candidates: [None, None],
            change_view_payloads: Vec::new(),
            last_change_view_payloads: Vec::new(),
            view_number: 0,
            validator_set: ValidatorSetView::empty(),
            my_index: -1,
            liveness: LivenessTracker::new(),
            cache: MessageCache::new(),
            key_pair: None,
            witness_size: 0,
        };
        context.reset(0)?;
        Ok(context)
    }

    /// Re-initializes the round.
    ///
    /// View 0 is a full reset: a fresh chain snapshot is acquired, both
    /// candidate drafts are rebuilt against the new tip, the validator
    /// set is refreshed and the wallet rescanned. A non-zero view is a
    /// partial transition: change views justifying the new view are
    /// carried over, the priority candidate's mutable fields are
    /// cleared, and the fallback candidate is torn down entirely —
    /// dual proposals are a view-0-only affair.
    pub fn reset(&mut self, view_number: u8) -> Result<()> {
        if view_number == 0 {
            self.reset_full()?;
        } else {
            self.reset_partial(view_number);
        }
        self.view_number = view_number;
        if let Ok(index) = usize::try_from(self.my_index) {
            if let Some(me) = self.validator_set.get(index).copied() {
                // We are about to act this round.
                self.liveness.note(me, self.block_index());
            }
        }
        Ok(())
    }

    fn reset_full(&mut self) -> Result<()> {
        // Release the previous snapshot before acquiring the next one.
        self.snapshot = None;
        let snapshot = self.ledger.snapshot();

        let height = snapshot.current_index();
        let prev_hash = snapshot.current_hash();
        let block_index = height + 1;

        let previous_count = self.validator_set.len();
        let validators_changed = validators_changed_at(snapshot.as_ref());
        self.validator_set = ValidatorSetView::refresh(snapshot.as_ref(), &self.settings);
        let validators: Vec<EcPoint> = self.validator_set.as_slice().to_vec();
        let n = validators.len();
        if n == 0 {
            return Err(Error::EmptyValidatorSet);
        }

        if self.witness_size == 0 || previous_count != n {
            self.witness_size = estimate_witness_size(self.validator_set.m(), &validators)?;
        }

        let next_consensus = UInt160::from(bft_address(&validators)?);
        let draft = |primary_index: u8| Block {
            header: Header {
                version: BLOCK_VERSION,
                prev_hash,
                merkle_root: UInt256::zero(),
                timestamp: 0,
                nonce: 0,
                index: block_index,
                primary_index,
                next_consensus,
                witness: Witness::empty(),
            },
            transactions: None,
        };
        let priority_index = (block_index as i64).rem_euclid(n as i64) as u8;
        let fallback_index = (block_index as i64 - 1).rem_euclid(n as i64) as u8;
        self.candidates = [
            Some(Candidate::new(draft(priority_index), n)),
            Some(Candidate::new(draft(fallback_index), n)),
        ];

        self.change_view_payloads = vec![None; n];
        self.last_change_view_payloads = vec![None; n];

        if self.liveness.is_empty() || validators_changed {
            self.liveness.rebuild(&validators, height);
        }

        self.my_index = -1;
        self.key_pair = None;
        for (index, validator) in validators.iter().enumerate() {
            let Some(account) = self.wallet.account(validator) else {
                continue;
            };
            if account.has_key() {
                if let Some(key) = account.key() {
                    self.my_index = index as i32;
                    self.key_pair = Some(key);
                    break;
                }
            }
        }

        self.cache.clear();
        self.snapshot = Some(snapshot);

        debug!(
            height,
            validators = n,
            my_index = self.my_index,
            "full reset against chain tip"
        );
        Ok(())
    }

    fn reset_partial(&mut self, view_number: u8) {
        // Carry forward the change views that justify this view or a
        // later one; they back future recovery messages.
        let carried: Vec<Option<_>> = self
            .change_view_payloads
            .iter()
            .map(|slot| {
                slot.as_ref()
                    .filter(|payload| {
                        self.get_message(payload)
                            .ok()
                            .and_then(|message| {
                                message.change_view().map(|cv| cv.new_view_number)
                            })
                            .is_some_and(|new_view| new_view >= view_number)
                    })
                    .cloned()
            })
            .collect();
        self.last_change_view_payloads = carried;

        let primary_index = self.priority_primary_index(view_number);
        if let Some(candidate) = self.candidates[PRIORITY].as_mut() {
            candidate.clear_for_view(primary_index);
        }
        // Dual proposals end with view 0.
        self.candidates[FALLBACK] = None;

        debug!(view = view_number, "partial reset into new view");
    }
}
