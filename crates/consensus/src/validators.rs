//! Snapshot of the validator set for the pending height.

use crate::providers::LedgerSnapshot;
use crate::settings::ConsensusSettings;
use dbft_crypto::EcPoint;

/// The ordered validator public keys for the block being produced,
/// with the Byzantine arithmetic derived once.
///
/// `f = (n − 1) / 3` is the fault tolerance, `m = n − f` the quorum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorSetView {
    validators: Vec<EcPoint>,
}

impl ValidatorSetView {
    /// An empty view, the state before the first reset.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a view from an explicit key list.
    pub fn from_validators(validators: Vec<EcPoint>) -> Self {
        Self { validators }
    }

    /// Reads the pending-height validator set from a chain snapshot.
    ///
    /// If the committee-refresh epoch applies at the next height the
    /// set is recomputed from stake tallies, otherwise the previously
    /// committed set is reused. The decision is binary and
    /// deterministic.
    pub fn refresh(snapshot: &dyn LedgerSnapshot, settings: &ConsensusSettings) -> Self {
        let next_height = snapshot.current_index() + 1;
        let validators = if snapshot
            .should_refresh_committee(next_height, settings.committee_members_count)
        {
            snapshot.compute_next_block_validators(settings.validators_count)
        } else {
            snapshot.next_block_validators(settings.validators_count)
        };
        Self { validators }
    }

    /// Number of validators, `N`.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether the view holds no validators.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Fault tolerance `F = (N − 1) / 3`.
    pub fn f(&self) -> usize {
        (self.len().saturating_sub(1)) / 3
    }

    /// Quorum `M = N − F`.
    pub fn m(&self) -> usize {
        self.len() - self.f()
    }

    /// The key at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<&EcPoint> {
        self.validators.get(index)
    }

    /// The ordered key list.
    pub fn as_slice(&self) -> &[EcPoint] {
        &self.validators
    }

    /// Position of `key` in the set.
    pub fn index_of(&self, key: &EcPoint) -> Option<usize> {
        self.validators.iter().position(|v| v == key)
    }
}
