//! Consensus configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// The recognized consensus options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ConsensusSettings {
    /// Path of the durable store holding recovery state.
    pub recovery_logs: String,
    /// Network magic mixed into every signature.
    pub network: u32,
    /// Expected validator count.
    pub validators_count: usize,
    /// Committee size used for the refresh-epoch decision.
    pub committee_members_count: usize,
}

impl Default for ConsensusSettings {
    fn default() -> Self {
        Self {
            recovery_logs: "ConsensusState".to_string(),
            network: 0,
            validators_count: 7,
            committee_members_count: 21,
        }
    }
}

impl ConsensusSettings {
    /// Rejects configurations the round arithmetic cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.validators_count < 4 {
            return Err(Error::InvalidSettings(format!(
                "ValidatorsCount must be at least 4, got {}",
                self.validators_count
            )));
        }
        if self.committee_members_count < self.validators_count {
            return Err(Error::InvalidSettings(format!(
                "CommitteeMembersCount {} is smaller than ValidatorsCount {}",
                self.committee_members_count, self.validators_count
            )));
        }
        Ok(())
    }
}
