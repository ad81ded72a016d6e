//! Compact round-state records carried by recovery messages.
//!
//! A recovery message replays what the sender has collected so far:
//! change views, the prepare requests (or just their payload hashes),
//! preparations, pre-commits and commits. Each record is compact: it
//! carries the fields needed to reconstruct the original message plus
//! the emitter's invocation script, so receivers can re-wrap and verify
//! the originals. Applying a recovery message is the protocol driver's
//! job; the context only fabricates them.

use crate::messages::PrepareRequest;
use dbft_core::witness::MAX_INVOCATION_SCRIPT;
use dbft_core::UInt256;
use dbft_io::{helper, BinaryWriter, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// Upper bound on per-validator records in one recovery message.
const MAX_RECORDS: usize = 255;

/// A change-view payload, compacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeViewPayloadCompact {
    /// Emitting validator.
    pub validator_index: u8,
    /// View the emitter was in when it asked to leave.
    pub original_view_number: u8,
    /// Emitter's millisecond timestamp.
    pub timestamp: u64,
    /// The emitter's witness invocation script.
    pub invocation_script: Vec<u8>,
}

/// A preparation payload, compacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparationPayloadCompact {
    /// Candidate id: 0 priority, 1 fallback.
    pub proposal: u8,
    /// Emitting validator.
    pub validator_index: u8,
    /// The emitter's witness invocation script.
    pub invocation_script: Vec<u8>,
}

/// A pre-commit payload, compacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreCommitPayloadCompact {
    /// Candidate id: 0 priority, 1 fallback.
    pub proposal: u8,
    /// Emitting validator.
    pub validator_index: u8,
    /// Hash of the prepare-request payload being acknowledged.
    pub preparation_hash: UInt256,
    /// The emitter's witness invocation script.
    pub invocation_script: Vec<u8>,
}

/// A commit payload, compacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPayloadCompact {
    /// Candidate id: 0 priority, 1 fallback.
    pub proposal: u8,
    /// Emitting validator.
    pub validator_index: u8,
    /// View the commit was emitted in.
    pub view_number: u8,
    /// Raw 64-byte header signature.
    pub signature: Vec<u8>,
    /// The emitter's witness invocation script.
    pub invocation_script: Vec<u8>,
}

/// Replay of the collected round state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryMessage {
    /// Change views seen this round.
    pub change_view_messages: Vec<ChangeViewPayloadCompact>,
    /// The prepare request per candidate, when the sender has it.
    pub prepare_requests: [Option<PrepareRequest>; 2],
    /// Per candidate, the prepare-request payload hash peers agreed on,
    /// for receivers that already hold the request.
    pub preparation_hashes: [Option<UInt256>; 2],
    /// Preparation responses seen this round.
    pub preparation_messages: Vec<PreparationPayloadCompact>,
    /// Pre-commits seen this round.
    pub pre_commit_messages: Vec<PreCommitPayloadCompact>,
    /// Commits seen this round (any view).
    pub commit_messages: Vec<CommitPayloadCompact>,
}

impl Serializable for ChangeViewPayloadCompact {
    fn size(&self) -> usize {
        1 + 1 + 8 + helper::var_bytes_size(&self.invocation_script)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u8(self.validator_index)?;
        writer.write_u8(self.original_view_number)?;
        writer.write_u64(self.timestamp)?;
        writer.write_var_bytes(&self.invocation_script)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            validator_index: reader.read_u8()?,
            original_view_number: reader.read_u8()?,
            timestamp: reader.read_u64()?,
            invocation_script: reader.read_var_bytes(MAX_INVOCATION_SCRIPT)?,
        })
    }
}

impl Serializable for PreparationPayloadCompact {
    fn size(&self) -> usize {
        1 + 1 + helper::var_bytes_size(&self.invocation_script)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u8(self.proposal)?;
        writer.write_u8(self.validator_index)?;
        writer.write_var_bytes(&self.invocation_script)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            proposal: reader.read_u8()?,
            validator_index: reader.read_u8()?,
            invocation_script: reader.read_var_bytes(MAX_INVOCATION_SCRIPT)?,
        })
    }
}

impl Serializable for PreCommitPayloadCompact {
    fn size(&self) -> usize {
        1 + 1 + 32 + helper::var_bytes_size(&self.invocation_script)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u8(self.proposal)?;
        writer.write_u8(self.validator_index)?;
        writer.write_serializable(&self.preparation_hash)?;
        writer.write_var_bytes(&self.invocation_script)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            proposal: reader.read_u8()?,
            validator_index: reader.read_u8()?,
            preparation_hash: <UInt256 as Serializable>::deserialize(reader)?,
            invocation_script: reader.read_var_bytes(MAX_INVOCATION_SCRIPT)?,
        })
    }
}

impl Serializable for CommitPayloadCompact {
    fn size(&self) -> usize {
        1 + 1 + 1
            + helper::var_bytes_size(&self.signature)
            + helper::var_bytes_size(&self.invocation_script)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u8(self.proposal)?;
        writer.write_u8(self.validator_index)?;
        writer.write_u8(self.view_number)?;
        writer.write_var_bytes(&self.signature)?;
        writer.write_var_bytes(&self.invocation_script)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            proposal: reader.read_u8()?,
            validator_index: reader.read_u8()?,
            view_number: reader.read_u8()?,
            signature: reader.read_var_bytes(dbft_crypto::SIGNATURE_SIZE)?,
            invocation_script: reader.read_var_bytes(MAX_INVOCATION_SCRIPT)?,
        })
    }
}

impl Serializable for RecoveryMessage {
    fn size(&self) -> usize {
        let mut size = helper::array_size(&self.change_view_messages);
        for request in &self.prepare_requests {
            size += 1 + request.as_ref().map_or(0, |request| request.size());
        }
        for hash in &self.preparation_hashes {
            size += 1 + hash.as_ref().map_or(0, |_| 32);
        }
        size + helper::array_size(&self.preparation_messages)
            + helper::array_size(&self.pre_commit_messages)
            + helper::array_size(&self.commit_messages)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        helper::serialize_array(&self.change_view_messages, writer)?;
        for request in &self.prepare_requests {
            writer.write_bool(request.is_some())?;
            if let Some(request) = request {
                Serializable::serialize(request, writer)?;
            }
        }
        for hash in &self.preparation_hashes {
            writer.write_bool(hash.is_some())?;
            if let Some(hash) = hash {
                writer.write_serializable(hash)?;
            }
        }
        helper::serialize_array(&self.preparation_messages, writer)?;
        helper::serialize_array(&self.pre_commit_messages, writer)?;
        helper::serialize_array(&self.commit_messages, writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let change_view_messages = helper::deserialize_array(reader, MAX_RECORDS)?;
        let mut prepare_requests = [None, None];
        for slot in prepare_requests.iter_mut() {
            if reader.read_bool()? {
                *slot = Some(<PrepareRequest as Serializable>::deserialize(reader)?);
            }
        }
        let mut preparation_hashes = [None, None];
        for slot in preparation_hashes.iter_mut() {
            if reader.read_bool()? {
                *slot = Some(<UInt256 as Serializable>::deserialize(reader)?);
            }
        }
        Ok(Self {
            change_view_messages,
            prepare_requests,
            preparation_hashes,
            preparation_messages: helper::deserialize_array(reader, MAX_RECORDS)?,
            pre_commit_messages: helper::deserialize_array(reader, MAX_RECORDS)?,
            commit_messages: helper::deserialize_array(reader, MAX_RECORDS)?,
        })
    }
}
