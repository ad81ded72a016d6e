//! The closed set of dBFT messages and their wire codec.
//!
//! Every message travels inside an extensible payload; this module only
//! concerns the inner bytes. Dispatch is a tagged enum: the first byte
//! names the variant, followed by the envelope fields shared by all
//! messages, followed by the variant body.

use crate::recovery::RecoveryMessage;
use crate::{Error, Result};
use dbft_core::UInt256;
use dbft_crypto::SIGNATURE_SIZE;
use dbft_io::{helper, BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// Upper bound on a proposal's transaction hash list.
pub const MAX_TRANSACTION_HASHES: usize = 65_535;

/// Wire tag of each message variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// Proposal to advance to a higher view.
    ChangeView = 0x00,
    /// A primary's block proposal.
    PrepareRequest = 0x20,
    /// A backup's acceptance of a proposal.
    PrepareResponse = 0x21,
    /// Acknowledgement that a preparation quorum was observed.
    PreCommit = 0x22,
    /// A block signature.
    Commit = 0x30,
    /// Plea for peers to replay what this node missed.
    RecoveryRequest = 0x40,
    /// Replay of the collected round state.
    RecoveryMessage = 0x41,
}

impl MessageType {
    /// Decodes a wire tag.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::ChangeView),
            0x20 => Some(Self::PrepareRequest),
            0x21 => Some(Self::PrepareResponse),
            0x22 => Some(Self::PreCommit),
            0x30 => Some(Self::Commit),
            0x40 => Some(Self::RecoveryRequest),
            0x41 => Some(Self::RecoveryMessage),
            _ => None,
        }
    }
}

/// Why a validator asked for a view change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChangeViewReason {
    /// The current phase timed out.
    Timeout = 0x00,
    /// Enough peers already want the change.
    ChangeAgreement = 0x01,
    /// A proposed transaction could not be found.
    TxNotFound = 0x02,
    /// A proposed transaction was rejected by policy.
    TxRejectedByPolicy = 0x03,
    /// A proposed transaction failed verification.
    TxInvalid = 0x04,
    /// The proposed block was rejected by policy.
    BlockRejectedByPolicy = 0x05,
}

impl ChangeViewReason {
    /// Decodes a wire value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Timeout),
            0x01 => Some(Self::ChangeAgreement),
            0x02 => Some(Self::TxNotFound),
            0x03 => Some(Self::TxRejectedByPolicy),
            0x04 => Some(Self::TxInvalid),
            0x05 => Some(Self::BlockRejectedByPolicy),
            _ => None,
        }
    }
}

/// A decoded consensus message: the shared envelope plus the variant
/// body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusMessage {
    /// Height of the block being produced.
    pub block_index: u32,
    /// Index of the emitting validator.
    pub validator_index: u8,
    /// View the message was emitted in.
    pub view_number: u8,
    /// The variant body.
    pub body: MessageBody,
}

/// Variant bodies of [`ConsensusMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageBody {
    /// See [`ChangeView`].
    ChangeView(ChangeView),
    /// See [`PrepareRequest`].
    PrepareRequest(PrepareRequest),
    /// See [`PrepareResponse`].
    PrepareResponse(PrepareResponse),
    /// See [`PreCommit`].
    PreCommit(PreCommit),
    /// See [`Commit`].
    Commit(Commit),
    /// See [`RecoveryRequest`].
    RecoveryRequest(RecoveryRequest),
    /// See [`RecoveryMessage`].
    RecoveryMessage(RecoveryMessage),
}

/// Proposal to advance to `new_view_number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeView {
    /// The view the sender wants to move to.
    pub new_view_number: u8,
    /// Sender-side millisecond timestamp.
    pub timestamp: u64,
    /// Why the sender gave up on the current view.
    pub reason: ChangeViewReason,
}

/// A primary's block proposal for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareRequest {
    /// Candidate id: 0 priority, 1 fallback.
    pub proposal: u8,
    /// Header format version of the draft.
    pub version: u32,
    /// Hash of the chain tip the draft builds on.
    pub prev_hash: UInt256,
    /// Proposed block timestamp, milliseconds.
    pub timestamp: u64,
    /// Proposed block nonce.
    pub nonce: u64,
    /// Hashes of the proposed transactions.
    pub transaction_hashes: Vec<UInt256>,
}

/// A backup's acceptance of the proposal identified by
/// `preparation_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareResponse {
    /// Candidate id: 0 priority, 1 fallback.
    pub proposal: u8,
    /// Hash of the primary's prepare-request payload.
    pub preparation_hash: UInt256,
}

/// Acknowledgement that a preparation quorum was observed for the
/// candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreCommit {
    /// Candidate id: 0 priority, 1 fallback.
    pub proposal: u8,
    /// Hash of the primary's prepare-request payload.
    pub preparation_hash: UInt256,
}

/// A validator's signature over the candidate block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Candidate id: 0 priority, 1 fallback.
    pub proposal: u8,
    /// Raw 64-byte `r ‖ s` signature over the header sign-data.
    pub signature: Vec<u8>,
}

/// Plea for peers to replay the round state this node missed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryRequest {
    /// Sender-side millisecond timestamp.
    pub timestamp: u64,
}

// The prepare-request body also rides inside recovery messages, so it
// gets a standalone codec.
impl Serializable for PrepareRequest {
    fn size(&self) -> usize {
        1 + 4 + 32 + 8 + 8 + helper::array_size(&self.transaction_hashes)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u8(self.proposal)?;
        writer.write_u32(self.version)?;
        writer.write_serializable(&self.prev_hash)?;
        writer.write_u64(self.timestamp)?;
        writer.write_u64(self.nonce)?;
        helper::serialize_array(&self.transaction_hashes, writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            proposal: reader.read_u8()?,
            version: reader.read_u32()?,
            prev_hash: <UInt256 as Serializable>::deserialize(reader)?,
            timestamp: reader.read_u64()?,
            nonce: reader.read_u64()?,
            transaction_hashes: helper::deserialize_array(reader, MAX_TRANSACTION_HASHES)?,
        })
    }
}

impl ConsensusMessage {
    /// The wire tag of this message.
    pub fn message_type(&self) -> MessageType {
        match &self.body {
            MessageBody::ChangeView(_) => MessageType::ChangeView,
            MessageBody::PrepareRequest(_) => MessageType::PrepareRequest,
            MessageBody::PrepareResponse(_) => MessageType::PrepareResponse,
            MessageBody::PreCommit(_) => MessageType::PreCommit,
            MessageBody::Commit(_) => MessageType::Commit,
            MessageBody::RecoveryRequest(_) => MessageType::RecoveryRequest,
            MessageBody::RecoveryMessage(_) => MessageType::RecoveryMessage,
        }
    }

    /// The body as a change view, if it is one.
    pub fn change_view(&self) -> Option<&ChangeView> {
        match &self.body {
            MessageBody::ChangeView(body) => Some(body),
            _ => None,
        }
    }

    /// The body as a prepare request, if it is one.
    pub fn prepare_request(&self) -> Option<&PrepareRequest> {
        match &self.body {
            MessageBody::PrepareRequest(body) => Some(body),
            _ => None,
        }
    }

    /// The body as a prepare response, if it is one.
    pub fn prepare_response(&self) -> Option<&PrepareResponse> {
        match &self.body {
            MessageBody::PrepareResponse(body) => Some(body),
            _ => None,
        }
    }

    /// The body as a pre-commit, if it is one.
    pub fn pre_commit(&self) -> Option<&PreCommit> {
        match &self.body {
            MessageBody::PreCommit(body) => Some(body),
            _ => None,
        }
    }

    /// The body as a commit, if it is one.
    pub fn commit(&self) -> Option<&Commit> {
        match &self.body {
            MessageBody::Commit(body) => Some(body),
            _ => None,
        }
    }

    /// Validates fields the codec cannot express, e.g. signature width.
    pub fn validate(&self) -> Result<()> {
        if let MessageBody::Commit(commit) = &self.body {
            if commit.signature.len() != SIGNATURE_SIZE {
                return Err(Error::Io(IoError::invalid_data(
                    "commit signature",
                    format!("expected {SIGNATURE_SIZE} bytes, got {}", commit.signature.len()),
                )));
            }
        }
        Ok(())
    }
}

impl Serializable for ConsensusMessage {
    fn size(&self) -> usize {
        let body = match &self.body {
            MessageBody::ChangeView(_) => 1 + 8 + 1,
            MessageBody::PrepareRequest(request) => request.size(),
            MessageBody::PrepareResponse(_) | MessageBody::PreCommit(_) => 1 + 32,
            MessageBody::Commit(_) => 1 + SIGNATURE_SIZE,
            MessageBody::RecoveryRequest(_) => 8,
            MessageBody::RecoveryMessage(recovery) => recovery.size(),
        };
        // tag + block_index + validator_index + view_number + body
        1 + 4 + 1 + 1 + body
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u8(self.message_type() as u8)?;
        writer.write_u32(self.block_index)?;
        writer.write_u8(self.validator_index)?;
        writer.write_u8(self.view_number)?;
        match &self.body {
            MessageBody::ChangeView(body) => {
                writer.write_u8(body.new_view_number)?;
                writer.write_u64(body.timestamp)?;
                writer.write_u8(body.reason as u8)
            }
            MessageBody::PrepareRequest(body) => Serializable::serialize(body, writer),
            MessageBody::PrepareResponse(body) => {
                writer.write_u8(body.proposal)?;
                writer.write_serializable(&body.preparation_hash)
            }
            MessageBody::PreCommit(body) => {
                writer.write_u8(body.proposal)?;
                writer.write_serializable(&body.preparation_hash)
            }
            MessageBody::Commit(body) => {
                writer.write_u8(body.proposal)?;
                writer.write_bytes(&body.signature)
            }
            MessageBody::RecoveryRequest(body) => writer.write_u64(body.timestamp),
            MessageBody::RecoveryMessage(body) => Serializable::serialize(body, writer),
        }
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let tag = reader.read_u8()?;
        let message_type = MessageType::from_u8(tag).ok_or_else(|| {
            IoError::invalid_data("message type", format!("unknown tag 0x{tag:02x}"))
        })?;
        let block_index = reader.read_u32()?;
        let validator_index = reader.read_u8()?;
        let view_number = reader.read_u8()?;
        let body = match message_type {
            MessageType::ChangeView => MessageBody::ChangeView(ChangeView {
                new_view_number: reader.read_u8()?,
                timestamp: reader.read_u64()?,
                reason: {
                    let raw = reader.read_u8()?;
                    ChangeViewReason::from_u8(raw).ok_or_else(|| {
                        IoError::invalid_data(
                            "change view reason",
                            format!("unknown value 0x{raw:02x}"),
                        )
                    })?
                },
            }),
            MessageType::PrepareRequest => {
                MessageBody::PrepareRequest(<PrepareRequest as Serializable>::deserialize(reader)?)
            }
            MessageType::PrepareResponse => MessageBody::PrepareResponse(PrepareResponse {
                proposal: reader.read_u8()?,
                preparation_hash: <UInt256 as Serializable>::deserialize(reader)?,
            }),
            MessageType::PreCommit => MessageBody::PreCommit(PreCommit {
                proposal: reader.read_u8()?,
                preparation_hash: <UInt256 as Serializable>::deserialize(reader)?,
            }),
            MessageType::Commit => MessageBody::Commit(Commit {
                proposal: reader.read_u8()?,
                signature: reader.read_bytes(SIGNATURE_SIZE)?,
            }),
            MessageType::RecoveryRequest => MessageBody::RecoveryRequest(RecoveryRequest {
                timestamp: reader.read_u64()?,
            }),
            MessageType::RecoveryMessage => {
                MessageBody::RecoveryMessage(<RecoveryMessage as Serializable>::deserialize(reader)?)
            }
        };
        Ok(Self {
            block_index,
            validator_index,
            view_number,
            body,
        })
    }
}
