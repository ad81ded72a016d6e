//! Block headers, full blocks and trimmed blocks.

use crate::transaction::Transaction;
use crate::uint160::UInt160;
use crate::uint256::UInt256;
use crate::witness::Witness;
use dbft_io::{helper, BinaryWriter, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// The only header format version this implementation produces.
pub const BLOCK_VERSION: u32 = 0;

/// Upper bound on transactions carried by a block.
pub const MAX_TRANSACTIONS_PER_BLOCK: usize = 65_535;

/// A block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Format version.
    pub version: u32,
    /// Hash of the preceding block.
    pub prev_hash: UInt256,
    /// Merkle root over the transaction hash list; zero until computed.
    pub merkle_root: UInt256,
    /// Millisecond timestamp chosen by the proposer.
    pub timestamp: u64,
    /// Proposer-chosen random value.
    pub nonce: u64,
    /// Height of this block.
    pub index: u32,
    /// Index of the validator that proposed this block.
    pub primary_index: u8,
    /// Script hash of the next round's quorum multi-sig contract.
    pub next_consensus: UInt160,
    /// The validator-set multi-sig witness; empty until assembly.
    pub witness: Witness,
}

impl Header {
    /// Serializes the signed-over portion (everything but the witness).
    pub fn serialize_unsigned(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u32(self.version)?;
        writer.write_serializable(&self.prev_hash)?;
        writer.write_serializable(&self.merkle_root)?;
        writer.write_u64(self.timestamp)?;
        writer.write_u64(self.nonce)?;
        writer.write_u32(self.index)?;
        writer.write_u8(self.primary_index)?;
        writer.write_serializable(&self.next_consensus)
    }

    fn unsigned_size(&self) -> usize {
        4 + 32 + 32 + 8 + 8 + 4 + 1 + 20
    }

    /// The identity hash: double SHA-256 over the unsigned form.
    pub fn hash(&self) -> UInt256 {
        let mut writer = BinaryWriter::with_capacity(self.unsigned_size());
        self.serialize_unsigned(&mut writer)
            .expect("in-memory serialization cannot fail");
        UInt256::from(dbft_crypto::hash256(&writer.into_bytes()))
    }

    /// The byte string validators sign: network magic followed by the
    /// header hash.
    pub fn sign_data(&self, network: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity(4 + 32);
        data.extend_from_slice(&network.to_le_bytes());
        data.extend_from_slice(self.hash().as_bytes());
        data
    }
}

impl Serializable for Header {
    fn size(&self) -> usize {
        self.unsigned_size() + self.witness.size()
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        self.serialize_unsigned(writer)?;
        Serializable::serialize(&self.witness, writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            version: reader.read_u32()?,
            prev_hash: <UInt256 as Serializable>::deserialize(reader)?,
            merkle_root: <UInt256 as Serializable>::deserialize(reader)?,
            timestamp: reader.read_u64()?,
            nonce: reader.read_u64()?,
            index: reader.read_u32()?,
            primary_index: reader.read_u8()?,
            next_consensus: <UInt160 as Serializable>::deserialize(reader)?,
            witness: <Witness as Serializable>::deserialize(reader)?,
        })
    }
}

/// A block: a header and, once assembly has succeeded, its transactions.
///
/// `transactions` staying `None` is the draft state a candidate proposal
/// lives in; a populated list marks the round's terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The header.
    pub header: Header,
    /// Full transactions, in hash-list order. `None` while drafting.
    pub transactions: Option<Vec<Transaction>>,
}

impl Block {
    /// The identity hash of the header.
    pub fn hash(&self) -> UInt256 {
        self.header.hash()
    }

    /// Height of this block.
    pub fn index(&self) -> u32 {
        self.header.index
    }
}

impl Serializable for Block {
    fn size(&self) -> usize {
        let transactions = self.transactions.as_deref().unwrap_or(&[]);
        self.header.size() + helper::array_size(transactions)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        Serializable::serialize(&self.header, writer)?;
        helper::serialize_array(self.transactions.as_deref().unwrap_or(&[]), writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            header: <Header as Serializable>::deserialize(reader)?,
            transactions: Some(helper::deserialize_array(
                reader,
                MAX_TRANSACTIONS_PER_BLOCK,
            )?),
        })
    }
}

/// A block with its transactions trimmed down to their hashes, the form
/// the ledger serves for history lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimmedBlock {
    /// The header.
    pub header: Header,
    /// Hashes of the block's transactions.
    pub hashes: Vec<UInt256>,
}

impl TrimmedBlock {
    /// The identity hash of the header.
    pub fn hash(&self) -> UInt256 {
        self.header.hash()
    }
}

impl Serializable for TrimmedBlock {
    fn size(&self) -> usize {
        self.header.size() + helper::array_size(&self.hashes)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        Serializable::serialize(&self.header, writer)?;
        helper::serialize_array(&self.hashes, writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            header: <Header as Serializable>::deserialize(reader)?,
            hashes: helper::deserialize_array(reader, MAX_TRANSACTIONS_PER_BLOCK)?,
        })
    }
}
