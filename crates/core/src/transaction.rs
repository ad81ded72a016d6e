//! Transactions, as the consensus context sees them.

use crate::uint160::UInt160;
use crate::uint256::UInt256;
use crate::witness::Witness;
use dbft_io::{helper, BinaryWriter, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// Upper bound on a transaction script.
pub const MAX_TX_SCRIPT: usize = 65_536;

/// A transaction carried by a candidate block.
///
/// The context never executes transactions; it stores them, hashes them
/// into the Merkle root, and tracks sender fees for admission policing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Format version, currently 0.
    pub version: u8,
    /// Random value distinguishing otherwise-identical transactions.
    pub nonce: u32,
    /// Account paying the fees.
    pub sender: UInt160,
    /// Execution cost, in the smallest fee unit.
    pub system_fee: i64,
    /// Relay cost, in the smallest fee unit.
    pub network_fee: i64,
    /// Last block height at which this transaction may be included.
    pub valid_until_block: u32,
    /// The payload script.
    pub script: Vec<u8>,
    /// Sender authentication.
    pub witness: Witness,
}

impl Transaction {
    /// Total fee the sender is committing to.
    pub fn fee(&self) -> i64 {
        self.system_fee + self.network_fee
    }

    /// The identity hash: double SHA-256 over the unsigned form.
    pub fn hash(&self) -> UInt256 {
        let mut writer = BinaryWriter::with_capacity(self.unsigned_size());
        // Unsigned serialization is infallible into a memory buffer.
        self.serialize_unsigned(&mut writer)
            .expect("in-memory serialization cannot fail");
        UInt256::from(dbft_crypto::hash256(&writer.into_bytes()))
    }

    fn unsigned_size(&self) -> usize {
        1 + 4 + 20 + 8 + 8 + 4 + helper::var_bytes_size(&self.script)
    }

    fn serialize_unsigned(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u8(self.version)?;
        writer.write_u32(self.nonce)?;
        writer.write_serializable(&self.sender)?;
        writer.write_i64(self.system_fee)?;
        writer.write_i64(self.network_fee)?;
        writer.write_u32(self.valid_until_block)?;
        writer.write_var_bytes(&self.script)
    }
}

impl Serializable for Transaction {
    fn size(&self) -> usize {
        self.unsigned_size() + self.witness.size()
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        self.serialize_unsigned(writer)?;
        Serializable::serialize(&self.witness, writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            version: reader.read_u8()?,
            nonce: reader.read_u32()?,
            sender: <UInt160 as Serializable>::deserialize(reader)?,
            system_fee: reader.read_i64()?,
            network_fee: reader.read_i64()?,
            valid_until_block: reader.read_u32()?,
            script: reader.read_var_bytes(MAX_TX_SCRIPT)?,
            witness: <Witness as Serializable>::deserialize(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbft_io::SerializableExt;

    fn sample() -> Transaction {
        Transaction {
            version: 0,
            nonce: 0x0102_0304,
            sender: UInt160::from([5u8; 20]),
            system_fee: 100,
            network_fee: 25,
            valid_until_block: 1_000,
            script: vec![0x51],
            witness: Witness::new(vec![1], vec![2, 3]),
        }
    }

    #[test]
    fn round_trip() {
        let tx = sample();
        let bytes = tx.to_array().unwrap();
        assert_eq!(bytes.len(), tx.size());
        assert_eq!(Transaction::from_array(&bytes).unwrap(), tx);
    }

    #[test]
    fn hash_ignores_witness() {
        let tx = sample();
        let mut unsigned = sample();
        unsigned.witness = Witness::empty();
        assert_eq!(tx.hash(), unsigned.hash());
    }

    #[test]
    fn hash_tracks_content() {
        let tx = sample();
        let mut other = sample();
        other.nonce += 1;
        assert_ne!(tx.hash(), other.hash());
    }

    #[test]
    fn fee_is_total() {
        assert_eq!(sample().fee(), 125);
    }
}
