// Copyright (C) 2015-2025 The Neo Project.
//
// extensible.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The extensible payload envelope dBFT messages travel in.

use crate::uint160::UInt160;
use crate::uint256::UInt256;
use crate::witness::Witness;
use dbft_io::{helper, BinaryWriter, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// Upper bound on the category tag.
pub const MAX_CATEGORY: usize = 32;

/// Upper bound on the carried message bytes.
pub const MAX_PAYLOAD_DATA: usize = 0x0f_ffff;

/// An extensible message that can be relayed between nodes.
///
/// The envelope names its category, a block-height validity window, the
/// sender address, the opaque inner message, and the sender's witness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensiblePayload {
    /// Routing tag; consensus traffic uses `"dBFT"`.
    pub category: String,
    /// First height at which the payload is valid.
    pub valid_block_start: u32,
    /// Height from which the payload is no longer valid.
    pub valid_block_end: u32,
    /// Address of the emitting validator.
    pub sender: UInt160,
    /// Serialized inner message.
    pub data: Vec<u8>,
    /// Sender authentication over the unsigned envelope.
    pub witness: Witness,
}

impl ExtensiblePayload {
    fn serialize_unsigned(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_var_string(&self.category)?;
        writer.write_u32(self.valid_block_start)?;
        writer.write_u32(self.valid_block_end)?;
        writer.write_serializable(&self.sender)?;
        writer.write_var_bytes(&self.data)
    }

    fn unsigned_size(&self) -> usize {
        helper::var_bytes_size(self.category.as_bytes())
            + 4
            + 4
            + 20
            + helper::var_bytes_size(&self.data)
    }

    /// The identity hash: double SHA-256 over the unsigned envelope.
    pub fn hash(&self) -> UInt256 {
        let mut writer = BinaryWriter::with_capacity(self.unsigned_size());
        self.serialize_unsigned(&mut writer)
            .expect("in-memory serialization cannot fail");
        UInt256::from(dbft_crypto::hash256(&writer.into_bytes()))
    }

    /// The byte string the sender signs: network magic followed by the
    /// payload hash.
    pub fn sign_data(&self, network: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity(4 + 32);
        data.extend_from_slice(&network.to_le_bytes());
        data.extend_from_slice(self.hash().as_bytes());
        data
    }
}

impl Serializable for ExtensiblePayload {
    fn size(&self) -> usize {
        // A single-element witness list follows the unsigned envelope.
        self.unsigned_size() + 1 + self.witness.size()
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        self.serialize_unsigned(writer)?;
        writer.write_u8(1)?;
        Serializable::serialize(&self.witness, writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let category = reader.read_var_string(MAX_CATEGORY)?;
        let valid_block_start = reader.read_u32()?;
        let valid_block_end = reader.read_u32()?;
        let sender = <UInt160 as Serializable>::deserialize(reader)?;
        let data = reader.read_var_bytes(MAX_PAYLOAD_DATA)?;
        let witness_count = reader.read_u8()?;
        if witness_count != 1 {
            return Err(dbft_io::IoError::invalid_data(
                "extensible payload",
                format!("expected 1 witness, got {witness_count}"),
            ));
        }
        Ok(Self {
            category,
            valid_block_start,
            valid_block_end,
            sender,
            data,
            witness: <Witness as Serializable>::deserialize(reader)?,
        })
    }
}
