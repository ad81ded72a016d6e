// Copyright (C) 2015-2025 The Neo Project.
//
// witness.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Witness: invocation plus verification script.

use crate::uint160::UInt160;
use dbft_io::{helper, BinaryWriter, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// Sized to admit a committee-scale multi-sig invocation script.
pub const MAX_INVOCATION_SCRIPT: usize = 1024;

/// Sized to admit a committee-scale multi-sig verification script.
pub const MAX_VERIFICATION_SCRIPT: usize = 1024;

/// Authenticates a verifiable object: the invocation script pushes the
/// arguments (signatures) consumed by the verification script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    /// Argument pushes, typically `PUSHDATA1 64 ‖ signature` per signer.
    pub invocation_script: Vec<u8>,
    /// The redeem script whose hash the object's sender must match.
    pub verification_script: Vec<u8>,
}

impl Witness {
    /// An empty witness, the placeholder before signing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a witness from its two scripts.
    pub fn new(invocation_script: Vec<u8>, verification_script: Vec<u8>) -> Self {
        Self {
            invocation_script,
            verification_script,
        }
    }

    /// Whether both scripts are empty.
    pub fn is_empty(&self) -> bool {
        self.invocation_script.is_empty() && self.verification_script.is_empty()
    }

    /// Hash of the verification script.
    pub fn script_hash(&self) -> UInt160 {
        UInt160::from_script(&self.verification_script)
    }
}

impl Serializable for Witness {
    fn size(&self) -> usize {
        helper::var_bytes_size(&self.invocation_script)
            + helper::var_bytes_size(&self.verification_script)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_var_bytes(&self.invocation_script)?;
        writer.write_var_bytes(&self.verification_script)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            invocation_script: reader.read_var_bytes(MAX_INVOCATION_SCRIPT)?,
            verification_script: reader.read_var_bytes(MAX_VERIFICATION_SCRIPT)?,
        })
    }
}
