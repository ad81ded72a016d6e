// Copyright (C) 2015-2025 The Neo Project.
//
// uint256.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! 256-bit identity hash.

use crate::error::{CoreError, CoreResult};
use dbft_io::{BinaryWriter, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of a [`UInt256`] in bytes.
pub const UINT256_SIZE: usize = 32;

/// A 256-bit value identifying blocks, transactions and payloads.
///
/// Bytes are held in little-endian order; the textual form is the
/// reversed hex string with a `0x` prefix.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UInt256([u8; UINT256_SIZE]);

impl UInt256 {
    /// The all-zero value, used as a null sentinel (e.g. an unset
    /// Merkle root).
    pub fn zero() -> Self {
        Self::default()
    }

    /// Whether this is the all-zero sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; UINT256_SIZE]
    }

    /// Wraps a byte slice of exactly [`UINT256_SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != UINT256_SIZE {
            return Err(CoreError::InvalidLength {
                expected: UINT256_SIZE,
                got: bytes.len(),
            });
        }
        let mut value = [0u8; UINT256_SIZE];
        value.copy_from_slice(bytes);
        Ok(Self(value))
    }

    /// Borrow of the little-endian bytes.
    pub fn as_bytes(&self) -> &[u8; UINT256_SIZE] {
        &self.0
    }

    /// Copy of the little-endian bytes.
    pub fn to_array(&self) -> [u8; UINT256_SIZE] {
        self.0
    }

    /// Parses the reversed-hex textual form, with or without `0x`.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let text = text.strip_prefix("0x").unwrap_or(text);
        let mut bytes =
            hex::decode(text).map_err(|e| CoreError::InvalidFormat(e.to_string()))?;
        bytes.reverse();
        Self::from_bytes(&bytes)
    }
}

impl From<[u8; UINT256_SIZE]> for UInt256 {
    fn from(value: [u8; UINT256_SIZE]) -> Self {
        Self(value)
    }
}

impl fmt::Display for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "0x{}", hex::encode(reversed))
    }
}

impl fmt::Debug for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serializable for UInt256 {
    fn size(&self) -> usize {
        UINT256_SIZE
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_bytes(&self.0)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self(reader.read_array()?))
    }
}
