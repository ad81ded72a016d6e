//! Persistence of the whole round state under a single store key.
//!
//! The layout is deterministic and little-endian: both candidates (a
//! blank record stands in for a torn-down fallback), the view number,
//! then the view-wide change-view tables. Per-validator slot tables
//! serialize as a nullable array: an LSB-first presence bitmap of
//! ⌈N/8⌉ bytes followed by the non-null payloads in index order.
//! Snapshot, message cache and key pair are not persisted — they are
//! rebuilt from context on restore.

use crate::context::ConsensusContext;
use crate::proposal::{Candidate, SenderFeeTracker, FALLBACK, PRIORITY};
use crate::{Error, Result, CONTEXT_KEY};
use dbft_core::{ExtensiblePayload, Transaction, UInt160, UInt256};
use dbft_io::{BinaryWriter, IoResult, MemoryReader, Serializable};
use std::collections::HashMap;
use tracing::{debug, warn};

impl ConsensusContext {
    /// Writes the round state to the durable store.
    pub fn save(&self) -> Result<()> {
        let bytes = self.serialize_state()?;
        self.store.put_sync(&[CONTEXT_KEY], &bytes);
        debug!(len = bytes.len(), "round state checkpointed");
        Ok(())
    }

    /// Restores the round state from the durable store.
    ///
    /// Returns `false` — leaving the context untouched — when no
    /// checkpoint exists or its version/height does not match this
    /// round. A decode failure mid-overlay falls back to a fresh
    /// view-0 reset and also returns `false`.
    pub fn load(&mut self) -> bool {
        let Some(bytes) = self.store.try_get(&[CONTEXT_KEY]) else {
            return false;
        };
        // Staleness probe before any state is touched.
        let mut probe = MemoryReader::new(&bytes);
        let (Ok(version), Ok(index)) = (probe.read_u32(), probe.read_u32()) else {
            return false;
        };
        if version != self.expected_version() || index != self.block_index() {
            warn!(
                version,
                index,
                expected = self.block_index(),
                "discarding stale checkpoint"
            );
            return false;
        }

        if self.reset(0).is_err() {
            return false;
        }
        match self.overlay_state(&bytes) {
            Ok(()) => {
                debug!(view = self.view_number, "round state restored");
                true
            }
            Err(error) => {
                warn!(%error, "discarding corrupt checkpoint");
                let _ = self.reset(0);
                false
            }
        }
    }

    fn expected_version(&self) -> u32 {
        self.candidates[PRIORITY]
            .as_ref()
            .map(|candidate| candidate.block.header.version)
            .unwrap_or_default()
    }

    pub(crate) fn serialize_state(&self) -> Result<Vec<u8>> {
        let mut writer = BinaryWriter::new();
        for slot in [PRIORITY, FALLBACK] {
            self.serialize_candidate(self.candidates[slot].as_ref(), &mut writer)?;
        }
        writer.write_u8(self.view_number)?;
        write_nullable_array(&self.change_view_payloads, &mut writer)?;
        write_nullable_array(&self.last_change_view_payloads, &mut writer)?;
        Ok(writer.into_bytes())
    }

    fn serialize_candidate(
        &self,
        candidate: Option<&Candidate>,
        writer: &mut BinaryWriter,
    ) -> Result<()> {
        let Some(candidate) = candidate else {
            // Blank record: zeroed header fields, empty lists, all-null
            // slot tables. The zero next-consensus is the null sentinel.
            writer.write_u32(0)?;
            writer.write_u32(0)?;
            writer.write_u64(0)?;
            writer.write_u64(0)?;
            writer.write_u8(0)?;
            writer.write_serializable(&UInt160::zero())?;
            writer.write_u16(0)?;
            writer.write_u16(0)?;
            let blank = vec![None; self.validator_count()];
            for _ in 0..3 {
                write_nullable_array(&blank, writer)?;
            }
            return Ok(());
        };

        let header = &candidate.block.header;
        writer.write_u32(header.version)?;
        writer.write_u32(header.index)?;
        writer.write_u64(header.timestamp)?;
        writer.write_u64(header.nonce)?;
        writer.write_u8(header.primary_index)?;
        writer.write_serializable(&header.next_consensus)?;

        let hashes = candidate.transaction_hashes.as_deref().unwrap_or(&[]);
        writer.write_u16(hashes.len() as u16)?;
        for hash in hashes {
            writer.write_serializable(hash)?;
        }

        // Transactions follow the hash-list order so the blob stays
        // deterministic regardless of pool-map iteration.
        let transactions: Vec<&Transaction> = hashes
            .iter()
            .filter_map(|hash| candidate.transactions.get(hash))
            .collect();
        writer.write_u16(transactions.len() as u16)?;
        for transaction in transactions {
            writer.write_serializable(transaction)?;
        }

        write_nullable_array(&candidate.preparation_payloads, writer)?;
        write_nullable_array(&candidate.pre_commit_payloads, writer)?;
        write_nullable_array(&candidate.commit_payloads, writer)?;
        Ok(())
    }

    pub(crate) fn overlay_state(&mut self, bytes: &[u8]) -> Result<()> {
        let mut reader = MemoryReader::new(bytes);
        let n = self.validator_count();

        for slot in [PRIORITY, FALLBACK] {
            let version = reader.read_u32()?;
            let index = reader.read_u32()?;
            if slot == PRIORITY {
                if version != self.expected_version() {
                    return Err(Error::StaleCheckpoint {
                        expected: self.expected_version(),
                        found: version,
                    });
                }
                if index != self.block_index() {
                    return Err(Error::StaleCheckpoint {
                        expected: self.block_index(),
                        found: index,
                    });
                }
            }
            let timestamp = reader.read_u64()?;
            let nonce = reader.read_u64()?;
            let primary_index = reader.read_u8()?;
            let next_consensus = UInt160::deserialize(&mut reader)?;

            let hash_count = reader.read_u16()? as usize;
            let mut hashes = Vec::with_capacity(hash_count);
            for _ in 0..hash_count {
                hashes.push(UInt256::deserialize(&mut reader)?);
            }
            let transaction_count = reader.read_u16()? as usize;
            let mut transactions = Vec::with_capacity(transaction_count);
            for _ in 0..transaction_count {
                transactions.push(Transaction::deserialize(&mut reader)?);
            }
            let preparation_payloads = read_nullable_array(&mut reader, n)?;
            let pre_commit_payloads = read_nullable_array(&mut reader, n)?;
            let commit_payloads = read_nullable_array(&mut reader, n)?;

            if let Some(candidate) = self.candidates[slot].as_mut() {
                candidate.block.header.timestamp = timestamp;
                candidate.block.header.nonce = nonce;
                candidate.block.header.primary_index = primary_index;
                if !next_consensus.is_zero() {
                    candidate.block.header.next_consensus = next_consensus;
                }
                // An empty hash list reads back as "no proposal seen".
                candidate.transaction_hashes = if hashes.is_empty() {
                    None
                } else {
                    Some(hashes)
                };
                let mut verification_context = SenderFeeTracker::new();
                let mut pool = HashMap::with_capacity(transactions.len());
                for transaction in transactions {
                    verification_context.add(&transaction);
                    pool.insert(transaction.hash(), transaction);
                }
                candidate.transactions = pool;
                candidate.verification_context = verification_context;
                candidate.merkle_root = None;
                candidate.preparation_payloads = preparation_payloads;
                candidate.pre_commit_payloads = pre_commit_payloads;
                candidate.commit_payloads = commit_payloads;
            }
        }

        let view_number = reader.read_u8()?;
        self.change_view_payloads = read_nullable_array(&mut reader, n)?;
        self.last_change_view_payloads = read_nullable_array(&mut reader, n)?;
        self.view_number = view_number;
        if view_number > 0 {
            self.candidates[FALLBACK] = None;
        }
        Ok(())
    }
}

fn write_nullable_array(
    slots: &[Option<ExtensiblePayload>],
    writer: &mut BinaryWriter,
) -> IoResult<()> {
    let mut bitmap = vec![0u8; slots.len().div_ceil(8)];
    for (index, slot) in slots.iter().enumerate() {
        if slot.is_some() {
            bitmap[index / 8] |= 1 << (index % 8);
        }
    }
    writer.write_bytes(&bitmap)?;
    for payload in slots.iter().flatten() {
        payload.serialize(writer)?;
    }
    Ok(())
}

fn read_nullable_array(
    reader: &mut MemoryReader<'_>,
    len: usize,
) -> IoResult<Vec<Option<ExtensiblePayload>>> {
    let bitmap = reader.read_bytes(len.div_ceil(8))?;
    let mut slots = Vec::with_capacity(len);
    for index in 0..len {
        if bitmap[index / 8] & (1 << (index % 8)) != 0 {
            slots.push(Some(ExtensiblePayload::deserialize(reader)?));
        } else {
            slots.push(None);
        }
    }
    Ok(slots)
}
