//! Decoded-message memo keyed by payload hash.

use crate::messages::ConsensusMessage;
use crate::Result;
use dbft_core::{ExtensiblePayload, UInt256};
use dbft_io::SerializableExt;
use std::cell::RefCell;
use std::collections::HashMap;

/// Avoids reparsing payload bytes every time a predicate inspects a
/// stored payload. Populated when payloads are emitted or received;
/// losing it is harmless. Interior mutability keeps lookups available
/// from `&self` predicates; the context is single-threaded by design.
#[derive(Debug, Default)]
pub struct MessageCache {
    entries: RefCell<HashMap<UInt256, ConsensusMessage>>,
}

impl MessageCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of memoized messages.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Drops all entries.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Inserts a decoded message unless the hash is already present.
    pub fn try_insert(&self, hash: UInt256, message: ConsensusMessage) {
        self.entries.borrow_mut().entry(hash).or_insert(message);
    }

    /// Returns the decoded message for `payload`, decoding and
    /// memoizing on first sight.
    pub fn get_or_decode(&self, payload: &ExtensiblePayload) -> Result<ConsensusMessage> {
        let hash = payload.hash();
        if let Some(message) = self.entries.borrow().get(&hash) {
            return Ok(message.clone());
        }
        let message = ConsensusMessage::from_array(&payload.data)?;
        self.entries.borrow_mut().insert(hash, message.clone());
        Ok(message)
    }
}
