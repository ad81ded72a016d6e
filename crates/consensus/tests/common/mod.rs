//! In-memory collaborators for driving the context in tests.

#![allow(dead_code)]

use dbft_consensus::providers::{Ledger, LedgerSnapshot, Store, Wallet, WalletAccount};
use dbft_consensus::{ConsensusContext, ConsensusSettings};
use dbft_core::{Header, TrimmedBlock, UInt160, UInt256, Witness, BLOCK_VERSION};
use dbft_crypto::{EcPoint, KeyPair};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

/// Network magic used throughout the suites.
pub const TEST_NETWORK: u32 = 0x74_65_73_74;

/// Deterministic key pairs, sorted by public key so that validator
/// index order matches key order.
pub fn test_keys(count: usize) -> Vec<KeyPair> {
    let mut keys: Vec<KeyPair> = (1..=count as u8)
        .map(|seed| KeyPair::from_private_key(&[seed; 32]).unwrap())
        .collect();
    keys.sort_by_key(|key| *key.public_key().as_bytes());
    keys
}

#[derive(Clone)]
struct ChainState {
    current_index: u32,
    current_hash: UInt256,
    blocks: HashMap<UInt256, TrimmedBlock>,
    validators: Vec<EcPoint>,
    refresh_committee: bool,
}

/// A ledger whose tip the tests move by hand.
pub struct MemoryLedger {
    state: RefCell<ChainState>,
}

impl MemoryLedger {
    /// A chain whose tip block sits at `tip_index`, with a minimal
    /// header history behind it.
    pub fn new(validators: Vec<EcPoint>, tip_index: u32) -> Self {
        let mut blocks = HashMap::new();
        let mut prev_hash = UInt256::zero();
        let mut current_hash = UInt256::zero();
        for index in 0..=tip_index {
            let header = Header {
                version: BLOCK_VERSION,
                prev_hash,
                merkle_root: UInt256::zero(),
                timestamp: index as u64,
                nonce: 0,
                index,
                primary_index: 0,
                next_consensus: UInt160::from([0xbb; 20]),
                witness: Witness::empty(),
            };
            let hash = header.hash();
            blocks.insert(
                hash,
                TrimmedBlock {
                    header,
                    hashes: Vec::new(),
                },
            );
            current_hash = hash;
            prev_hash = hash;
        }
        Self {
            state: RefCell::new(ChainState {
                current_index: tip_index,
                current_hash,
                blocks,
                validators,
                refresh_committee: false,
            }),
        }
    }

    /// Pretends another block was committed, advancing the tip.
    pub fn advance_tip(&self) {
        let mut state = self.state.borrow_mut();
        let index = state.current_index + 1;
        let header = Header {
            version: BLOCK_VERSION,
            prev_hash: state.current_hash,
            merkle_root: UInt256::zero(),
            timestamp: index as u64,
            nonce: 0,
            index,
            primary_index: 0,
            next_consensus: UInt160::from([0xbb; 20]),
            witness: Witness::empty(),
        };
        let hash = header.hash();
        state.blocks.insert(
            hash,
            TrimmedBlock {
                header,
                hashes: Vec::new(),
            },
        );
        state.current_index = index;
        state.current_hash = hash;
    }
}

struct MemorySnapshot {
    state: ChainState,
}

impl Ledger for MemoryLedger {
    fn snapshot(&self) -> Box<dyn LedgerSnapshot> {
        Box::new(MemorySnapshot {
            state: self.state.borrow().clone(),
        })
    }
}

impl LedgerSnapshot for MemorySnapshot {
    fn current_index(&self) -> u32 {
        self.state.current_index
    }

    fn current_hash(&self) -> UInt256 {
        self.state.current_hash
    }

    fn header(&self, hash: &UInt256) -> Option<Header> {
        self.state
            .blocks
            .get(hash)
            .map(|block| block.header.clone())
    }

    fn trimmed_block(&self, hash: &UInt256) -> Option<TrimmedBlock> {
        self.state.blocks.get(hash).cloned()
    }

    fn next_block_validators(&self, count: usize) -> Vec<EcPoint> {
        self.state.validators.iter().take(count).copied().collect()
    }

    fn compute_next_block_validators(&self, count: usize) -> Vec<EcPoint> {
        self.next_block_validators(count)
    }

    fn should_refresh_committee(&self, _height: u32, _committee_size: usize) -> bool {
        self.state.refresh_committee
    }
}

/// A store backed by a plain map.
#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct write access, for corrupting checkpoints in tests.
    pub fn put_raw(&self, key: &[u8], value: Vec<u8>) {
        self.entries.borrow_mut().insert(key.to_vec(), value);
    }

    pub fn get_raw(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.borrow().get(key).cloned()
    }
}

impl Store for MemoryStore {
    fn try_get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.borrow().get(key).cloned()
    }

    fn put_sync(&self, key: &[u8], value: &[u8]) {
        self.entries.borrow_mut().insert(key.to_vec(), value.to_vec());
    }
}

/// A wallet holding at most one validator key.
pub struct MemoryWallet {
    key: Option<KeyPair>,
}

impl MemoryWallet {
    pub fn with_key(key: KeyPair) -> Self {
        Self { key: Some(key) }
    }

    pub fn watch_only() -> Self {
        Self { key: None }
    }
}

struct MemoryAccount {
    key: KeyPair,
}

impl Wallet for MemoryWallet {
    fn account(&self, key: &EcPoint) -> Option<Box<dyn WalletAccount>> {
        let own = self.key.as_ref()?;
        if own.public_key() == key {
            Some(Box::new(MemoryAccount { key: own.clone() }))
        } else {
            None
        }
    }
}

impl WalletAccount for MemoryAccount {
    fn has_key(&self) -> bool {
        true
    }

    fn key(&self) -> Option<KeyPair> {
        Some(self.key.clone())
    }
}

/// A committee of `n` validators sharing one ledger and store.
pub struct TestNet {
    pub keys: Vec<KeyPair>,
    pub ledger: Arc<MemoryLedger>,
    pub store: Arc<MemoryStore>,
    pub settings: ConsensusSettings,
}

impl TestNet {
    /// A network of `n` validators whose pending block height is
    /// `tip_index + 1`.
    pub fn new(n: usize, tip_index: u32) -> Self {
        let keys = test_keys(n);
        let validators: Vec<EcPoint> = keys.iter().map(|key| *key.public_key()).collect();
        Self {
            keys,
            ledger: Arc::new(MemoryLedger::new(validators, tip_index)),
            store: Arc::new(MemoryStore::new()),
            settings: ConsensusSettings {
                network: TEST_NETWORK,
                validators_count: n,
                committee_members_count: n.max(21),
                ..Default::default()
            },
        }
    }

    /// A context for the validator at `node`, sharing the net's ledger
    /// and store.
    pub fn context_for(&self, node: usize) -> ConsensusContext {
        ConsensusContext::new(
            self.settings.clone(),
            self.ledger.clone(),
            self.store.clone(),
            Arc::new(MemoryWallet::with_key(self.keys[node].clone())),
        )
        .unwrap()
    }

    /// A context holding no validator key.
    pub fn watch_only_context(&self) -> ConsensusContext {
        ConsensusContext::new(
            self.settings.clone(),
            self.ledger.clone(),
            self.store.clone(),
            Arc::new(MemoryWallet::watch_only()),
        )
        .unwrap()
    }
}
