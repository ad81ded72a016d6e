//! Checkpoint save/restore scenarios.

mod common;

use common::TestNet;
use dbft_consensus::{
    ChangeViewReason, ConsensusContext, CONTEXT_KEY, FALLBACK, PRIORITY,
};
use dbft_core::{Transaction, UInt160, Witness};

fn transaction(nonce: u32) -> Transaction {
    Transaction {
        version: 0,
        nonce,
        sender: UInt160::from([7u8; 20]),
        system_fee: 100,
        network_fee: 10,
        valid_until_block: 100,
        script: vec![0x51],
        witness: Witness::empty(),
    }
}

/// Builds the S4 state: preparations from the primary and ourselves on
/// the priority candidate, plus our own commit.
fn populated_context(net: &TestNet) -> ConsensusContext {
    let mut primary = net.context_for(2);
    let mut observer = net.context_for(0);

    let transactions = vec![transaction(1), transaction(2)];
    let request = primary
        .make_prepare_request(PRIORITY, transactions.clone(), 1_000, 42)
        .unwrap();
    observer.record_payload(request).unwrap();
    for tx in transactions {
        assert!(observer.add_transaction(PRIORITY, tx).unwrap());
    }
    observer.make_prepare_response(PRIORITY).unwrap();
    observer.make_commit(PRIORITY).unwrap();
    observer
}

#[test]
fn checkpoint_round_trips_state_and_predicates() {
    let net = TestNet::new(4, 9);
    let observer = populated_context(&net);
    observer.save().unwrap();
    let saved = net.store.get_raw(&[CONTEXT_KEY]).unwrap();

    let mut restored = net.context_for(0);
    assert!(restored.load());

    // Predicates agree across the round trip.
    assert_eq!(restored.view_number, observer.view_number);
    assert_eq!(
        restored.request_sent_or_received(),
        observer.request_sent_or_received()
    );
    assert_eq!(restored.response_sent(), observer.response_sent());
    assert_eq!(restored.commit_sent(), observer.commit_sent());
    assert_eq!(restored.block_sent(), observer.block_sent());
    assert_eq!(restored.count_committed(), observer.count_committed());
    assert!(restored.request_sent_or_received());
    assert!(restored.response_sent());
    assert!(restored.commit_sent());

    // Slot tables match entry for entry.
    for slot in [PRIORITY, FALLBACK] {
        let original = observer.candidate(slot).unwrap();
        let reloaded = restored.candidate(slot).unwrap();
        assert_eq!(
            original.preparation_payloads, reloaded.preparation_payloads,
            "preparation slots, candidate {slot}"
        );
        assert_eq!(original.pre_commit_payloads, reloaded.pre_commit_payloads);
        assert_eq!(original.commit_payloads, reloaded.commit_payloads);
        assert_eq!(original.transaction_hashes, reloaded.transaction_hashes);
    }
    assert!(restored.transactions_complete(PRIORITY));

    // serialize ∘ deserialize is the identity on the blob.
    restored.save().unwrap();
    assert_eq!(net.store.get_raw(&[CONTEXT_KEY]).unwrap(), saved);
}

#[test]
fn stale_checkpoint_is_discarded_untouched() {
    // S5: the checkpoint names height 10, but the chain advanced.
    let net = TestNet::new(4, 9);
    let observer = populated_context(&net);
    observer.save().unwrap();

    net.ledger.advance_tip();
    let mut fresh = net.context_for(0);
    assert_eq!(fresh.block_index(), 11);

    assert!(!fresh.load());

    // Nothing was overlaid.
    assert_eq!(fresh.block_index(), 11);
    assert!(!fresh.request_sent_or_received());
    assert!(!fresh.commit_sent());
    assert_eq!(fresh.count_committed(), 0);
}

#[test]
fn missing_checkpoint_loads_nothing() {
    let net = TestNet::new(4, 9);
    let mut context = net.context_for(0);
    assert!(!context.load());
}

#[test]
fn corrupt_checkpoint_falls_back_to_a_fresh_round() {
    let net = TestNet::new(4, 9);
    let observer = populated_context(&net);
    observer.save().unwrap();

    // Truncate the blob past the staleness probe.
    let mut bytes = net.store.get_raw(&[CONTEXT_KEY]).unwrap();
    bytes.truncate(bytes.len() / 2);
    net.store.put_raw(&[CONTEXT_KEY], bytes);

    let mut context = net.context_for(0);
    assert!(!context.load());

    // The context is a clean view-0 round again.
    assert_eq!(context.block_index(), 10);
    assert_eq!(context.view_number, 0);
    assert!(!context.request_sent_or_received());
    assert!(context.candidate(FALLBACK).is_some());
}

#[test]
fn view_one_checkpoint_restores_without_a_fallback() {
    let net = TestNet::new(4, 9);
    let mut contexts: Vec<ConsensusContext> = (0..4).map(|node| net.context_for(node)).collect();

    let change_view = contexts[3]
        .make_change_view(ChangeViewReason::Timeout, 2_000)
        .unwrap();
    for node in [0usize, 1, 2] {
        contexts[node].record_payload(change_view.clone()).unwrap();
    }
    contexts[0].reset(1).unwrap();
    assert!(contexts[0].candidate(FALLBACK).is_none());
    contexts[0].save().unwrap();

    let mut restored = net.context_for(0);
    assert!(restored.load());
    assert_eq!(restored.view_number, 1);
    assert!(restored.candidate(FALLBACK).is_none());
    assert!(restored.candidate(PRIORITY).is_some());
    assert_eq!(
        restored.last_change_view_payloads[3],
        contexts[0].last_change_view_payloads[3]
    );

    // A second save reproduces the same blob.
    let first = net.store.get_raw(&[CONTEXT_KEY]).unwrap();
    restored.save().unwrap();
    assert_eq!(net.store.get_raw(&[CONTEXT_KEY]).unwrap(), first);
}

#[test]
fn empty_store_value_is_rejected() {
    let net = TestNet::new(4, 9);
    net.store.put_raw(&[CONTEXT_KEY], Vec::new());
    let mut context = net.context_for(0);
    assert!(!context.load());
}
