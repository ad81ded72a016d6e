//! Property suites over the round arithmetic and the codecs.

mod common;

use dbft_consensus::{
    ChangeView, ChangeViewReason, Commit, ConsensusMessage, MessageBody, PrepareResponse,
    RecoveryRequest, ValidatorSetView,
};
use dbft_core::UInt256;
use dbft_crypto::EcPoint;
use dbft_io::Serializable;
use dbft_io::{BinaryWriter, MemoryReader, SerializableExt};
use proptest::prelude::*;
use std::sync::OnceLock;

/// Key generation is expensive; derive the largest committee once and
/// slice it per case.
fn committee(n: usize) -> Vec<EcPoint> {
    static KEYS: OnceLock<Vec<EcPoint>> = OnceLock::new();
    KEYS.get_or_init(|| {
        common::test_keys(21)
            .iter()
            .map(|key| *key.public_key())
            .collect()
    })[..n]
        .to_vec()
}

fn reason_strategy() -> impl Strategy<Value = ChangeViewReason> {
    prop_oneof![
        Just(ChangeViewReason::Timeout),
        Just(ChangeViewReason::ChangeAgreement),
        Just(ChangeViewReason::TxNotFound),
        Just(ChangeViewReason::TxRejectedByPolicy),
        Just(ChangeViewReason::TxInvalid),
        Just(ChangeViewReason::BlockRejectedByPolicy),
    ]
}

proptest! {
    #[test]
    fn quorum_arithmetic_holds(n in 4usize..=21) {
        let view = ValidatorSetView::from_validators(committee(n));
        let f = view.f();
        let m = view.m();
        prop_assert_eq!(f, (n - 1) / 3);
        prop_assert_eq!(m, n - f);
        prop_assert!(f < n.div_ceil(3));
        // A quorum always outnumbers the faulty plus one honest spare.
        prop_assert!(2 * m > n + f - 1);
    }

    #[test]
    fn var_int_round_trips(value in any::<u64>()) {
        let mut writer = BinaryWriter::new();
        writer.write_var_int(value).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = MemoryReader::new(&bytes);
        prop_assert_eq!(reader.read_var_int(u64::MAX).unwrap(), value);
        prop_assert!(reader.is_exhausted());
    }

    #[test]
    fn change_view_messages_round_trip(
        block_index in any::<u32>(),
        validator_index in any::<u8>(),
        view_number in any::<u8>(),
        new_view_number in any::<u8>(),
        timestamp in any::<u64>(),
        reason in reason_strategy(),
    ) {
        let message = ConsensusMessage {
            block_index,
            validator_index,
            view_number,
            body: MessageBody::ChangeView(ChangeView {
                new_view_number,
                timestamp,
                reason,
            }),
        };
        let bytes = message.to_array().unwrap();
        prop_assert_eq!(bytes.len(), message.size());
        prop_assert_eq!(ConsensusMessage::from_array(&bytes).unwrap(), message);
    }

    #[test]
    fn commit_messages_round_trip(
        block_index in any::<u32>(),
        validator_index in any::<u8>(),
        view_number in any::<u8>(),
        proposal in 0u8..=1,
        signature in proptest::collection::vec(any::<u8>(), 64),
    ) {
        let message = ConsensusMessage {
            block_index,
            validator_index,
            view_number,
            body: MessageBody::Commit(Commit { proposal, signature }),
        };
        let bytes = message.to_array().unwrap();
        prop_assert_eq!(bytes.len(), message.size());
        prop_assert_eq!(ConsensusMessage::from_array(&bytes).unwrap(), message);
    }

    #[test]
    fn prepare_response_messages_round_trip(
        proposal in 0u8..=1,
        hash in any::<[u8; 32]>(),
    ) {
        let message = ConsensusMessage {
            block_index: 1,
            validator_index: 0,
            view_number: 0,
            body: MessageBody::PrepareResponse(PrepareResponse {
                proposal,
                preparation_hash: UInt256::from(hash),
            }),
        };
        let bytes = message.to_array().unwrap();
        prop_assert_eq!(ConsensusMessage::from_array(&bytes).unwrap(), message);
    }

    #[test]
    fn recovery_request_messages_round_trip(timestamp in any::<u64>()) {
        let message = ConsensusMessage {
            block_index: 1,
            validator_index: 0,
            view_number: 0,
            body: MessageBody::RecoveryRequest(RecoveryRequest { timestamp }),
        };
        let bytes = message.to_array().unwrap();
        prop_assert_eq!(bytes.len(), message.size());
        prop_assert_eq!(ConsensusMessage::from_array(&bytes).unwrap(), message);
    }

    #[test]
    fn uint256_text_round_trips(bytes in any::<[u8; 32]>()) {
        let value = UInt256::from(bytes);
        prop_assert_eq!(UInt256::parse(&value.to_string()).unwrap(), value);
    }
}
