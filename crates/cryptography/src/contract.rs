//! Verification (redeem) scripts for validators.

use crate::ecc::EcPoint;
use crate::error::{CryptoError, CryptoResult};
use crate::hash::hash160;
use crate::script::ScriptBuilder;

/// Interop invoked by single-signature verification scripts.
pub const CHECK_SIG: &str = "System.Crypto.CheckSig";

/// Interop invoked by multi-signature verification scripts.
pub const CHECK_MULTISIG: &str = "System.Crypto.CheckMultisig";

/// Largest admissible multi-sig group.
const MAX_KEYS: usize = 1024;

/// Builds the verification script for a single key:
/// `PUSHDATA key, SYSCALL CheckSig`.
pub fn create_signature_redeem_script(key: &EcPoint) -> Vec<u8> {
    let mut builder = ScriptBuilder::new();
    builder.emit_push(key.as_bytes()).emit_syscall(CHECK_SIG);
    builder.into_bytes()
}

/// Builds an m-of-n verification script:
/// `PUSH m, PUSHDATA key…, PUSH n, SYSCALL CheckMultisig`.
///
/// Keys are listed in their canonical (sorted) order regardless of the
/// order supplied.
pub fn create_multisig_redeem_script(m: usize, keys: &[EcPoint]) -> CryptoResult<Vec<u8>> {
    let n = keys.len();
    if n == 0 || n > MAX_KEYS || !(1..=n).contains(&m) {
        return Err(CryptoError::InvalidContract(format!(
            "unsupported multi-sig shape {m}-of-{n}"
        )));
    }

    let mut sorted = keys.to_vec();
    sorted.sort();

    let mut builder = ScriptBuilder::new();
    builder.emit_push_int(m as i64);
    for key in &sorted {
        builder.emit_push(key.as_bytes());
    }
    builder.emit_push_int(n as i64);
    builder.emit_syscall(CHECK_MULTISIG);
    Ok(builder.into_bytes())
}

/// Script hash of the quorum multi-sig contract for `validators`:
/// the `next_consensus` address of a block.
pub fn bft_address(validators: &[EcPoint]) -> CryptoResult<[u8; 20]> {
    let n = validators.len();
    let m = n - (n - 1) / 3;
    let script = create_multisig_redeem_script(m, validators)?;
    Ok(hash160(&script))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecc::KeyPair;

    fn keys(count: u8) -> Vec<EcPoint> {
        (1..=count)
            .map(|seed| *KeyPair::from_private_key(&[seed; 32]).unwrap().public_key())
            .collect()
    }

    #[test]
    fn signature_script_shape() {
        let key = keys(1)[0];
        let script = create_signature_redeem_script(&key);
        // PUSHDATA1 33 <key> SYSCALL <4>
        assert_eq!(script.len(), 2 + 33 + 5);
        assert_eq!(script[0], 0x0c);
        assert_eq!(script[1], 33);
        assert_eq!(&script[2..35], key.as_bytes());
    }

    #[test]
    fn multisig_script_is_key_order_independent() {
        let mut group = keys(4);
        let forward = create_multisig_redeem_script(3, &group).unwrap();
        group.reverse();
        let backward = create_multisig_redeem_script(3, &group).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn multisig_rejects_bad_shapes() {
        let group = keys(4);
        assert!(create_multisig_redeem_script(0, &group).is_err());
        assert!(create_multisig_redeem_script(5, &group).is_err());
        assert!(create_multisig_redeem_script(1, &[]).is_err());
    }

    #[test]
    fn bft_address_uses_quorum_threshold() {
        let group = keys(4);
        // N=4 → M=3
        let script = create_multisig_redeem_script(3, &group).unwrap();
        assert_eq!(bft_address(&group).unwrap(), hash160(&script));
    }
}
