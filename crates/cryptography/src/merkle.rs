//! Merkle root over a hash sequence.

use crate::hash::hash256;

/// Computes the Merkle root of `hashes`.
///
/// Levels with an odd node count duplicate their last node. An empty
/// sequence yields the all-zero root.
pub fn merkle_root(hashes: &[[u8; 32]]) -> [u8; 32] {
    if hashes.is_empty() {
        return [0u8; 32];
    }
    let mut level: Vec<[u8; 32]> = hashes.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level[level.len() - 1];
            level.push(last);
        }
        level = level
            .chunks_exact(2)
            .map(|pair| {
                let mut buf = [0u8; 64];
                buf[..32].copy_from_slice(&pair[0]);
                buf[32..].copy_from_slice(&pair[1]);
                hash256(&buf)
            })
            .collect();
    }
    level[0]
}
