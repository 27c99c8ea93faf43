//! Blake2b hashing for ids, commitments and address derivation.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use tangle_types::{BlockId, TransactionId};

type Blake2b256 = Blake2b<U32>;

/// 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash several byte slices as if concatenated.
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Id of an encoded transaction payload.
pub fn transaction_id(payload_bytes: &[u8]) -> TransactionId {
    TransactionId::new(blake2b_256(payload_bytes))
}

/// Id of an encoded block (or legacy message).
pub fn block_id(block_bytes: &[u8]) -> BlockId {
    BlockId::new(blake2b_256(block_bytes))
}

/// Numeric network id embedded in every essence: the first eight bytes of
/// `blake2b_256(network_name)` read as little-endian.
pub fn network_id(network_name: &str) -> u64 {
    let digest = blake2b_256(network_name.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}
