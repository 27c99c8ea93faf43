//! Signed transaction payloads and the blocks that carry them.

use serde::{Deserialize, Serialize};
use tangle_types::BlockId;

use crate::essence::TransactionEssence;
use crate::unlock::Unlock;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub essence: TransactionEssence,
    pub unlocks: Vec<Unlock>,
}

/// A block (legacy networks: a message) carrying one transaction payload.
///
/// Proof of work is left to the node: `nonce` stays zero unless a caller
/// fills it in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub protocol_version: u8,
    pub parents: Vec<BlockId>,
    pub payload: TransactionPayload,
    pub nonce: u64,
}

pub const MIN_PARENTS: usize = 1;
pub const MAX_PARENTS: usize = 8;

impl Block {
    /// Parents are sorted and deduplicated, as nodes require.
    pub fn new(protocol_version: u8, mut parents: Vec<BlockId>, payload: TransactionPayload) -> Self {
        parents.sort();
        parents.dedup();
        parents.truncate(MAX_PARENTS);
        Self {
            protocol_version,
            parents,
            payload,
            nonce: 0,
        }
    }
}
