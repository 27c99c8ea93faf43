//! Wrapping a signed transaction in a block and handing it to a node.

use tangle_transactions::{Block, TransactionPayload, MIN_PARENTS};
use tangle_types::{BlockId, ProtocolParams};

use crate::error::WalletError;
use crate::node::NodeApi;

/// Attach `payload` to the node's current tips and submit it.
///
/// The nonce stays zero; nodes fill in proof of work for remote blocks.
pub async fn submit_payload(
    node: &dyn NodeApi,
    params: &ProtocolParams,
    payload: TransactionPayload,
) -> Result<BlockId, WalletError> {
    let tips = node.tips().await?;
    if tips.len() < MIN_PARENTS {
        return Err(WalletError::Node("node returned no tips".into()));
    }
    let block = Block::new(params.protocol_version, tips, payload);
    let block_id = node.submit_block(&block).await?;
    tracing::info!(block = %block_id, url = node.url(), "submitted block");
    Ok(block_id)
}
