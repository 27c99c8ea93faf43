//! The node RPC boundary.

use async_trait::async_trait;
use tangle_transactions::{Block, Output};
use tangle_types::{Address, BlockId, InclusionState, NativeTokens, Network, OutputId};

use crate::error::WalletError;

/// An output as a node reports it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeOutput {
    pub output: Output,
    pub is_spent: bool,
}

/// Base token and native token holdings of one address.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Balance {
    pub amount: u64,
    pub native_tokens: NativeTokens,
}

/// One node of one network. Implementations exist per network family.
#[async_trait]
pub trait NodeApi: Send + Sync {
    fn network(&self) -> Network;

    /// Base URL, for logs.
    fn url(&self) -> &str;

    /// Liveness probe. `Ok(false)` means reachable but not synced.
    async fn health(&self) -> Result<bool, WalletError>;

    /// Blocks to reference as parents of a new block.
    async fn tips(&self) -> Result<Vec<BlockId>, WalletError>;

    /// Ids of every unspent output the address can unlock.
    async fn output_ids(&self, address: &Address) -> Result<Vec<OutputId>, WalletError>;

    async fn get_output(&self, output_id: &OutputId) -> Result<NodeOutput, WalletError>;

    async fn submit_block(&self, block: &Block) -> Result<BlockId, WalletError>;

    /// `Pending` until a milestone references the block.
    async fn block_metadata(&self, block_id: &BlockId) -> Result<InclusionState, WalletError>;

    async fn balance(&self, address: &Address) -> Result<Balance, WalletError> {
        let mut balance = Balance::default();
        for id in self.output_ids(address).await? {
            let found = self.get_output(&id).await?;
            if found.is_spent {
                continue;
            }
            balance.amount = balance
                .amount
                .checked_add(found.output.amount())
                .ok_or_else(|| WalletError::Node("balance overflow".into()))?;
            balance
                .native_tokens
                .add_all(found.output.native_tokens())
                .map_err(|e| WalletError::Node(e.to_string()))?;
        }
        Ok(balance)
    }
}
