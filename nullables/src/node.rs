//! Nullable node: an in-memory ledger behind the node RPC boundary.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use tangle_crypto::blake2b_256;
use tangle_transactions::{codec_for, BasicOutput, Block, Output, WireCodec};
use tangle_types::{Address, BlockId, InclusionState, Network, OutputId, TransactionId};
use tangle_wallet::{NodeApi, NodeOutput, WalletError};

struct Ledger {
    healthy: bool,
    outputs: BTreeMap<OutputId, NodeOutput>,
    submitted: Vec<(BlockId, Block)>,
    inclusion: HashMap<BlockId, InclusionState>,
    /// State reported for blocks submitted from now on.
    next_inclusion: InclusionState,
    /// Upcoming submissions that fail.
    failing_submissions: u32,
    next_funding: u32,
}

/// A scripted node that records submitted blocks instead of sending them.
///
/// Submitted transactions are applied to the in-memory ledger right away
/// (inputs spent, outputs created) unless the next inclusion state is set
/// to something other than `Included`.
pub struct NullNode {
    network: Network,
    url: String,
    ledger: Mutex<Ledger>,
}

impl NullNode {
    pub fn new(network: Network) -> Self {
        Self::with_url(network, "null://node")
    }

    pub fn with_url(network: Network, url: impl Into<String>) -> Self {
        Self {
            network,
            url: url.into(),
            ledger: Mutex::new(Ledger {
                healthy: true,
                outputs: BTreeMap::new(),
                submitted: Vec::new(),
                inclusion: HashMap::new(),
                next_inclusion: InclusionState::Included,
                failing_submissions: 0,
                next_funding: 0,
            }),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.ledger.lock().unwrap().healthy = healthy;
    }

    pub fn insert_output(&self, id: OutputId, output: Output) {
        self.ledger.lock().unwrap().outputs.insert(
            id,
            NodeOutput {
                output,
                is_spent: false,
            },
        );
    }

    /// Credit `address` with a fresh plain output and return its id.
    pub fn fund(&self, address: Address, amount: u64) -> OutputId {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.next_funding += 1;
        let mut tx = [0xF0u8; 32];
        tx[..4].copy_from_slice(&ledger.next_funding.to_be_bytes());
        let id = OutputId::new(TransactionId::new(tx), 0);
        ledger.outputs.insert(
            id,
            NodeOutput {
                output: Output::Basic(BasicOutput::plain(address, amount)),
                is_spent: false,
            },
        );
        id
    }

    pub fn mark_spent(&self, id: &OutputId) {
        if let Some(o) = self.ledger.lock().unwrap().outputs.get_mut(id) {
            o.is_spent = true;
        }
    }

    pub fn unspent_for(&self, address: &Address) -> Vec<(OutputId, Output)> {
        self.ledger
            .lock()
            .unwrap()
            .outputs
            .iter()
            .filter(|(_, o)| !o.is_spent && o.output.owner().as_ref() == Some(address))
            .map(|(id, o)| (*id, o.output.clone()))
            .collect()
    }

    /// Make the next `count` submissions fail with a node error.
    pub fn fail_next_submissions(&self, count: u32) {
        self.ledger.lock().unwrap().failing_submissions = count;
    }

    /// Inclusion state reported for blocks submitted from now on.
    pub fn set_next_inclusion(&self, state: InclusionState) {
        self.ledger.lock().unwrap().next_inclusion = state;
    }

    pub fn set_inclusion(&self, block_id: BlockId, state: InclusionState) {
        self.ledger.lock().unwrap().inclusion.insert(block_id, state);
    }

    pub fn submitted(&self) -> Vec<(BlockId, Block)> {
        self.ledger.lock().unwrap().submitted.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.ledger.lock().unwrap().submitted.len()
    }
}

#[async_trait]
impl NodeApi for NullNode {
    fn network(&self) -> Network {
        self.network
    }

    fn url(&self) -> &str {
        &self.url
    }

    async fn health(&self) -> Result<bool, WalletError> {
        Ok(self.ledger.lock().unwrap().healthy)
    }

    async fn tips(&self) -> Result<Vec<BlockId>, WalletError> {
        let ledger = self.ledger.lock().unwrap();
        Ok(match ledger.submitted.last() {
            Some((id, _)) => vec![*id],
            None => vec![BlockId::new([0x11; 32])],
        })
    }

    async fn output_ids(&self, address: &Address) -> Result<Vec<OutputId>, WalletError> {
        Ok(self.unspent_for(address).into_iter().map(|(id, _)| id).collect())
    }

    async fn get_output(&self, output_id: &OutputId) -> Result<NodeOutput, WalletError> {
        self.ledger
            .lock()
            .unwrap()
            .outputs
            .get(output_id)
            .cloned()
            .ok_or(WalletError::OutputNotFound(*output_id))
    }

    async fn submit_block(&self, block: &Block) -> Result<BlockId, WalletError> {
        let codec = codec_for(self.network);
        let block_bytes = codec.encode_block(block)?;
        let payload_bytes = codec.encode_payload(&block.payload)?;

        let mut ledger = self.ledger.lock().unwrap();
        if ledger.failing_submissions > 0 {
            ledger.failing_submissions -= 1;
            return Err(WalletError::Node("scripted submission failure".into()));
        }
        let block_id = BlockId::new(blake2b_256(&block_bytes));
        let state = ledger.next_inclusion;
        if state == InclusionState::Included {
            let transaction_id = TransactionId::new(blake2b_256(&payload_bytes));
            for input in &block.payload.essence.inputs {
                if let Some(o) = ledger.outputs.get_mut(input) {
                    o.is_spent = true;
                }
            }
            for (index, output) in block.payload.essence.outputs.iter().enumerate() {
                ledger.outputs.insert(
                    OutputId::new(transaction_id, index as u16),
                    NodeOutput {
                        output: output.clone(),
                        is_spent: false,
                    },
                );
            }
        }
        ledger.inclusion.insert(block_id, state);
        ledger.submitted.push((block_id, block.clone()));
        Ok(block_id)
    }

    async fn block_metadata(&self, block_id: &BlockId) -> Result<InclusionState, WalletError> {
        Ok(self
            .ledger
            .lock()
            .unwrap()
            .inclusion
            .get(block_id)
            .copied()
            .unwrap_or(InclusionState::Pending))
    }
}
