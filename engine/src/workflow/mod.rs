//! Workflow dispatch: one [`OutputBuilder`] per family of workflow types.
//!
//! A builder turns a transaction record plus the outputs available to its
//! addresses into a [`TransactionPlan`]: the inputs to consume and the
//! outputs to create. Builders are pure; selecting, signing and submitting
//! is the executor's job.

mod mint;
mod value;

use std::collections::HashMap;
use std::sync::Arc;

use tangle_crypto::AddressDetails;
use tangle_store::{TransactionRecord, WorkflowType};
use tangle_transactions::{
    merge_outputs, subtract, AliasOutput, InputSelection, NftOutput, Output, OutputPacker,
    TransactionError, UnlockCondition, MAX_INPUTS,
};
use tangle_types::{
    Address, AliasId, NativeTokens, NftId, OutputId, ProtocolParams, Timestamp,
};
use tangle_wallet::AddressService;

use crate::EngineError;

pub use mint::{AliasMinter, CollectionMinter, NftMetadataUpdater, NftMinter, TokenMinter};
pub use value::ValueTransfer;

/// Everything a builder may look at.
pub struct BuildContext<'a> {
    pub record: &'a TransactionRecord,
    pub packer: &'a OutputPacker,
    pub addresses: &'a dyn AddressService,
    pub source: &'a AddressDetails,
    /// Details of the separate storage deposit source, if any.
    pub funder: Option<&'a AddressDetails>,
    /// Details of the alias governor, if it is not the source.
    pub governor: Option<&'a AddressDetails>,
    /// Unspent outputs of the reserved addresses; on a retry exactly the
    /// outputs of the previous attempt.
    pub available: &'a InputSelection,
}

impl BuildContext<'_> {
    pub fn params(&self) -> &ProtocolParams {
        self.packer.params()
    }

    /// Recipient of the workflow's main output; the source when unset.
    pub fn target(&self) -> Result<Address, EngineError> {
        match &self.record.payload.target_address {
            Some(text) => Ok(self.addresses.parse_address(text)?),
            None => Ok(self.source.address()),
        }
    }

    /// Address an existing alias must be controlled by.
    pub fn alias_controller(&self) -> Address {
        self.governor.unwrap_or(self.source).address()
    }

    pub fn parse(&self, text: &str) -> Result<Address, EngineError> {
        Ok(self.addresses.parse_address(text)?)
    }
}

/// Inputs to consume and outputs to create.
#[derive(Clone, Debug, Default)]
pub struct TransactionPlan {
    pub inputs: Vec<(OutputId, Output)>,
    pub outputs: Vec<Output>,
}

impl TransactionPlan {
    pub fn selection(&self) -> Result<InputSelection, EngineError> {
        Ok(InputSelection::new(self.inputs.clone())?)
    }

    /// Spend `owner`'s plain outputs, in selection order, until `amount` and
    /// `tokens` are covered and the change can hold its own deposit. Never
    /// takes more than the inputs still free under [`MAX_INPUTS`]. Nothing
    /// is consumed when nothing is due.
    fn fund(
        &mut self,
        ctx: &BuildContext<'_>,
        owner: Address,
        amount: u64,
        tokens: &NativeTokens,
    ) -> Result<(), EngineError> {
        if amount == 0 && tokens.is_empty() {
            return Ok(());
        }
        let room = MAX_INPUTS.saturating_sub(self.inputs.len());
        let mut chosen = Vec::new();
        let mut shortfall = TransactionError::InsufficientFunds {
            needed: amount,
            available: 0,
        };
        for input in spendable_basic(ctx.available, &owner).into_iter().take(room) {
            chosen.push(input);
            let merged = merge_outputs(chosen.iter().map(|(_, o)| o))?;
            match subtract(&merged, amount, tokens, ctx.params()) {
                Ok(change) => {
                    self.outputs.extend(change);
                    self.inputs.append(&mut chosen);
                    return Ok(());
                }
                Err(
                    e @ (TransactionError::InsufficientFunds { .. }
                    | TransactionError::InvalidNativeToken { .. }),
                ) => shortfall = e,
                Err(e) => return Err(e.into()),
            }
        }
        Err(shortfall.into())
    }
}

pub trait OutputBuilder: Send + Sync {
    /// Workflow types this builder handles.
    fn workflow_types(&self) -> &'static [WorkflowType];

    fn build(&self, ctx: &BuildContext<'_>) -> Result<TransactionPlan, EngineError>;
}

/// Builders keyed by workflow type, filled once at startup.
#[derive(Clone, Default)]
pub struct WorkflowRegistry {
    builders: HashMap<WorkflowType, Arc<dyn OutputBuilder>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a builder for every workflow type.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ValueTransfer));
        registry.register(Arc::new(AliasMinter));
        registry.register(Arc::new(CollectionMinter));
        registry.register(Arc::new(NftMinter));
        registry.register(Arc::new(NftMetadataUpdater));
        registry.register(Arc::new(TokenMinter));
        registry
    }

    /// Later registrations replace earlier ones for the same type.
    pub fn register(&mut self, builder: Arc<dyn OutputBuilder>) {
        for workflow_type in builder.workflow_types() {
            self.builders.insert(*workflow_type, builder.clone());
        }
    }

    pub fn get(&self, workflow_type: WorkflowType) -> Result<&dyn OutputBuilder, EngineError> {
        self.builders
            .get(&workflow_type)
            .map(|b| b.as_ref())
            .ok_or(EngineError::UnknownWorkflow(workflow_type))
    }

    pub fn contains(&self, workflow_type: WorkflowType) -> bool {
        self.builders.contains_key(&workflow_type)
    }
}

/// Basic outputs `owner` can spend without conditions, in selection order.
fn spendable_basic(available: &InputSelection, owner: &Address) -> Vec<(OutputId, Output)> {
    available
        .iter()
        .filter(|(_, output)| match output {
            Output::Basic(basic) => {
                matches!(basic.unlock_conditions.as_slice(), [UnlockCondition::Address(a)] if a == owner)
            }
            _ => false,
        })
        .cloned()
        .collect()
}

fn find_alias(
    available: &InputSelection,
    alias_id: AliasId,
    controller: &Address,
) -> Result<(OutputId, AliasOutput), EngineError> {
    available
        .iter()
        .find_map(|(id, output)| match output {
            Output::Alias(alias)
                if alias.alias_id.or_from_output_id(id) == alias_id
                    && output.owner().as_ref() == Some(controller) =>
            {
                Some((*id, alias.clone()))
            }
            _ => None,
        })
        .ok_or_else(|| EngineError::Request(format!("alias {alias_id} is not controlled by the alias governor")))
}

fn find_nft(
    available: &InputSelection,
    nft_id: NftId,
    owner: &Address,
) -> Result<(OutputId, NftOutput), EngineError> {
    available
        .iter()
        .find_map(|(id, output)| match output {
            Output::Nft(nft)
                if nft.nft_id.or_from_output_id(id) == nft_id
                    && output.owner().as_ref() == Some(owner) =>
            {
                Some((*id, nft.clone()))
            }
            _ => None,
        })
        .ok_or_else(|| EngineError::Request(format!("nft {nft_id} is not owned by the source address")))
}

/// Unix seconds as the ledger's 32-bit time.
fn unix_time(at: Timestamp) -> Result<u32, EngineError> {
    u32::try_from(at.as_secs())
        .map_err(|_| EngineError::Request(format!("timestamp {at} does not fit the ledger")))
}

#[cfg(test)]
mod tests;
