//! Minting and chain-state workflows (Shimmer family only; the legacy
//! codec rejects these outputs as unsupported).

use tangle_store::{WorkflowDetails, WorkflowType};
use tangle_transactions::{
    AliasOutputSpec, BasicOutputSpec, FoundryOutputSpec, NftOutput, NftOutputSpec, Output,
    SimpleTokenScheme, TransactionError,
};
use tangle_types::{Address, NativeTokens, TokenId, SIMPLE_TOKEN_SCHEME_KIND};

use super::{find_alias, find_nft, BuildContext, OutputBuilder, TransactionPlan};
use crate::EngineError;

fn details<'a>(ctx: &'a BuildContext<'_>) -> Result<&'a WorkflowDetails, EngineError> {
    ctx.record.payload.details.as_ref().ok_or_else(|| {
        EngineError::Request(format!(
            "{} requires workflow details",
            ctx.record.workflow_type
        ))
    })
}

fn wrong_details(ctx: &BuildContext<'_>) -> EngineError {
    EngineError::Request(format!(
        "details do not match workflow {}",
        ctx.record.workflow_type
    ))
}

/// A new alias controlled and governed by the target, issued by the source.
pub struct AliasMinter;

impl OutputBuilder for AliasMinter {
    fn workflow_types(&self) -> &'static [WorkflowType] {
        &[WorkflowType::MintAlias]
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<TransactionPlan, EngineError> {
        let WorkflowDetails::Alias {
            state_metadata,
            immutable_metadata,
        } = details(ctx)?
        else {
            return Err(wrong_details(ctx));
        };

        let mut spec = AliasOutputSpec::mint(ctx.target()?);
        spec.amount = ctx.record.payload.amount;
        spec.state_metadata = state_metadata.clone();
        spec.immutable_metadata = immutable_metadata.clone();
        spec.metadata = ctx.record.payload.metadata.clone();
        spec.issuer = Some(ctx.source.address());
        let alias = ctx.packer.pack_alias(&spec)?;

        let mut plan = TransactionPlan::default();
        let due = alias.amount();
        plan.outputs.push(alias);
        plan.fund(ctx, ctx.source.address(), due, &NativeTokens::new())?;
        Ok(plan)
    }
}

/// A collection NFT issued by an alias the source controls, or the alias
/// governor when one is named. The alias moves to its next state in the same
/// transaction.
pub struct CollectionMinter;

impl OutputBuilder for CollectionMinter {
    fn workflow_types(&self) -> &'static [WorkflowType] {
        &[WorkflowType::MintCollection]
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<TransactionPlan, EngineError> {
        let WorkflowDetails::Collection {
            alias_id,
            immutable_metadata,
        } = details(ctx)?
        else {
            return Err(wrong_details(ctx));
        };

        let source = ctx.source.address();
        let (alias_output_id, alias) = find_alias(ctx.available, *alias_id, &ctx.alias_controller())?;
        let next_alias = ctx.packer.transition_alias(&alias, &alias_output_id)?;

        let mut spec = NftOutputSpec::mint(ctx.target()?);
        spec.amount = ctx.record.payload.amount;
        spec.issuer = Some(Address::Alias(*alias_id));
        spec.immutable_metadata = Some(immutable_metadata.clone());
        spec.metadata = ctx.record.payload.metadata.clone();
        spec.tag = ctx.record.payload.tag.clone();
        let collection = ctx.packer.pack_nft(&spec)?;

        let mut plan = TransactionPlan::default();
        plan.inputs.push((alias_output_id, Output::Alias(alias)));
        plan.outputs.push(Output::Alias(next_alias));
        let due = collection.amount();
        plan.outputs.push(collection);
        plan.fund(ctx, source, due, &NativeTokens::new())?;
        Ok(plan)
    }
}

/// An NFT issued by a collection NFT the source owns. The collection is
/// carried forward unchanged.
pub struct NftMinter;

impl OutputBuilder for NftMinter {
    fn workflow_types(&self) -> &'static [WorkflowType] {
        &[WorkflowType::MintNft]
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<TransactionPlan, EngineError> {
        let WorkflowDetails::Nft {
            collection_id,
            immutable_metadata,
            metadata,
        } = details(ctx)?
        else {
            return Err(wrong_details(ctx));
        };

        let source = ctx.source.address();
        let (collection_output_id, collection) = find_nft(ctx.available, *collection_id, &source)?;
        let carried = NftOutput {
            nft_id: *collection_id,
            ..collection.clone()
        };

        let mut spec = NftOutputSpec::mint(ctx.target()?);
        spec.amount = ctx.record.payload.amount;
        spec.issuer = Some(Address::Nft(*collection_id));
        spec.immutable_metadata = Some(immutable_metadata.clone());
        spec.metadata = metadata.clone().or_else(|| ctx.record.payload.metadata.clone());
        spec.tag = ctx.record.payload.tag.clone();
        let nft = ctx.packer.pack_nft(&spec)?;

        let mut plan = TransactionPlan::default();
        plan.inputs.push((collection_output_id, Output::Nft(collection)));
        plan.outputs.push(Output::Nft(carried));
        let due = nft.amount();
        plan.outputs.push(nft);
        plan.fund(ctx, source, due, &NativeTokens::new())?;
        Ok(plan)
    }
}

/// New mutable metadata on an NFT the source owns. Immutable features are
/// copied verbatim; a higher storage deposit is paid from plain outputs.
pub struct NftMetadataUpdater;

impl OutputBuilder for NftMetadataUpdater {
    fn workflow_types(&self) -> &'static [WorkflowType] {
        &[WorkflowType::UpdateNftMetadata]
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<TransactionPlan, EngineError> {
        let WorkflowDetails::NftMetadata { nft_id, metadata } = details(ctx)? else {
            return Err(wrong_details(ctx));
        };

        let source = ctx.source.address();
        let (nft_output_id, nft) = find_nft(ctx.available, *nft_id, &source)?;
        let updated = ctx
            .packer
            .update_nft_metadata(&nft, &nft_output_id, metadata.clone())?;
        let extra = updated.amount().saturating_sub(nft.amount);

        let mut plan = TransactionPlan::default();
        plan.inputs.push((nft_output_id, Output::Nft(nft)));
        plan.outputs.push(updated);
        plan.fund(ctx, source, extra, &NativeTokens::new())?;
        Ok(plan)
    }
}

/// A foundry under an alias controlled by the source or the alias governor,
/// with every minted token sent to the target.
pub struct TokenMinter;

impl OutputBuilder for TokenMinter {
    fn workflow_types(&self) -> &'static [WorkflowType] {
        &[WorkflowType::MintToken]
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<TransactionPlan, EngineError> {
        let WorkflowDetails::Token {
            alias_id,
            minted,
            maximum_supply,
            metadata,
        } = details(ctx)?
        else {
            return Err(wrong_details(ctx));
        };

        let source = ctx.source.address();
        let (alias_output_id, alias) = find_alias(ctx.available, *alias_id, &ctx.alias_controller())?;
        let mut next_alias = ctx.packer.transition_alias(&alias, &alias_output_id)?;
        next_alias.foundry_counter = next_alias
            .foundry_counter
            .checked_add(1)
            .ok_or_else(|| TransactionError::Malformed("foundry counter overflow".into()))?;
        let serial_number = next_alias.foundry_counter;

        let foundry = ctx.packer.pack_foundry(&FoundryOutputSpec {
            alias_id: *alias_id,
            serial_number,
            token_scheme: SimpleTokenScheme {
                minted_tokens: *minted,
                melted_tokens: 0,
                maximum_supply: *maximum_supply,
            },
            amount: 0,
            native_tokens: NativeTokens::new(),
            immutable_metadata: metadata.clone(),
            metadata: None,
        })?;

        let token_id = TokenId::from_foundry(*alias_id, serial_number, SIMPLE_TOKEN_SCHEME_KIND);
        let mut tokens = NativeTokens::new();
        tokens.add(token_id, *minted).map_err(TransactionError::from)?;
        let mut spec = BasicOutputSpec::new(ctx.target()?, ctx.record.payload.amount);
        spec.native_tokens = tokens;
        spec.metadata = ctx.record.payload.metadata.clone();
        spec.tag = ctx.record.payload.tag.clone();
        let minted_output = ctx.packer.pack_basic(&spec)?;

        let due = foundry
            .amount()
            .checked_add(minted_output.amount())
            .ok_or_else(|| TransactionError::Malformed("amount overflow".into()))?;

        let mut plan = TransactionPlan::default();
        plan.inputs.push((alias_output_id, Output::Alias(alias)));
        plan.outputs.push(Output::Alias(next_alias));
        plan.outputs.push(foundry);
        plan.outputs.push(minted_output);
        plan.fund(ctx, source, due, &NativeTokens::new())?;
        Ok(plan)
    }
}
