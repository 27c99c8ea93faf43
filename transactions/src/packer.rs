//! Output Packer.
//!
//! Every `pack_*` call raises the requested amount to the network's minimum
//! storage deposit. A storage deposit return condition refunds exactly that
//! minimum, so the recipient keeps everything above it.

use tangle_types::{Address, AliasId, NativeTokens, NftId, OutputId, ProtocolParams};

use crate::deposit::min_storage_deposit;
use crate::error::TransactionError;
use crate::output::{
    sort_by_kind, AliasOutput, BasicOutput, Feature, FoundryOutput, NftOutput, Output,
    SimpleTokenScheme, UnlockCondition,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Expiration {
    pub return_address: Address,
    pub unix_time: u32,
}

/// Parameters of a basic (value) output.
#[derive(Clone, Debug)]
pub struct BasicOutputSpec {
    pub target: Address,
    pub amount: u64,
    pub native_tokens: NativeTokens,
    /// Adds a storage deposit return condition for this address.
    pub return_address: Option<Address>,
    /// Timelock: unspendable before this unix time.
    pub vesting_at: Option<u32>,
    pub expiration: Option<Expiration>,
    pub metadata: Option<Vec<u8>>,
    pub tag: Option<Vec<u8>>,
    pub sender: Option<Address>,
}

impl BasicOutputSpec {
    pub fn new(target: Address, amount: u64) -> Self {
        Self {
            target,
            amount,
            native_tokens: NativeTokens::new(),
            return_address: None,
            vesting_at: None,
            expiration: None,
            metadata: None,
            tag: None,
            sender: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NftOutputSpec {
    pub owner: Address,
    /// `NftId::ZERO` mints a new NFT.
    pub nft_id: NftId,
    pub amount: u64,
    pub native_tokens: NativeTokens,
    /// Collection or alias that issued the NFT. Immutable.
    pub issuer: Option<Address>,
    pub immutable_metadata: Option<Vec<u8>>,
    pub metadata: Option<Vec<u8>>,
    pub tag: Option<Vec<u8>>,
    pub sender: Option<Address>,
    pub return_address: Option<Address>,
    pub expiration: Option<Expiration>,
}

impl NftOutputSpec {
    pub fn mint(owner: Address) -> Self {
        Self {
            owner,
            nft_id: NftId::ZERO,
            amount: 0,
            native_tokens: NativeTokens::new(),
            issuer: None,
            immutable_metadata: None,
            metadata: None,
            tag: None,
            sender: None,
            return_address: None,
            expiration: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AliasOutputSpec {
    /// `AliasId::ZERO` mints a new alias.
    pub alias_id: AliasId,
    pub amount: u64,
    pub native_tokens: NativeTokens,
    pub state_controller: Address,
    pub governor: Address,
    pub state_index: u32,
    pub state_metadata: Vec<u8>,
    pub foundry_counter: u32,
    pub issuer: Option<Address>,
    pub immutable_metadata: Option<Vec<u8>>,
    pub metadata: Option<Vec<u8>>,
    pub sender: Option<Address>,
}

impl AliasOutputSpec {
    /// A fresh alias controlled and governed by `controller`.
    pub fn mint(controller: Address) -> Self {
        Self {
            alias_id: AliasId::ZERO,
            amount: 0,
            native_tokens: NativeTokens::new(),
            state_controller: controller,
            governor: controller,
            state_index: 0,
            state_metadata: Vec::new(),
            foundry_counter: 0,
            issuer: None,
            immutable_metadata: None,
            metadata: None,
            sender: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FoundryOutputSpec {
    pub alias_id: AliasId,
    pub serial_number: u32,
    pub token_scheme: SimpleTokenScheme,
    pub amount: u64,
    pub native_tokens: NativeTokens,
    pub immutable_metadata: Option<Vec<u8>>,
    pub metadata: Option<Vec<u8>>,
}

fn push_opt(features: &mut Vec<Feature>, make: fn(Vec<u8>) -> Feature, value: &Option<Vec<u8>>) {
    if let Some(v) = value {
        features.push(make(v.clone()));
    }
}

fn value_conditions(
    owner: Address,
    return_address: Option<Address>,
    vesting_at: Option<u32>,
    expiration: Option<Expiration>,
) -> Vec<UnlockCondition> {
    let mut conditions = vec![UnlockCondition::Address(owner)];
    if let Some(return_address) = return_address {
        // Refund amount is filled in once the deposit is known.
        conditions.push(UnlockCondition::StorageDepositReturn {
            return_address,
            amount: 0,
        });
    }
    if let Some(unix_time) = vesting_at {
        conditions.push(UnlockCondition::Timelock { unix_time });
    }
    if let Some(exp) = expiration {
        conditions.push(UnlockCondition::Expiration {
            return_address: exp.return_address,
            unix_time: exp.unix_time,
        });
    }
    sort_by_kind(&mut conditions);
    conditions
}

/// Builds outputs that satisfy the storage deposit rules of one network.
#[derive(Clone, Debug)]
pub struct OutputPacker {
    params: ProtocolParams,
}

impl OutputPacker {
    pub fn new(params: ProtocolParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn min_deposit(&self, output: &Output) -> Result<u64, TransactionError> {
        min_storage_deposit(output, &self.params)
    }

    /// Raise `amount` to the minimum deposit and set the refund of a storage
    /// deposit return condition to exactly that minimum.
    fn settle(&self, mut output: Output) -> Result<Output, TransactionError> {
        let minimum = self.min_deposit(&output)?;
        for uc in output.unlock_conditions_mut() {
            if let UnlockCondition::StorageDepositReturn { amount, .. } = uc {
                *amount = minimum;
            }
        }
        let amount = output.amount().max(minimum);
        if amount > self.params.token_supply {
            return Err(TransactionError::Malformed(format!(
                "amount {amount} exceeds token supply"
            )));
        }
        output.set_amount(amount);
        Ok(output)
    }

    pub fn pack_basic(&self, spec: &BasicOutputSpec) -> Result<Output, TransactionError> {
        let mut features = Vec::new();
        if let Some(sender) = spec.sender {
            features.push(Feature::Sender(sender));
        }
        push_opt(&mut features, Feature::Metadata, &spec.metadata);
        push_opt(&mut features, Feature::Tag, &spec.tag);
        sort_by_kind(&mut features);

        self.settle(Output::Basic(BasicOutput {
            amount: spec.amount,
            native_tokens: spec.native_tokens.clone(),
            unlock_conditions: value_conditions(
                spec.target,
                spec.return_address,
                spec.vesting_at,
                spec.expiration,
            ),
            features,
        }))
    }

    pub fn pack_nft(&self, spec: &NftOutputSpec) -> Result<Output, TransactionError> {
        let mut features = Vec::new();
        if let Some(sender) = spec.sender {
            features.push(Feature::Sender(sender));
        }
        push_opt(&mut features, Feature::Metadata, &spec.metadata);
        push_opt(&mut features, Feature::Tag, &spec.tag);
        sort_by_kind(&mut features);

        let mut immutable_features = Vec::new();
        if let Some(issuer) = spec.issuer {
            immutable_features.push(Feature::Issuer(issuer));
        }
        push_opt(&mut immutable_features, Feature::Metadata, &spec.immutable_metadata);

        self.settle(Output::Nft(NftOutput {
            amount: spec.amount,
            native_tokens: spec.native_tokens.clone(),
            nft_id: spec.nft_id,
            unlock_conditions: value_conditions(
                spec.owner,
                spec.return_address,
                None,
                spec.expiration,
            ),
            features,
            immutable_features,
        }))
    }

    pub fn pack_alias(&self, spec: &AliasOutputSpec) -> Result<Output, TransactionError> {
        let mut features = Vec::new();
        if let Some(sender) = spec.sender {
            features.push(Feature::Sender(sender));
        }
        push_opt(&mut features, Feature::Metadata, &spec.metadata);

        let mut immutable_features = Vec::new();
        if let Some(issuer) = spec.issuer {
            immutable_features.push(Feature::Issuer(issuer));
        }
        push_opt(&mut immutable_features, Feature::Metadata, &spec.immutable_metadata);

        self.settle(Output::Alias(AliasOutput {
            amount: spec.amount,
            native_tokens: spec.native_tokens.clone(),
            alias_id: spec.alias_id,
            state_index: spec.state_index,
            state_metadata: spec.state_metadata.clone(),
            foundry_counter: spec.foundry_counter,
            unlock_conditions: vec![
                UnlockCondition::StateControllerAddress(spec.state_controller),
                UnlockCondition::GovernorAddress(spec.governor),
            ],
            features,
            immutable_features,
        }))
    }

    pub fn pack_foundry(&self, spec: &FoundryOutputSpec) -> Result<Output, TransactionError> {
        let scheme = spec.token_scheme;
        if scheme.maximum_supply == 0
            || scheme.melted_tokens > scheme.minted_tokens
            || scheme.minted_tokens - scheme.melted_tokens > scheme.maximum_supply
        {
            return Err(TransactionError::Malformed(format!(
                "invalid token scheme {scheme:?}"
            )));
        }
        let mut features = Vec::new();
        push_opt(&mut features, Feature::Metadata, &spec.metadata);
        let mut immutable_features = Vec::new();
        push_opt(&mut immutable_features, Feature::Metadata, &spec.immutable_metadata);

        self.settle(Output::Foundry(FoundryOutput {
            amount: spec.amount,
            native_tokens: spec.native_tokens.clone(),
            serial_number: spec.serial_number,
            token_scheme: scheme,
            unlock_conditions: vec![UnlockCondition::ImmutableAliasAddress(spec.alias_id)],
            features,
            immutable_features,
        }))
    }

    /// Next state of an existing NFT with new mutable metadata.
    ///
    /// Immutable features are carried over verbatim; only the metadata
    /// feature changes. A zero id is resolved from `output_id`.
    pub fn update_nft_metadata(
        &self,
        existing: &NftOutput,
        output_id: &OutputId,
        metadata: Vec<u8>,
    ) -> Result<Output, TransactionError> {
        let mut next = existing.clone();
        next.nft_id = existing.nft_id.or_from_output_id(output_id);
        next.features.retain(|f| !matches!(f, Feature::Metadata(_)));
        next.features.push(Feature::Metadata(metadata));
        sort_by_kind(&mut next.features);
        self.settle(Output::Nft(next))
    }

    /// Next state of an existing alias, with the state index advanced.
    pub fn transition_alias(
        &self,
        existing: &AliasOutput,
        output_id: &OutputId,
    ) -> Result<AliasOutput, TransactionError> {
        let mut next = existing.clone();
        next.alias_id = existing.alias_id.or_from_output_id(output_id);
        next.state_index = existing
            .state_index
            .checked_add(1)
            .ok_or_else(|| TransactionError::Malformed("alias state index overflow".into()))?;
        Ok(next)
    }
}
