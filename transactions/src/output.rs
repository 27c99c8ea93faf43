//! The output model: basic, alias, foundry and NFT outputs with their
//! unlock conditions and features.
//!
//! Unlock conditions and features are kept sorted by kind, the order the
//! binary encoding requires. Use the constructors and [`sort_by_kind`] to
//! keep it that way.

use serde::{Deserialize, Serialize};
use tangle_types::{Address, AliasId, NativeTokens, NftId, OutputId};

/// Kind bytes of each output variant on the wire.
pub const BASIC_OUTPUT_KIND: u8 = 3;
pub const ALIAS_OUTPUT_KIND: u8 = 4;
pub const FOUNDRY_OUTPUT_KIND: u8 = 5;
pub const NFT_OUTPUT_KIND: u8 = 6;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnlockCondition {
    Address(Address),
    /// The consuming transaction must send `amount` back to `return_address`.
    StorageDepositReturn { return_address: Address, amount: u64 },
    /// Output cannot be spent before `unix_time`.
    Timelock { unix_time: u32 },
    /// After `unix_time` only `return_address` may spend the output.
    Expiration { return_address: Address, unix_time: u32 },
    StateControllerAddress(Address),
    GovernorAddress(Address),
    ImmutableAliasAddress(AliasId),
}

impl UnlockCondition {
    pub fn kind(&self) -> u8 {
        match self {
            Self::Address(_) => 0,
            Self::StorageDepositReturn { .. } => 1,
            Self::Timelock { .. } => 2,
            Self::Expiration { .. } => 3,
            Self::StateControllerAddress(_) => 4,
            Self::GovernorAddress(_) => 5,
            Self::ImmutableAliasAddress(_) => 6,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feature {
    Sender(Address),
    Issuer(Address),
    Metadata(Vec<u8>),
    Tag(Vec<u8>),
}

impl Feature {
    pub fn kind(&self) -> u8 {
        match self {
            Self::Sender(_) => 0,
            Self::Issuer(_) => 1,
            Self::Metadata(_) => 2,
            Self::Tag(_) => 3,
        }
    }
}

/// Implemented by unlock conditions and features so one helper can sort both.
pub trait Kinded {
    fn kind_byte(&self) -> u8;
}

impl Kinded for UnlockCondition {
    fn kind_byte(&self) -> u8 {
        self.kind()
    }
}

impl Kinded for Feature {
    fn kind_byte(&self) -> u8 {
        self.kind()
    }
}

pub fn sort_by_kind<T: Kinded>(items: &mut [T]) {
    items.sort_by_key(Kinded::kind_byte);
}

/// Supply accounting of a foundry's token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleTokenScheme {
    pub minted_tokens: u128,
    pub melted_tokens: u128,
    pub maximum_supply: u128,
}

impl SimpleTokenScheme {
    pub fn circulating(&self) -> u128 {
        self.minted_tokens.saturating_sub(self.melted_tokens)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicOutput {
    pub amount: u64,
    pub native_tokens: NativeTokens,
    pub unlock_conditions: Vec<UnlockCondition>,
    pub features: Vec<Feature>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasOutput {
    pub amount: u64,
    pub native_tokens: NativeTokens,
    /// Zero while minting; the ledger assigns the real id.
    pub alias_id: AliasId,
    pub state_index: u32,
    pub state_metadata: Vec<u8>,
    pub foundry_counter: u32,
    pub unlock_conditions: Vec<UnlockCondition>,
    pub features: Vec<Feature>,
    pub immutable_features: Vec<Feature>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundryOutput {
    pub amount: u64,
    pub native_tokens: NativeTokens,
    pub serial_number: u32,
    pub token_scheme: SimpleTokenScheme,
    pub unlock_conditions: Vec<UnlockCondition>,
    pub features: Vec<Feature>,
    pub immutable_features: Vec<Feature>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftOutput {
    pub amount: u64,
    pub native_tokens: NativeTokens,
    /// Zero while minting; the ledger assigns the real id.
    pub nft_id: NftId,
    pub unlock_conditions: Vec<UnlockCondition>,
    pub features: Vec<Feature>,
    pub immutable_features: Vec<Feature>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Output {
    Basic(BasicOutput),
    Alias(AliasOutput),
    Foundry(FoundryOutput),
    Nft(NftOutput),
}

impl Output {
    pub fn kind(&self) -> u8 {
        match self {
            Self::Basic(_) => BASIC_OUTPUT_KIND,
            Self::Alias(_) => ALIAS_OUTPUT_KIND,
            Self::Foundry(_) => FOUNDRY_OUTPUT_KIND,
            Self::Nft(_) => NFT_OUTPUT_KIND,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Basic(_) => "basic output",
            Self::Alias(_) => "alias output",
            Self::Foundry(_) => "foundry output",
            Self::Nft(_) => "nft output",
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            Self::Basic(o) => o.amount,
            Self::Alias(o) => o.amount,
            Self::Foundry(o) => o.amount,
            Self::Nft(o) => o.amount,
        }
    }

    pub fn set_amount(&mut self, amount: u64) {
        match self {
            Self::Basic(o) => o.amount = amount,
            Self::Alias(o) => o.amount = amount,
            Self::Foundry(o) => o.amount = amount,
            Self::Nft(o) => o.amount = amount,
        }
    }

    pub fn native_tokens(&self) -> &NativeTokens {
        match self {
            Self::Basic(o) => &o.native_tokens,
            Self::Alias(o) => &o.native_tokens,
            Self::Foundry(o) => &o.native_tokens,
            Self::Nft(o) => &o.native_tokens,
        }
    }

    pub fn unlock_conditions(&self) -> &[UnlockCondition] {
        match self {
            Self::Basic(o) => &o.unlock_conditions,
            Self::Alias(o) => &o.unlock_conditions,
            Self::Foundry(o) => &o.unlock_conditions,
            Self::Nft(o) => &o.unlock_conditions,
        }
    }

    pub fn unlock_conditions_mut(&mut self) -> &mut Vec<UnlockCondition> {
        match self {
            Self::Basic(o) => &mut o.unlock_conditions,
            Self::Alias(o) => &mut o.unlock_conditions,
            Self::Foundry(o) => &mut o.unlock_conditions,
            Self::Nft(o) => &mut o.unlock_conditions,
        }
    }

    pub fn features(&self) -> &[Feature] {
        match self {
            Self::Basic(o) => &o.features,
            Self::Alias(o) => &o.features,
            Self::Foundry(o) => &o.features,
            Self::Nft(o) => &o.features,
        }
    }

    /// Immutable features; basic outputs have none.
    pub fn immutable_features(&self) -> &[Feature] {
        match self {
            Self::Basic(_) => &[],
            Self::Alias(o) => &o.immutable_features,
            Self::Foundry(o) => &o.immutable_features,
            Self::Nft(o) => &o.immutable_features,
        }
    }

    /// The address that must unlock this output when it is consumed.
    ///
    /// Aliases are spent by their state controller; the engine only ever
    /// performs state transitions.
    pub fn owner(&self) -> Option<Address> {
        let conditions = self.unlock_conditions();
        let wanted = |uc: &UnlockCondition| match (self, uc) {
            (Self::Alias(_), UnlockCondition::StateControllerAddress(a)) => Some(*a),
            (Self::Foundry(_), UnlockCondition::ImmutableAliasAddress(id)) => {
                Some(Address::Alias(*id))
            }
            (Self::Basic(_) | Self::Nft(_), UnlockCondition::Address(a)) => Some(*a),
            _ => None,
        };
        conditions.iter().find_map(wanted)
    }

    pub fn storage_deposit_return(&self) -> Option<(Address, u64)> {
        self.unlock_conditions().iter().find_map(|uc| match uc {
            UnlockCondition::StorageDepositReturn {
                return_address,
                amount,
            } => Some((*return_address, *amount)),
            _ => None,
        })
    }

    pub fn metadata(&self) -> Option<&[u8]> {
        find_metadata(self.features())
    }

    pub fn immutable_metadata(&self) -> Option<&[u8]> {
        find_metadata(self.immutable_features())
    }

    /// Chain address this output represents once it exists on the ledger,
    /// resolving a zero id from the output id that created it.
    pub fn chain_address(&self, output_id: &OutputId) -> Option<Address> {
        match self {
            Self::Alias(o) => Some(Address::Alias(o.alias_id.or_from_output_id(output_id))),
            Self::Nft(o) => Some(Address::Nft(o.nft_id.or_from_output_id(output_id))),
            _ => None,
        }
    }

    /// Only an owner address and an amount: the shape legacy networks support.
    pub fn is_plain_value(&self) -> bool {
        match self {
            Self::Basic(o) => {
                o.native_tokens.is_empty()
                    && o.features.is_empty()
                    && matches!(
                        o.unlock_conditions.as_slice(),
                        [UnlockCondition::Address(Address::Ed25519(_))]
                    )
            }
            _ => false,
        }
    }
}

fn find_metadata(features: &[Feature]) -> Option<&[u8]> {
    features.iter().find_map(|f| match f {
        Feature::Metadata(data) => Some(data.as_slice()),
        _ => None,
    })
}

impl BasicOutput {
    /// A basic output holding `amount` for `address` and nothing else.
    pub fn plain(address: Address, amount: u64) -> Self {
        Self {
            amount,
            native_tokens: NativeTokens::new(),
            unlock_conditions: vec![UnlockCondition::Address(address)],
            features: Vec::new(),
        }
    }
}
