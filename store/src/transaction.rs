//! Transaction request records and their storage trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tangle_types::{AliasId, BlockId, NativeTokens, Network, NftId, OutputId, Timestamp};

/// Dispatch key selecting how a request's outputs are built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkflowType {
    Payment,
    Credit,
    Refund,
    Stake,
    BillPayment,
    MintAlias,
    MintCollection,
    MintNft,
    UpdateNftMetadata,
    MintToken,
}

impl WorkflowType {
    pub const ALL: [WorkflowType; 10] = [
        Self::Payment,
        Self::Credit,
        Self::Refund,
        Self::Stake,
        Self::BillPayment,
        Self::MintAlias,
        Self::MintCollection,
        Self::MintNft,
        Self::UpdateNftMetadata,
        Self::MintToken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Credit => "credit",
            Self::Refund => "refund",
            Self::Stake => "stake",
            Self::BillPayment => "bill_payment",
            Self::MintAlias => "mint_alias",
            Self::MintCollection => "mint_collection",
            Self::MintNft => "mint_nft",
            Self::UpdateNftMetadata => "update_nft_metadata",
            Self::MintToken => "mint_token",
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| StoreError::Serialization(format!("unknown workflow type: {s}")))
    }
}

/// Expiration requested for a value output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationRequest {
    pub return_address: String,
    pub at: Timestamp,
}

/// Type-specific payload fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowDetails {
    /// A new alias controlled by the source address.
    Alias {
        state_metadata: Vec<u8>,
        immutable_metadata: Option<Vec<u8>>,
    },
    /// An NFT representing a collection, issued by an alias the source
    /// address controls.
    Collection {
        alias_id: AliasId,
        immutable_metadata: Vec<u8>,
    },
    /// An NFT issued by a collection NFT held at the source address. The
    /// collection NFT is spent and carried forward unchanged.
    Nft {
        collection_id: NftId,
        immutable_metadata: Vec<u8>,
        metadata: Option<Vec<u8>>,
    },
    /// New mutable metadata for an NFT held at the source address.
    NftMetadata { nft_id: NftId, metadata: Vec<u8> },
    /// A foundry under an alias the source address controls, minting
    /// `minted` tokens to the target.
    Token {
        alias_id: AliasId,
        minted: u128,
        maximum_supply: u128,
        metadata: Option<Vec<u8>>,
    },
}

/// What the requesting workflow wants moved or minted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    pub source_address: String,
    pub target_address: Option<String>,
    pub amount: u64,
    pub native_tokens: NativeTokens,
    /// Address funding storage deposits, when it differs from the source.
    pub storage_deposit_source_address: Option<String>,
    /// Address controlling the alias a collection or token mint builds on,
    /// when it differs from the source.
    pub alias_governor_address: Option<String>,
    /// Timelock on the target output.
    pub vesting_at: Option<Timestamp>,
    pub expiration: Option<ExpirationRequest>,
    pub metadata: Option<Vec<u8>>,
    pub tag: Option<Vec<u8>>,
    pub details: Option<WorkflowDetails>,
}

impl RequestPayload {
    /// Every address whose outputs this request may spend, source first.
    pub fn spending_addresses(&self) -> Vec<String> {
        let mut addresses = vec![self.source_address.clone()];
        let extra = [
            &self.storage_deposit_source_address,
            &self.alias_governor_address,
        ];
        for address in extra.into_iter().flatten() {
            if !addresses.contains(address) {
                addresses.push(address.clone());
            }
        }
        addresses
    }
}

/// Execution bookkeeping. Written only by the engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletReference {
    pub attempt_count: u32,
    pub in_progress: bool,
    /// Never reset once set.
    pub confirmed: bool,
    /// Block of the current submission, cleared on failure.
    pub chain_reference: Option<BlockId>,
    /// Every block ever submitted for this request, oldest first.
    pub chain_references: Vec<BlockId>,
    pub processed_on: Option<Timestamp>,
    pub error: Option<String>,
    /// Inputs spent by the latest attempt, re-fetched verbatim on retry.
    pub consumed_output_ids: Vec<OutputId>,
    /// Endpoint used for the latest submission.
    pub node_index: Option<usize>,
    pub abandoned: bool,
}

impl WalletReference {
    pub fn is_pending(&self) -> bool {
        !self.confirmed && !self.abandoned
    }
}

/// A transaction request and its execution state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub workflow_type: WorkflowType,
    pub network: Network,
    pub payload: RequestPayload,
    pub wallet_reference: WalletReference,
    pub should_retry: bool,
    /// Held back until a bill payment settles.
    pub depends_on_bill_payment: bool,
    pub created_on: Timestamp,
}

impl TransactionRecord {
    pub fn new(
        id: impl Into<String>,
        workflow_type: WorkflowType,
        network: Network,
        payload: RequestPayload,
        created_on: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            workflow_type,
            network,
            payload,
            wallet_reference: WalletReference::default(),
            should_retry: false,
            depends_on_bill_payment: false,
            created_on,
        }
    }
}

/// Storage of transaction records.
pub trait TransactionStore: Send + Sync {
    /// Insert a new record. Fails with `Duplicate` if the id exists.
    fn insert_transaction(&self, record: &TransactionRecord) -> Result<(), StoreError>;

    fn get_transaction(&self, id: &str) -> Result<TransactionRecord, StoreError>;

    /// Read-modify-write one record atomically. `update` returns whether it
    /// changed anything; nothing is written when it returns `false`.
    /// Returns the record as stored afterwards.
    fn update_transaction(
        &self,
        id: &str,
        update: &mut dyn FnMut(&mut TransactionRecord) -> bool,
    ) -> Result<TransactionRecord, StoreError>;

    fn iter_transactions(&self) -> Result<Vec<TransactionRecord>, StoreError>;

    fn transaction_count(&self) -> Result<u64, StoreError> {
        self.iter_transactions().map(|v| v.len() as u64)
    }

    /// Records still waiting to run or in flight.
    fn iter_pending(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        Ok(self
            .iter_transactions()?
            .into_iter()
            .filter(|r| r.wallet_reference.is_pending())
            .collect())
    }
}
