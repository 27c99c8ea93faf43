//! Transaction construction for legacy and Stardust-family ledgers.
//!
//! Outputs are built by the [`OutputPacker`] so they always hold at least
//! their storage deposit. An [`InputSelection`] snapshot plus the desired
//! outputs becomes a [`SignedTransaction`] through [`build_transaction`],
//! and a [`WireCodec`] turns the result into the bytes a node accepts.

pub mod block;
pub mod builder;
pub mod codec;
pub mod deposit;
pub mod error;
pub mod essence;
pub mod merge;
pub mod output;
pub mod packer;
pub mod unlock;

pub use block::{Block, TransactionPayload, MAX_PARENTS, MIN_PARENTS};
pub use builder::{build_transaction, SignedTransaction};
pub use codec::{codec_for, LegacyCodec, StardustCodec, WireCodec};
pub use deposit::{check_storage_deposit, min_storage_deposit};
pub use error::TransactionError;
pub use essence::{
    essence_from_selection, pack_essence, InputSelection, TaggedData, TransactionEssence,
    MAX_INPUTS,
};
pub use merge::{merge_outputs, subtract};
pub use output::{
    AliasOutput, BasicOutput, Feature, FoundryOutput, NftOutput, Output, SimpleTokenScheme,
    UnlockCondition,
};
pub use packer::{
    AliasOutputSpec, BasicOutputSpec, Expiration, FoundryOutputSpec, NftOutputSpec, OutputPacker,
};
pub use unlock::{create_unlocks, Unlock};
