//! Fundamental types for the tangle transaction engine.
//!
//! Networks and their protocol parameters, ledger identifiers, addresses,
//! key material, native token balances and timestamps. Every other crate in
//! the workspace builds on these.

pub mod address;
pub mod amount;
pub mod error;
pub mod hash;
pub mod keys;
pub mod network;
pub mod params;
pub mod state;
pub mod time;

pub use address::{Address, Ed25519Address};
pub use amount::{NativeTokens, TokenId, MAX_NATIVE_TOKENS, SIMPLE_TOKEN_SCHEME_KIND};
pub use error::TypesError;
pub use hash::{decode_hex_fixed, AliasId, BlockId, NftId, OutputId, TransactionId};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use network::{Network, NetworkFamily};
pub use params::{ProtocolParams, RentStructure};
pub use state::InclusionState;
pub use time::{Clock, SystemClock, Timestamp};
