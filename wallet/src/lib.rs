//! Wallet-side services of the transaction engine.
//!
//! - Address/key service: mnemonics to keys and network address text
//! - The node RPC boundary ([`NodeApi`]) with one client per network family
//! - Endpoint selection with health probes
//! - Output discovery, block submission, and bounded inclusion polling

pub mod address;
pub mod error;
pub mod http;
pub mod inclusion;
pub mod legacy;
pub mod node;
pub mod outputs;
pub mod pool;
pub mod shimmer;
pub mod submit;

pub use address::{address_service, AddressService, LegacyAddressService, ShimmerAddressService};
pub use error::WalletError;
pub use inclusion::{await_inclusion, InclusionPolicy};
pub use legacy::LegacyClient;
pub use node::{Balance, NodeApi, NodeOutput};
pub use outputs::get_outputs;
pub use pool::{client_for, EndpointPool};
pub use shimmer::ShimmerClient;
pub use submit::submit_payload;
