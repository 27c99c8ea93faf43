//! Cryptographic primitives for the tangle transaction engine.
//!
//! - **Ed25519** signing of transaction essences
//! - **Blake2b-256** for ids, commitments and address hashes
//! - **BIP39 + SLIP-10** key derivation from mnemonics
//! - **Bech32** address text

pub mod address;
pub mod details;
pub mod hash;
pub mod keys;
pub mod mnemonic;

pub use address::{from_bech32, parse_bech32, to_bech32, AddressError};
pub use details::{AddressDetails, DetailsError};
pub use hash::{block_id, blake2b_256, blake2b_256_multi, network_id, transaction_id};
pub use keys::{ed25519_address, generate_keypair, keypair_from_seed, sign_essence, verify_essence};
pub use mnemonic::{
    derive_slip10, generate_mnemonic, keypair_from_mnemonic, seed_from_mnemonic,
    validate_mnemonic, MnemonicError,
};
