//! Ed25519 key pairs, ledger addresses and essence signatures.
//!
//! Every signature unlock signs the 32-byte Blake2b hash of a transaction
//! essence, never the essence bytes themselves.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use tangle_types::{Ed25519Address, KeyPair, PrivateKey, PublicKey, Signature};

use crate::hash::blake2b_256;

/// Key pair from a 32-byte Ed25519 secret, e.g. a derived SLIP-10 child key.
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    let signing_key = SigningKey::from_bytes(seed);
    KeyPair {
        public: PublicKey(signing_key.verifying_key().to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// Random key pair, for throwaway keys in tests and benches.
pub fn generate_keypair() -> KeyPair {
    keypair_from_seed(&SigningKey::generate(&mut OsRng).to_bytes())
}

/// Ledger address controlled by `public`.
pub fn ed25519_address(public: &PublicKey) -> Ed25519Address {
    Ed25519Address(blake2b_256(public.as_bytes()))
}

pub fn sign_essence(essence_hash: &[u8; 32], private_key: &PrivateKey) -> Signature {
    Signature(SigningKey::from_bytes(&private_key.0).sign(essence_hash).to_bytes())
}

/// `false` for a malformed public key as well as a bad signature.
pub fn verify_essence(essence_hash: &[u8; 32], signature: &Signature, public_key: &PublicKey) -> bool {
    VerifyingKey::from_bytes(&public_key.0)
        .map(|key| {
            key.verify(essence_hash, &ed25519_dalek::Signature::from_bytes(&signature.0))
                .is_ok()
        })
        .unwrap_or(false)
}
