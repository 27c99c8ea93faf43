//! BIP39 mnemonics and SLIP-10 Ed25519 key derivation.
//!
//! Every wallet address is the single key at
//! `m/44'/<coin type>'/0'/0'/0'`, derived from a 24-word mnemonic. All
//! path segments are hardened, the only kind SLIP-10 allows for Ed25519.

use bip39::Mnemonic;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use tangle_types::KeyPair;
use thiserror::Error;
use zeroize::Zeroize;

use crate::keys::keypair_from_seed;

type HmacSha512 = Hmac<Sha512>;

const SLIP10_ED25519_KEY: &[u8] = b"ed25519 seed";
const HARDENED: u32 = 0x8000_0000;
const PURPOSE: u32 = 44;

#[derive(Debug, Error)]
pub enum MnemonicError {
    #[error("invalid mnemonic phrase: {0}")]
    InvalidMnemonic(String),

    #[error("key derivation failed: {0}")]
    DerivationFailed(String),
}

/// New 24-word mnemonic from 256 bits of OS entropy.
pub fn generate_mnemonic() -> Result<String, MnemonicError> {
    let mut entropy = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut entropy);
    let mnemonic = Mnemonic::from_entropy(&entropy)
        .map_err(|e| MnemonicError::DerivationFailed(e.to_string()));
    entropy.zeroize();
    Ok(mnemonic?.to_string())
}

pub fn validate_mnemonic(mnemonic: &str) -> bool {
    Mnemonic::parse_normalized(mnemonic).is_ok()
}

/// BIP39 seed with an empty passphrase.
pub fn seed_from_mnemonic(mnemonic: &str) -> Result<[u8; 64], MnemonicError> {
    let mnemonic = Mnemonic::parse_normalized(mnemonic)
        .map_err(|e| MnemonicError::InvalidMnemonic(e.to_string()))?;
    Ok(mnemonic.to_seed_normalized(""))
}

/// A SLIP-10 extended private key: secret plus chain code.
struct ExtendedKey {
    key: [u8; 32],
    chain_code: [u8; 32],
}

impl Drop for ExtendedKey {
    fn drop(&mut self) {
        self.key.zeroize();
        self.chain_code.zeroize();
    }
}

fn hmac_split(key: &[u8], parts: &[&[u8]]) -> Result<ExtendedKey, MnemonicError> {
    let mut mac =
        HmacSha512::new_from_slice(key).map_err(|e| MnemonicError::DerivationFailed(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    let out = mac.finalize().into_bytes();
    let mut ext = ExtendedKey {
        key: [0u8; 32],
        chain_code: [0u8; 32],
    };
    ext.key.copy_from_slice(&out[..32]);
    ext.chain_code.copy_from_slice(&out[32..]);
    Ok(ext)
}

/// Derive the Ed25519 secret at `path` (indexes without the hardened bit).
pub fn derive_slip10(seed: &[u8], path: &[u32]) -> Result<[u8; 32], MnemonicError> {
    let mut node = hmac_split(SLIP10_ED25519_KEY, &[seed])?;
    for index in path {
        let hardened = (index | HARDENED).to_be_bytes();
        node = hmac_split(&node.chain_code, &[&[0u8], &node.key, &hardened])?;
    }
    Ok(node.key)
}

/// Derivation path for the wallet key of `coin_type`.
pub fn address_path(coin_type: u32) -> [u32; 5] {
    [PURPOSE, coin_type, 0, 0, 0]
}

/// Key pair for the wallet address of `coin_type` under `mnemonic`.
pub fn keypair_from_mnemonic(mnemonic: &str, coin_type: u32) -> Result<KeyPair, MnemonicError> {
    let mut seed = seed_from_mnemonic(mnemonic)?;
    let secret = derive_slip10(&seed, &address_path(coin_type));
    seed.zeroize();
    let mut secret = secret?;
    let pair = keypair_from_seed(&secret);
    secret.zeroize();
    Ok(pair)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";

    #[test]
    fn generate_produces_valid_24_words() {
        let mnemonic = generate_mnemonic().unwrap();
        assert_eq!(mnemonic.split_whitespace().count(), 24);
        assert!(validate_mnemonic(&mnemonic));
    }

    #[test]
    fn invalid_mnemonic_rejected() {
        assert!(!validate_mnemonic("not a valid mnemonic phrase"));
        assert!(keypair_from_mnemonic("invalid words here", 4219).is_err());
    }

    #[test]
    fn slip10_master_and_first_child_vectors() {
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let master = derive_slip10(&seed, &[]).unwrap();
        assert_eq!(
            hex::encode(master),
            "2b4be7f19ee27bbf30c667b642d5f4aa69fd169872f8fc3059c08ebae2eb19e7"
        );
        let child = derive_slip10(&seed, &[0]).unwrap();
        assert_eq!(
            hex::encode(child),
            "68e0fe46dfb67e368c75379acec591dad19df3cde26e63b93a8e704f1dade7a3"
        );
    }

    #[test]
    fn coin_type_changes_the_key() {
        let legacy = keypair_from_mnemonic(KNOWN, 4218).unwrap();
        let shimmer = keypair_from_mnemonic(KNOWN, 4219).unwrap();
        assert_ne!(legacy.public, shimmer.public);
        assert_eq!(
            keypair_from_mnemonic(KNOWN, 4219).unwrap().public,
            shimmer.public
        );
    }
}
