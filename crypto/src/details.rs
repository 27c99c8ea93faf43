//! Everything needed to spend from one wallet address.

use std::fmt;

use tangle_types::{Address, KeyPair, Network};
use zeroize::Zeroize;

use crate::address::{to_bech32, AddressError};
use crate::keys::ed25519_address;
use crate::mnemonic::{keypair_from_mnemonic, MnemonicError};

#[derive(Debug, thiserror::Error)]
pub enum DetailsError {
    #[error(transparent)]
    Mnemonic(#[from] MnemonicError),
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Mnemonic, derived key pair and address forms of one wallet address.
///
/// Derived on demand and never persisted; the mnemonic is wiped on drop and
/// hidden from `Debug`.
pub struct AddressDetails {
    mnemonic: String,
    keypair: KeyPair,
    network: Network,
    address: Address,
    hex: String,
    bech32: String,
}

impl AddressDetails {
    pub fn derive(mnemonic: &str, network: Network) -> Result<Self, DetailsError> {
        let keypair = keypair_from_mnemonic(mnemonic, network.coin_type())?;
        let ed = ed25519_address(&keypair.public);
        let address = Address::Ed25519(ed);
        let bech32 = to_bech32(&address, network)?;
        Ok(Self {
            mnemonic: mnemonic.to_string(),
            keypair,
            network,
            address,
            hex: format!("0x{}", hex::encode(ed.as_bytes())),
            bech32,
        })
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Hex of the public key hash, i.e. the Ed25519 address body.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    pub fn bech32(&self) -> &str {
        &self.bech32
    }
}

impl Drop for AddressDetails {
    fn drop(&mut self) {
        self.mnemonic.zeroize();
    }
}

impl fmt::Debug for AddressDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressDetails")
            .field("network", &self.network)
            .field("bech32", &self.bech32)
            .field("mnemonic", &"<redacted>")
            .finish()
    }
}
