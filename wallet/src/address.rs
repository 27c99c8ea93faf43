//! Address/key service: mnemonic to address details, per network family.

use std::sync::Arc;

use tangle_crypto::{from_bech32, generate_mnemonic, AddressDetails};
use tangle_store::SecretStore;
use tangle_types::{Address, Network, NetworkFamily};

use crate::error::WalletError;

/// Derives keys and address text for one network.
///
/// Derivation is deterministic: the same mnemonic always yields the same
/// key pair and address on a given network.
pub trait AddressService: Send + Sync {
    fn network(&self) -> Network;

    fn derive_address(&self, mnemonic: &str) -> Result<AddressDetails, WalletError>;

    /// Parse address text of this network.
    fn parse_address(&self, text: &str) -> Result<Address, WalletError>;

    fn secrets(&self) -> &Arc<dyn SecretStore>;

    /// Generate a fresh mnemonic and derive its address. With `persist`
    /// the mnemonic is stored under the address before returning, so a
    /// reservation can be attached to it later.
    fn new_address(&self, persist: bool) -> Result<AddressDetails, WalletError> {
        let mnemonic = generate_mnemonic()?;
        let details = self.derive_address(&mnemonic)?;
        if persist {
            self.secrets()
                .store_mnemonic(details.bech32(), details.mnemonic())?;
            tracing::info!(address = %details.bech32(), network = %self.network(), "stored new address");
        }
        Ok(details)
    }

    /// Details of an address whose mnemonic is in the secret store.
    fn address_details(&self, address: &str) -> Result<AddressDetails, WalletError> {
        let mnemonic = self.secrets().get_mnemonic(address)?;
        let details = self.derive_address(&mnemonic)?;
        if details.bech32() != address {
            return Err(WalletError::Key(format!(
                "stored mnemonic does not derive {address}"
            )));
        }
        Ok(details)
    }
}

/// Legacy networks: only Ed25519 addresses exist.
pub struct LegacyAddressService {
    network: Network,
    secrets: Arc<dyn SecretStore>,
}

impl LegacyAddressService {
    pub fn new(network: Network, secrets: Arc<dyn SecretStore>) -> Result<Self, WalletError> {
        if network.family() != NetworkFamily::Legacy {
            return Err(WalletError::Unsupported {
                network,
                what: "legacy address service".into(),
            });
        }
        Ok(Self { network, secrets })
    }
}

impl AddressService for LegacyAddressService {
    fn network(&self) -> Network {
        self.network
    }

    fn derive_address(&self, mnemonic: &str) -> Result<AddressDetails, WalletError> {
        Ok(AddressDetails::derive(mnemonic, self.network)?)
    }

    fn parse_address(&self, text: &str) -> Result<Address, WalletError> {
        let address = from_bech32(text, self.network)?;
        if !address.is_ed25519() {
            return Err(WalletError::InvalidAddress(format!(
                "{text} is not an Ed25519 address"
            )));
        }
        Ok(address)
    }

    fn secrets(&self) -> &Arc<dyn SecretStore> {
        &self.secrets
    }
}

/// Shimmer networks: Ed25519, alias and NFT addresses.
pub struct ShimmerAddressService {
    network: Network,
    secrets: Arc<dyn SecretStore>,
}

impl ShimmerAddressService {
    pub fn new(network: Network, secrets: Arc<dyn SecretStore>) -> Result<Self, WalletError> {
        if network.family() != NetworkFamily::Shimmer {
            return Err(WalletError::Unsupported {
                network,
                what: "shimmer address service".into(),
            });
        }
        Ok(Self { network, secrets })
    }
}

impl AddressService for ShimmerAddressService {
    fn network(&self) -> Network {
        self.network
    }

    fn derive_address(&self, mnemonic: &str) -> Result<AddressDetails, WalletError> {
        Ok(AddressDetails::derive(mnemonic, self.network)?)
    }

    fn parse_address(&self, text: &str) -> Result<Address, WalletError> {
        Ok(from_bech32(text, self.network)?)
    }

    fn secrets(&self) -> &Arc<dyn SecretStore> {
        &self.secrets
    }
}

/// The address service for `network`.
pub fn address_service(
    network: Network,
    secrets: Arc<dyn SecretStore>,
) -> Arc<dyn AddressService> {
    match network.family() {
        NetworkFamily::Legacy => Arc::new(LegacyAddressService { network, secrets }),
        NetworkFamily::Shimmer => Arc::new(ShimmerAddressService { network, secrets }),
    }
}
