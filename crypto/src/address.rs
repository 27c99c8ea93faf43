//! Bech32 address text.
//!
//! The payload is the packed address (kind byte + 32-byte body) and the
//! human-readable part names the network, e.g. `smr1q...` or `atoi1q...`.

use bech32::{Bech32, Hrp};
use tangle_types::{Address, Network, TypesError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("bech32: {0}")]
    Bech32(String),

    #[error("address is for {got}, expected {expected}")]
    WrongNetwork { expected: String, got: String },

    #[error(transparent)]
    Payload(#[from] TypesError),
}

pub fn to_bech32(address: &Address, network: Network) -> Result<String, AddressError> {
    let hrp = Hrp::parse(network.bech32_hrp()).map_err(|e| AddressError::Bech32(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, &address.to_packed()).map_err(|e| AddressError::Bech32(e.to_string()))
}

/// Decode bech32 text, returning the network its prefix names.
pub fn parse_bech32(text: &str) -> Result<(Network, Address), AddressError> {
    let (hrp, data) = bech32::decode(text).map_err(|e| AddressError::Bech32(e.to_string()))?;
    let network: Network = hrp.to_string().to_ascii_lowercase().parse()?;
    Ok((network, Address::from_packed(&data)?))
}

/// Decode bech32 text that must belong to `network`.
pub fn from_bech32(text: &str, network: Network) -> Result<Address, AddressError> {
    let (got, address) = parse_bech32(text)?;
    if got != network {
        return Err(AddressError::WrongNetwork {
            expected: network.to_string(),
            got: got.to_string(),
        });
    }
    Ok(address)
}
