//! Network identifiers.
//!
//! The engine talks to two ledger families. The legacy family (`iota`,
//! `atoi`) only moves plain value; the Shimmer family (`smr`, `rms`) adds
//! native tokens, aliases, foundries and NFTs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// A concrete ledger network the engine can transact on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Legacy mainnet.
    Iota,
    /// Legacy testnet.
    Atoi,
    /// Shimmer mainnet.
    Smr,
    /// Shimmer testnet.
    Rms,
}

/// The wire/protocol family a network belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkFamily {
    Legacy,
    Shimmer,
}

impl Network {
    pub const ALL: [Network; 4] = [Network::Iota, Network::Atoi, Network::Smr, Network::Rms];

    pub fn family(&self) -> NetworkFamily {
        match self {
            Self::Iota | Self::Atoi => NetworkFamily::Legacy,
            Self::Smr | Self::Rms => NetworkFamily::Shimmer,
        }
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self, Self::Atoi | Self::Rms)
    }

    /// Human-readable part used for bech32 address text.
    pub fn bech32_hrp(&self) -> &'static str {
        match self {
            Self::Iota => "iota",
            Self::Atoi => "atoi",
            Self::Smr => "smr",
            Self::Rms => "rms",
        }
    }

    /// SLIP-44 coin type used in the key derivation path.
    pub fn coin_type(&self) -> u32 {
        match self.family() {
            NetworkFamily::Legacy => 4218,
            NetworkFamily::Shimmer => 4219,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.bech32_hrp()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "iota" => Ok(Self::Iota),
            "atoi" => Ok(Self::Atoi),
            "smr" => Ok(Self::Smr),
            "rms" => Ok(Self::Rms),
            other => Err(TypesError::UnknownNetwork(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families() {
        assert_eq!(Network::Iota.family(), NetworkFamily::Legacy);
        assert_eq!(Network::Atoi.family(), NetworkFamily::Legacy);
        assert_eq!(Network::Smr.family(), NetworkFamily::Shimmer);
        assert_eq!(Network::Rms.family(), NetworkFamily::Shimmer);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("SMR".parse::<Network>().unwrap(), Network::Smr);
        assert!("btc".parse::<Network>().is_err());
    }

    #[test]
    fn coin_types_differ_per_family() {
        assert_ne!(Network::Iota.coin_type(), Network::Smr.coin_type());
        assert_eq!(Network::Smr.coin_type(), Network::Rms.coin_type());
    }
}
