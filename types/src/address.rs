//! Ledger addresses.
//!
//! An address is either backed by an Ed25519 key (the Blake2b-256 hash of
//! the public key) or by a chain output that can own other outputs: an
//! alias or an NFT. Bech32 text encoding lives in `tangle-crypto`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::{AliasId, NftId};
use crate::TypesError;

/// Blake2b-256 digest of an Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ed25519Address(pub [u8; 32]);

impl Ed25519Address {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Ed25519Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Address(0x{})", hex::encode(self.0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Address {
    Ed25519(Ed25519Address),
    Alias(AliasId),
    Nft(NftId),
}

impl Address {
    pub const ED25519_KIND: u8 = 0;
    pub const ALIAS_KIND: u8 = 8;
    pub const NFT_KIND: u8 = 16;

    /// Serialized length: one kind byte plus the 32-byte body.
    pub const PACKED_LENGTH: usize = 33;

    pub fn kind(&self) -> u8 {
        match self {
            Self::Ed25519(_) => Self::ED25519_KIND,
            Self::Alias(_) => Self::ALIAS_KIND,
            Self::Nft(_) => Self::NFT_KIND,
        }
    }

    pub fn body(&self) -> &[u8; 32] {
        match self {
            Self::Ed25519(a) => a.as_bytes(),
            Self::Alias(id) => id.as_bytes(),
            Self::Nft(id) => id.as_bytes(),
        }
    }

    /// Kind byte followed by the body.
    pub fn to_packed(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        out[0] = self.kind();
        out[1..].copy_from_slice(self.body());
        out
    }

    pub fn from_packed(bytes: &[u8]) -> Result<Self, TypesError> {
        if bytes.len() != Self::PACKED_LENGTH {
            return Err(TypesError::InvalidLength {
                expected: Self::PACKED_LENGTH,
                got: bytes.len(),
            });
        }
        let mut body = [0u8; 32];
        body.copy_from_slice(&bytes[1..]);
        match bytes[0] {
            Self::ED25519_KIND => Ok(Self::Ed25519(Ed25519Address(body))),
            Self::ALIAS_KIND => Ok(Self::Alias(AliasId::new(body))),
            Self::NFT_KIND => Ok(Self::Nft(NftId::new(body))),
            other => Err(TypesError::InvalidAddress(format!("unknown kind {other}"))),
        }
    }

    pub fn is_ed25519(&self) -> bool {
        matches!(self, Self::Ed25519(_))
    }
}

impl From<Ed25519Address> for Address {
    fn from(a: Ed25519Address) -> Self {
        Self::Ed25519(a)
    }
}

impl From<AliasId> for Address {
    fn from(id: AliasId) -> Self {
        Self::Alias(id)
    }
}

impl From<NftId> for Address {
    fn from(id: NftId) -> Self {
        Self::Nft(id)
    }
}
