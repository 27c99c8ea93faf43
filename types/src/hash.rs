//! Ledger identifiers: transaction, block, output, alias and NFT ids.
//!
//! All ids render as `0x`-prefixed lowercase hex, the format node APIs use.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Decode `0x`-prefixed (or bare) hex into a fixed-size array.
pub fn decode_hex_fixed<const N: usize>(s: &str) -> Result<[u8; N], TypesError> {
    let raw = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(raw).map_err(|e| TypesError::InvalidHex(e.to_string()))?;
    bytes.try_into().map_err(|v: Vec<u8>| TypesError::InvalidLength {
        expected: N,
        got: v.len(),
    })
}

macro_rules! id32 {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);
            pub const LENGTH: usize = 32;

            pub fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{}\u{2026})", stringify!($name), hex::encode(&self.0[..4]))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_hex_fixed::<32>(s).map(Self)
            }
        }
    };
}

id32!(
    /// Blake2b-256 of an encoded transaction payload.
    TransactionId
);
id32!(
    /// Identifier of a submitted block (legacy networks call it a message id).
    BlockId
);
id32!(
    /// Identifier of an alias output chain.
    AliasId
);
id32!(
    /// Identifier of an NFT output chain.
    NftId
);

fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// A transaction id plus the index of the output inside that transaction.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputId {
    pub transaction_id: TransactionId,
    pub index: u16,
}

impl OutputId {
    pub const LENGTH: usize = 34;

    pub fn new(transaction_id: TransactionId, index: u16) -> Self {
        Self {
            transaction_id,
            index,
        }
    }

    pub fn to_bytes(&self) -> [u8; 34] {
        let mut out = [0u8; 34];
        out[..32].copy_from_slice(self.transaction_id.as_bytes());
        out[32..].copy_from_slice(&self.index.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; 34]) -> Self {
        let mut tx = [0u8; 32];
        tx.copy_from_slice(&bytes[..32]);
        let index = u16::from_le_bytes([bytes[32], bytes[33]]);
        Self::new(TransactionId::new(tx), index)
    }

    /// Bare hex without the `0x` prefix, as legacy node routes expect.
    pub fn to_bare_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl fmt::Debug for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputId({})", self)
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_bare_hex())
    }
}

impl FromStr for OutputId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex_fixed::<34>(s).map(|b| Self::from_bytes(&b))
    }
}

impl AliasId {
    /// Id of an alias created by the output `output_id`.
    pub fn from_output_id(output_id: &OutputId) -> Self {
        Self(blake2b_256(&output_id.to_bytes()))
    }

    /// Resolve the zero placeholder a freshly minted alias output carries.
    pub fn or_from_output_id(self, output_id: &OutputId) -> Self {
        if self.is_zero() {
            Self::from_output_id(output_id)
        } else {
            self
        }
    }
}

impl NftId {
    /// Id of an NFT created by the output `output_id`.
    pub fn from_output_id(output_id: &OutputId) -> Self {
        Self(blake2b_256(&output_id.to_bytes()))
    }

    pub fn or_from_output_id(self, output_id: &OutputId) -> Self {
        if self.is_zero() {
            Self::from_output_id(output_id)
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_id_display_parse_roundtrip() {
        let id = OutputId::new(TransactionId::new([7u8; 32]), 3);
        let text = id.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 2 + 68);
        assert_eq!(text.parse::<OutputId>().unwrap(), id);
    }

    #[test]
    fn output_id_index_is_little_endian() {
        let id = OutputId::new(TransactionId::ZERO, 0x0102);
        let bytes = id.to_bytes();
        assert_eq!(bytes[32], 0x02);
        assert_eq!(bytes[33], 0x01);
    }

    #[test]
    fn bare_hex_is_accepted() {
        let id = BlockId::new([0xAB; 32]);
        let bare = hex::encode(id.as_bytes());
        assert_eq!(bare.parse::<BlockId>().unwrap(), id);
    }

    #[test]
    fn wrong_length_rejected() {
        assert_eq!(
            "0xabcd".parse::<BlockId>(),
            Err(TypesError::InvalidLength {
                expected: 32,
                got: 2
            })
        );
    }

    #[test]
    fn zero_alias_id_resolves_from_output() {
        let output_id = OutputId::new(TransactionId::new([1u8; 32]), 0);
        let resolved = AliasId::ZERO.or_from_output_id(&output_id);
        assert!(!resolved.is_zero());
        assert_eq!(resolved, AliasId::from_output_id(&output_id));

        let fixed = AliasId::new([9u8; 32]);
        assert_eq!(fixed.or_from_output_id(&output_id), fixed);
    }
}
