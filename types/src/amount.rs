//! Native token ids and balances.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::address::Address;
use crate::hash::{decode_hex_fixed, AliasId};
use crate::TypesError;

/// Most distinct native tokens a single output may carry.
pub const MAX_NATIVE_TOKENS: usize = 64;

/// Simple token scheme kind, the only scheme foundries use.
pub const SIMPLE_TOKEN_SCHEME_KIND: u8 = 0;

/// 38-byte native token id: the controlling alias address (33 bytes),
/// the foundry serial number (u32 LE) and the token scheme kind.
///
/// A token id equals the id of the foundry that minted it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(pub [u8; 38]);

impl TokenId {
    pub const LENGTH: usize = 38;

    pub fn from_foundry(alias_id: AliasId, serial_number: u32, token_scheme_kind: u8) -> Self {
        let mut out = [0u8; 38];
        out[..33].copy_from_slice(&Address::Alias(alias_id).to_packed());
        out[33..37].copy_from_slice(&serial_number.to_le_bytes());
        out[37] = token_scheme_kind;
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 38] {
        &self.0
    }

    pub fn serial_number(&self) -> u32 {
        u32::from_le_bytes([self.0[33], self.0[34], self.0[35], self.0[36]])
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for TokenId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex_fixed::<38>(s).map(Self)
    }
}

// Hex text keeps token ids usable as JSON map keys.
impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Native token balances keyed by token id. Zero balances are never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeTokens(BTreeMap<TokenId, u128>);

impl NativeTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, id: &TokenId) -> u128 {
        self.0.get(id).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TokenId, &u128)> {
        self.0.iter()
    }

    pub fn add(&mut self, id: TokenId, amount: u128) -> Result<(), TypesError> {
        if amount == 0 {
            return Ok(());
        }
        let entry = self.0.entry(id).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| TypesError::TokenOverflow(id.to_string()))?;
        Ok(())
    }

    pub fn add_all(&mut self, other: &NativeTokens) -> Result<(), TypesError> {
        for (id, amount) in other.iter() {
            self.add(*id, *amount)?;
        }
        Ok(())
    }

    /// Remove `amount` of `id`. Returns `false` without changing anything
    /// when the balance is too small.
    pub fn checked_sub(&mut self, id: &TokenId, amount: u128) -> bool {
        if amount == 0 {
            return true;
        }
        match self.0.get_mut(id) {
            Some(held) if *held >= amount => {
                *held -= amount;
                if *held == 0 {
                    self.0.remove(id);
                }
                true
            }
            _ => false,
        }
    }
}

impl FromIterator<(TokenId, u128)> for NativeTokens {
    fn from_iter<I: IntoIterator<Item = (TokenId, u128)>>(iter: I) -> Self {
        let mut tokens = Self::new();
        for (id, amount) in iter {
            // Saturate rather than panic on absurd inputs.
            if tokens.add(id, amount).is_err() {
                tokens.0.insert(id, u128::MAX);
            }
        }
        tokens
    }
}
