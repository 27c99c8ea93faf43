//! Unlocks proving the right to consume each input.
//!
//! The first input owned by an Ed25519 address gets a signature unlock;
//! every later input owned by the same address gets a reference unlock
//! pointing at that signature. Inputs owned by an alias or NFT point at the
//! index of the input that holds that alias or NFT. This holds when owners
//! are interleaved as well.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tangle_crypto::{ed25519_address, sign_essence, AddressDetails};
use tangle_types::{Address, PublicKey, Signature};

use crate::essence::InputSelection;
use crate::error::TransactionError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unlock {
    Signature {
        public_key: PublicKey,
        signature: Signature,
    },
    Reference(u16),
    Alias(u16),
    Nft(u16),
}

impl Unlock {
    pub fn kind(&self) -> u8 {
        match self {
            Self::Signature { .. } => 0,
            Self::Reference(_) => 1,
            Self::Alias(_) => 2,
            Self::Nft(_) => 3,
        }
    }

    /// Index of the unlock this one points at, if it is not a signature.
    pub fn target(&self) -> Option<u16> {
        match self {
            Self::Signature { .. } => None,
            Self::Reference(i) | Self::Alias(i) | Self::Nft(i) => Some(*i),
        }
    }
}

/// Build one unlock per input of `selection`, signing `essence_hash` with
/// the key of each Ed25519 owner the first time it appears.
pub fn create_unlocks(
    selection: &InputSelection,
    essence_hash: &[u8; 32],
    signers: &[&AddressDetails],
) -> Result<Vec<Unlock>, TransactionError> {
    let mut unlocked: HashMap<Address, u16> = HashMap::new();
    let mut unlocks = Vec::with_capacity(selection.len());

    for (index, (output_id, output)) in selection.iter().enumerate() {
        let position = index as u16;
        let owner = output.owner().ok_or_else(|| TransactionError::UnlockOrder {
            index,
            owner: "<none>".into(),
        })?;

        let unlock = match (unlocked.get(&owner), owner) {
            (Some(&at), Address::Ed25519(_)) => Unlock::Reference(at),
            (Some(&at), Address::Alias(_)) => Unlock::Alias(at),
            (Some(&at), Address::Nft(_)) => Unlock::Nft(at),
            (None, Address::Ed25519(ed)) => {
                let signer = signers
                    .iter()
                    .find(|d| ed25519_address(&d.keypair().public) == ed)
                    .ok_or_else(|| TransactionError::MissingSigner {
                        index,
                        owner: format!("{:?}", owner),
                    })?;
                unlocked.insert(owner, position);
                Unlock::Signature {
                    public_key: signer.keypair().public,
                    signature: sign_essence(essence_hash, &signer.keypair().private),
                }
            }
            (None, _) => {
                return Err(TransactionError::UnlockOrder {
                    index,
                    owner: format!("{:?}", owner),
                })
            }
        };
        unlocks.push(unlock);

        // An alias or NFT input unlocks whatever it owns further down.
        if let Some(chain) = output.chain_address(output_id) {
            unlocked.entry(chain).or_insert(position);
        }
    }

    Ok(unlocks)
}
