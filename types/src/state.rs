//! Inclusion states reported by nodes for submitted blocks.

use serde::{Deserialize, Serialize};

/// Ledger inclusion state of a transaction-carrying block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InclusionState {
    /// Not yet referenced by a milestone.
    Pending,
    /// Referenced and applied to the ledger.
    Included,
    /// Referenced but rejected (double spend or invalid).
    Conflicting,
    /// Referenced block carries no transaction.
    NoTransaction,
}

impl InclusionState {
    /// Whether the node has made a final decision about the block.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Parse the `ledgerInclusionState` string nodes return.
    pub fn from_node_str(s: &str) -> Option<Self> {
        match s {
            "included" => Some(Self::Included),
            "conflicting" => Some(Self::Conflicting),
            "noTransaction" => Some(Self::NoTransaction),
            _ => None,
        }
    }
}
