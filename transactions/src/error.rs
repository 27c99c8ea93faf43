use tangle_types::{Network, TypesError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("invalid native token {token_id}: needed {needed}, available {available}")]
    InvalidNativeToken {
        token_id: String,
        needed: u128,
        available: u128,
    },

    #[error("amount {amount} below minimum storage deposit {minimum}")]
    BelowMinimumDeposit { amount: u64, minimum: u64 },

    #[error("{what} is not supported on {network}")]
    UnsupportedOnNetwork { network: Network, what: String },

    #[error("malformed output: {0}")]
    Malformed(String),

    #[error("too many native tokens: {0}")]
    TooManyNativeTokens(usize),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("no signer for input {index} owned by {owner}")]
    MissingSigner { index: usize, owner: String },

    #[error("input {index} is owned by {owner}, which is not unlocked by an earlier input")]
    UnlockOrder { index: usize, owner: String },

    #[error("unbalanced transaction: inputs {inputs}, outputs {outputs}")]
    Unbalanced { inputs: u64, outputs: u64 },

    #[error("inputs and outputs must not be empty")]
    Empty,

    #[error(transparent)]
    Types(#[from] TypesError),
}

impl TransactionError {
    /// Errors that can only come from a bug in transaction assembly rather
    /// than from the request. Retrying reproduces them.
    pub fn is_protocol_invariant(&self) -> bool {
        matches!(
            self,
            Self::MissingSigner { .. } | Self::UnlockOrder { .. } | Self::Unbalanced { .. }
        )
    }
}
