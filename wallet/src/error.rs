use tangle_crypto::{AddressError, DetailsError, MnemonicError};
use tangle_store::StoreError;
use tangle_transactions::TransactionError;
use tangle_types::{BlockId, Network, OutputId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("node RPC error: {0}")]
    Node(String),

    #[error("node rejected block: {0}")]
    Rejected(String),

    #[error("no healthy endpoint for {network} after {attempts} attempts")]
    NoHealthyEndpoint { network: Network, attempts: u32 },

    #[error("block {block_id} not included after {attempts} polls")]
    InclusionTimeout { block_id: BlockId, attempts: u32 },

    #[error("output {0} is already spent")]
    InputSpent(OutputId),

    #[error("output {0} not found")]
    OutputNotFound(OutputId),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("{what} is not supported on {network}")]
    Unsupported { network: Network, what: String },

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WalletError {
    /// Failures of the node or the path to it. The transaction itself may
    /// still be fine, so these are worth retrying.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Node(_)
                | Self::Rejected(_)
                | Self::NoHealthyEndpoint { .. }
                | Self::InclusionTimeout { .. }
                | Self::InputSpent(_)
                | Self::OutputNotFound(_)
        )
    }
}

impl From<AddressError> for WalletError {
    fn from(e: AddressError) -> Self {
        WalletError::InvalidAddress(e.to_string())
    }
}

impl From<MnemonicError> for WalletError {
    fn from(e: MnemonicError) -> Self {
        WalletError::Key(e.to_string())
    }
}

impl From<DetailsError> for WalletError {
    fn from(e: DetailsError) -> Self {
        match e {
            DetailsError::Mnemonic(e) => e.into(),
            DetailsError::Address(e) => e.into(),
        }
    }
}
