use std::fmt;

use tangle_store::{StoreError, WorkflowType};
use tangle_transactions::TransactionError;
use tangle_types::{BlockId, Network};
use tangle_wallet::WalletError;
use thiserror::Error;

/// How a failure affects the transaction that hit it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Bad amounts, insufficient funds, malformed request. Never retried.
    Construction,
    /// Another transaction holds an address. Not a failure; try later.
    ReservationConflict,
    /// Node unreachable, block rejected, inclusion timeout. Retried up to
    /// the retry budget.
    Network,
    /// Assembly bug. Fatal; retrying would reproduce it.
    ProtocolInvariant,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Construction => "construction",
            Self::ReservationConflict => "reservation_conflict",
            Self::Network => "network",
            Self::ProtocolInvariant => "protocol_invariant",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::ReservationConflict)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid request: {0}")]
    Request(String),

    #[error("no output builder registered for {0}")]
    UnknownWorkflow(WorkflowType),

    #[error("network {0} is not configured")]
    NetworkNotConfigured(Network),

    #[error("addresses of {0} are reserved by another transaction")]
    ReservationConflict(String),

    #[error("block {0} conflicts with the ledger")]
    Conflicting(BlockId),

    #[error("trigger queue is closed")]
    QueueClosed,

    #[error("config error: {0}")]
    Config(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn transaction_class(e: &TransactionError) -> ErrorClass {
    if e.is_protocol_invariant() {
        ErrorClass::ProtocolInvariant
    } else {
        ErrorClass::Construction
    }
}

impl EngineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Transaction(e) => transaction_class(e),
            Self::Wallet(WalletError::Transaction(e)) => transaction_class(e),
            Self::Wallet(WalletError::Store(StoreError::NotFound(_))) => ErrorClass::Construction,
            Self::Wallet(WalletError::Store(_)) => ErrorClass::Network,
            Self::Wallet(e) if e.is_network() => ErrorClass::Network,
            Self::Wallet(_) => ErrorClass::Construction,
            // An address without a stored mnemonic cannot be fixed by retrying.
            Self::Store(StoreError::NotFound(_)) => ErrorClass::Construction,
            Self::Store(_) => ErrorClass::Network,
            Self::Conflicting(_) => ErrorClass::Network,
            Self::ReservationConflict(_) => ErrorClass::ReservationConflict,
            Self::Request(_)
            | Self::UnknownWorkflow(_)
            | Self::NetworkNotConfigured(_)
            | Self::QueueClosed
            | Self::Config(_)
            | Self::Metrics(_)
            | Self::Io(_) => ErrorClass::Construction,
        }
    }
}

impl From<tangle_store_lmdb::LmdbError> for EngineError {
    fn from(e: tangle_store_lmdb::LmdbError) -> Self {
        EngineError::Store(e.into())
    }
}
