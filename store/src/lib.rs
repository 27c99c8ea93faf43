//! Record types and storage traits for the transaction engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.

pub mod error;
pub mod reservation;
pub mod schema;
pub mod secret;
pub mod transaction;

pub use error::StoreError;
pub use reservation::{AddressReservation, ReservationStore};
pub use schema::{decode_schema_version, SchemaStore};
pub use secret::SecretStore;
pub use transaction::{
    ExpirationRequest, RequestPayload, TransactionRecord, TransactionStore, WalletReference,
    WorkflowDetails, WorkflowType,
};

/// Everything the engine needs from one backend.
pub trait EngineStore: TransactionStore + ReservationStore + SecretStore + SchemaStore {}

impl<T> EngineStore for T where T: TransactionStore + ReservationStore + SecretStore + SchemaStore {}
