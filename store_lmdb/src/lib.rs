//! LMDB storage backend for the transaction engine.
//!
//! Implements every trait from `tangle-store` using the `heed` LMDB
//! bindings. Each record type maps to one database within a single
//! environment; read-modify-write operations run inside one write
//! transaction.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod migration;
pub mod reservation;
pub mod schema;
pub mod transaction;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
