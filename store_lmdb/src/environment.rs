//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use tangle_store::{
    AddressReservation, ReservationStore, SchemaStore, SecretStore, StoreError, TransactionRecord,
    TransactionStore,
};

use crate::reservation::LmdbReservationStore;
use crate::schema::LmdbSchemaStore;
use crate::transaction::LmdbTransactionStore;
use crate::LmdbError;

pub const TRANSACTIONS_DB: &str = "transactions";
pub const RESERVATIONS_DB: &str = "reservations";
pub const META_DB: &str = "meta";

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Wraps the LMDB environment and one store per database.
///
/// Implements every store trait by delegation so it can be handed to the
/// engine as a single `Arc<dyn EngineStore>`.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    transactions: LmdbTransactionStore,
    reservations: LmdbReservationStore,
    schema: LmdbSchemaStore,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the directory is owned by this process; nothing else maps
        // the same files with different options.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };
        let env = Arc::new(env);

        let mut wtxn = env.write_txn()?;
        let transactions_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some(TRANSACTIONS_DB))?;
        let reservations_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some(RESERVATIONS_DB))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            transactions: LmdbTransactionStore {
                env: env.clone(),
                transactions_db,
            },
            reservations: LmdbReservationStore {
                env: env.clone(),
                reservations_db,
            },
            schema: LmdbSchemaStore {
                env: env.clone(),
                meta_db,
            },
            env,
        })
    }

    /// Open with default sizing.
    pub fn open_default(path: &Path) -> Result<Self, LmdbError> {
        Self::open(path, 8, DEFAULT_MAP_SIZE)
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn transaction_store(&self) -> &LmdbTransactionStore {
        &self.transactions
    }

    pub fn reservation_store(&self) -> &LmdbReservationStore {
        &self.reservations
    }

    pub fn schema_store(&self) -> &LmdbSchemaStore {
        &self.schema
    }
}

impl TransactionStore for LmdbEnvironment {
    fn insert_transaction(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        self.transactions.insert_transaction(record)
    }

    fn get_transaction(&self, id: &str) -> Result<TransactionRecord, StoreError> {
        self.transactions.get_transaction(id)
    }

    fn update_transaction(
        &self,
        id: &str,
        update: &mut dyn FnMut(&mut TransactionRecord) -> bool,
    ) -> Result<TransactionRecord, StoreError> {
        self.transactions.update_transaction(id, update)
    }

    fn iter_transactions(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        self.transactions.iter_transactions()
    }

    fn transaction_count(&self) -> Result<u64, StoreError> {
        self.transactions.transaction_count()
    }
}

impl ReservationStore for LmdbEnvironment {
    fn get_reservation(&self, address: &str) -> Result<AddressReservation, StoreError> {
        self.reservations.get_reservation(address)
    }

    fn transact_reservations(
        &self,
        addresses: &[String],
        update: &mut dyn FnMut(&mut [AddressReservation]) -> bool,
    ) -> Result<bool, StoreError> {
        self.reservations.transact_reservations(addresses, update)
    }

    fn iter_reservations(&self) -> Result<Vec<AddressReservation>, StoreError> {
        self.reservations.iter_reservations()
    }
}

impl SecretStore for LmdbEnvironment {
    fn store_mnemonic(&self, address: &str, mnemonic: &str) -> Result<(), StoreError> {
        self.reservations.store_mnemonic(address, mnemonic)
    }

    fn get_mnemonic(&self, address: &str) -> Result<String, StoreError> {
        self.reservations.get_mnemonic(address)
    }
}

impl SchemaStore for LmdbEnvironment {
    fn schema_version(&self) -> Result<u32, StoreError> {
        self.schema.schema_version()
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.schema.set_schema_version(version)
    }
}
