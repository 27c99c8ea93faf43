//! LMDB implementation of TransactionStore.
//!
//! Key: record id (UTF-8). Value: bincode-encoded `TransactionRecord`.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use tangle_store::{StoreError, TransactionRecord, TransactionStore};

use crate::LmdbError;

pub struct LmdbTransactionStore {
    pub(crate) env: Arc<Env>,
    pub(crate) transactions_db: Database<Bytes, Bytes>,
}

fn decode(bytes: &[u8]) -> Result<TransactionRecord, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

impl TransactionStore for LmdbTransactionStore {
    fn insert_transaction(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .transactions_db
            .get(&wtxn, record.id.as_bytes())
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(LmdbError::Duplicate(format!("transaction '{}'", record.id)).into());
        }
        self.transactions_db
            .put(&mut wtxn, record.id.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_transaction(&self, id: &str) -> Result<TransactionRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let bytes = self
            .transactions_db
            .get(&rtxn, id.as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("transaction '{}'", id)))?;
        Ok(decode(bytes)?)
    }

    fn update_transaction(
        &self,
        id: &str,
        update: &mut dyn FnMut(&mut TransactionRecord) -> bool,
    ) -> Result<TransactionRecord, StoreError> {
        // LMDB allows one writer at a time, so the read below cannot be
        // invalidated before the commit.
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut record = {
            let bytes = self
                .transactions_db
                .get(&wtxn, id.as_bytes())
                .map_err(LmdbError::from)?
                .ok_or_else(|| LmdbError::NotFound(format!("transaction '{}'", id)))?;
            decode(bytes)?
        };
        if update(&mut record) {
            let bytes = bincode::serialize(&record).map_err(LmdbError::from)?;
            self.transactions_db
                .put(&mut wtxn, id.as_bytes(), &bytes)
                .map_err(LmdbError::from)?;
            wtxn.commit().map_err(LmdbError::from)?;
        }
        Ok(record)
    }

    fn iter_transactions(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut records = Vec::new();
        for item in self.transactions_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (_, bytes) = item.map_err(LmdbError::from)?;
            records.push(decode(bytes)?);
        }
        Ok(records)
    }

    fn transaction_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.transactions_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}
