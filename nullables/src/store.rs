//! Nullable store: thread-safe in-memory storage for testing.

use std::collections::BTreeMap;
use std::sync::Mutex;

use tangle_store::{
    AddressReservation, ReservationStore, SchemaStore, SecretStore, StoreError, TransactionRecord,
    TransactionStore,
};

/// An in-memory implementation of every store trait.
///
/// Each record map sits behind its own mutex, held for the whole of a
/// read-modify-write, which gives the same atomicity as one LMDB write
/// transaction.
#[derive(Default)]
pub struct NullStore {
    transactions: Mutex<BTreeMap<String, TransactionRecord>>,
    reservations: Mutex<BTreeMap<String, AddressReservation>>,
    schema_version: Mutex<u32>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for NullStore {
    fn insert_transaction(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        let mut map = self.transactions.lock().unwrap();
        if map.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id.clone()));
        }
        map.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn get_transaction(&self, id: &str) -> Result<TransactionRecord, StoreError> {
        self.transactions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn update_transaction(
        &self,
        id: &str,
        update: &mut dyn FnMut(&mut TransactionRecord) -> bool,
    ) -> Result<TransactionRecord, StoreError> {
        let mut map = self.transactions.lock().unwrap();
        let stored = map
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let mut record = stored.clone();
        if update(&mut record) {
            *stored = record.clone();
        }
        Ok(record)
    }

    fn iter_transactions(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        Ok(self.transactions.lock().unwrap().values().cloned().collect())
    }
}

impl ReservationStore for NullStore {
    fn get_reservation(&self, address: &str) -> Result<AddressReservation, StoreError> {
        self.reservations
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(address.to_string()))
    }

    fn transact_reservations(
        &self,
        addresses: &[String],
        update: &mut dyn FnMut(&mut [AddressReservation]) -> bool,
    ) -> Result<bool, StoreError> {
        let mut map = self.reservations.lock().unwrap();
        let mut records = addresses
            .iter()
            .map(|a| {
                map.get(a)
                    .cloned()
                    .ok_or_else(|| StoreError::NotFound(a.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if !update(&mut records) {
            return Ok(false);
        }
        for record in records {
            map.insert(record.address.clone(), record);
        }
        Ok(true)
    }

    fn iter_reservations(&self) -> Result<Vec<AddressReservation>, StoreError> {
        Ok(self.reservations.lock().unwrap().values().cloned().collect())
    }
}

impl SecretStore for NullStore {
    fn store_mnemonic(&self, address: &str, mnemonic: &str) -> Result<(), StoreError> {
        let mut map = self.reservations.lock().unwrap();
        if map.contains_key(address) {
            return Err(StoreError::Duplicate(address.to_string()));
        }
        map.insert(address.to_string(), AddressReservation::new(address, mnemonic));
        Ok(())
    }

    fn get_mnemonic(&self, address: &str) -> Result<String, StoreError> {
        Ok(self.get_reservation(address)?.mnemonic)
    }
}

impl SchemaStore for NullStore {
    fn schema_version(&self) -> Result<u32, StoreError> {
        Ok(*self.schema_version.lock().unwrap())
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        *self.schema_version.lock().unwrap() = version;
        Ok(())
    }
}
