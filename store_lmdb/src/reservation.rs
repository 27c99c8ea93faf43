//! LMDB implementation of ReservationStore and SecretStore.
//!
//! Key: address text. Value: bincode-encoded `AddressReservation`. The
//! mnemonic lives in the same record, so storing a secret creates the
//! reservation row for its address.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};

use tangle_store::{AddressReservation, ReservationStore, SecretStore, StoreError};

use crate::LmdbError;

pub struct LmdbReservationStore {
    pub(crate) env: Arc<Env>,
    pub(crate) reservations_db: Database<Bytes, Bytes>,
}

impl LmdbReservationStore {
    fn read(&self, txn: &RoTxn, address: &str) -> Result<AddressReservation, LmdbError> {
        let bytes = self
            .reservations_db
            .get(txn, address.as_bytes())?
            .ok_or_else(|| LmdbError::NotFound(format!("reservation for '{}'", address)))?;
        Ok(bincode::deserialize(bytes)?)
    }
}

impl ReservationStore for LmdbReservationStore {
    fn get_reservation(&self, address: &str) -> Result<AddressReservation, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.read(&rtxn, address)?)
    }

    fn transact_reservations(
        &self,
        addresses: &[String],
        update: &mut dyn FnMut(&mut [AddressReservation]) -> bool,
    ) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut records = addresses
            .iter()
            .map(|address| self.read(&wtxn, address))
            .collect::<Result<Vec<_>, _>>()?;

        if !update(&mut records) {
            // Dropping the transaction aborts it.
            return Ok(false);
        }

        for record in &records {
            let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
            self.reservations_db
                .put(&mut wtxn, record.address.as_bytes(), &bytes)
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }

    fn iter_reservations(&self) -> Result<Vec<AddressReservation>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut records = Vec::new();
        for item in self.reservations_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (_, bytes) = item.map_err(LmdbError::from)?;
            records.push(bincode::deserialize(bytes).map_err(LmdbError::from)?);
        }
        Ok(records)
    }
}

impl SecretStore for LmdbReservationStore {
    fn store_mnemonic(&self, address: &str, mnemonic: &str) -> Result<(), StoreError> {
        let record = AddressReservation::new(address, mnemonic);
        let bytes = bincode::serialize(&record).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .reservations_db
            .get(&wtxn, address.as_bytes())
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(LmdbError::Duplicate(format!("mnemonic for '{}'", address)).into());
        }
        self.reservations_db
            .put(&mut wtxn, address.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_mnemonic(&self, address: &str) -> Result<String, StoreError> {
        Ok(self.get_reservation(address)?.mnemonic)
    }
}
