//! Startup checks on an existing store.
//!
//! Every stored record is decoded once, so a store written by a broken
//! build is caught before the engine takes any reservation.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};
use serde::de::DeserializeOwned;

use tangle_store::{AddressReservation, TransactionRecord};

use crate::environment::{RESERVATIONS_DB, TRANSACTIONS_DB};
use crate::LmdbError;

#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub transactions: u64,
    pub reservations: u64,
    /// Addresses still locked at startup, with their holder. Each lock is
    /// released when its holder finishes or is abandoned.
    pub locked: Vec<(String, String)>,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn check_integrity(env: &Arc<Env>) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let rtxn = env.read_txn()?;

    report.transactions = scan::<TransactionRecord>(env, &rtxn, TRANSACTIONS_DB, &mut report.errors, |_| {})?;
    let mut locked = Vec::new();
    report.reservations = scan::<AddressReservation>(env, &rtxn, RESERVATIONS_DB, &mut report.errors, |r| {
        if let Some(holder) = &r.locked_by {
            locked.push((r.address.clone(), holder.clone()));
        }
    })?;
    report.locked = locked;

    if !report.locked.is_empty() {
        tracing::info!(count = report.locked.len(), "reservations held from a previous run");
    }
    Ok(report)
}

/// Decode every value of `name`, recording failures instead of stopping.
fn scan<T: DeserializeOwned>(
    env: &Env,
    rtxn: &RoTxn,
    name: &str,
    errors: &mut Vec<String>,
    mut visit: impl FnMut(&T),
) -> Result<u64, LmdbError> {
    let db: Database<Bytes, Bytes> = match env.open_database(rtxn, Some(name))? {
        Some(db) => db,
        None => {
            errors.push(format!("database '{name}' is missing"));
            return Ok(0);
        }
    };
    let mut count = 0;
    for item in db.iter(rtxn)? {
        let (key, bytes) = item?;
        match bincode::deserialize::<T>(bytes) {
            Ok(value) => visit(&value),
            Err(e) => errors.push(format!(
                "{name}: entry '{}' does not decode: {e}",
                String::from_utf8_lossy(key)
            )),
        }
        count += 1;
    }
    Ok(count)
}

/// A directory without `data.mdb` is only acceptable when the directory
/// does not exist yet.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if path.exists() && !path.join("data.mdb").exists() {
        return Err(format!(
            "{} exists but holds no store (data.mdb missing)",
            path.display()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use tangle_store::{ReservationStore, SecretStore};

    #[test]
    fn missing_directory_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(&dir.path().join("not-yet")).is_ok());
        assert!(check_data_dir(dir.path()).is_err());
    }

    #[test]
    fn held_locks_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 1 << 20).unwrap();
        env.store_mnemonic("rms1a", "words").unwrap();
        env.store_mnemonic("rms1b", "other words").unwrap();
        let addresses = vec!["rms1a".to_string()];
        env.transact_reservations(&addresses, &mut |rs| {
            rs[0].locked_by = Some("tx-9".into());
            true
        })
        .unwrap();

        let report = check_integrity(env.env()).unwrap();
        assert!(report.is_healthy());
        assert_eq!(report.transactions, 0);
        assert_eq!(report.reservations, 2);
        assert_eq!(report.locked, vec![("rms1a".to_string(), "tx-9".to_string())]);
    }

    #[test]
    fn undecodable_entry_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 1 << 20).unwrap();
        let raw = env.env();
        let mut wtxn = raw.write_txn().unwrap();
        let db: Database<Bytes, Bytes> = raw
            .open_database(&wtxn, Some(TRANSACTIONS_DB))
            .unwrap()
            .unwrap();
        db.put(&mut wtxn, b"tx-1", &[0xff]).unwrap();
        wtxn.commit().unwrap();

        let report = check_integrity(raw).unwrap();
        assert!(!report.is_healthy());
        assert_eq!(report.transactions, 1);
        assert!(report.errors[0].contains("tx-1"));
    }
}
