//! Schema stamping and upgrades.
//!
//! The stored version only moves forward. Opening a store written by a
//! newer build is refused rather than risk misreading its records.

use tangle_store::SchemaStore;

use crate::LmdbError;

/// Layout written by this build: transaction records, reservations with
/// their mnemonics, and the schema stamp itself.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

pub struct Migrator;

impl Migrator {
    /// Bring the store to [`CURRENT_SCHEMA_VERSION`], one step at a time.
    /// Returns the version the store had before.
    pub fn run(store: &dyn SchemaStore) -> Result<u32, LmdbError> {
        let found = store.schema_version()?;
        if found > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::SchemaTooNew {
                found,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        if found == CURRENT_SCHEMA_VERSION {
            tracing::debug!(version = found, "store schema current");
            return Ok(found);
        }

        for from in found..CURRENT_SCHEMA_VERSION {
            step(from)?;
            store.set_schema_version(from + 1)?;
            tracing::info!(from, to = from + 1, "store schema upgraded");
        }
        Ok(found)
    }
}

fn step(from: u32) -> Result<(), LmdbError> {
    match from {
        // A fresh store: the databases were created on open.
        0 => Ok(()),
        other => Err(LmdbError::NoMigration(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    fn env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 1 << 20).unwrap();
        (dir, env)
    }

    #[test]
    fn fresh_store_is_stamped_once() {
        let (_dir, env) = env();
        assert_eq!(env.schema_version().unwrap(), 0);
        assert_eq!(Migrator::run(&env).unwrap(), 0);
        assert_eq!(env.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
        assert_eq!(Migrator::run(&env).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn newer_store_is_refused() {
        let (_dir, env) = env();
        env.set_schema_version(CURRENT_SCHEMA_VERSION + 1).unwrap();
        assert!(matches!(
            Migrator::run(&env),
            Err(LmdbError::SchemaTooNew { found, .. }) if found == CURRENT_SCHEMA_VERSION + 1
        ));
    }

    #[test]
    fn missing_step_is_reported() {
        assert!(matches!(step(CURRENT_SCHEMA_VERSION), Err(LmdbError::NoMigration(_))));
    }
}
