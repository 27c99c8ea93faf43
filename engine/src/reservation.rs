//! Output reservation manager ("mnemonic lock").
//!
//! The reservation record of an address is the only mutual-exclusion
//! primitive of the engine. It is changed only inside one store
//! transaction, so several engine instances can share a store.

use std::sync::Arc;

use tangle_store::{ReservationStore, StoreError};
use tangle_transactions::Output;
use tangle_types::OutputId;

use crate::EngineError;

#[derive(Clone)]
pub struct ReservationManager {
    store: Arc<dyn ReservationStore>,
}

impl ReservationManager {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    /// Lock every address for `transaction_id`, all or nothing.
    ///
    /// Succeeds when each address is free or already held by the same
    /// transaction (a retry). On success the consumed-output lists start
    /// empty. On failure nothing is written.
    pub fn try_reserve(
        &self,
        transaction_id: &str,
        addresses: &[String],
    ) -> Result<bool, EngineError> {
        let reserved = self.store.transact_reservations(addresses, &mut |records| {
            if !records.iter().all(|r| r.is_available_to(transaction_id)) {
                return false;
            }
            for record in records.iter_mut() {
                record.locked_by = Some(transaction_id.to_string());
                record.clear_consumed();
            }
            true
        })?;
        if reserved {
            tracing::debug!(tx = %transaction_id, ?addresses, "reserved addresses");
        } else {
            tracing::debug!(tx = %transaction_id, ?addresses, "addresses held by another transaction");
        }
        Ok(reserved)
    }

    /// Clear the lock and consumed lists of `address` if `holder` still
    /// holds it. Returns whether anything was released.
    pub fn release(&self, address: &str, holder: &str) -> Result<bool, EngineError> {
        let released = self
            .store
            .transact_reservations(&[address.to_string()], &mut |records| {
                let record = &mut records[0];
                if record.locked_by.as_deref() != Some(holder) {
                    return false;
                }
                record.locked_by = None;
                record.clear_consumed();
                true
            });
        match released {
            Ok(released) => {
                if released {
                    tracing::debug!(tx = %holder, address = %address, "released address");
                }
                Ok(released)
            }
            // Nothing to release for an address that was never stored.
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn release_all(&self, addresses: &[String], holder: &str) -> Result<(), EngineError> {
        for address in addresses {
            self.release(address, holder)?;
        }
        Ok(())
    }

    /// Record the outputs `holder` is spending from `address`, by kind.
    pub fn record_consumed<'a>(
        &self,
        address: &str,
        holder: &str,
        consumed: impl IntoIterator<Item = (&'a OutputId, &'a Output)>,
    ) -> Result<bool, EngineError> {
        let consumed: Vec<(OutputId, &Output)> =
            consumed.into_iter().map(|(id, o)| (*id, o)).collect();
        Ok(self
            .store
            .transact_reservations(&[address.to_string()], &mut |records| {
                let record = &mut records[0];
                if record.locked_by.as_deref() != Some(holder) {
                    return false;
                }
                record.clear_consumed();
                for (id, output) in &consumed {
                    match output {
                        Output::Nft(_) => record.consumed_nft_output_ids.push(*id),
                        Output::Alias(_) => record.consumed_alias_output_ids.push(*id),
                        Output::Basic(_) | Output::Foundry(_) => {
                            record.consumed_output_ids.push(*id)
                        }
                    }
                }
                true
            })?)
    }

    /// Addresses currently locked, with their holders.
    pub fn locked(&self) -> Result<Vec<(String, String)>, EngineError> {
        Ok(self.store.locked_addresses()?)
    }
}
