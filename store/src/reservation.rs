//! Per-address reservation records ("mnemonic lock").

use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tangle_types::OutputId;

/// Reservation state of one address.
///
/// `locked_by` names the single transaction allowed to spend the address's
/// outputs right now. It is only ever changed inside
/// [`ReservationStore::transact_reservations`].
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressReservation {
    pub address: String,
    pub mnemonic: String,
    pub locked_by: Option<String>,
    pub consumed_output_ids: Vec<OutputId>,
    pub consumed_nft_output_ids: Vec<OutputId>,
    pub consumed_alias_output_ids: Vec<OutputId>,
}

impl AddressReservation {
    pub fn new(address: impl Into<String>, mnemonic: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            mnemonic: mnemonic.into(),
            ..Default::default()
        }
    }

    /// Whether `transaction_id` may take (or already holds) this address.
    pub fn is_available_to(&self, transaction_id: &str) -> bool {
        match &self.locked_by {
            None => true,
            Some(holder) => holder == transaction_id,
        }
    }

    pub fn clear_consumed(&mut self) {
        self.consumed_output_ids.clear();
        self.consumed_nft_output_ids.clear();
        self.consumed_alias_output_ids.clear();
    }
}

impl fmt::Debug for AddressReservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressReservation")
            .field("address", &self.address)
            .field("mnemonic", &"<redacted>")
            .field("locked_by", &self.locked_by)
            .field("consumed_output_ids", &self.consumed_output_ids)
            .field("consumed_nft_output_ids", &self.consumed_nft_output_ids)
            .field("consumed_alias_output_ids", &self.consumed_alias_output_ids)
            .finish()
    }
}

/// Storage of reservation records.
pub trait ReservationStore: Send + Sync {
    fn get_reservation(&self, address: &str) -> Result<AddressReservation, StoreError>;

    /// Read every record for `addresses` and hand them to `update` inside one
    /// write transaction, in the order given. All records are written back
    /// if `update` returns `true`; nothing is written otherwise. Missing
    /// records fail the whole call with `NotFound`.
    fn transact_reservations(
        &self,
        addresses: &[String],
        update: &mut dyn FnMut(&mut [AddressReservation]) -> bool,
    ) -> Result<bool, StoreError>;

    fn iter_reservations(&self) -> Result<Vec<AddressReservation>, StoreError>;

    /// Addresses currently held by some transaction.
    fn locked_addresses(&self) -> Result<Vec<(String, String)>, StoreError> {
        Ok(self
            .iter_reservations()?
            .into_iter()
            .filter_map(|r| r.locked_by.map(|holder| (r.address, holder)))
            .collect())
    }
}
