//! Secret store boundary: mnemonics keyed by address.

use crate::StoreError;

/// Mnemonics are kept in the reservation record of their address, so
/// storing one creates that record with no lock held.
pub trait SecretStore: Send + Sync {
    /// Fails with `Duplicate` if the address already has a mnemonic.
    fn store_mnemonic(&self, address: &str, mnemonic: &str) -> Result<(), StoreError>;

    fn get_mnemonic(&self, address: &str) -> Result<String, StoreError>;

    fn has_mnemonic(&self, address: &str) -> Result<bool, StoreError> {
        match self.get_mnemonic(address) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

