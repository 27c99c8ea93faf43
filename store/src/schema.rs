//! Schema version bookkeeping.

use crate::StoreError;

/// The one piece of state that belongs to no record: which layout the
/// stored records use. A fresh store reports version 0.
pub trait SchemaStore: Send + Sync {
    fn schema_version(&self) -> Result<u32, StoreError>;

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;
}

/// Decode a stored version value.
pub fn decode_schema_version(bytes: &[u8]) -> Result<u32, StoreError> {
    let arr: [u8; 4] = bytes
        .try_into()
        .map_err(|_| StoreError::Corruption(format!("schema version of {} bytes", bytes.len())))?;
    Ok(u32::from_le_bytes(arr))
}
