use thiserror::Error;

/// Failures every backend reports the same way.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("store backend failed: {0}")]
    Backend(String),

    #[error("record could not be encoded or decoded: {0}")]
    Serialization(String),

    #[error("stored data is corrupt: {0}")]
    Corruption(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
