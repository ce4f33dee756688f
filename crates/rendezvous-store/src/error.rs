//! Error types for rendezvous storage.

use rendezvous_core::DomainError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A key in an index column family has an unexpected shape.
    #[error("corrupt index entry in {cf}")]
    CorruptIndex {
        /// The column family holding the entry.
        cf: &'static str,
    },
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}
