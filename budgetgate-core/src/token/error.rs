//! Token store errors.

use thiserror::Error;

/// Errors from token store operations.
///
/// A missing, consumed or expired token is not an error: lookups report it
/// as `Ok(None)`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenStoreError {
    /// The store is full; the write was refused.
    #[error("token store capacity of {max_entries} entries exceeded")]
    CapacityExceeded {
        /// Configured maximum number of live entries
        max_entries: usize,
    },

    /// The request could not be serialized for storage.
    #[error("failed to serialize token payload: {details}")]
    Serialization {
        /// Serializer error message
        details: String,
    },

    /// A stored payload could not be deserialized.
    #[error("stored token payload is corrupt: {details}")]
    CorruptPayload {
        /// Deserializer error message
        details: String,
    },
}
