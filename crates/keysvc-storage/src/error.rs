//! Storage error types.
//!
//! Every variant names the collection and document id involved, never the
//! document body.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to open or connect to the storage backend.
    #[error("failed to open storage at '{location}': {reason}")]
    Open { location: String, reason: String },

    /// Failed to read a document.
    #[error("failed to read '{id}' from '{collection}': {reason}")]
    Read {
        collection: String,
        id: String,
        reason: String,
    },

    /// Failed to write a document.
    #[error("failed to write '{id}' to '{collection}': {reason}")]
    Write {
        collection: String,
        id: String,
        reason: String,
    },

    /// A database or collection name is not usable as a storage location.
    #[error("invalid collection name '{name}': {reason}")]
    InvalidCollection { name: String, reason: String },

    /// A document could not be encoded or decoded.
    #[error("invalid encoding: {reason}")]
    InvalidEncoding { reason: String },
}
