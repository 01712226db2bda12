//! Document storage abstraction for `keysvc`.
//!
//! This crate defines the [`DocumentStore`] trait, a collection-scoped
//! document interface that knows nothing about principals, keys, or
//! freshness. `keysvc-core` serializes credential records and hands the
//! bytes to a store; the store only guarantees that a single upsert is an
//! atomic replace-or-insert keyed by `(collection, id)`.
//!
//! Three implementations are provided:
//!
//! - [`RocksDbBackend`]: embedded persistent store (feature `rocksdb-backend`)
//! - [`PostgresBackend`]: one table per collection (feature `postgres-backend`)
//! - [`MemoryBackend`]: in-memory, for tests and local development

mod collection;
mod error;
mod memory;
#[cfg(feature = "postgres-backend")]
mod postgres_backend;
#[cfg(feature = "rocksdb-backend")]
mod rocksdb_backend;

pub use collection::Collection;
pub use error::StorageError;
pub use memory::MemoryBackend;
#[cfg(feature = "postgres-backend")]
pub use postgres_backend::PostgresBackend;
#[cfg(feature = "rocksdb-backend")]
pub use rocksdb_backend::RocksDbBackend;

/// A pluggable document store.
///
/// Documents are opaque byte arrays (JSON in practice) addressed by a
/// [`Collection`] and a document id. Ids are matched exactly; any
/// normalization happens above this layer.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Insert the document, or replace it entirely if `id` already exists in
    /// the collection. Must be atomic: concurrent upserts for the same id
    /// never leave a half-written document behind.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the underlying backend fails.
    async fn upsert(
        &self,
        collection: &Collection,
        id: &str,
        document: &[u8],
    ) -> Result<(), StorageError>;

    /// Fetch a document by exact id.
    ///
    /// Returns `Ok(None)` if no document with that id exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn find(&self, collection: &Collection, id: &str)
    -> Result<Option<Vec<u8>>, StorageError>;
}
