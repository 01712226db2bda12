//! In-memory document store for testing.
//!
//! Stores every document in a `BTreeMap` behind a `RwLock`, keyed by
//! `database/collection/id`. Not persistent; all data is lost when the
//! process exits.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{Collection, DocumentStore, StorageError};

/// An in-memory document store backed by a `BTreeMap`.
///
/// Clones share the same underlying map, so a test can keep a handle to the
/// store it passed into the service and inspect it afterwards.
///
/// # Examples
///
/// ```
/// # use keysvc_storage::{Collection, DocumentStore, MemoryBackend};
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryBackend::new();
/// let hooks = Collection::new("keys", "hooks_keys").unwrap();
/// store.upsert(&hooks, "c1", b"{}").await.unwrap();
/// assert_eq!(store.find(&hooks, "c1").await.unwrap(), Some(b"{}".to_vec()));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    data: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryBackend {
    async fn upsert(
        &self,
        collection: &Collection,
        id: &str,
        document: &[u8],
    ) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        data.insert(collection.document_key(id), document.to_vec());
        Ok(())
    }

    async fn find(
        &self,
        collection: &Collection,
        id: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let data = self.data.read().await;
        Ok(data.get(&collection.document_key(id)).cloned())
    }
}
