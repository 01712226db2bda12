//! `RocksDB` document store: the embedded persistent default.
//!
//! Wraps the `rocksdb` crate behind the [`DocumentStore`] trait. Documents are
//! stored under `database/collection/id`; a single `put` is atomic, which is
//! all an upsert needs. All operations are dispatched to a blocking thread via
//! [`tokio::task::spawn_blocking`] since `RocksDB` is a synchronous C++ library.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rocksdb::{DBWithThreadMode, MultiThreaded, Options};
use tracing::debug;

use crate::{Collection, DocumentStore, StorageError};

type Db = DBWithThreadMode<MultiThreaded>;

/// A document store backed by `RocksDB`.
///
/// # Examples
///
/// ```no_run
/// # use keysvc_storage::RocksDbBackend;
/// let backend = RocksDbBackend::open("/var/lib/keysvc/data").unwrap();
/// ```
#[derive(Clone)]
pub struct RocksDbBackend {
    db: Arc<Db>,
    path: PathBuf,
}

impl std::fmt::Debug for RocksDbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksDbBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RocksDbBackend {
    /// Open a `RocksDB` database at the given path, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if `RocksDB` fails to open or create the
    /// database at the specified path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = Db::open(&opts, path).map_err(|e| StorageError::Open {
            location: path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), "opened RocksDB document store");

        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }
}

#[async_trait::async_trait]
impl DocumentStore for RocksDbBackend {
    async fn upsert(
        &self,
        collection: &Collection,
        id: &str,
        document: &[u8],
    ) -> Result<(), StorageError> {
        let db = Arc::clone(&self.db);
        let key = collection.document_key(id);
        let value = document.to_vec();
        let write_err = |reason: String| StorageError::Write {
            collection: collection.to_string(),
            id: id.to_owned(),
            reason,
        };
        tokio::task::spawn_blocking(move || db.put(key.as_bytes(), &value))
            .await
            .map_err(|e| write_err(format!("blocking task panicked: {e}")))?
            .map_err(|e| write_err(e.to_string()))
    }

    async fn find(
        &self,
        collection: &Collection,
        id: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let db = Arc::clone(&self.db);
        let key = collection.document_key(id);
        let read_err = |reason: String| StorageError::Read {
            collection: collection.to_string(),
            id: id.to_owned(),
            reason,
        };
        tokio::task::spawn_blocking(move || db.get(key.as_bytes()))
            .await
            .map_err(|e| read_err(format!("blocking task panicked: {e}")))?
            .map_err(|e| read_err(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = Collection::new("keys", "hooks_keys").unwrap();
        {
            let store = RocksDbBackend::open(dir.path()).unwrap();
            store.upsert(&hooks, "c1", b"doc").await.unwrap();
        }
        let store = RocksDbBackend::open(dir.path()).unwrap();
        assert_eq!(store.find(&hooks, "c1").await.unwrap(), Some(b"doc".to_vec()));
    }

    #[tokio::test]
    async fn collections_share_one_database_without_colliding() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksDbBackend::open(dir.path()).unwrap();
        let agents = Collection::new("keys", "agent_keys").unwrap();
        let hooks = Collection::new("keys", "hooks_keys").unwrap();
        store.upsert(&agents, "c1", b"agent").await.unwrap();
        store.upsert(&hooks, "c1", b"hook").await.unwrap();
        store.upsert(&hooks, "c1", b"hook2").await.unwrap();
        assert_eq!(store.find(&agents, "c1").await.unwrap(), Some(b"agent".to_vec()));
        assert_eq!(store.find(&hooks, "c1").await.unwrap(), Some(b"hook2".to_vec()));
        assert_eq!(store.find(&hooks, "c2").await.unwrap(), None);
    }
}
