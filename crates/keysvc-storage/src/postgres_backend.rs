//! PostgreSQL document store.
//!
//! Every [`Collection`] maps to a table `"<database>"."<collection>"` with an
//! `id TEXT PRIMARY KEY` and a `document JSONB` column. Upserts are a single
//! `INSERT … ON CONFLICT (id) DO UPDATE`, which is atomic per row.
//!
//! There is no pool: every operation opens its own [`PgConnection`], runs one
//! statement, and closes the connection before returning, on success and on
//! failure alike.

use sqlx::{Connection, PgConnection};
use tracing::debug;

use crate::{Collection, DocumentStore, StorageError};

/// A document store backed by PostgreSQL.
///
/// # Examples
///
/// ```no_run
/// # use keysvc_storage::{Collection, PostgresBackend};
/// # #[tokio::main]
/// # async fn main() {
/// let hooks = Collection::new("keys", "hooks_keys").unwrap();
/// let backend = PostgresBackend::connect("postgres://localhost/keys", &[hooks])
///     .await
///     .unwrap();
/// # }
/// ```
#[derive(Clone)]
pub struct PostgresBackend {
    url: String,
}

impl std::fmt::Debug for PostgresBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBackend")
            .field("url", &"[redacted]")
            .finish()
    }
}

impl PostgresBackend {
    /// Verify connectivity and create the schema and table for every
    /// collection the service will use.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the connection or migration fails.
    pub async fn connect(database_url: &str, collections: &[Collection]) -> Result<Self, StorageError> {
        let backend = Self {
            url: database_url.to_owned(),
        };

        let mut conn = backend.open().await?;
        let mut result = Ok(());
        for collection in collections {
            result = migrate(&mut conn, collection).await;
            if result.is_err() {
                break;
            }
        }
        release(conn).await;
        result?;

        Ok(backend)
    }

    async fn open(&self) -> Result<PgConnection, StorageError> {
        PgConnection::connect(&self.url)
            .await
            .map_err(|e| StorageError::Open {
                location: "[redacted]".to_owned(),
                reason: e.to_string(),
            })
    }
}

async fn migrate(conn: &mut PgConnection, collection: &Collection) -> Result<(), StorageError> {
    let open_err = |e: sqlx::Error| StorageError::Open {
        location: collection.to_string(),
        reason: format!("migration failed: {e}"),
    };

    sqlx::query(&format!(
        "CREATE SCHEMA IF NOT EXISTS \"{}\"",
        collection.database()
    ))
    .execute(&mut *conn)
    .await
    .map_err(open_err)?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (\
            id       TEXT  PRIMARY KEY, \
            document JSONB NOT NULL\
        )",
        table(collection)
    ))
    .execute(&mut *conn)
    .await
    .map_err(open_err)?;

    Ok(())
}

/// Close a connection, logging rather than surfacing a failed goodbye.
async fn release(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        debug!(error = %e, "postgres connection close failed");
    }
}

/// Quoted table identifier. Names are validated by [`Collection::new`].
fn table(collection: &Collection) -> String {
    format!(
        "\"{}\".\"{}\"",
        collection.database(),
        collection.collection()
    )
}

#[async_trait::async_trait]
impl DocumentStore for PostgresBackend {
    async fn upsert(
        &self,
        collection: &Collection,
        id: &str,
        document: &[u8],
    ) -> Result<(), StorageError> {
        let write_err = |reason: String| StorageError::Write {
            collection: collection.to_string(),
            id: id.to_owned(),
            reason,
        };
        let body = std::str::from_utf8(document).map_err(|e| write_err(e.to_string()))?;

        let mut conn = self.open().await?;
        let result = sqlx::query(&format!(
            "INSERT INTO {} (id, document) VALUES ($1, $2::jsonb) \
             ON CONFLICT (id) DO UPDATE SET document = EXCLUDED.document",
            table(collection)
        ))
        .bind(id)
        .bind(body)
        .execute(&mut conn)
        .await;
        release(conn).await;

        result.map(|_| ()).map_err(|e| write_err(e.to_string()))
    }

    async fn find(
        &self,
        collection: &Collection,
        id: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let mut conn = self.open().await?;
        let result: Result<Option<(String,)>, sqlx::Error> = sqlx::query_as(&format!(
            "SELECT document::text FROM {} WHERE id = $1",
            table(collection)
        ))
        .bind(id)
        .fetch_optional(&mut conn)
        .await;
        release(conn).await;

        let row = result.map_err(|e| StorageError::Read {
            collection: collection.to_string(),
            id: id.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(row.map(|(doc,)| doc.into_bytes()))
    }
}
