//! Server configuration for `keysvc`.
//!
//! Everything is read from the environment once at startup. The core
//! receives the result as an immutable [`ServiceConfig`] and never looks at
//! the environment itself.

use std::net::SocketAddr;

use anyhow::Context;
use keysvc_core::directory::{
    ServiceConfig, ServiceDirectory, ServiceEndpoint, ServiceName, StoreLocations,
};
use keysvc_storage::Collection;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
    3000,
);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend type.
    pub storage_backend: StorageBackendType,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Service keys, addresses, and store locations handed to the core.
    pub service: ServiceConfig,
}

/// Supported storage backend types.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// `RocksDB` persistent storage.
    RocksDb { path: String },
    /// PostgreSQL, one table per collection.
    Postgres { url: String },
}

impl std::fmt::Debug for StorageBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("Memory"),
            Self::RocksDb { path } => f.debug_struct("RocksDb").field("path", path).finish(),
            Self::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("url", &"[REDACTED]")
                .finish(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails if a bind address or port does not parse, or a store location
    /// is not a valid collection name.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Environment variables:
    /// - `KEYSVC_BIND_ADDR`: full bind address (default: `127.0.0.1:3000`)
    /// - `HTTP_PORT`: port to bind on `0.0.0.0` when `KEYSVC_BIND_ADDR` is unset
    /// - `KEYSVC_STORAGE`: `memory`, `rocksdb`, or `postgres` (default: `memory`)
    /// - `KEYSVC_STORAGE_PATH`: `RocksDB` directory (default: `./data`)
    /// - `DATABASE_URL`: PostgreSQL connection string
    /// - `KEYSVC_LOG_LEVEL`: log filter (default: `info`)
    /// - `<SVC>_SERVICE_KEY` / `<SVC>_SERVICE_ADDRESS` for hooks, user,
    ///   company, billing, and permission; `ORCHESTRATOR_KEY` /
    ///   `ORCHESTRATOR_ADDRESS` for the orchestrator
    /// - `<TYPE>_KEYS_DATABASE` / `<TYPE>_KEYS_COLLECTION` for user, hooks,
    ///   agent, and bundle records
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind_addr = if let Some(addr) = lookup("KEYSVC_BIND_ADDR") {
            addr.parse()
                .with_context(|| format!("invalid KEYSVC_BIND_ADDR '{addr}'"))?
        } else if let Some(port) = lookup("HTTP_PORT") {
            let port: u16 = port
                .parse()
                .with_context(|| format!("invalid HTTP_PORT '{port}'"))?;
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            DEFAULT_BIND_ADDR
        };

        let storage_path = lookup("KEYSVC_STORAGE_PATH").unwrap_or_else(|| "./data".to_owned());

        let storage_backend = match lookup("KEYSVC_STORAGE")
            .unwrap_or_else(|| "memory".to_owned())
            .to_lowercase()
            .as_str()
        {
            "rocksdb" => StorageBackendType::RocksDb { path: storage_path },
            "postgres" | "postgresql" => StorageBackendType::Postgres {
                url: lookup("DATABASE_URL")
                    .unwrap_or_else(|| "postgres://localhost/keys".to_owned()),
            },
            "memory" => StorageBackendType::Memory,
            other => anyhow::bail!("unknown KEYSVC_STORAGE '{other}'"),
        };

        let log_level = lookup("KEYSVC_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let mut services = ServiceDirectory::new();
        for name in ServiceName::ALL {
            let (key_var, address_var) = service_vars(name);
            services.insert(
                name,
                ServiceEndpoint::new(
                    lookup(&key_var).unwrap_or_default(),
                    lookup(&address_var)
                        .unwrap_or_else(|| format!("https://{}.keysvc.internal", name.as_str())),
                ),
            );
        }

        let location = |prefix: &str, default_collection: &str| -> anyhow::Result<Collection> {
            let database =
                lookup(&format!("{prefix}_KEYS_DATABASE")).unwrap_or_else(|| "keys".to_owned());
            let collection = lookup(&format!("{prefix}_KEYS_COLLECTION"))
                .unwrap_or_else(|| default_collection.to_owned());
            Collection::new(database, collection)
                .with_context(|| format!("invalid {prefix}_KEYS_* location"))
        };
        let locations = StoreLocations {
            user: location("USER", "user_keys")?,
            hooks: location("HOOKS", "hooks_keys")?,
            agent: location("AGENT", "agent_keys")?,
            bundle: location("BUNDLE", "keys")?,
        };

        Ok(Self {
            bind_addr,
            storage_backend,
            log_level,
            service: ServiceConfig {
                services,
                locations,
            },
        })
    }
}

fn service_vars(name: ServiceName) -> (String, String) {
    match name {
        ServiceName::Orchestrator => ("ORCHESTRATOR_KEY".to_owned(), "ORCHESTRATOR_ADDRESS".to_owned()),
        other => {
            let upper = other.as_str().to_uppercase();
            (format!("{upper}_SERVICE_KEY"), format!("{upper}_SERVICE_ADDRESS"))
        }
    }
}
