//! Static service configuration handed to the core once at startup.
//!
//! The [`ServiceDirectory`] maps each internal caller to its service key and
//! address. [`StoreLocations`] says which collection holds each kind of
//! record. Both are plain values; nothing here reads the environment.

use std::collections::BTreeMap;
use std::fmt;

use keysvc_storage::{Collection, StorageError};

use crate::principal::PrincipalType;

/// An internal service that may hold a service key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceName {
    Hooks,
    Orchestrator,
    User,
    Company,
    Billing,
    Permission,
}

impl ServiceName {
    pub const ALL: [Self; 6] = [
        Self::Hooks,
        Self::Orchestrator,
        Self::User,
        Self::Company,
        Self::Billing,
        Self::Permission,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hooks => "hooks",
            Self::Orchestrator => "orchestrator",
            Self::User => "user",
            Self::Company => "company",
            Self::Billing => "billing",
            Self::Permission => "permission",
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One service's key and network address.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub key: String,
    pub address: String,
}

impl ServiceEndpoint {
    #[must_use]
    pub fn new(key: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            address: address.into(),
        }
    }
}

impl fmt::Debug for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEndpoint")
            .field("key", &if self.key.is_empty() { "" } else { "[REDACTED]" })
            .field("address", &self.address)
            .finish()
    }
}

/// Service name to `{key, address}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDirectory {
    entries: BTreeMap<ServiceName, ServiceEndpoint>,
}

impl ServiceDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: ServiceName, endpoint: ServiceEndpoint) -> Self {
        self.insert(name, endpoint);
        self
    }

    pub fn insert(&mut self, name: ServiceName, endpoint: ServiceEndpoint) {
        self.entries.insert(name, endpoint);
    }

    #[must_use]
    pub fn get(&self, name: ServiceName) -> Option<&ServiceEndpoint> {
        self.entries.get(&name)
    }

    /// The configured key for `name`, or `""` when the service is absent.
    #[must_use]
    pub fn key(&self, name: ServiceName) -> &str {
        self.entries.get(&name).map_or("", |e| e.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ServiceName, &ServiceEndpoint)> {
        self.entries.iter().map(|(name, endpoint)| (*name, endpoint))
    }
}

/// Which collection holds each kind of record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocations {
    pub user: Collection,
    pub hooks: Collection,
    pub agent: Collection,
    pub bundle: Collection,
}

impl StoreLocations {
    /// `keys.user_keys`, `keys.hooks_keys`, `keys.agent_keys`, `keys.keys`.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the names are valid constants.
    pub fn defaults() -> Result<Self, StorageError> {
        Ok(Self {
            user: Collection::new("keys", "user_keys")?,
            hooks: Collection::new("keys", "hooks_keys")?,
            agent: Collection::new("keys", "agent_keys")?,
            bundle: Collection::new("keys", "keys")?,
        })
    }

    /// The single-pair collection for a principal type.
    #[must_use]
    pub fn for_principal(&self, principal_type: PrincipalType) -> &Collection {
        match principal_type {
            PrincipalType::User => &self.user,
            PrincipalType::Hooks => &self.hooks,
            PrincipalType::Agent => &self.agent,
        }
    }

    /// Every collection, for backends that prepare tables up front.
    #[must_use]
    pub fn all(&self) -> [Collection; 4] {
        [
            self.user.clone(),
            self.hooks.clone(),
            self.agent.clone(),
            self.bundle.clone(),
        ]
    }
}

/// Everything the core needs from configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub services: ServiceDirectory,
    pub locations: StoreLocations,
}
