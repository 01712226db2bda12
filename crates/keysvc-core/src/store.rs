//! Principal records on top of a [`DocumentStore`].
//!
//! Records are serialized to JSON and written under the principal id with
//! non-alphanumerics stripped. Bundle reads normalize the id the same way and
//! apply the freshness window. Single-pair reads and matching use the id as
//! given, so an id that changes under normalization never finds its own
//! single-pair record.

use std::sync::Arc;

use keysvc_storage::{Collection, DocumentStore, StorageError};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use subtle::ConstantTimeEq;

use crate::directory::StoreLocations;
use crate::freshness::{Clock, is_fresh};
use crate::principal::{
    BundleRecord, CredentialBundle, KeyPair, PrincipalRecord, PrincipalType,
    normalize_principal_id,
};

#[derive(Serialize, Deserialize)]
struct PairDocument {
    principal_id: String,
    generated: i64,
    key: String,
    secret: String,
}

#[derive(Serialize, Deserialize)]
struct BundleDocument {
    user_id: String,
    generated: i64,
    keys: BundleKeys,
}

#[derive(Serialize, Deserialize)]
struct BundleKeys {
    user_service: String,
    hooks_service: String,
    company_service: String,
    billing_service: String,
    permissions_service: String,
    #[serde(default)]
    orchestrator: String,
}

/// Typed access to principal and bundle records.
#[derive(Clone)]
pub struct PrincipalStore {
    documents: Arc<dyn DocumentStore>,
    locations: StoreLocations,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PrincipalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalStore")
            .field("locations", &self.locations)
            .finish_non_exhaustive()
    }
}

impl PrincipalStore {
    #[must_use]
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        locations: StoreLocations,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            documents,
            locations,
            clock,
        }
    }

    /// Replace or insert the user's bundle, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if encoding or the write fails.
    pub async fn upsert_bundle(
        &self,
        principal_id: &str,
        bundle: &CredentialBundle,
    ) -> Result<BundleRecord, StorageError> {
        let user_id = normalize_principal_id(principal_id);
        let generated = self.clock.now();
        let document = BundleDocument {
            user_id: user_id.clone(),
            generated,
            keys: BundleKeys {
                user_service: bundle.user_service.clone(),
                hooks_service: bundle.hooks_service.clone(),
                company_service: bundle.company_service.clone(),
                billing_service: bundle.billing_service.clone(),
                permissions_service: bundle.permissions_service.clone(),
                orchestrator: String::new(),
            },
        };
        self.documents
            .upsert(&self.locations.bundle, &user_id, &encode(&document)?)
            .await?;

        Ok(BundleRecord {
            user_id,
            bundle: bundle.clone(),
            generated_at: generated,
        })
    }

    /// Fetch the user's bundle if it exists and is fresh.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the read fails or the document is corrupt.
    pub async fn fetch_bundle(
        &self,
        principal_id: &str,
    ) -> Result<Option<BundleRecord>, StorageError> {
        let user_id = normalize_principal_id(principal_id);
        let Some(raw) = self.documents.find(&self.locations.bundle, &user_id).await? else {
            return Ok(None);
        };
        let document: BundleDocument = decode(&self.locations.bundle, &raw)?;

        if !is_fresh(document.generated, self.clock.now()) {
            tracing::debug!(user_id = %user_id, generated = document.generated, "bundle outside freshness window");
            return Ok(None);
        }

        Ok(Some(BundleRecord {
            user_id: document.user_id,
            bundle: CredentialBundle {
                user_service: document.keys.user_service,
                hooks_service: document.keys.hooks_service,
                company_service: document.keys.company_service,
                billing_service: document.keys.billing_service,
                permissions_service: document.keys.permissions_service,
            },
            generated_at: document.generated,
        }))
    }

    /// Replace or insert the principal's single key pair.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if encoding or the write fails.
    pub async fn upsert_principal_key(
        &self,
        principal_type: PrincipalType,
        principal_id: &str,
        pair: &KeyPair,
    ) -> Result<PrincipalRecord, StorageError> {
        let principal_id = normalize_principal_id(principal_id);
        let generated = self.clock.now();
        let document = PairDocument {
            principal_id: principal_id.clone(),
            generated,
            key: pair.key.clone(),
            secret: pair.secret.clone(),
        };
        self.documents
            .upsert(
                self.locations.for_principal(principal_type),
                &principal_id,
                &encode(&document)?,
            )
            .await?;

        Ok(PrincipalRecord {
            principal_type,
            principal_id,
            key: pair.key.clone(),
            secret: pair.secret.clone(),
            generated_at: generated,
        })
    }

    /// Fetch the record stored under exactly `principal_id`.
    ///
    /// Ids containing NUL are never stored (writes normalize them away), so
    /// they miss without reaching the backend.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the read fails or the document is corrupt.
    pub async fn fetch_principal_key(
        &self,
        principal_type: PrincipalType,
        principal_id: &str,
    ) -> Result<Option<PrincipalRecord>, StorageError> {
        if principal_id.contains('\0') {
            return Ok(None);
        }
        let collection = self.locations.for_principal(principal_type);
        let Some(raw) = self.documents.find(collection, principal_id).await? else {
            return Ok(None);
        };
        let document: PairDocument = decode(collection, &raw)?;
        if document.principal_id != principal_id {
            return Ok(None);
        }

        Ok(Some(PrincipalRecord {
            principal_type,
            principal_id: document.principal_id,
            key: document.key,
            secret: document.secret,
            generated_at: document.generated,
        }))
    }

    /// Number of records whose id, key, and secret all equal the given
    /// values exactly. At most one record exists per id, so this is 0 or 1.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the read fails or the document is corrupt.
    pub async fn count_matching(
        &self,
        principal_type: PrincipalType,
        principal_id: &str,
        key: &str,
        secret: &str,
    ) -> Result<u64, StorageError> {
        let Some(record) = self.fetch_principal_key(principal_type, principal_id).await? else {
            return Ok(0);
        };
        let key_ok = record.key.as_bytes().ct_eq(key.as_bytes());
        let secret_ok = record.secret.as_bytes().ct_eq(secret.as_bytes());
        Ok(u64::from(bool::from(key_ok & secret_ok)))
    }
}

fn encode<T: Serialize>(document: &T) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(document).map_err(|e| StorageError::InvalidEncoding {
        reason: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(collection: &Collection, raw: &[u8]) -> Result<T, StorageError> {
    serde_json::from_slice(raw).map_err(|e| StorageError::InvalidEncoding {
        reason: format!("corrupt document in '{collection}': {e}"),
    })
}
