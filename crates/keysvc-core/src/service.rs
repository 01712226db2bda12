//! Create, get, and validate credentials.
//!
//! Every privileged operation runs its checks in the same order: a missing
//! service key, then a service key that is not allow-listed, then a missing
//! principal id. Only then is the generator or the store touched.

use std::sync::Arc;

use keysvc_storage::DocumentStore;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};

use crate::directory::ServiceConfig;
use crate::error::ServiceError;
use crate::freshness::{Clock, SystemClock};
use crate::gate::ServiceKeyGate;
use crate::generator::CredentialGenerator;
use crate::principal::{
    BundleRecord, PrincipalKey, PrincipalRecord, PrincipalType, normalize_principal_id,
};
use crate::store::PrincipalStore;

/// The credential issuance and validation engine.
#[derive(Debug, Clone)]
pub struct CredentialService {
    gate: ServiceKeyGate,
    generator: CredentialGenerator,
    store: PrincipalStore,
}

impl CredentialService {
    /// Build a service over `documents` using the OS random source and the
    /// system clock.
    #[must_use]
    pub fn new(config: ServiceConfig, documents: Arc<dyn DocumentStore>) -> Self {
        Self::with_parts(
            config,
            documents,
            CredentialGenerator::default(),
            Arc::new(SystemClock),
        )
    }

    /// Build a service with an explicit generator and clock.
    #[must_use]
    pub fn with_parts(
        config: ServiceConfig,
        documents: Arc<dyn DocumentStore>,
        generator: CredentialGenerator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let gate = ServiceKeyGate::from_directory(&config.services);
        let store = PrincipalStore::new(documents, config.locations, clock);
        Self {
            gate,
            generator,
            store,
        }
    }

    fn admit(
        &self,
        principal_type: PrincipalType,
        principal_id: &str,
        service_key: &str,
        operation: &'static str,
    ) -> Result<(), ServiceError> {
        if service_key.is_empty() {
            return Err(ServiceError::MissingServiceKey);
        }
        if !self.gate.authorize(service_key) {
            warn!(principal = %principal_type, operation, "rejected service key");
            return Err(ServiceError::InvalidServiceKey);
        }
        if principal_id.is_empty() {
            return Err(ServiceError::MissingIdentifier(principal_type));
        }
        Ok(())
    }

    /// Generate a new key pair for the principal, replacing any existing one.
    ///
    /// The returned record is the only place the secret is ever handed out.
    ///
    /// # Errors
    ///
    /// Input and authorization errors per the check ordering, or a system
    /// error if generation or the write fails.
    pub async fn create_key_pair(
        &self,
        principal_type: PrincipalType,
        principal_id: &str,
        service_key: &str,
    ) -> Result<PrincipalRecord, ServiceError> {
        self.admit(principal_type, principal_id, service_key, "create")?;
        if normalize_principal_id(principal_id).is_empty() {
            return Err(ServiceError::MissingIdentifier(principal_type));
        }

        let pair = self
            .generator
            .key_pair()
            .map_err(|e| system(principal_type, "create", e.into()))?;
        let record = self
            .store
            .upsert_principal_key(principal_type, principal_id, &pair)
            .await
            .map_err(|e| system(principal_type, "create", e.into()))?;

        info!(principal = %principal_type, principal_id = %record.principal_id, "issued key pair");
        Ok(record)
    }

    /// Read the principal's key. The secret is never returned.
    ///
    /// # Errors
    ///
    /// Input and authorization errors, [`ServiceError::NotFound`], or a
    /// system error.
    pub async fn get_key_pair(
        &self,
        principal_type: PrincipalType,
        principal_id: &str,
        service_key: &str,
    ) -> Result<PrincipalKey, ServiceError> {
        self.admit(principal_type, principal_id, service_key, "get")?;

        self.store
            .fetch_principal_key(principal_type, principal_id)
            .await
            .map_err(|e| system(principal_type, "get", e.into()))?
            .map(PrincipalKey::from)
            .ok_or(ServiceError::NotFound)
    }

    /// Whether `key` and `secret` match the principal's stored pair.
    ///
    /// # Errors
    ///
    /// Input and authorization errors, or a system error.
    pub async fn validate_key_pair(
        &self,
        principal_type: PrincipalType,
        principal_id: &str,
        service_key: &str,
        key: &str,
        secret: &str,
    ) -> Result<bool, ServiceError> {
        self.admit(principal_type, principal_id, service_key, "validate")?;

        let count = self
            .store
            .count_matching(principal_type, principal_id, key, secret)
            .await
            .map_err(|e| system(principal_type, "validate", e.into()))?;
        Ok(count >= 1)
    }

    /// Generate and store a fresh five-key bundle for the user.
    ///
    /// # Errors
    ///
    /// Input and authorization errors, or a system error. Nothing is written
    /// unless all five keys were generated.
    pub async fn create_bundle(
        &self,
        user_id: &str,
        service_key: &str,
    ) -> Result<BundleRecord, ServiceError> {
        self.admit(PrincipalType::User, user_id, service_key, "create_bundle")?;
        if normalize_principal_id(user_id).is_empty() {
            return Err(ServiceError::MissingIdentifier(PrincipalType::User));
        }

        let bundle = self
            .generator
            .bundle()
            .map_err(|e| system(PrincipalType::User, "create_bundle", e.into()))?;
        let record = self
            .store
            .upsert_bundle(user_id, &bundle)
            .await
            .map_err(|e| system(PrincipalType::User, "create_bundle", e.into()))?;

        info!(user_id = %record.user_id, "issued credential bundle");
        Ok(record)
    }

    /// Read the user's bundle if it exists and is fresh.
    ///
    /// # Errors
    ///
    /// Input and authorization errors, [`ServiceError::NotFound`] for an
    /// absent or stale bundle, or a system error.
    pub async fn get_bundle(
        &self,
        user_id: &str,
        service_key: &str,
    ) -> Result<BundleRecord, ServiceError> {
        self.admit(PrincipalType::User, user_id, service_key, "get_bundle")?;

        self.store
            .fetch_bundle(user_id)
            .await
            .map_err(|e| system(PrincipalType::User, "get_bundle", e.into()))?
            .ok_or(ServiceError::NotFound)
    }

    /// Whether `key` is one of the five keys in the user's fresh bundle.
    ///
    /// Takes no service key. An absent or stale bundle admits nothing.
    ///
    /// # Errors
    ///
    /// [`ServiceError::MissingIdentifier`], [`ServiceError::MissingKey`], or
    /// a system error.
    pub async fn validate_bundle_key(&self, user_id: &str, key: &str) -> Result<bool, ServiceError> {
        if user_id.is_empty() {
            return Err(ServiceError::MissingIdentifier(PrincipalType::User));
        }
        if key.is_empty() {
            return Err(ServiceError::MissingKey);
        }

        let Some(record) = self
            .store
            .fetch_bundle(user_id)
            .await
            .map_err(|e| system(PrincipalType::User, "validate_bundle", e.into()))?
        else {
            return Ok(false);
        };

        let mut matched = subtle::Choice::from(0);
        for field in record.bundle.fields() {
            matched |= field.as_bytes().ct_eq(key.as_bytes());
        }
        Ok(bool::from(matched))
    }
}

fn system(principal_type: PrincipalType, operation: &'static str, err: ServiceError) -> ServiceError {
    error!(principal = %principal_type, operation, error = %err, "credential operation failed");
    err
}
