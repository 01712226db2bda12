//! Error types for `keysvc-core`.
//!
//! Expected per-request outcomes (missing input, rejected service key, not
//! found) and system failures (store, random source) share one enum so the
//! service has a single return type; [`ServiceError::kind`] tells them
//! apart. No variant ever carries key or secret material.

use keysvc_storage::StorageError;

use crate::principal::PrincipalType;

/// Errors from the secure random source.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// A zero-length credential was requested.
    #[error("credential length must be at least 1")]
    InvalidLength,

    /// The OS random source failed or returned unusable output.
    #[error("secure random source unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Coarse classification of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing identifier, service key, or candidate key.
    Input,
    /// Service key present but not on the allow-list.
    Authorization,
    /// No record, or a record outside the freshness window.
    NotFound,
    /// The document store failed.
    Store,
    /// The random source failed.
    Generation,
}

/// Errors returned by [`CredentialService`](crate::service::CredentialService).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// No service key was presented.
    #[error("missing service key")]
    MissingServiceKey,

    /// A service key was presented but is not allowed to call this service.
    #[error("invalid service key")]
    InvalidServiceKey,

    /// The principal identifier was empty.
    #[error("missing {} id", .0.identifier_label())]
    MissingIdentifier(PrincipalType),

    /// The candidate key to validate was empty.
    #[error("missing key")]
    MissingKey,

    /// The record does not exist or is no longer fresh.
    #[error("not found")]
    NotFound,

    /// Credential material could not be generated.
    #[error("credential generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// The store returned an error.
    #[error("credential store error: {0}")]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingServiceKey | Self::MissingIdentifier(_) | Self::MissingKey => {
                ErrorKind::Input
            }
            Self::InvalidServiceKey => ErrorKind::Authorization,
            Self::NotFound => ErrorKind::NotFound,
            Self::Generation(_) => ErrorKind::Generation,
            Self::Storage(_) => ErrorKind::Store,
        }
    }

    /// The status string reported to callers.
    ///
    /// System failures collapse to a generic `"system error"`; their detail
    /// goes to the log, not the wire.
    #[must_use]
    pub fn status(&self) -> String {
        match self.kind() {
            ErrorKind::Store | ErrorKind::Generation => "system error".to_owned(),
            ErrorKind::Input | ErrorKind::Authorization | ErrorKind::NotFound => self.to_string(),
        }
    }

    /// Whether this is a system failure rather than an expected outcome.
    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self.kind(), ErrorKind::Store | ErrorKind::Generation)
    }
}
