//! Shared application state for the `keysvc` server.
//!
//! A single [`AppState`] is built at startup and shared across all Axum
//! handlers via `Arc`.

use std::sync::Arc;

use keysvc_core::directory::ServiceConfig;
use keysvc_core::service::CredentialService;
use keysvc_storage::DocumentStore;

/// Shared application state passed to all HTTP handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The credential engine.
    pub service: CredentialService,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServiceConfig, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            service: CredentialService::new(config, documents),
        }
    }

    /// Wrap an already-built service.
    #[must_use]
    pub fn with_service(service: CredentialService) -> Self {
        Self { service }
    }
}
