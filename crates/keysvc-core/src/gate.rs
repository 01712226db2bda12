//! Service-key gate.
//!
//! Only the hooks service and the orchestrator may call privileged
//! operations. Keys configured for other services are known but never
//! admitted.

use subtle::ConstantTimeEq;

use crate::directory::{ServiceDirectory, ServiceName};

/// Services whose keys are admitted.
pub const ALLOWED_CALLERS: [ServiceName; 2] = [ServiceName::Hooks, ServiceName::Orchestrator];

/// Allow-list of inter-service keys.
#[derive(Clone)]
pub struct ServiceKeyGate {
    allowed: Vec<(ServiceName, Vec<u8>)>,
}

impl std::fmt::Debug for ServiceKeyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.allowed.iter().map(|(name, _)| *name).collect();
        f.debug_struct("ServiceKeyGate")
            .field("allowed", &names)
            .finish()
    }
}

impl ServiceKeyGate {
    /// Build the gate from the directory. Services with an empty key are left
    /// out so an unset key can never match.
    #[must_use]
    pub fn from_directory(directory: &ServiceDirectory) -> Self {
        let allowed = ALLOWED_CALLERS
            .iter()
            .map(|name| (*name, directory.key(*name).as_bytes().to_vec()))
            .filter(|(_, key)| !key.is_empty())
            .collect();
        Self { allowed }
    }

    /// Whether `presented` is an allow-listed key.
    #[must_use]
    pub fn authorize(&self, presented: &str) -> bool {
        self.caller(presented).is_some()
    }

    /// The service that owns `presented`, if it is allow-listed.
    ///
    /// Every entry is compared in constant time, even after a match.
    #[must_use]
    pub fn caller(&self, presented: &str) -> Option<ServiceName> {
        if presented.is_empty() {
            return None;
        }
        let presented = presented.as_bytes();
        let mut matched = None;
        for (name, key) in &self.allowed {
            if bool::from(key.as_slice().ct_eq(presented)) {
                matched = Some(*name);
            }
        }
        matched
    }
}
