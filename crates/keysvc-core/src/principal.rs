//! Principals and the credential records issued to them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of entity a credential is issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalType {
    /// An end user.
    User,
    /// A webhook integration, identified by company.
    Hooks,
    /// An automation agent, identified by company.
    Agent,
}

impl PrincipalType {
    /// Lowercase name, as used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Hooks => "hooks",
            Self::Agent => "agent",
        }
    }

    /// What the principal id names: a user, or the owning company.
    #[must_use]
    pub fn identifier_label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Hooks | Self::Agent => "company",
        }
    }
}

impl fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip everything but ASCII letters and digits from a principal id.
///
/// Applied when a record is written and when a bundle is read. Single-pair
/// lookups match the raw id.
#[must_use]
pub fn normalize_principal_id(id: &str) -> String {
    id.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// A freshly generated key/secret pair.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub key: String,
    pub secret: String,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("key", &"[REDACTED]")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// The single key/secret record held for one principal.
#[derive(Clone, PartialEq, Eq)]
pub struct PrincipalRecord {
    pub principal_type: PrincipalType,
    /// Normalized id the record was stored under.
    pub principal_id: String,
    pub key: String,
    pub secret: String,
    /// Unix seconds.
    pub generated_at: i64,
}

impl fmt::Debug for PrincipalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrincipalRecord")
            .field("principal_type", &self.principal_type)
            .field("principal_id", &self.principal_id)
            .field("key", &"[REDACTED]")
            .field("secret", &"[REDACTED]")
            .field("generated_at", &self.generated_at)
            .finish()
    }
}

/// The non-secret view of a [`PrincipalRecord`], returned by reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalKey {
    pub principal_type: PrincipalType,
    pub principal_id: String,
    pub key: String,
    pub generated_at: i64,
}

impl From<PrincipalRecord> for PrincipalKey {
    fn from(record: PrincipalRecord) -> Self {
        Self {
            principal_type: record.principal_type,
            principal_id: record.principal_id,
            key: record.key,
            generated_at: record.generated_at,
        }
    }
}

/// The five sub-service credentials issued to a user as one unit.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    pub user_service: String,
    pub hooks_service: String,
    pub company_service: String,
    pub billing_service: String,
    pub permissions_service: String,
}

impl CredentialBundle {
    /// All five fields, in a fixed order.
    #[must_use]
    pub fn fields(&self) -> [&str; 5] {
        [
            &self.user_service,
            &self.hooks_service,
            &self.company_service,
            &self.billing_service,
            &self.permissions_service,
        ]
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle").finish_non_exhaustive()
    }
}

/// A stored bundle with its owner and generation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRecord {
    pub user_id: String,
    pub bundle: CredentialBundle,
    /// Unix seconds.
    pub generated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_non_alphanumerics() {
        assert_eq!(normalize_principal_id("c-1"), "c1");
        assert_eq!(normalize_principal_id(" user_42@example.com "), "user42examplecom");
        assert_eq!(normalize_principal_id("abcXYZ09"), "abcXYZ09");
        assert_eq!(normalize_principal_id("---"), "");
    }

    #[test]
    fn normalize_drops_non_ascii_letters() {
        assert_eq!(normalize_principal_id("é1"), "1");
    }

    #[test]
    fn debug_never_prints_secrets() {
        let pair = KeyPair {
            key: "kkkk".to_owned(),
            secret: "ssss".to_owned(),
        };
        let out = format!("{pair:?}");
        assert!(!out.contains("kkkk"));
        assert!(!out.contains("ssss"));

        let bundle = CredentialBundle {
            user_service: "u".repeat(25),
            hooks_service: "h".repeat(25),
            company_service: "c".repeat(25),
            billing_service: "b".repeat(25),
            permissions_service: "p".repeat(25),
        };
        assert!(!format!("{bundle:?}").contains(&"u".repeat(25)));
    }

    #[test]
    fn labels() {
        assert_eq!(PrincipalType::Hooks.to_string(), "hooks");
        assert_eq!(PrincipalType::User.identifier_label(), "user");
        assert_eq!(PrincipalType::Agent.identifier_label(), "company");
    }
}
