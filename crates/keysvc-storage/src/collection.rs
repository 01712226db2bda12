//! Storage locations.

use std::fmt;

use crate::StorageError;

/// A named document collection inside a named database.
///
/// Both names are restricted to ASCII letters, digits and `_` so they can be
/// used verbatim as SQL identifiers and key prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Collection {
    database: String,
    collection: String,
}

impl Collection {
    /// Build a collection location, validating both names.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidCollection`] if either name is empty or
    /// contains characters outside `[A-Za-z0-9_]`.
    pub fn new(
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let database = database.into();
        let collection = collection.into();
        validate_name(&database)?;
        validate_name(&collection)?;
        Ok(Self {
            database,
            collection,
        })
    }

    /// Database (schema) name.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Collection (table) name.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Key prefix shared by every document of this collection in flat
    /// key-value backends.
    pub(crate) fn key_prefix(&self) -> String {
        format!("{}/{}/", self.database, self.collection)
    }

    pub(crate) fn document_key(&self, id: &str) -> String {
        format!("{}{id}", self.key_prefix())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

fn validate_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() {
        return Err(StorageError::InvalidCollection {
            name: String::new(),
            reason: "name must not be empty".to_owned(),
        });
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '_')
    {
        return Err(StorageError::InvalidCollection {
            name: name.to_owned(),
            reason: format!("unsupported character {bad:?}"),
        });
    }
    Ok(())
}
