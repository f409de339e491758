//! Ordered, appendable list of migration descriptors.
//!
//! The registry only records what was registered and in which order.
//! Applying migrations is left to whoever reads [`MigrationRegistry::snapshot`].

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DbError;

/// A migration descriptor. Its content is opaque to the registry.
pub trait Migration: Send + Sync + fmt::Debug {
    fn name(&self) -> Cow<'_, str>;

    fn version(&self) -> Option<u64> {
        None
    }
}

/// Plain-SQL migration with forward and reverse statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlMigration {
    pub name: String,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub up: Vec<String>,
    #[serde(default)]
    pub down: Vec<String>,
}

impl SqlMigration {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            up: Vec::new(),
            down: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    #[must_use]
    pub fn up(mut self, statement: impl Into<String>) -> Self {
        self.up.push(statement.into());
        self
    }

    #[must_use]
    pub fn down(mut self, statement: impl Into<String>) -> Self {
        self.down.push(statement.into());
        self
    }
}

impl Migration for SqlMigration {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn version(&self) -> Option<u64> {
        self.version
    }
}

/// Registered migrations in insertion order.
///
/// Each call is atomic on its own; duplicates are accepted. Callers that
/// register from several threads and care about the interleaving must
/// serialize those calls themselves.
#[derive(Default)]
pub struct MigrationRegistry {
    entries: RwLock<Vec<Arc<dyn Migration>>>,
}

impl MigrationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<M>(&self, migration: M)
    where
        M: Migration + 'static,
    {
        self.register_arc(Arc::new(migration));
    }

    pub fn register_arc(&self, migration: Arc<dyn Migration>) {
        debug!(migration = %migration.name(), "migration registered");
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(migration);
    }

    /// Append several migrations in iteration order under one lock.
    pub fn extend<I>(&self, migrations: I)
    where
        I: IntoIterator<Item = Arc<dyn Migration>>,
    {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(migrations);
    }

    /// Register a JSON array of [`SqlMigration`] objects, in array order.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` if the document is not such an array;
    /// nothing is registered in that case.
    pub fn load_json(&self, json: &str) -> Result<usize, DbError> {
        let parsed: Vec<SqlMigration> = serde_json::from_str(json)
            .map_err(|e| DbError::ConfigError(format!("invalid migration list: {e}")))?;
        let count = parsed.len();
        self.extend(
            parsed
                .into_iter()
                .map(|migration| Arc::new(migration) as Arc<dyn Migration>),
        );
        Ok(count)
    }

    /// The full ordered list at the time of the call.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<dyn Migration>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|migration| migration.name().into_owned())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("names", &self.names())
            .finish()
    }
}
