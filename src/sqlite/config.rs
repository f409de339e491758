use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DbError;

/// Path that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

fn default_wal() -> bool {
    true
}

/// Options for opening a `SQLite` database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteOptions {
    pub db_path: String,
    /// Switch file databases to WAL journaling on open.
    #[serde(default = "default_wal")]
    pub wal: bool,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            wal: default_wal(),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY.to_string())
    }

    #[must_use]
    pub fn with_wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }

    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.db_path == IN_MEMORY
    }

    /// # Errors
    /// Returns `DbError::ConfigError` for an empty path.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.db_path.trim().is_empty() {
            return Err(DbError::ConfigError("db_path is required".to_string()));
        }
        Ok(())
    }

    /// Open the connection described by these options.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` for invalid options or
    /// `DbError::SqliteError` if the file cannot be opened.
    pub fn open(&self) -> Result<Connection, DbError> {
        self.validate()?;
        let conn = Connection::open(&self.db_path)?;
        if self.wal && !self.is_in_memory() {
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            debug!(db_path = %self.db_path, journal_mode = %mode, "sqlite journal mode set");
        }
        Ok(conn)
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_serde_defaults_agree() {
        let built = SqliteOptionsBuilder::new("app.db".into()).finish();
        let parsed: SqliteOptions = serde_json::from_str(r#"{"db_path": "app.db"}"#).unwrap();
        assert_eq!(built, parsed);
        assert!(parsed.wal);
        assert!(SqliteOptions::in_memory().is_in_memory());
    }

    #[test]
    fn empty_path_is_rejected() {
        let err = SqliteOptions::new("  ".into()).open().unwrap_err();
        assert!(matches!(err, DbError::ConfigError(_)));
    }

    #[test]
    fn file_database_switches_to_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.db");
        let conn = SqliteOptions::new(path.to_string_lossy().into_owned())
            .open()
            .unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
