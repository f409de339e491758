//! Selecting and opening a backend from configuration.
//!
//! ```rust
//! use sql_gateway::config::DatabaseConfig;
//! use sql_gateway::types::DatabaseType;
//!
//! let config = DatabaseConfig::from_json_str(r#"{"backend": "sqlite", "db_path": ":memory:"}"#)
//!     .unwrap();
//! assert_eq!(config.database_type(), DatabaseType::Sqlite);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::DbError;
use crate::event_loop::EventLoopHandle;
use crate::offload::ThreadPool;
use crate::types::DatabaseType;

#[cfg(feature = "mysql")]
pub use crate::mysql::MySqlOptions;
#[cfg(feature = "postgres")]
pub use crate::postgres::PostgresOptions;
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteOptions, SqliteOptionsBuilder};

/// Which backend to open and how, tagged by `"backend"` in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DatabaseConfig {
    #[cfg(feature = "postgres")]
    Postgres(PostgresOptions),
    #[cfg(feature = "mysql")]
    MySql(MySqlOptions),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteOptions),
}

impl DatabaseConfig {
    /// # Errors
    /// Returns `DbError::ConfigError` if the document does not describe a
    /// backend compiled into this build.
    pub fn from_json_str(json: &str) -> Result<Self, DbError> {
        serde_json::from_str(json)
            .map_err(|e| DbError::ConfigError(format!("invalid database config: {e}")))
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "postgres")]
            DatabaseConfig::Postgres(_) => DatabaseType::Postgres,
            #[cfg(feature = "mysql")]
            DatabaseConfig::MySql(_) => DatabaseType::MySql,
            #[cfg(feature = "sqlite")]
            DatabaseConfig::Sqlite(_) => DatabaseType::Sqlite,
        }
    }

    /// Open the configured backend bound to `event_loop`.
    ///
    /// `threads` is used by backends whose driver blocks; async drivers
    /// ignore it.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` for invalid options, or the backend's
    /// error if it cannot be opened.
    #[allow(unused_variables)]
    pub fn connect(
        &self,
        event_loop: &EventLoopHandle,
        threads: &ThreadPool,
    ) -> Result<Arc<dyn Database>, DbError> {
        match self {
            #[cfg(feature = "postgres")]
            DatabaseConfig::Postgres(options) => Ok(Arc::new(
                crate::postgres::PostgresDatabase::connect(options, event_loop)?,
            )),
            #[cfg(feature = "mysql")]
            DatabaseConfig::MySql(options) => Ok(Arc::new(crate::mysql::MySqlDatabase::connect(
                options, event_loop,
            )?)),
            #[cfg(feature = "sqlite")]
            DatabaseConfig::Sqlite(options) => Ok(Arc::new(
                crate::sqlite::SqliteDatabase::open(options, event_loop, threads)?,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "sqlite")]
    #[test]
    fn parses_tagged_sqlite_config() {
        let config =
            DatabaseConfig::from_json_str(r#"{"backend": "sqlite", "db_path": "app.db", "wal": false}"#)
                .unwrap();
        assert_eq!(
            config,
            DatabaseConfig::Sqlite(SqliteOptions::new("app.db".into()).with_wal(false))
        );
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn parses_tagged_postgres_config() {
        let config = DatabaseConfig::from_json_str(
            r#"{"backend": "postgres", "host": "localhost", "port": 5432,
                "dbname": "app", "user": "svc", "password": "pw"}"#,
        )
        .unwrap();
        assert_eq!(config.database_type(), DatabaseType::Postgres);
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let err = DatabaseConfig::from_json_str(r#"{"backend": "oracle"}"#).unwrap_err();
        assert!(matches!(err, DbError::ConfigError(_)));
    }
}
