use deadpool_postgres::{Config as PgConfig, Pool, Runtime};
use serde::{Deserialize, Serialize};
use tokio_postgres::NoTls;

use crate::error::DbError;

/// Connection settings for a Postgres database.
///
/// Every field except `max_connections` is required; they are optional here
/// so a partially filled config file fails validation with a clear message
/// instead of a deserialization error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub max_connections: Option<usize>,
}

impl PostgresOptions {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, dbname: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
            dbname: Some(dbname.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Check that every required field is present.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` naming the first missing field.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.dbname.is_none() {
            return Err(DbError::ConfigError("dbname is required".to_string()));
        }
        if self.host.is_none() {
            return Err(DbError::ConfigError("host is required".to_string()));
        }
        if self.port.is_none() {
            return Err(DbError::ConfigError("port is required".to_string()));
        }
        if self.user.is_none() {
            return Err(DbError::ConfigError("user is required".to_string()));
        }
        if self.password.is_none() {
            return Err(DbError::ConfigError("password is required".to_string()));
        }
        if self.max_connections == Some(0) {
            return Err(DbError::ConfigError(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Validated `deadpool_postgres` configuration.
    ///
    /// # Errors
    /// See [`validate`](Self::validate).
    pub fn to_pool_config(&self) -> Result<PgConfig, DbError> {
        self.validate()?;
        let mut cfg = PgConfig::new();
        cfg.host.clone_from(&self.host);
        cfg.port = self.port;
        cfg.dbname.clone_from(&self.dbname);
        cfg.user.clone_from(&self.user);
        cfg.password.clone_from(&self.password);
        if let Some(max_size) = self.max_connections {
            cfg.pool = Some(deadpool_postgres::PoolConfig::new(max_size));
        }
        Ok(cfg)
    }
}

impl From<&PgConfig> for PostgresOptions {
    fn from(cfg: &PgConfig) -> Self {
        Self {
            host: cfg.host.clone(),
            port: cfg.port,
            dbname: cfg.dbname.clone(),
            user: cfg.user.clone(),
            password: cfg.password.clone(),
            max_connections: cfg.pool.as_ref().map(|pool| pool.max_size),
        }
    }
}

/// Build a connection pool. No connection is opened until first use.
///
/// # Errors
/// Returns `DbError::ConfigError` for missing fields or
/// `DbError::ConnectionError` if the pool cannot be created.
pub fn create_pool(options: &PostgresOptions) -> Result<Pool, DbError> {
    options
        .to_pool_config()?
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| DbError::ConnectionError(format!("Failed to create Postgres pool: {e}")))
}
