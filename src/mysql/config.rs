use serde::{Deserialize, Serialize};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::time::Duration;

use crate::error::DbError;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

fn default_port() -> u16 {
    3306
}

/// Connection settings for a `MySQL` / `MariaDB` database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MySqlOptions {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub max_connections: Option<u32>,
}

impl MySqlOptions {
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            database: database.into(),
            user: user.into(),
            password: None,
            max_connections: None,
        }
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// # Errors
    /// Returns `DbError::ConfigError` naming the first empty required field.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.host.is_empty() {
            return Err(DbError::ConfigError("host is required".to_string()));
        }
        if self.database.is_empty() {
            return Err(DbError::ConfigError("database is required".to_string()));
        }
        if self.user.is_empty() {
            return Err(DbError::ConfigError("user is required".to_string()));
        }
        if self.max_connections == Some(0) {
            return Err(DbError::ConfigError(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// # Errors
    /// See [`validate`](Self::validate).
    pub fn to_connect_options(&self) -> Result<MySqlConnectOptions, DbError> {
        self.validate()?;
        let mut options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user);
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        Ok(options)
    }
}

/// Build a lazily connecting pool.
///
/// Must be called inside a tokio runtime context; the pool's maintenance
/// task is spawned there.
///
/// # Errors
/// See [`MySqlOptions::validate`].
pub fn create_pool(options: &MySqlOptions) -> Result<MySqlPool, DbError> {
    let connect = options.to_connect_options()?;
    let mut pool = MySqlPoolOptions::new().acquire_timeout(ACQUIRE_TIMEOUT);
    if let Some(max) = options.max_connections {
        pool = pool.max_connections(max);
    }
    Ok(pool.connect_lazy_with(connect))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_validation() {
        let parsed: MySqlOptions =
            serde_json::from_str(r#"{"host": "db", "database": "app", "user": "svc"}"#).unwrap();
        assert_eq!(parsed, MySqlOptions::new("db", "app", "svc"));
        assert_eq!(parsed.port, 3306);

        let err = MySqlOptions::new("db", "", "svc").validate().unwrap_err();
        assert!(matches!(err, DbError::ConfigError(msg) if msg == "database is required"));
    }
}
