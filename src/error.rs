use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PoolErrorPostgres(#[from] deadpool_postgres::PoolError),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "mysql")]
    #[error(transparent)]
    MySqlError(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("SQL expects {expected} bound value(s) but {actual} were supplied")]
    ParameterCountMismatch { expected: usize, actual: usize },

    #[error("thread pool is not accepting work")]
    PoolInactive,

    #[error("Shutdown error: {0}")]
    Shutdown(String),

    #[error(transparent)]
    Task(Box<dyn std::error::Error + Send + Sync>),

    #[error("offloaded task panicked: {0}")]
    TaskPanicked(String),

    #[error("promise dropped before it was completed")]
    PromiseAbandoned,

    #[error("Event loop error: {0}")]
    EventLoop(String),
}

/// Coarse classification of a [`DbError`], stable across backends.
///
/// Callers use this to decide between retrying (`BackendExecution`) and fixing
/// the call (`ParameterCountMismatch`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ParameterCountMismatch,
    BackendExecution,
    PoolInactive,
    Shutdown,
    Configuration,
    Task,
    Runtime,
}

impl DbError {
    /// Wrap an arbitrary error produced by an offloaded task.
    pub fn task<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        DbError::Task(err.into())
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            #[cfg(feature = "postgres")]
            DbError::PostgresError(_) | DbError::PoolErrorPostgres(_) => {
                ErrorKind::BackendExecution
            }
            #[cfg(feature = "sqlite")]
            DbError::SqliteError(_) => ErrorKind::BackendExecution,
            #[cfg(feature = "mysql")]
            DbError::MySqlError(_) => ErrorKind::BackendExecution,
            DbError::ConnectionError(_)
            | DbError::ExecutionError(_)
            | DbError::ParameterError(_) => ErrorKind::BackendExecution,
            DbError::ParameterCountMismatch { .. } => ErrorKind::ParameterCountMismatch,
            DbError::PoolInactive => ErrorKind::PoolInactive,
            DbError::Shutdown(_) => ErrorKind::Shutdown,
            DbError::ConfigError(_) => ErrorKind::Configuration,
            DbError::Task(_) | DbError::TaskPanicked(_) => ErrorKind::Task,
            DbError::PromiseAbandoned | DbError::EventLoop(_) => ErrorKind::Runtime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_error_kinds() {
        let mismatch = DbError::ParameterCountMismatch {
            expected: 2,
            actual: 1,
        };
        assert_eq!(mismatch.kind(), ErrorKind::ParameterCountMismatch);
        assert_eq!(
            mismatch.to_string(),
            "SQL expects 2 bound value(s) but 1 were supplied"
        );
        assert_eq!(DbError::PoolInactive.kind(), ErrorKind::PoolInactive);
        assert_eq!(
            DbError::Shutdown("socket closed".into()).kind(),
            ErrorKind::Shutdown
        );
        assert_eq!(
            DbError::ConnectionError("reset".into()).kind(),
            ErrorKind::BackendExecution
        );
    }

    #[test]
    fn task_errors_keep_their_message() {
        let err = DbError::task("hash failed");
        assert_eq!(err.kind(), ErrorKind::Task);
        assert_eq!(err.to_string(), "hash failed");
    }
}
