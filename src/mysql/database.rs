use sqlx::mysql::MySqlPool;
use tracing::{info, warn};

use super::config::{MySqlOptions, create_pool};
use super::query::run_statement;
use crate::database::{Database, Lifecycle, prepare_statement};
use crate::deferred::Deferred;
use crate::error::DbError;
use crate::event_loop::EventLoopHandle;
use crate::grammar::{Grammar, MySqlGrammar};
use crate::migrations::MigrationRegistry;
use crate::results::DatabaseRow;
use crate::types::DatabaseValue;

/// [`Database`] backed by an `sqlx` `MySQL` pool living on one event loop.
pub struct MySqlDatabase {
    pool: MySqlPool,
    event_loop: EventLoopHandle,
    grammar: MySqlGrammar,
    migrations: MigrationRegistry,
    lifecycle: Lifecycle,
}

impl MySqlDatabase {
    /// Build a lazily connecting pool on `event_loop`.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` for incomplete options.
    pub fn connect(options: &MySqlOptions, event_loop: &EventLoopHandle) -> Result<Self, DbError> {
        let pool = {
            let _runtime = event_loop.enter();
            create_pool(options)?
        };
        info!(
            host = %options.host,
            port = options.port,
            database = %options.database,
            event_loop = %event_loop.id(),
            "mysql database ready"
        );
        Ok(Self::from_pool(pool, event_loop.clone()))
    }

    #[must_use]
    pub fn from_pool(pool: MySqlPool, event_loop: EventLoopHandle) -> Self {
        Self {
            pool,
            event_loop,
            grammar: MySqlGrammar,
            migrations: MigrationRegistry::new(),
            lifecycle: Lifecycle::default(),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

impl Database for MySqlDatabase {
    fn event_loop(&self) -> &EventLoopHandle {
        &self.event_loop
    }

    fn grammar(&self) -> &dyn Grammar {
        &self.grammar
    }

    fn run_raw_query(&self, sql: &str, values: Vec<DatabaseValue>) -> Deferred<Vec<DatabaseRow>> {
        let sql = match prepare_statement(&self.grammar, &self.lifecycle, sql, &values) {
            Ok(sql) => sql.into_owned(),
            Err(err) => return self.event_loop.make_failed(err),
        };

        let pool = self.pool.clone();
        let (promise, deferred) = self.event_loop.make_promise();
        self.event_loop.spawn(async move {
            promise.complete(run_statement(&pool, &sql, &values).await);
        });
        deferred
    }

    fn shutdown(&self) -> Deferred<()> {
        if let Err(err) = self.lifecycle.begin_shutdown() {
            warn!(backend = "mysql", "shutdown requested twice");
            return self.event_loop.make_failed(err);
        }

        let pool = self.pool.clone();
        let (promise, deferred) = self.event_loop.make_promise();
        self.event_loop.spawn(async move {
            // Waits for checked-out connections to be returned.
            pool.close().await;
            info!(backend = "mysql", "database shut down");
            promise.succeed(());
        });
        deferred
    }

    fn migrations(&self) -> &MigrationRegistry {
        &self.migrations
    }
}

impl std::fmt::Debug for MySqlDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlDatabase")
            .field("event_loop", &self.event_loop.id())
            .field("closed", &self.lifecycle.is_closed())
            .finish_non_exhaustive()
    }
}
