use deadpool_postgres::Pool;
use tracing::{info, warn};

use super::config::{PostgresOptions, create_pool};
use super::query::run_statement;
use crate::database::{Database, Lifecycle, prepare_statement};
use crate::deferred::Deferred;
use crate::error::DbError;
use crate::event_loop::EventLoopHandle;
use crate::grammar::{Grammar, PostgresGrammar};
use crate::migrations::MigrationRegistry;
use crate::results::DatabaseRow;
use crate::types::DatabaseValue;

/// [`Database`] backed by a `deadpool-postgres` pool.
///
/// Statements run as tasks on the bound event loop; the driver is fully
/// async so nothing is offloaded.
pub struct PostgresDatabase {
    pool: Pool,
    event_loop: EventLoopHandle,
    grammar: PostgresGrammar,
    migrations: MigrationRegistry,
    lifecycle: Lifecycle,
}

impl PostgresDatabase {
    /// Create the pool and bind it to `event_loop`.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` for incomplete options or
    /// `DbError::ConnectionError` if the pool cannot be built.
    pub fn connect(options: &PostgresOptions, event_loop: &EventLoopHandle) -> Result<Self, DbError> {
        let pool = {
            let _runtime = event_loop.enter();
            create_pool(options)?
        };
        info!(
            host = options.host.as_deref().unwrap_or_default(),
            dbname = options.dbname.as_deref().unwrap_or_default(),
            event_loop = %event_loop.id(),
            "postgres database ready"
        );
        Ok(Self::from_pool(pool, event_loop.clone()))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: Pool, event_loop: EventLoopHandle) -> Self {
        Self {
            pool,
            event_loop,
            grammar: PostgresGrammar,
            migrations: MigrationRegistry::new(),
            lifecycle: Lifecycle::default(),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

impl Database for PostgresDatabase {
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
            warn!(backend = "postgres", "shutdown requested twice");
            return self.event_loop.make_failed(err);
        }
        // Clients already checked out finish their statement and are then dropped.
        self.pool.close();
        info!(backend = "postgres", "database shut down");
        self.event_loop.make_succeeded(())
    }

    fn migrations(&self) -> &MigrationRegistry {
        &self.migrations
    }
}

impl std::fmt::Debug for PostgresDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDatabase")
            .field("event_loop", &self.event_loop.id())
            .field("closed", &self.lifecycle.is_closed())
            .finish_non_exhaustive()
    }
}
