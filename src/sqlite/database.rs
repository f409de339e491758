use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::Connection;
use tracing::{info, warn};

use super::config::SqliteOptions;
use super::query::run_statement;
use crate::database::{Database, Lifecycle, prepare_statement};
use crate::deferred::Deferred;
use crate::error::DbError;
use crate::event_loop::EventLoopHandle;
use crate::grammar::{Grammar, SqliteGrammar};
use crate::migrations::MigrationRegistry;
use crate::offload::ThreadPool;
use crate::results::DatabaseRow;
use crate::types::DatabaseValue;

type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// [`Database`] backed by one `rusqlite` connection.
///
/// rusqlite blocks, so every statement runs on the [`ThreadPool`] and its
/// outcome is delivered back on the bound event loop. Statements are
/// serialized by the connection mutex.
pub struct SqliteDatabase {
    connection: SharedConnection,
    threads: ThreadPool,
    event_loop: EventLoopHandle,
    grammar: SqliteGrammar,
    migrations: MigrationRegistry,
    lifecycle: Lifecycle,
}

impl SqliteDatabase {
    /// Open the database described by `options`.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` for invalid options or
    /// `DbError::SqliteError` if the database cannot be opened.
    pub fn open(
        options: &SqliteOptions,
        event_loop: &EventLoopHandle,
        threads: &ThreadPool,
    ) -> Result<Self, DbError> {
        let conn = options.open()?;
        info!(
            db_path = %options.db_path,
            event_loop = %event_loop.id(),
            "sqlite database ready"
        );
        Ok(Self::from_connection(conn, event_loop.clone(), threads.clone()))
    }

    /// Wrap an already opened connection.
    #[must_use]
    pub fn from_connection(conn: Connection, event_loop: EventLoopHandle, threads: ThreadPool) -> Self {
        Self {
            connection: Arc::new(Mutex::new(Some(conn))),
            threads,
            event_loop,
            grammar: SqliteGrammar,
            migrations: MigrationRegistry::new(),
            lifecycle: Lifecycle::default(),
        }
    }

    #[must_use]
    pub fn thread_pool(&self) -> &ThreadPool {
        &self.threads
    }
}

fn close_connection(connection: &Mutex<Option<Connection>>) -> Result<(), DbError> {
    // Waits for a statement already holding the connection.
    let taken = connection
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    match taken {
        Some(conn) => conn.close().map_err(|(_, err)| {
            DbError::Shutdown(format!("failed to close sqlite connection: {err}"))
        }),
        None => Ok(()),
    }
}

impl Database for SqliteDatabase {
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

        let connection = Arc::clone(&self.connection);
        self.threads.run(&self.event_loop, move || {
            let guard = connection.lock().unwrap_or_else(PoisonError::into_inner);
            let conn = guard
                .as_ref()
                .ok_or_else(|| DbError::ConnectionError("database is shut down".into()))?;
            run_statement(conn, &sql, &values)
        })
    }

    fn shutdown(&self) -> Deferred<()> {
        if let Err(err) = self.lifecycle.begin_shutdown() {
            warn!(backend = "sqlite", "shutdown requested twice");
            return self.event_loop.make_failed(err);
        }
        info!(backend = "sqlite", "database shutting down");

        let connection = Arc::clone(&self.connection);
        let fallback = Arc::clone(&self.connection);
        let (promise, deferred) = self.event_loop.make_promise();
        self.threads
            .run(&self.event_loop, move || close_connection(&connection))
            .when_complete(move |outcome| match outcome {
                // The pool was stopped before the close was queued, so no
                // worker can still hold the connection.
                Err(DbError::PoolInactive) => promise.complete(close_connection(&fallback)),
                outcome => promise.complete(outcome),
            });
        deferred
    }

    fn migrations(&self) -> &MigrationRegistry {
        &self.migrations
    }
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabase")
            .field("event_loop", &self.event_loop.id())
            .field("threads", &self.threads)
            .field("closed", &self.lifecycle.is_closed())
            .finish_non_exhaustive()
    }
}
