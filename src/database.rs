//! The backend-neutral database contract.
//!
//! Callers hold an `Arc<dyn Database>` and never learn which backend is
//! behind it. Everything that may touch the network returns a [`Deferred`]
//! bound to the database's event loop; failures travel through that
//! deferred and nothing panics or returns an error synchronously.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::deferred::Deferred;
use crate::error::DbError;
use crate::event_loop::EventLoopHandle;
use crate::grammar::Grammar;
use crate::migrations::MigrationRegistry;
use crate::query_builder::QueryBuilder;
use crate::results::DatabaseRow;
use crate::translation::compile_raw;
use crate::types::{DatabaseType, DatabaseValue};

/// Upcast to `&dyn Database`, implemented for every sized [`Database`].
///
/// Lets provided methods such as [`Database::query`] hand out a trait
/// object whether they are called on a concrete backend or on
/// `dyn Database`.
pub trait AsDatabase {
    fn as_database(&self) -> &dyn Database;
}

impl<D: Database> AsDatabase for D {
    fn as_database(&self) -> &dyn Database {
        self
    }
}

pub trait Database: AsDatabase + Send + Sync {
    /// The loop every returned [`Deferred`] is bound to.
    fn event_loop(&self) -> &EventLoopHandle;

    /// Dialect rules, fixed for the lifetime of the database.
    fn grammar(&self) -> &dyn Grammar;

    fn database_type(&self) -> DatabaseType {
        self.grammar().dialect()
    }

    /// Start a query builder bound to this database.
    fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self.as_database())
    }

    /// Execute `sql`, binding `values` left to right to its `?` placeholders.
    ///
    /// A placeholder/value count mismatch fails the deferred with
    /// `DbError::ParameterCountMismatch` before the backend is contacted.
    /// Values are always bound through the driver, never spliced into text.
    fn run_raw_query(&self, sql: &str, values: Vec<DatabaseValue>) -> Deferred<Vec<DatabaseRow>>;

    /// [`run_raw_query`](Database::run_raw_query) with no values.
    fn run_raw(&self, sql: &str) -> Deferred<Vec<DatabaseRow>> {
        self.run_raw_query(sql, Vec::new())
    }

    /// Release the backend's connections.
    ///
    /// The first call closes and succeeds, or fails with `DbError::Shutdown`
    /// if the driver reports a close failure. Later calls fail with
    /// `DbError::Shutdown`. Statements issued afterwards fail with a
    /// connection error; statements already holding a connection finish.
    fn shutdown(&self) -> Deferred<()>;

    fn migrations(&self) -> &MigrationRegistry;
}

/// Open/closed flag shared by the backends.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    closed: AtomicBool,
}

impl Lifecycle {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_open(&self) -> Result<(), DbError> {
        if self.is_closed() {
            return Err(DbError::ConnectionError("database is shut down".into()));
        }
        Ok(())
    }

    /// Flip to closed. Only the first caller gets `Ok`.
    pub(crate) fn begin_shutdown(&self) -> Result<(), DbError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(DbError::Shutdown("already shut down".into()));
        }
        Ok(())
    }
}

/// Compile `sql` for execution and check the database is still open.
///
/// The count check runs first, so a malformed call reports the mismatch
/// even on a closed database.
pub(crate) fn prepare_statement<'a>(
    grammar: &dyn Grammar,
    lifecycle: &Lifecycle,
    sql: &'a str,
    values: &[DatabaseValue],
) -> Result<Cow<'a, str>, DbError> {
    let backend = grammar.dialect();
    let compiled = compile_raw(grammar, sql, values).inspect_err(|err| {
        warn!(%backend, error = %err, "rejecting statement");
    })?;
    if let Err(err) = lifecycle.ensure_open() {
        warn!(%backend, "statement issued after shutdown");
        return Err(err);
    }
    debug!(%backend, sql = %compiled, params = values.len(), "executing statement");
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::PostgresGrammar;

    #[test]
    fn lifecycle_closes_once() {
        let lifecycle = Lifecycle::default();
        assert!(lifecycle.ensure_open().is_ok());
        assert!(lifecycle.begin_shutdown().is_ok());
        assert!(matches!(lifecycle.begin_shutdown(), Err(DbError::Shutdown(_))));
        assert!(matches!(
            lifecycle.ensure_open(),
            Err(DbError::ConnectionError(msg)) if msg == "database is shut down"
        ));
    }

    #[test]
    fn mismatch_is_reported_before_closed_state() {
        let lifecycle = Lifecycle::default();
        lifecycle.begin_shutdown().unwrap();
        let err = prepare_statement(&PostgresGrammar, &lifecycle, "select ?", &[]).unwrap_err();
        assert!(matches!(err, DbError::ParameterCountMismatch { .. }));
        let err = prepare_statement(&PostgresGrammar, &lifecycle, "select 1", &[]).unwrap_err();
        assert!(matches!(err, DbError::ConnectionError(_)));
    }
}
