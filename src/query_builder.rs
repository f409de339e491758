//! Fluent statement builder bound to one [`Database`].
//!
//! The builder accumulates `?`-style SQL and its values, and compiles both
//! through the database's grammar. Identifiers are quoted by the grammar;
//! values are only ever bound.

use crate::database::Database;
use crate::deferred::Deferred;
use crate::error::DbError;
use crate::results::DatabaseRow;
use crate::translation::compile_raw;
use crate::types::DatabaseValue;

/// A statement ready for the driver: native bind markers plus values.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub binds: Vec<DatabaseValue>,
}

#[must_use = "a query builder does nothing until compiled or run"]
pub struct QueryBuilder<'db> {
    database: &'db dyn Database,
    sql: String,
    binds: Vec<DatabaseValue>,
}

impl<'db> QueryBuilder<'db> {
    pub fn new(database: &'db dyn Database) -> Self {
        Self {
            database,
            sql: String::new(),
            binds: Vec::new(),
        }
    }

    #[must_use]
    pub fn database(&self) -> &'db dyn Database {
        self.database
    }

    /// Append raw SQL text, which may contain `?` placeholders.
    pub fn sql(mut self, text: &str) -> Self {
        self.sql.push_str(text);
        self
    }

    /// Append an identifier quoted for this database's dialect.
    pub fn identifier(mut self, name: &str) -> Self {
        let quoted = self.database.grammar().quote_identifier(name);
        self.sql.push_str(&quoted);
        self
    }

    /// Supply the value for the next `?` already present in the text.
    pub fn bind(mut self, value: impl Into<DatabaseValue>) -> Self {
        self.binds.push(value.into());
        self
    }

    /// Append a `?` placeholder together with its value.
    pub fn push_bind(mut self, value: impl Into<DatabaseValue>) -> Self {
        self.sql.push('?');
        self.binds.push(value.into());
        self
    }

    /// The uncompiled `?`-style text accumulated so far.
    #[must_use]
    pub fn raw_sql(&self) -> &str {
        &self.sql
    }

    /// Compile through the database's grammar.
    ///
    /// # Errors
    /// Returns `DbError::ParameterCountMismatch` if the placeholders and the
    /// bound values disagree.
    pub fn compile(&self) -> Result<CompiledQuery, DbError> {
        let sql = compile_raw(self.database.grammar(), &self.sql, &self.binds)?;
        Ok(CompiledQuery {
            sql: sql.into_owned(),
            binds: self.binds.clone(),
        })
    }

    /// Execute through [`Database::run_raw_query`].
    pub fn run(self) -> Deferred<Vec<DatabaseRow>> {
        self.database.run_raw_query(&self.sql, self.binds)
    }

    /// Execute and keep only the first row.
    pub fn first(self) -> Deferred<Option<DatabaseRow>> {
        self.run().map(|rows| rows.into_iter().next())
    }
}

impl std::fmt::Debug for QueryBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("database_type", &self.database.database_type())
            .field("sql", &self.sql)
            .field("binds", &self.binds.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::event_loop::{EventLoop, EventLoopHandle};
    use crate::grammar::{Grammar, MySqlGrammar, PostgresGrammar, SqliteGrammar};
    use crate::migrations::MigrationRegistry;

    struct Offline {
        event_loop: EventLoopHandle,
        grammar: &'static dyn Grammar,
        migrations: MigrationRegistry,
    }

    impl Database for Offline {
        fn event_loop(&self) -> &EventLoopHandle {
            &self.event_loop
        }

        fn grammar(&self) -> &dyn Grammar {
            self.grammar
        }

        fn run_raw_query(
            &self,
            sql: &str,
            values: Vec<DatabaseValue>,
        ) -> Deferred<Vec<DatabaseRow>> {
            match compile_raw(self.grammar, sql, &values) {
                Ok(_) => self.event_loop.make_succeeded(Vec::new()),
                Err(err) => self.event_loop.make_failed(err),
            }
        }

        fn shutdown(&self) -> Deferred<()> {
            self.event_loop.make_succeeded(())
        }

        fn migrations(&self) -> &MigrationRegistry {
            &self.migrations
        }
    }

    fn offline(event_loop: &EventLoop, grammar: &'static dyn Grammar) -> Offline {
        Offline {
            event_loop: event_loop.handle().clone(),
            grammar,
            migrations: MigrationRegistry::new(),
        }
    }

    #[test]
    fn compiles_through_each_grammar() {
        let event_loop = EventLoop::spawn("builder-grammar").unwrap();
        let expected: [(&'static dyn Grammar, &str); 3] = [
            (
                &PostgresGrammar,
                "SELECT * FROM \"users\" WHERE id = $1 AND name = $2",
            ),
            (&MySqlGrammar, "SELECT * FROM `users` WHERE id = ? AND name = ?"),
            (&SqliteGrammar, "SELECT * FROM \"users\" WHERE id = ?1 AND name = ?2"),
        ];
        for (grammar, sql) in expected {
            let db = offline(&event_loop, grammar);
            let compiled = db
                .query()
                .sql("SELECT * FROM ")
                .identifier("users")
                .sql(" WHERE id = ")
                .push_bind(1_i64)
                .sql(" AND name = ?")
                .bind("ada")
                .compile()
                .unwrap();
            assert_eq!(compiled.sql, sql);
            assert_eq!(
                compiled.binds,
                vec![DatabaseValue::Int(1), DatabaseValue::Text("ada".into())]
            );
        }
        event_loop.shutdown_gracefully().unwrap();
    }

    #[test]
    fn hostile_values_never_change_the_text() {
        let event_loop = EventLoop::spawn("builder-injection").unwrap();
        let db = offline(&event_loop, &PostgresGrammar);
        let plain = db.query().sql("SELECT ?").bind("alice").compile().unwrap();
        let hostile = db
            .query()
            .sql("SELECT ?")
            .bind("'; DROP TABLE x; --")
            .compile()
            .unwrap();
        assert_eq!(plain.sql, hostile.sql);
        event_loop.shutdown_gracefully().unwrap();
    }

    #[test]
    fn missing_bind_is_a_mismatch() {
        let event_loop = EventLoop::spawn("builder-mismatch").unwrap();
        let db = offline(&event_loop, &SqliteGrammar);
        let err = db.query().sql("SELECT ? + ?").bind(1).compile().unwrap_err();
        assert!(matches!(
            err,
            DbError::ParameterCountMismatch {
                expected: 2,
                actual: 1
            }
        ));

        let shared: &dyn Database = &db;
        let outcome = shared.query().sql("SELECT ?").run().wait();
        assert!(matches!(outcome, Err(DbError::ParameterCountMismatch { .. })));
        let first = shared.query().sql("SELECT 1").first().wait().unwrap();
        assert!(first.is_none());
        event_loop.shutdown_gracefully().unwrap();
    }

    #[test]
    fn query_resolves_through_shared_handles() {
        let event_loop = EventLoop::spawn("builder-handles").unwrap();
        let shared: Arc<dyn Database> = Arc::new(offline(&event_loop, &MySqlGrammar));
        let from_arc = shared.query().sql("SELECT ").push_bind(1).compile().unwrap();

        let borrowed: &dyn Database = shared.as_ref();
        let from_ref = borrowed.query().sql("SELECT ").push_bind(1).compile().unwrap();
        assert_eq!(from_arc, from_ref);
        assert_eq!(from_arc.sql, "SELECT ?");
        assert!(shared.query().sql("SELECT 1").first().wait().unwrap().is_none());
        event_loop.shutdown_gracefully().unwrap();
    }
}
