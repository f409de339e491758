//! Per-backend SQL dialect rules.
//!
//! A grammar is stateless and deterministic. Each [`Database`](crate::Database)
//! owns exactly one, fixed when the database is constructed; the query
//! builder and the raw-SQL path compile through it.

use std::borrow::Cow;
use std::fmt;

use crate::types::DatabaseType;

pub trait Grammar: Send + Sync + fmt::Debug {
    /// Which dialect these rules describe.
    fn dialect(&self) -> DatabaseType;

    /// The native bind marker for the parameter at `position` (1-based).
    fn bind_placeholder(&self, position: usize) -> Cow<'static, str>;

    /// Quote an identifier, escaping embedded quote characters.
    fn quote_identifier(&self, identifier: &str) -> String {
        quote_with(identifier, '"')
    }

    /// Whether `INSERT ... RETURNING` is understood.
    fn supports_returning(&self) -> bool {
        false
    }
}

fn quote_with(identifier: &str, quote: char) -> String {
    let mut out = String::with_capacity(identifier.len() + 2);
    out.push(quote);
    for ch in identifier.chars() {
        if ch == quote {
            out.push(quote);
        }
        out.push(ch);
    }
    out.push(quote);
    out
}

/// `PostgreSQL`: `$1, $2, ...` and double-quoted identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostgresGrammar;

impl Grammar for PostgresGrammar {
    fn dialect(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    fn bind_placeholder(&self, position: usize) -> Cow<'static, str> {
        Cow::Owned(format!("${position}"))
    }

    fn supports_returning(&self) -> bool {
        true
    }
}

/// `MySQL`: anonymous `?` markers and backtick identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MySqlGrammar;

impl Grammar for MySqlGrammar {
    fn dialect(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    fn bind_placeholder(&self, _position: usize) -> Cow<'static, str> {
        Cow::Borrowed("?")
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_with(identifier, '`')
    }
}

/// `SQLite`: numbered `?1, ?2, ...` markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqliteGrammar;

impl Grammar for SqliteGrammar {
    fn dialect(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn bind_placeholder(&self, position: usize) -> Cow<'static, str> {
        Cow::Owned(format!("?{position}"))
    }

    fn supports_returning(&self) -> bool {
        true
    }
}

/// The shipped grammar for a dialect.
#[must_use]
pub fn grammar_for(dialect: DatabaseType) -> &'static dyn Grammar {
    match dialect {
        DatabaseType::Postgres => &PostgresGrammar,
        DatabaseType::MySql => &MySqlGrammar,
        DatabaseType::Sqlite => &SqliteGrammar,
    }
}
