//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types so a single
//! `use sql_gateway::prelude::*;` is enough to open a database and run
//! statements.

pub use crate::config::DatabaseConfig;
pub use crate::database::Database;
pub use crate::deferred::{Deferred, Promise};
pub use crate::error::{DbError, ErrorKind};
pub use crate::event_loop::{EventLoop, EventLoopGroup, EventLoopHandle};
pub use crate::grammar::Grammar;
pub use crate::migrations::{Migration, MigrationRegistry, SqlMigration};
pub use crate::offload::{ThreadPool, ThreadPoolConfig};
pub use crate::query_builder::{CompiledQuery, QueryBuilder};
pub use crate::results::DatabaseRow;
pub use crate::types::{DatabaseType, DatabaseValue};

#[cfg(feature = "mysql")]
pub use crate::mysql::{MySqlDatabase, MySqlOptions};
#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresDatabase, PostgresOptions};
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteDatabase, SqliteOptions, SqliteOptionsBuilder};
