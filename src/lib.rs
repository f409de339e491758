//! Vendor-neutral SQL access over interchangeable backends.
//!
//! A [`Database`] hides which backend executes a statement. Every operation
//! returns a [`Deferred`] bound to the database's [`EventLoopHandle`], and
//! blocking drivers run on an explicitly constructed [`ThreadPool`] so the
//! loop is never blocked.
//!
//! ```rust
//! use sql_gateway::prelude::*;
//!
//! # fn main() -> Result<(), DbError> {
//! let loops = EventLoopGroup::new(1)?;
//! let threads = ThreadPool::started(ThreadPoolConfig::default().with_threads(2))?;
//! let config = DatabaseConfig::from_json_str(r#"{"backend": "sqlite", "db_path": ":memory:"}"#)?;
//! let db = config.connect(&loops.next(), &threads)?;
//!
//! let rows = db.run_raw_query("SELECT ? AS answer", vec![DatabaseValue::Int(42)]).wait()?;
//! assert_eq!(rows[0].get("answer"), Some(&DatabaseValue::Int(42)));
//!
//! db.shutdown().wait()?;
//! threads.shutdown_gracefully()?;
//! loops.shutdown_gracefully()?;
//! # Ok(())
//! # }
//! ```

#[cfg(not(any(feature = "postgres", feature = "mysql", feature = "sqlite")))]
compile_error!("enable at least one backend feature: postgres, mysql or sqlite");

pub mod config;
pub mod database;
pub mod deferred;
pub mod error;
pub mod event_loop;
pub mod grammar;
pub mod migrations;
pub mod offload;
pub mod prelude;
pub mod query_builder;
pub mod results;
pub mod translation;
pub mod types;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "test-utils-postgres")]
pub mod test_utils;

pub use config::DatabaseConfig;
pub use database::{AsDatabase, Database};
pub use deferred::{Deferred, Promise};
pub use error::{DbError, ErrorKind};
pub use event_loop::{EventLoop, EventLoopGroup, EventLoopHandle, EventLoopId};
pub use grammar::{Grammar, MySqlGrammar, PostgresGrammar, SqliteGrammar, grammar_for};
pub use migrations::{Migration, MigrationRegistry, SqlMigration};
pub use offload::{ThreadPool, ThreadPoolConfig};
pub use query_builder::{CompiledQuery, QueryBuilder};
pub use results::{DatabaseRow, RowSetBuilder};
pub use types::{DatabaseType, DatabaseValue};
