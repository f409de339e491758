//! Helpers for tests that need a real server.

#[cfg(feature = "test-utils-postgres")]
pub mod postgres;

#[cfg(feature = "test-utils-postgres")]
pub use postgres::{EmbeddedPostgres, setup_postgres_embedded, stop_postgres_embedded};
