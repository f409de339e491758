#![allow(dead_code)]

use std::sync::{Arc, Once};

use sql_gateway::prelude::*;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test-friendly subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// One event loop plus a small worker pool, torn down together.
pub struct Harness {
    pub loops: EventLoopGroup,
    pub threads: ThreadPool,
}

impl Harness {
    pub fn new(threads: usize) -> Result<Self, DbError> {
        init_tracing();
        Ok(Self {
            loops: EventLoopGroup::new(1)?,
            threads: ThreadPool::started(
                ThreadPoolConfig::default()
                    .with_threads(threads)
                    .with_thread_name_prefix("test-worker"),
            )?,
        })
    }

    pub fn event_loop(&self) -> EventLoopHandle {
        self.loops.next()
    }

    #[cfg(feature = "sqlite")]
    pub fn sqlite_memory(&self) -> Result<Arc<dyn Database>, DbError> {
        DatabaseConfig::Sqlite(SqliteOptions::in_memory()).connect(&self.event_loop(), &self.threads)
    }

    pub fn shutdown(self) -> Result<(), DbError> {
        self.threads.shutdown_gracefully()?;
        self.loops.shutdown_gracefully()
    }
}

/// `users(id, name)` with alice (1) and bob (2).
pub fn seed_users(db: &dyn Database) -> Result<(), DbError> {
    db.run_raw("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
        .wait()?;
    for (id, name) in [(1, "alice"), (2, "bob")] {
        db.run_raw_query(
            "INSERT INTO users (id, name) VALUES (?, ?)",
            vec![DatabaseValue::Int(id), DatabaseValue::from(name)],
        )
        .wait()?;
    }
    Ok(())
}
