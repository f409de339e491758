//! Offloading blocking or CPU-bound work from event loops.
//!
//! [`ThreadPool`] owns a set of worker threads sized independently of the
//! number of event loops. [`ThreadPool::run`] queues a synchronous task and
//! returns a [`Deferred`] bound to the caller's loop; the task's outcome is
//! delivered back on that loop, never on the worker.
//!
//! The pool is constructed once and passed by reference (cloning shares the
//! same workers) to whatever needs it:
//! ```rust
//! use sql_gateway::prelude::*;
//!
//! # fn main() -> Result<(), DbError> {
//! let group = EventLoopGroup::new(1)?;
//! let pool = ThreadPool::started(ThreadPoolConfig::default().with_threads(2))?;
//! let digest = pool.run(&group.next(), || Ok("abc".repeat(3).len()));
//! assert_eq!(digest.wait()?, 9);
//! pool.shutdown_gracefully()?;
//! group.shutdown_gracefully()?;
//! # Ok(())
//! # }
//! ```

mod channel;
mod worker;

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::deferred::Deferred;
use crate::error::DbError;
use crate::event_loop::EventLoopHandle;

use channel::{Command, Job, Work};
use worker::run_worker;

/// Sizing and naming for a [`ThreadPool`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadPoolConfig {
    pub threads: usize,
    pub thread_name_prefix: String,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            threads: thread::available_parallelism().map_or(4, NonZeroUsize::get),
            thread_name_prefix: "sql-gateway-worker".to_string(),
        }
    }
}

impl ThreadPoolConfig {
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

enum State {
    Idle,
    Running {
        sender: Sender<Command>,
        workers: Vec<JoinHandle<()>>,
    },
    Stopped,
}

struct Inner {
    config: ThreadPoolConfig,
    state: Mutex<State>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let State::Running { sender, workers } = state {
            for _ in workers.iter() {
                let _ = sender.send(Command::Shutdown);
            }
        }
    }
}

/// Worker-thread pool for blocking and CPU-bound tasks.
#[derive(Clone)]
pub struct ThreadPool {
    inner: Arc<Inner>,
}

impl ThreadPool {
    /// Create an inactive pool; call [`start`](Self::start) before use.
    #[must_use]
    pub fn new(config: ThreadPoolConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State::Idle),
            }),
        }
    }

    /// Create and start a pool.
    ///
    /// # Errors
    /// See [`start`](Self::start).
    pub fn started(config: ThreadPoolConfig) -> Result<Self, DbError> {
        let pool = Self::new(config);
        pool.start()?;
        Ok(pool)
    }

    /// Spawn the worker threads. Starting a running pool is a no-op.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` for a zero thread count,
    /// `DbError::PoolInactive` if the pool was already shut down, and
    /// `DbError::ConnectionError` if a thread cannot be spawned.
    pub fn start(&self) -> Result<(), DbError> {
        let config = &self.inner.config;
        if config.threads == 0 {
            return Err(DbError::ConfigError(
                "thread pool needs at least one thread".into(),
            ));
        }

        let mut state = self.inner.state();
        match *state {
            State::Running { .. } => return Ok(()),
            State::Stopped => return Err(DbError::PoolInactive),
            State::Idle => {}
        }

        let (sender, receiver) = mpsc::channel::<Command>();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut workers = Vec::with_capacity(config.threads);
        for idx in 0..config.threads {
            let receiver = Arc::clone(&receiver);
            let spawned = thread::Builder::new()
                .name(format!("{}-{idx}", config.thread_name_prefix))
                .spawn(move || run_worker(&receiver));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    // Workers already spawned exit once the sender is dropped.
                    return Err(DbError::ConnectionError(format!(
                        "failed to spawn offload worker thread: {err}"
                    )));
                }
            }
        }

        info!(threads = config.threads, "thread pool started");
        *state = State::Running { sender, workers };
        Ok(())
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(*self.inner.state(), State::Running { .. })
    }

    #[must_use]
    pub fn config(&self) -> &ThreadPoolConfig {
        &self.inner.config
    }

    /// Run `task` on a worker and deliver its outcome on `on`.
    ///
    /// If the pool is not running the returned deferred has already failed
    /// with `DbError::PoolInactive` and `task` is never called. Errors returned
    /// by `task` are forwarded unchanged; a panic becomes
    /// `DbError::TaskPanicked`.
    pub fn run<T, F>(&self, on: &EventLoopHandle, task: F) -> Deferred<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, DbError> + Send + 'static,
    {
        let (promise, deferred) = on.make_promise();
        let job: Box<dyn Job> = Box::new(Work { task, promise });

        let state = self.inner.state();
        match &*state {
            State::Running { sender, .. } => {
                if let Err(mpsc::SendError(Command::Run(job))) = sender.send(Command::Run(job)) {
                    warn!("offload workers are gone; rejecting task");
                    job.reject();
                }
            }
            State::Idle | State::Stopped => {
                drop(state);
                warn!(event_loop = %on.id(), "thread pool inactive; rejecting task");
                job.reject();
            }
        }
        deferred
    }

    /// Stop accepting work, let queued tasks finish and join the workers.
    /// Calling it again, or on a pool that never started, is a no-op.
    ///
    /// # Errors
    /// Returns `DbError::Shutdown` if a worker thread panicked.
    pub fn shutdown_gracefully(&self) -> Result<(), DbError> {
        let previous = std::mem::replace(&mut *self.inner.state(), State::Stopped);
        let State::Running { sender, workers } = previous else {
            return Ok(());
        };

        for _ in &workers {
            let _ = sender.send(Command::Shutdown);
        }
        drop(sender);

        let current = thread::current().id();
        let mut failed = 0_usize;
        for handle in workers {
            if handle.thread().id() == current {
                // A task shutting down its own pool cannot join itself.
                continue;
            }
            if handle.join().is_err() {
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(DbError::Shutdown(format!(
                "{failed} offload worker thread(s) panicked"
            )));
        }
        info!("thread pool stopped");
        Ok(())
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("config", &self.inner.config)
            .field("active", &self.is_active())
            .finish()
    }
}
