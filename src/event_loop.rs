//! Single-threaded cooperative execution contexts.
//!
//! An [`EventLoop`] is one OS thread driving a current-thread tokio runtime.
//! Everything spawned through its [`EventLoopHandle`] runs on that thread,
//! which is what lets a [`Deferred`] promise that its continuations run on
//! the loop that created it.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use tokio::runtime::{Builder, EnterGuard, Handle};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::deferred::{Deferred, Promise};
use crate::error::DbError;

static NEXT_LOOP_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_LOOP: RefCell<Option<EventLoopHandle>> = const { RefCell::new(None) };
}

/// Identity of an event loop, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventLoopId(u64);

impl fmt::Display for EventLoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loop#{}", self.0)
    }
}

/// Cheap, cloneable reference to a running [`EventLoop`].
#[derive(Clone)]
pub struct EventLoopHandle {
    id: EventLoopId,
    name: Arc<str>,
    runtime: Handle,
}

impl EventLoopHandle {
    #[must_use]
    pub fn id(&self) -> EventLoopId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The loop driving the calling thread, if any.
    #[must_use]
    pub fn current() -> Option<EventLoopHandle> {
        CURRENT_LOOP.with(|current| current.borrow().clone())
    }

    #[must_use]
    pub fn current_id() -> Option<EventLoopId> {
        CURRENT_LOOP.with(|current| current.borrow().as_ref().map(EventLoopHandle::id))
    }

    /// Whether the calling thread is this loop's thread.
    #[must_use]
    pub fn in_event_loop(&self) -> bool {
        Self::current_id() == Some(self.id)
    }

    /// Run a future on this loop.
    ///
    /// If the loop has already stopped, the future is dropped without being
    /// polled.
    pub fn spawn<F>(&self, future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }

    /// Run a closure on this loop.
    pub fn execute<F>(&self, func: F)
    where
        F: FnOnce() + Send + 'static,
    {
        drop(self.runtime.spawn(async move { func() }));
    }

    /// Enter the loop's runtime context from another thread, so drivers that
    /// spawn background tasks at construction attach them to this loop.
    #[must_use]
    pub fn enter(&self) -> EnterGuard<'_> {
        self.runtime.enter()
    }

    #[must_use]
    pub fn make_promise<T>(&self) -> (Promise<T>, Deferred<T>)
    where
        T: Send + 'static,
    {
        Promise::new(self.clone())
    }

    #[must_use]
    pub fn make_succeeded<T>(&self, value: T) -> Deferred<T>
    where
        T: Send + 'static,
    {
        let (promise, deferred) = self.make_promise();
        promise.succeed(value);
        deferred
    }

    #[must_use]
    pub fn make_failed<T>(&self, err: DbError) -> Deferred<T>
    where
        T: Send + 'static,
    {
        let (promise, deferred) = self.make_promise();
        promise.fail(err);
        deferred
    }
}

impl fmt::Debug for EventLoopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoopHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl PartialEq for EventLoopHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventLoopHandle {}

/// Owner of one loop thread. Dropping it stops the loop without joining.
pub struct EventLoop {
    handle: EventLoopHandle,
    stop: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl EventLoop {
    /// Start a loop on a new thread named `name`.
    ///
    /// # Errors
    /// Returns `DbError::EventLoop` if the runtime or thread cannot be created.
    pub fn spawn(name: impl Into<String>) -> Result<Self, DbError> {
        let name: Arc<str> = Arc::from(name.into());
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| DbError::EventLoop(format!("failed to build loop runtime: {err}")))?;
        let handle = EventLoopHandle {
            id: EventLoopId(NEXT_LOOP_ID.fetch_add(1, Ordering::Relaxed)),
            name: Arc::clone(&name),
            runtime: runtime.handle().clone(),
        };

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let thread_handle = handle.clone();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let id = thread_handle.id();
                CURRENT_LOOP.with(|current| *current.borrow_mut() = Some(thread_handle));
                // Either an explicit stop or the owner being dropped ends the loop.
                let _ = runtime.block_on(stop_rx);
                CURRENT_LOOP.with(|current| current.borrow_mut().take());
                drop(runtime);
                debug!(%id, "event loop thread exited");
            })
            .map_err(|err| DbError::EventLoop(format!("failed to spawn loop thread: {err}")))?;

        info!(id = %handle.id, name = %handle.name, "event loop started");
        Ok(Self {
            handle,
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }

    #[must_use]
    pub fn handle(&self) -> &EventLoopHandle {
        &self.handle
    }

    /// Stop the loop and wait for its thread to exit. Work still queued on the
    /// loop is dropped, which fails any pending promise with
    /// `PromiseAbandoned`.
    ///
    /// # Errors
    /// Returns `DbError::EventLoop` when called from the loop's own thread or if
    /// the loop thread panicked.
    pub fn shutdown_gracefully(mut self) -> Result<(), DbError> {
        if self.handle.in_event_loop() {
            return Err(DbError::EventLoop(
                "an event loop cannot be stopped from its own thread".into(),
            ));
        }
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            thread.join().map_err(|_| {
                DbError::EventLoop(format!("event loop {} panicked", self.handle.id))
            })?;
        }
        info!(id = %self.handle.id, "event loop stopped");
        Ok(())
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// A fixed set of event loops handed out round-robin.
#[derive(Debug)]
pub struct EventLoopGroup {
    loops: Vec<EventLoop>,
    next: AtomicUsize,
}

impl EventLoopGroup {
    /// Start `count` loops (at least one).
    ///
    /// # Errors
    /// Returns `DbError::EventLoop` if any loop fails to start.
    pub fn new(count: usize) -> Result<Self, DbError> {
        let count = count.max(1);
        let mut loops = Vec::with_capacity(count);
        for idx in 0..count {
            loops.push(EventLoop::spawn(format!("sql-gateway-loop-{idx}"))?);
        }
        Ok(Self {
            loops,
            next: AtomicUsize::new(0),
        })
    }

    /// The next loop in round-robin order.
    #[must_use]
    pub fn next(&self) -> EventLoopHandle {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.loops.len();
        self.loops[idx].handle().clone()
    }

    pub fn handles(&self) -> impl Iterator<Item = &EventLoopHandle> {
        self.loops.iter().map(EventLoop::handle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Stop every loop, reporting the first failure.
    ///
    /// # Errors
    /// See [`EventLoop::shutdown_gracefully`].
    pub fn shutdown_gracefully(self) -> Result<(), DbError> {
        let mut first_err = None;
        for event_loop in self.loops {
            if let Err(err) = event_loop.shutdown_gracefully() {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn spawned_work_runs_on_the_loop_thread() {
        let event_loop = EventLoop::spawn("test-loop").unwrap();
        let handle = event_loop.handle().clone();
        assert!(!handle.in_event_loop());

        let (tx, rx) = mpsc::channel();
        let observed = handle.clone();
        handle.execute(move || {
            let name = thread::current().name().map(str::to_owned);
            tx.send((observed.in_event_loop(), name)).unwrap();
        });
        let (in_loop, name) = rx.recv().unwrap();
        assert!(in_loop);
        assert_eq!(name.as_deref(), Some("test-loop"));

        event_loop.shutdown_gracefully().unwrap();
    }

    #[test]
    fn group_hands_out_loops_round_robin() {
        let group = EventLoopGroup::new(2).unwrap();
        let first = group.next();
        let second = group.next();
        let third = group.next();
        assert_ne!(first.id(), second.id());
        assert_eq!(first, third);
        assert_eq!(group.len(), 2);
        group.shutdown_gracefully().unwrap();
    }

    #[test]
    fn current_is_none_off_loop() {
        assert!(EventLoopHandle::current().is_none());
    }
}
