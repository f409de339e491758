//! Single-completion deferred values bound to an event loop.
//!
//! A [`Promise`] is the write side and a [`Deferred`] the read side of one
//! outcome. Completing the promise consumes it, so a deferred can never see
//! both a value and an error. Completion always happens on the bound loop:
//! a promise completed from a foreign thread (a worker, another loop) hops
//! onto its loop before delivering.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::DbError;
use crate::event_loop::EventLoopHandle;

type Outcome<T> = Result<T, DbError>;

/// Write side of a [`Deferred`].
pub struct Promise<T> {
    event_loop: EventLoopHandle,
    sender: oneshot::Sender<Outcome<T>>,
}

impl<T> Promise<T>
where
    T: Send + 'static,
{
    pub(crate) fn new(event_loop: EventLoopHandle) -> (Promise<T>, Deferred<T>) {
        let (sender, receiver) = oneshot::channel();
        let promise = Promise {
            event_loop: event_loop.clone(),
            sender,
        };
        (
            promise,
            Deferred {
                event_loop,
                receiver,
            },
        )
    }

    #[must_use]
    pub fn event_loop(&self) -> &EventLoopHandle {
        &self.event_loop
    }

    pub fn succeed(self, value: T) {
        self.complete(Ok(value));
    }

    pub fn fail(self, err: DbError) {
        self.complete(Err(err));
    }

    pub fn complete(self, outcome: Outcome<T>) {
        let Promise { event_loop, sender } = self;
        if event_loop.in_event_loop() {
            let _ = sender.send(outcome);
        } else {
            event_loop.execute(move || {
                let _ = sender.send(outcome);
            });
        }
    }

    /// Complete this promise with whatever `other` completes with.
    pub fn complete_with(self, other: Deferred<T>) {
        let event_loop = self.event_loop.clone();
        event_loop.spawn(async move {
            self.complete(other.await);
        });
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("event_loop", &self.event_loop.id())
            .finish_non_exhaustive()
    }
}

/// A value that becomes available later, bound to one event loop.
///
/// `Deferred` is a [`Future`], so it can simply be awaited. Continuations
/// registered through [`map`](Deferred::map), [`and_then`](Deferred::and_then)
/// and [`when_complete`](Deferred::when_complete) run on the bound loop.
#[must_use = "a deferred result does nothing unless awaited or observed"]
pub struct Deferred<T> {
    event_loop: EventLoopHandle,
    receiver: oneshot::Receiver<Outcome<T>>,
}

impl<T> Deferred<T>
where
    T: Send + 'static,
{
    #[must_use]
    pub fn event_loop(&self) -> &EventLoopHandle {
        &self.event_loop
    }

    pub fn map<U, F>(self, func: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let event_loop = self.event_loop.clone();
        let (promise, deferred) = event_loop.make_promise();
        event_loop.spawn(async move {
            promise.complete(self.await.map(func));
        });
        deferred
    }

    pub fn try_map<U, F>(self, func: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U, DbError> + Send + 'static,
    {
        let event_loop = self.event_loop.clone();
        let (promise, deferred) = event_loop.make_promise();
        event_loop.spawn(async move {
            promise.complete(self.await.and_then(func));
        });
        deferred
    }

    /// Chain another deferred computation; the result is bound to this loop
    /// even if `func` returns a deferred bound elsewhere.
    pub fn and_then<U, F>(self, func: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Deferred<U> + Send + 'static,
    {
        let event_loop = self.event_loop.clone();
        let (promise, deferred) = event_loop.make_promise();
        event_loop.spawn(async move {
            let outcome = match self.await {
                Ok(value) => func(value).await,
                Err(err) => Err(err),
            };
            promise.complete(outcome);
        });
        deferred
    }

    /// Re-bind the outcome to another loop.
    pub fn hop_to(self, target: &EventLoopHandle) -> Deferred<T> {
        if target.id() == self.event_loop.id() {
            return self;
        }
        let (promise, deferred) = target.make_promise();
        promise.complete_with(self);
        deferred
    }

    /// Observe the outcome on the bound loop.
    pub fn when_complete<F>(self, func: F)
    where
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        let event_loop = self.event_loop.clone();
        event_loop.spawn(async move {
            func(self.await);
        });
    }

    /// Block the calling thread until the outcome is available.
    ///
    /// # Errors
    /// Returns the deferred's failure, or `DbError::EventLoop` without
    /// blocking when called from a thread that drives an async runtime.
    pub fn wait(self) -> Outcome<T> {
        if tokio::runtime::Handle::try_current().is_ok() || EventLoopHandle::current().is_some() {
            return Err(DbError::EventLoop(
                "Deferred::wait would block a runtime thread; await it instead".into(),
            ));
        }
        self.receiver
            .blocking_recv()
            .unwrap_or_else(|_| Err(DbError::PromiseAbandoned))
    }
}

impl<T> Future for Deferred<T> {
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(DbError::PromiseAbandoned)))
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("event_loop", &self.event_loop.id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::{EventLoop, EventLoopId};
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn completes_once_with_value() {
        let event_loop = EventLoop::spawn("deferred-value").unwrap();
        let (promise, deferred) = event_loop.handle().make_promise::<i32>();
        promise.succeed(7);
        assert_eq!(deferred.wait().unwrap(), 7);
        event_loop.shutdown_gracefully().unwrap();
    }

    #[test]
    fn dropped_promise_fails_with_abandoned() {
        let event_loop = EventLoop::spawn("deferred-abandoned").unwrap();
        let (promise, deferred) = event_loop.handle().make_promise::<()>();
        drop(promise);
        assert!(matches!(deferred.wait(), Err(DbError::PromiseAbandoned)));
        event_loop.shutdown_gracefully().unwrap();
    }

    #[test]
    fn continuations_run_on_bound_loop_after_foreign_completion() {
        let event_loop = EventLoop::spawn("deferred-origin").unwrap();
        let origin = event_loop.handle().id();
        let (promise, deferred) = event_loop.handle().make_promise::<u8>();

        let (tx, rx) = mpsc::channel::<(Option<EventLoopId>, Result<u8, DbError>)>();
        deferred
            .map(|v| v + 1)
            .when_complete(move |outcome| {
                tx.send((EventLoopHandle::current_id(), outcome)).unwrap();
            });

        thread::spawn(move || promise.succeed(41)).join().unwrap();

        let (seen_on, outcome) = rx.recv().unwrap();
        assert_eq!(seen_on, Some(origin));
        assert_eq!(outcome.unwrap(), 42);
        event_loop.shutdown_gracefully().unwrap();
    }

    #[test]
    fn and_then_rebinds_to_original_loop() {
        let first = EventLoop::spawn("deferred-first").unwrap();
        let second = EventLoop::spawn("deferred-second").unwrap();
        let other = second.handle().clone();

        let chained = first
            .handle()
            .make_succeeded(2_u32)
            .and_then(move |v| other.make_succeeded(v * 10));
        assert_eq!(chained.event_loop().id(), first.handle().id());
        assert_eq!(chained.wait().unwrap(), 20);

        let hopped = first.handle().make_failed::<u32>(DbError::PoolInactive);
        let hopped = hopped.hop_to(second.handle());
        assert_eq!(hopped.event_loop().id(), second.handle().id());
        assert!(matches!(hopped.wait(), Err(DbError::PoolInactive)));

        first.shutdown_gracefully().unwrap();
        second.shutdown_gracefully().unwrap();
    }

    #[test]
    fn wait_refuses_inside_runtime() {
        let event_loop = EventLoop::spawn("deferred-wait").unwrap();
        let deferred = event_loop.handle().make_succeeded(1_u8);
        let rt = tokio::runtime::Runtime::new().unwrap();
        let outcome = rt.block_on(async move { deferred.wait() });
        assert!(matches!(outcome, Err(DbError::EventLoop(_))));
        event_loop.shutdown_gracefully().unwrap();
    }
}
