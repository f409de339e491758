use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::deferred::Promise;
use crate::error::DbError;

/// A unit of work queued for a worker thread.
pub(super) trait Job: Send {
    /// Execute the task and deliver its outcome.
    fn run(self: Box<Self>);

    /// Deliver `PoolInactive` without executing the task.
    fn reject(self: Box<Self>);
}

pub(super) struct Work<T, F> {
    pub(super) task: F,
    pub(super) promise: Promise<T>,
}

impl<T, F> Job for Work<T, F>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DbError> + Send + 'static,
{
    fn run(self: Box<Self>) {
        let Work { task, promise } = *self;
        let outcome = match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(outcome) => outcome,
            Err(payload) => Err(DbError::TaskPanicked(panic_message(payload.as_ref()))),
        };
        promise.complete(outcome);
    }

    fn reject(self: Box<Self>) {
        self.promise.fail(DbError::PoolInactive);
    }
}

pub(super) enum Command {
    Run(Box<dyn Job>),
    Shutdown,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
