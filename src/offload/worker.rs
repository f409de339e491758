use std::sync::Mutex;
use std::sync::mpsc::Receiver;

use tracing::trace;

use super::channel::Command;

pub(super) fn run_worker(receiver: &Mutex<Receiver<Command>>) {
    loop {
        // Only held across `recv`, so the lock is never poisoned by a task.
        let command = {
            let guard = match receiver.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.recv()
        };

        match command {
            Ok(Command::Run(job)) => job.run(),
            Ok(Command::Shutdown) | Err(_) => break,
        }
    }
    trace!("offload worker exiting");
}
