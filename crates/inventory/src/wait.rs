//! Waiting on long-running export operations.

use std::thread;
use std::time::{Duration, Instant};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::observer::ExportObserver;
use crate::types::{CancellationToken, ExportOperation, OperationStatus, WaitOptions};

/// Longest uninterrupted sleep; cancellation is checked between slices.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Poll an operation until it finishes.
///
/// `polls` is updated after every poll, so it holds the count whether the
/// wait succeeds or not. Fails with [`Error::Operation`] when the job
/// reports an error, [`Error::Timeout`] when `options.timeout` elapses
/// first, or [`Error::Cancelled`] once the token is cancelled. Backend
/// errors while polling are returned as-is.
pub fn wait_for_operation(
    backend: &dyn Backend,
    operation: &ExportOperation,
    options: &WaitOptions,
    cancel: &CancellationToken,
    observer: &dyn ExportObserver,
    polls: &mut u32,
) -> Result<()> {
    let started = Instant::now();
    // A deadline past the end of `Instant` is no deadline
    let deadline = options.timeout.and_then(|t| started.checked_add(t));
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                operation: operation.name.clone(),
            });
        }

        // Poll immediately the first time; the job may already be done
        let status = backend.poll(operation)?;
        attempt = attempt.saturating_add(1);
        *polls = attempt;
        observer.on_poll(operation.content_type, &operation.name, attempt);

        match status {
            OperationStatus::Succeeded => return Ok(()),
            OperationStatus::Failed { code, message } => {
                return Err(Error::Operation {
                    operation: operation.name.clone(),
                    code,
                    message,
                });
            }
            OperationStatus::Running => {}
        }

        let mut delay = options.delay_for_poll(attempt - 1);
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Timeout {
                    operation: operation.name.clone(),
                    elapsed: started.elapsed(),
                });
            }
            delay = delay.min(deadline - now);
        }

        sleep_cancellable(delay, cancel);
    }
}

/// Sleep for `duration`, returning early if the token is cancelled.
fn sleep_cancellable(duration: Duration, cancel: &CancellationToken) {
    let until = Instant::now().checked_add(duration);
    loop {
        if cancel.is_cancelled() {
            return;
        }
        let now = Instant::now();
        let remaining = match until {
            Some(until) if now >= until => return,
            Some(until) => until - now,
            None => SLEEP_SLICE,
        };
        thread::sleep(remaining.min(SLEEP_SLICE));
    }
}
