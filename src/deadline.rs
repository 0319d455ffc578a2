//! Cancellable deadline for provider calls.
//!
//! The call runs on its own tokio task and is raced against a timer. When
//! the timer wins the task is aborted. The abort lives in a drop guard, so
//! the worker is also released when the caller itself is cancelled.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::errors::{BotError, Result};

/// Result of racing a task against its deadline.
#[derive(Debug, PartialEq, Eq)]
pub enum DeadlineOutcome<T> {
    Completed(T),
    Expired,
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run `fut` on a separate task, giving up after `deadline`.
///
/// A panic inside the task is reported as an internal error rather than
/// propagated.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<DeadlineOutcome<T>>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut guard = AbortOnDrop(tokio::spawn(fut));
    match timeout(deadline, &mut guard.0).await {
        Ok(Ok(value)) => Ok(DeadlineOutcome::Completed(value)),
        Ok(Err(join_err)) => Err(BotError::Internal {
            message: "deadline-bound task did not complete".into(),
            source: Some(Box::new(join_err)),
        }),
        Err(_) => Ok(DeadlineOutcome::Expired),
    }
}
