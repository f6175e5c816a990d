//! ============================================================================
//! Deadline Combinator - Bounded waits for remote calls
//! ============================================================================
//! Every remote call races against a timer. On expiry the in-flight future
//! is dropped in place (reqwest cancels the request on drop), so a late
//! completion can never mutate caller state.
//! ============================================================================

use std::future::Future;
use std::time::Duration;

/// Default budget for a single remote call
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Outcome of a deadline-bounded operation
#[derive(Debug)]
pub enum Deadline<T> {
    /// The operation settled within the budget
    Completed(T),
    /// The budget expired; the operation was abandoned
    TimedOut,
}

impl<T> Deadline<T> {
    /// Unwrap with a fallback for the timed-out case
    pub fn unwrap_or(self, fallback: T) -> T {
        match self {
            Deadline::Completed(value) => value,
            Deadline::TimedOut => fallback,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Deadline::TimedOut)
    }
}

/// Run a future against a deadline, returning a tagged outcome instead of
/// an error. Used by every backend operation.
pub async fn with_deadline<F, T>(future: F, budget: Duration) -> Deadline<T>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(budget, future).await {
        Ok(value) => Deadline::Completed(value),
        Err(_) => Deadline::TimedOut,
    }
}
