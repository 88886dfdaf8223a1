//! Retry policy for transient failures
//!
//! Wraps any call that might fail transiently: pushing a batch to a remote
//! endpoint, notifying an audit subscriber, connecting to the database. A
//! policy holds a bounded attempt count, an ordered list of backoff delays
//! indexed by attempt (the last delay is reused once attempts run past the
//! list) and a predicate classifying errors as retryable or fatal.
//!
//! No jitter and no cancellation are built in; the inter-attempt sleep
//! blocks only the calling task.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::storage::error::StorageError;

/// Error returned by [`RetryPolicy::run`].
#[derive(Debug)]
pub enum RetryError<E> {
    /// The predicate classified the error as fatal; no retry was attempted.
    Fatal(E),

    /// The attempt budget ran out; wraps the last underlying cause.
    Exhausted { attempts: usize, last: E },
}

impl<E> RetryError<E> {
    /// The underlying error, dropping attempt bookkeeping.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal(err) => err,
            RetryError::Exhausted { last, .. } => last,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Fatal(err) => write!(f, "{err}"),
            RetryError::Exhausted { attempts, last } => {
                write!(f, "after {attempts} attempts operation failed, last error: {last}")
            }
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetryError::Fatal(err) => Some(err),
            RetryError::Exhausted { last, .. } => Some(last),
        }
    }
}

/// Bounded retry with per-attempt delays and an error classifier.
pub struct RetryPolicy<E> {
    max_retries: usize,
    delays: Vec<Duration>,
    should_retry: Box<dyn Fn(&E) -> bool + Send + Sync>,
}

impl<E: fmt::Display> RetryPolicy<E> {
    pub fn new(
        max_retries: usize,
        delays: Vec<Duration>,
        should_retry: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            max_retries,
            delays,
            should_retry: Box::new(should_retry),
        }
    }

    /// Policy for outbound pushes and audit notifications: every error is
    /// worth retrying.
    pub fn for_push() -> Self {
        Self::new(3, standard_delays(), |_| true)
    }

    fn delay_for(&self, attempt: usize) -> Option<Duration> {
        self.delays
            .get(attempt)
            .or_else(|| self.delays.last())
            .copied()
    }

    /// Run `op`, retrying per the policy.
    ///
    /// Success returns immediately. A fatal error (per the predicate)
    /// returns immediately without sleeping. A retryable error sleeps the
    /// current attempt's delay and tries again until the attempt budget is
    /// spent.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.max_retries.max(1);
        let mut attempt = 1;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !(self.should_retry)(&err) {
                return Err(RetryError::Fatal(err));
            }

            warn!("attempt {attempt}/{attempts} failed: {err}");

            if let Some(delay) = self.delay_for(attempt - 1) {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            if attempt >= attempts {
                return Err(RetryError::Exhausted {
                    attempts,
                    last: err,
                });
            }
            attempt += 1;
        }
    }
}

impl RetryPolicy<StorageError> {
    /// Policy for database access: only connection-class failures are
    /// transient; query and constraint errors are fatal.
    pub fn for_database() -> Self {
        Self::new(3, standard_delays(), |err| {
            matches!(
                err,
                StorageError::ConnectionFailed(_) | StorageError::Io(_)
            )
        })
    }
}

fn standard_delays() -> Vec<Duration> {
    vec![
        Duration::from_secs(1),
        Duration::from_secs(3),
        Duration::from_secs(5),
    ]
}
