use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::item::{ClipItem, ItemKey};

/// Persistent store behind the list. Every call may fail.
pub trait Backend {
    /// Full snapshot in canonical order.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<ClipItem>, BackendError>>;
    /// Moves an item to `to_index` within its scope (collection or group).
    fn move_item(&self, key: &ItemKey, to_index: usize) -> impl Future<Output = Result<(), BackendError>>;
    fn delete_item(&self, key: &ItemKey) -> impl Future<Output = Result<(), BackendError>>;
    fn move_item_to_group(&self, key: &ItemKey, group_id: &str) -> impl Future<Output = Result<(), BackendError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// IPC or network hiccup.
    Transport(String),
    Rejected { command: &'static str, reason: String },
    NotFound { key: ItemKey },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(reason) => write!(f, "backend unreachable: {reason}"),
            Self::Rejected { command, reason } => write!(f, "{command} rejected: {reason}"),
            Self::NotFound { key } => write!(f, "item {key} not found"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Bounded retry with a fixed backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    /// A single attempt, no backoff.
    pub const fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(200))
    }
}

/// Runs `op` until it succeeds or the policy is exhausted.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, command: &'static str, mut op: F) -> Result<T, BackendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(command, attempt, "backend call recovered");
                }
                return Ok(value);
            }
            Err(err) if attempt < attempts => {
                tracing::warn!(command, attempt, error = %err, "backend call failed, retrying");
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::warn!(command, attempt, error = %err, "backend call failed, giving up");
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tracing_test::traced_test;

    fn flaky(failures: u32, calls: &Cell<u32>) -> impl Future<Output = Result<u32, BackendError>> + '_ {
        let n = calls.get() + 1;
        calls.set(n);
        async move {
            if n <= failures {
                Err(BackendError::Transport(format!("attempt {n}")))
            } else {
                Ok(n)
            }
        }
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn succeeds_on_third_attempt_after_backoff() {
        let calls = Cell::new(0);
        let start = tokio::time::Instant::now();
        let result = retry(RetryPolicy::default(), "fetch_all", || flaky(2, &calls)).await;
        assert_eq!(result, Ok(3));
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(400) && waited < Duration::from_secs(1));
        assert!(logs_contain("retrying"));
        assert!(logs_contain("recovered"));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_policy_attempts() {
        let calls = Cell::new(0);
        let result = retry(RetryPolicy::default(), "fetch_all", || flaky(10, &calls)).await;
        assert!(matches!(result, Err(BackendError::Transport(_))));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn single_attempt_policy_does_not_sleep() {
        let calls = Cell::new(0);
        let result = retry(RetryPolicy::once(), "move_item", || flaky(1, &calls)).await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
