//! Bounded retry for operations that may fail transiently.
//!
//! Used by the janitor for paths that are briefly locked or busy.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (at least 1).
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryPolicy {
    /// Fixed pause of `delay` between at most `max_attempts` attempts.
    pub fn fixed(operation_name: impl Into<String>, max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            operation_name: operation_name.into(),
        }
    }
}

/// Result of a retried operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded.
    Success { value: T, attempts: u32 },
    /// Operation failed on every allowed attempt.
    Failed { error: E, attempts: u32 },
}

/// Run `operation` until it succeeds or the policy's attempts are used up.
///
/// ```ignore
/// let policy = RetryPolicy::fixed("remove_path", 3, Duration::from_secs(1));
/// let result = retry_async(&policy, || tokio::fs::remove_file(&path)).await;
/// ```
pub async fn retry_async<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                return RetryResult::Success {
                    value,
                    attempts: attempt,
                }
            }
            Err(e) if attempt < max_attempts => {
                debug!(
                    "{} attempt {}/{} failed, retrying in {:?}: {}",
                    policy.operation_name, attempt, max_attempts, policy.delay, e
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                return RetryResult::Failed {
                    error: e,
                    attempts: attempt,
                }
            }
        }
    }
}
