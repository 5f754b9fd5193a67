//! Bounded retry and polling helpers.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{DirectoryError, DirectoryErrorKind, DirectoryResult};

/// Attempt ceiling and fixed backoff for [`retry_on_specific_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

/// Re-run `op` while it fails with `kind`.
///
/// Any other error is returned immediately. After `policy.max_attempts`
/// failures of `kind` the last one is wrapped in `RetriesExhausted`.
pub async fn retry_on_specific_error<T, F, Fut>(
    policy: RetryPolicy,
    kind: DirectoryErrorKind,
    mut op: F,
) -> DirectoryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DirectoryResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.kind() == kind => {
                if attempt >= max_attempts {
                    warn!(%kind, attempts = attempt, error = %e, "giving up");
                    return Err(DirectoryError::RetriesExhausted {
                        kind,
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                debug!(%kind, attempt, backoff_ms = policy.backoff.as_millis() as u64, "retrying");
                sleep(policy.backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Poll `predicate` up to `max_attempts` times, `interval` apart.
///
/// Returns whether it ever held. A `false` only means the condition was not
/// observed in time.
pub async fn wait_until_or_timeout<F, Fut>(max_attempts: u32, interval: Duration, mut predicate: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 1..=max_attempts {
        if predicate().await {
            return true;
        }
        if attempt < max_attempts {
            sleep(interval).await;
        }
    }
    false
}
