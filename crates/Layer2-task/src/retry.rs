//! Bounded polling with a fixed interval
//!
//! The sleep is an injected capability so callers can drive the loop
//! without real time passing.

use async_trait::async_trait;
use ecs_task_foundation::{LogGroupWait, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Polling budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Checks after the first one
    pub max_retries: u32,

    /// Delay before each retry
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 60,
            interval: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_retries,
            interval,
        }
    }

    /// Single check, never sleeps
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            interval: Duration::ZERO,
        }
    }

    /// Upper bound on the time spent sleeping
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_retries
    }
}

impl From<LogGroupWait> for RetryPolicy {
    fn from(wait: LogGroupWait) -> Self {
        Self::new(wait.max_retries, wait.interval())
    }
}

/// Sleep capability
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `check` until it returns `true` or the budget is spent.
///
/// Returns `Ok(false)` on exhaustion. Errors from `check` stop the loop
/// and propagate.
pub async fn poll_until<F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    operation_name: &str,
    mut check: F,
) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    if check().await? {
        return Ok(true);
    }

    for attempt in 1..=policy.max_retries {
        sleeper.sleep(policy.interval).await;
        if check().await? {
            debug!("{}: satisfied after {} retries", operation_name, attempt);
            return Ok(true);
        }
    }

    warn!(
        "{}: gave up after {} retries ({:?})",
        operation_name,
        policy.max_retries,
        policy.max_wait()
    );
    Ok(false)
}
