//! Polling waits.
//!
//! Every wait in the crate is built on [`wait_for_function`]: an async
//! predicate is invoked immediately and then once per poll interval until it
//! reports `true`. The budget is a wall-clock deadline fixed when the wait
//! starts. When it passes, the wait fails with [`TypebenchError::Timeout`]
//! even if a predicate call is still in flight; that call's future is dropped.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::result::{TypebenchError, TypebenchResult};

/// Default timeout for wait operations (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Options for wait operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl From<Duration> for WaitOptions {
    fn from(timeout: Duration) -> Self {
        Self::new().with_timeout(duration_ms(timeout))
    }
}

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of predicate invocations, including the satisfying one
    pub attempts: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

impl WaitResult {
    /// Create a wait result
    #[must_use]
    pub fn new(elapsed: Duration, attempts: u32, waited_for: impl Into<String>) -> Self {
        Self {
            elapsed,
            attempts,
            waited_for: waited_for.into(),
        }
    }
}

/// Poll `predicate` every 100ms until it returns `true` or `timeout` elapses.
///
/// Errors returned by the predicate end the wait immediately.
pub async fn wait_for_function<F, Fut>(predicate: F, timeout: Duration) -> TypebenchResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TypebenchResult<bool>>,
{
    wait_for_function_with(predicate, &WaitOptions::from(timeout), "custom function").await
}

/// Poll `predicate` with explicit options and a description for logs.
pub async fn wait_for_function_with<F, Fut>(
    mut predicate: F,
    options: &WaitOptions,
    description: &str,
) -> TypebenchResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TypebenchResult<bool>>,
{
    let ((), result) = wait_for_value(
        || {
            let check = predicate();
            async move { check.await.map(|ready| ready.then_some(())) }
        },
        options,
        description,
    )
    .await?;
    Ok(result)
}

/// Poll `probe` until it yields `Some(value)`, returning the value.
///
/// Same deadline and interval rules as [`wait_for_function`]; this is the
/// form used when the satisfying poll also produces something, such as the
/// element a selector matched.
pub async fn wait_for_value<T, F, Fut>(
    mut probe: F,
    options: &WaitOptions,
    description: &str,
) -> TypebenchResult<(T, WaitResult)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TypebenchResult<Option<T>>>,
{
    let start = Instant::now();
    let deadline = start + options.timeout();
    let interval = options.poll_interval();

    let polling = async {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            if let Some(value) = probe().await? {
                return Ok::<(T, u32), TypebenchError>((value, attempts));
            }
            tokio::time::sleep(interval).await;
        }
    };

    match tokio::time::timeout_at(deadline, polling).await {
        Ok(Ok((value, attempts))) => {
            let elapsed = start.elapsed();
            debug!(waited_for = description, attempts, ?elapsed, "wait satisfied");
            Ok((value, WaitResult::new(elapsed, attempts, description)))
        }
        Ok(Err(err)) => Err(err),
        Err(_) => {
            debug!(waited_for = description, timeout_ms = options.timeout_ms, "wait timed out");
            Err(TypebenchError::Timeout {
                ms: options.timeout_ms,
            })
        }
    }
}

/// Milliseconds in a duration, saturating at `u64::MAX`
#[must_use]
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
