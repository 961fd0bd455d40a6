//! Bounded retry with exponential backoff.
//!
//! Sized for the token exchange clients: a handful of attempts, a caller
//! predicate deciding which failures are worth retrying, and no jitter (the
//! flows here are user-interactive, not fleet-scale).

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Retry behavior for a single logical operation.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Additional attempts after the first failure.
    pub retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { retries: 2, initial_delay: Duration::from_millis(500), backoff_factor: 2 }
    }
}

/// Execute `operation`, retrying while the predicate allows it.
///
/// The predicate receives the failure and the zero-based attempt index; it
/// is consulted only while attempts remain. The final error is returned
/// unchanged — mapping into the error taxonomy happens at the call site.
pub async fn execute<T, E, F, Fut, P>(
    config: &RetryConfig,
    mut operation: F,
    mut should_retry: P,
) -> Result<T, E>
where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E, u32) -> bool,
{
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let allow = attempt < config.retries && should_retry(&error, attempt);
                if !allow {
                    return Err(error);
                }

                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                delay *= config.backoff_factor;
            }
        }
    }
}
