//! Inference Retry Logic
//!
//! Bounded exponential-backoff retry for transient inference failures.
//! Inference calls have no side effects on the provider, so repeating one is
//! safe.

use std::time::{Duration, Instant};

use crate::services::inference_client::InferenceError;

/// Retry bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = single attempt)
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retry
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    pub fn from_config(config: &vsi_common::config::AnalysisConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.retry_initial_backoff_ms),
            max_backoff: Duration::from_millis(config.retry_max_backoff_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

/// Run `operation`, retrying retryable inference errors per `policy`
///
/// **Algorithm:**
/// 1. Attempt operation
/// 2. On success, return result
/// 3. On a retryable error with retries left: log WARN, back off, retry
/// 4. Otherwise return the error
///
/// Backoff doubles after each attempt, capped at `policy.max_backoff`.
pub async fn retry_transient<F, Fut, T>(
    operation_name: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, InferenceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, InferenceError>>,
{
    let start_time = Instant::now();
    let mut attempt: u32 = 0;
    let mut backoff = policy.initial_backoff;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Inference call succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                let retries_used = attempt - 1;
                if !err.is_retryable() || retries_used >= policy.max_retries {
                    if attempt > 1 {
                        tracing::error!(
                            operation = operation_name,
                            attempt,
                            error = %err,
                            "Inference call failed: retries exhausted"
                        );
                    }
                    return Err(err);
                }

                let delay = backoff.min(policy.max_backoff);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    error = %err,
                    backoff_ms = delay.as_millis() as u64,
                    "Transient inference failure, will retry after backoff"
                );

                tokio::time::sleep(delay).await;
                backoff = backoff.saturating_mul(2).min(policy.max_backoff);
            }
        }
    }
}
