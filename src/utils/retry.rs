use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::metrics::Metrics;

// ============================================================================
// Exponential Backoff Retry Strategy
// ============================================================================
//
// Generic bounded retry: knows nothing about orders or messages. The delay
// starts at `initial_delay`, is multiplied after every failed attempt and is
// capped at `max_delay`. There is no sleep after the final attempt.
//
// ============================================================================

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay slept after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let mut delay = self.initial_delay.min(self.max_delay);
        for _ in 1..attempt {
            delay = self.next_delay(delay);
        }
        delay
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::from_millis(((delay.as_millis() as f64) * self.multiplier) as u64).min(self.max_delay)
    }
}

/// All attempts failed; carries the error of the last one.
#[derive(Debug, thiserror::Error)]
#[error("Operation failed after {attempts} attempts: {last_error}")]
pub struct RetryExhausted<E>
where
    E: std::error::Error + 'static,
{
    pub attempts: u32,
    #[source]
    pub last_error: E,
}

/// Execute an operation with exponential backoff retry.
///
/// The closure receives the 1-based attempt number. `max_attempts` of zero
/// is treated as one.
pub async fn retry_with_backoff<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    let mut delay = config.initial_delay.min(config.max_delay);

    loop {
        attempt += 1;

        tracing::debug!(attempt = attempt, max_attempts = max_attempts, "Attempting operation");

        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(error) => {
                if attempt >= max_attempts {
                    tracing::error!(
                        attempt = attempt,
                        error = %error,
                        "Operation failed after all retries"
                    );
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: error,
                    });
                }

                tracing::warn!(
                    attempt = attempt,
                    max_attempts = max_attempts,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Operation failed, retrying after delay"
                );

                sleep(delay).await;
                delay = config.next_delay(delay);
            }
        }
    }
}

/// Retry runner bound to one configuration, reporting attempts to metrics
/// under an operation label.
#[derive(Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
    metrics: Option<Arc<Metrics>>,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Runs `operation` with the configured attempt budget.
    pub async fn execute<F, Fut, T, E>(&self, operation_name: &str, operation: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        self.execute_with_retry(operation_name, self.config.max_attempts, operation)
            .await
    }

    /// Runs `operation` with an explicit attempt budget.
    pub async fn execute_with_retry<F, Fut, T, E>(
        &self,
        operation_name: &str,
        max_attempts: u32,
        mut operation: F,
    ) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        let config = self.config.clone().with_max_attempts(max_attempts);
        let metrics = self.metrics.clone();

        let result = retry_with_backoff(&config, |attempt| {
            if let Some(metrics) = &metrics {
                metrics.record_retry_attempt(operation_name, attempt);
            }
            operation(attempt)
        })
        .await;

        if let Some(metrics) = &self.metrics {
            metrics.record_retry_outcome(operation_name, result.is_ok());
        }
        result
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct Flaky(&'static str);

    // the paused clock jumps straight to each timer deadline
    fn assert_slept(started: Instant, expected_ms: u64) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= Duration::from_millis(expected_ms) && elapsed < Duration::from_millis(expected_ms + 5),
            "expected ~{expected_ms}ms of backoff, got {elapsed:?}"
        );
    }

    fn config(initial_ms: u64, max_ms: u64) -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(initial_ms),
            max_delay: Duration::from_millis(max_ms),
            multiplier: 2.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_on_third_attempt_after_two_sleeps() {
        let started = Instant::now();
        let attempt_times = std::sync::Mutex::new(Vec::new());

        let result = retry_with_backoff(&config(100, 10_000), |attempt| {
            attempt_times.lock().unwrap().push(started.elapsed().as_millis());
            async move {
                if attempt < 3 {
                    Err(Flaky("temporary failure"))
                } else {
                    Ok("success")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "success");
        // sleeps of d then 2d on the paused clock
        assert_eq!(*attempt_times.lock().unwrap(), vec![0, 100, 300]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_capped() {
        let started = Instant::now();
        let result = retry_with_backoff(&config(100, 150), |_| async { Err::<(), _>(Flaky("down")) }).await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_slept(started, 250);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_fails_after_max_attempts_with_last_error() {
        let counter = AtomicU32::new(0);
        let result = retry_with_backoff(&config(10, 100).with_max_attempts(2), |attempt| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                Err::<(), _>(if attempt == 1 { Flaky("first") } else { Flaky("last") })
            }
        })
        .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 2);
        assert_eq!(exhausted.last_error.0, "last");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(exhausted.to_string().contains("after 2 attempts"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_does_not_sleep() {
        let started = Instant::now();
        let result = retry_with_backoff(&config(1_000, 60_000), |_| async { Ok::<_, Flaky>(7) }).await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_runs_once() {
        let counter = AtomicU32::new(0);
        let result = retry_with_backoff(&config(10, 100).with_max_attempts(0), |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(Flaky("nope")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_schedule() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.delay_after(1), Duration::from_secs(1));
        assert_eq!(cfg.delay_after(2), Duration::from_secs(2));
        assert_eq!(cfg.delay_after(3), Duration::from_secs(4));
        assert_eq!(cfg.delay_after(10), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_executor_records_attempts() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let executor = RetryExecutor::new(config(10, 100)).with_metrics(metrics.clone());

        let result = executor
            .execute("receive_confirmed", |attempt| async move {
                if attempt < 2 { Err(Flaky("once")) } else { Ok(attempt) }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(metrics.retry_attempt_count("receive_confirmed"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_executor_explicit_budget_overrides_config() {
        let executor = RetryExecutor::new(config(10, 100));
        let counter = AtomicU32::new(0);

        let result = executor
            .execute_with_retry("op", 5, |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(Flaky("down")) }
            })
            .await;

        assert_eq!(result.unwrap_err().attempts, 5);
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }
}
