use std::future::Future;
use std::time::Duration;

use crate::config::RunConfig;
use crate::error::WorkerError;
use crate::plan::RetryOverride;

/// Exponential backoff policy applied to a single task execution.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
    /// Deadline for one attempt; an expired attempt counts as a failure.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(10_000),
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Run-level defaults: attempt budget from error handling, delays from `[run.retry]`.
    pub fn from_run_config(cfg: &RunConfig) -> Self {
        Self {
            max_retries: cfg.error_handling.max_retries,
            base_delay: Duration::from_millis(cfg.retry.base_delay_ms),
            backoff_multiplier: cfg.retry.backoff_multiplier,
            max_delay: Duration::from_millis(cfg.retry.max_delay_ms),
            attempt_timeout: cfg.task_timeout_ms.map(Duration::from_millis),
        }
    }

    /// Apply a per-step override on top of these defaults.
    pub fn merged(&self, overrides: Option<&RetryOverride>) -> Self {
        let Some(o) = overrides else {
            return self.clone();
        };
        Self {
            max_retries: o.max_retries.unwrap_or(self.max_retries),
            base_delay: o
                .base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(self.base_delay),
            backoff_multiplier: o.backoff_multiplier.unwrap_or(self.backoff_multiplier),
            max_delay: o
                .max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(self.max_delay),
            attempt_timeout: self.attempt_timeout,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// `min(base_delay * backoff_multiplier^attempt, max_delay)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let ms = self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(exp);
        let max_ms = self.max_delay.as_millis() as f64;
        if !ms.is_finite() || ms >= max_ms {
            return self.max_delay;
        }
        Duration::from_millis(ms.max(0.0).round() as u64)
    }
}

/// Result of driving an operation through [`retry_with_backoff`].
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, WorkerError>,
    pub attempts: u32,
}

impl<T> RetryOutcome<T> {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Invoke `op` until it succeeds or the retry budget is spent.
///
/// `op` receives the zero-based attempt number. Before each backoff sleep
/// `on_retry(attempt, &error, delay)` is called. The last error is returned
/// untouched; recording it is the caller's job.
pub async fn retry_with_backoff<T, F, Fut, R>(
    policy: &RetryPolicy,
    mut op: F,
    mut on_retry: R,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, WorkerError>>,
    R: FnMut(u32, &WorkerError, Duration),
{
    let mut attempt: u32 = 0;
    loop {
        let result = match policy.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, op(attempt))
                .await
                .unwrap_or_else(|_| Err(WorkerError::Timeout(limit.as_millis() as u64))),
            None => op(attempt).await,
        };

        match result {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt + 1,
                }
            }
            Err(err) if attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                on_retry(attempt, &err, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                return RetryOutcome {
                    result: Err(err),
                    attempts: attempt + 1,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(8000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(10_000));
        assert_eq!(policy.delay_for(200), Duration::from_millis(10_000));
    }

    #[test]
    fn test_override_merge() {
        let base = RetryPolicy::from_run_config(&RunConfig::default());
        assert_eq!(base, RetryPolicy::default());

        let merged = base.merged(Some(&RetryOverride {
            max_retries: Some(0),
            base_delay_ms: Some(50),
            ..Default::default()
        }));
        assert_eq!(merged.max_retries, 0);
        assert_eq!(merged.base_delay, Duration::from_millis(50));
        assert_eq!(merged.max_delay, base.max_delay);
        assert_eq!(base.merged(None), base);
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_op_is_called_max_retries_plus_one_times() {
        let policy = RetryPolicy {
            max_delay: Duration::from_millis(3000),
            ..RetryPolicy::default()
        };
        let calls: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let mut announced = Vec::new();

        let outcome: RetryOutcome<()> = retry_with_backoff(
            &policy,
            |_| {
                let calls = calls.clone();
                async move {
                    calls.lock().unwrap().push(Instant::now());
                    Err(WorkerError::failed("nope"))
                }
            },
            |attempt, _, delay| announced.push((attempt, delay)),
        )
        .await;

        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.retries(), 3);
        assert_eq!(outcome.result, Err(WorkerError::failed("nope")));

        let calls = calls.lock().unwrap();
        let gaps: Vec<u128> = calls
            .windows(2)
            .map(|w| (w[1] - w[0]).as_millis())
            .collect();
        assert_eq!(gaps, vec![1000, 2000, 3000]);
        assert_eq!(
            announced,
            vec![
                (0, Duration::from_millis(1000)),
                (1, Duration::from_millis(2000)),
                (2, Duration::from_millis(3000)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::default();
        let outcome = retry_with_backoff(
            &policy,
            |attempt| async move {
                if attempt < 2 {
                    Err(WorkerError::failed("flaky"))
                } else {
                    Ok(attempt)
                }
            },
            |_, _, _| {},
        )
        .await;
        assert_eq!(outcome.result, Ok(2));
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_single_attempt() {
        let policy = RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        };
        let outcome: RetryOutcome<()> = retry_with_backoff(
            &policy,
            |_| async { Err(WorkerError::failed("once")) },
            |_, _, _| panic!("no retry expected"),
        )
        .await;
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_attempt_is_retried_as_timeout() {
        let policy = RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(5),
            attempt_timeout: Some(Duration::from_millis(10)),
            ..RetryPolicy::default()
        };
        let outcome: RetryOutcome<()> = retry_with_backoff(
            &policy,
            |_| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(())
            },
            |_, err, _| assert_eq!(err, &WorkerError::Timeout(10)),
        )
        .await;
        assert_eq!(outcome.result, Err(WorkerError::Timeout(10)));
        assert_eq!(outcome.attempts, 2);
    }
}
