//! Retry strategies, grounded in `retry_strategies.py`'s `RetryStrategy`
//! enum and its adaptive delay formula, reimplemented as an executor that
//! wraps an async operation the way the teacher's `pipeline.rs` wraps its
//! per-message worker loop with a manual retry-with-backoff.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::config::RetryConfig;
use crate::errors::NextvisionError;

/// Which delay curve to apply between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategyKind {
    FixedDelay,
    LinearBackoff,
    ExponentialBackoff,
    /// Exponential backoff with up to `jitter_factor` of random jitter
    /// added, to avoid synchronized retry storms across callers.
    JitteredExponential,
    /// Widens the base delay when a service's recent failure rate is high,
    /// the way `retry_strategies.py`'s `AdaptiveRetryStrategy` scales its
    /// delay by an externally-tracked error rate.
    Adaptive,
}

/// Executes an async operation, retrying per a [`RetryConfig`] until it
/// succeeds, exhausts its attempt budget, or the operation returns a
/// non-retryable error (per [`NextvisionError::is_retryable`]).
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        RetryExecutor { config }
    }

    /// Delay before the `attempt`-th retry (0-indexed: `attempt = 0` is the
    /// delay before the *first* retry, i.e. after the initial try fails).
    /// `observed_failure_rate` is only consulted for [`RetryStrategyKind::Adaptive`].
    pub fn delay_for(&self, attempt: u32, observed_failure_rate: f64) -> Duration {
        let base = self.config.base_delay.as_secs_f64();
        let raw = match self.config.strategy {
            RetryStrategyKind::FixedDelay => base,
            RetryStrategyKind::LinearBackoff => base * (attempt + 1) as f64,
            RetryStrategyKind::ExponentialBackoff => base * 2f64.powi(attempt as i32),
            RetryStrategyKind::JitteredExponential => {
                let exp = base * 2f64.powi(attempt as i32);
                let jitter_span = exp * self.config.jitter_factor;
                let jitter = rand::thread_rng().gen_range(-jitter_span..=jitter_span);
                exp + jitter
            }
            RetryStrategyKind::Adaptive => {
                let exp = base * 2f64.powi(attempt as i32);
                exp * (1.0 + observed_failure_rate)
            }
        };
        Duration::from_secs_f64(raw.max(0.0).min(self.config.max_delay.as_secs_f64()))
    }

    /// Run `op`, retrying on [`anyhow::Error`]s whose downcast to
    /// [`NextvisionError`] reports `is_retryable() == true` (errors that
    /// don't downcast are treated as retryable, matching the teacher's
    /// `pipeline.rs` treatment of unclassified IO errors).
    #[instrument(skip(self, op), fields(max_attempts = self.config.max_attempts))]
    pub async fn run<T, F, Fut>(&self, mut op: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let retryable = err
                        .downcast_ref::<NextvisionError>()
                        .map(NextvisionError::is_retryable)
                        .unwrap_or(true);
                    if !retryable || attempt + 1 >= self.config.max_attempts {
                        return Err(err);
                    }
                    let delay = self.delay_for(attempt, 0.0);
                    warn!(attempt, ?delay, error = %err, "retrying after failure");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
