// src/upstream/retry.rs
//! Bounded, fixed-delay retry loop around a single upstream call.
//!
//! Retried: timeouts, connection failures, 5xx responses.
//! Not retried: 4xx responses, unparsable payloads, local failures.

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{Result, WeatherError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    NoRetry,
}

/// A failed attempt plus whether another attempt may help.
#[derive(Debug)]
pub struct Failure {
    pub error: WeatherError,
    pub decision: RetryDecision,
}

impl Failure {
    pub fn retryable(error: WeatherError) -> Self {
        Self {
            error,
            decision: RetryDecision::Retry,
        }
    }

    pub fn terminal(error: WeatherError) -> Self {
        Self {
            error,
            decision: RetryDecision::NoRetry,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            delay: Duration::from_millis(cfg.delay_ms),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Total number of calls the policy allows.
    pub fn total_attempts(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }

    /// Run `op` until it succeeds, fails terminally, or the bound is reached.
    ///
    /// `op` receives the zero-based attempt number. The error of the last
    /// attempt is returned unchanged.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<T, Failure>>,
    {
        let total = self.total_attempts();
        let mut attempt: u32 = 0;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(target: "weather::upstream", attempt, "upstream call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(Failure { error, decision }) => {
                    let last = attempt + 1 >= total;
                    if decision == RetryDecision::NoRetry || last {
                        return Err(error);
                    }
                    warn!(
                        target: "weather::upstream",
                        attempt = attempt + 1,
                        of = total,
                        kind = %error.kind(),
                        error = %error,
                        "retryable upstream failure"
                    );
                    counter!("weather_upstream_retries_total").increment(1);
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
