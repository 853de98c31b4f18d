//! Bounded retry with exponential backoff and jitter around a single provider call.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::ProviderError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound for each individual call.
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
            call_timeout: Duration::from_secs(12),
        }
    }
}

impl RetryPolicy {
    /// Full-jitter delay before attempt `attempt + 1`: a random point in
    /// `[0, min(max_delay, base_delay * 2^(attempt-1))]`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let ceiling = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        let ceiling_ms = ceiling.as_millis() as u64;
        if ceiling_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling_ms))
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or the attempt budget
/// is spent. Every attempt is bounded by `policy.call_timeout`.
pub async fn retry_with_jitter<F, Fut, T>(
    provider: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        if attempt > 1 {
            log::debug!("🔁 {} attempt {}/{}", provider, attempt, max_attempts);
        }

        let outcome = match tokio::time::timeout(policy.call_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timed_out(provider, policy.call_timeout)),
        };

        let err = match outcome {
            Ok(value) => {
                if attempt > 1 {
                    log::info!("✅ {} succeeded after {} attempts", provider, attempt);
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            return Err(err);
        }

        if attempt >= max_attempts {
            log::warn!("⚠️ {} gave up after {} attempts: {}", provider, attempt, err);
            return Err(err);
        }

        let delay = policy.backoff(attempt);
        log::warn!(
            "⏳ {} failed ({}), retrying in {} ms",
            provider,
            err,
            delay.as_millis()
        );
        tokio::time::sleep(delay).await;
    }
}
