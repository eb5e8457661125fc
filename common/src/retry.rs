// Retry policy with exponential backoff and jitter
//
// External calls (forecast fetch, schedule create) are short synchronous
// requests with bounded timeouts. They get a small fixed number of attempts
// before the failure is handed to the per-business error path; the next
// evaluation cycle is the real retry mechanism.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Bounded exponential backoff with jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &crate::config::RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Delay before the retry following `attempt` (0-based), or None when
    /// the attempt budget is spent.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts {
            return None;
        }

        let exp = self
            .base_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
            .min(self.max_delay);

        // Up to 10% jitter to avoid synchronized retries across businesses.
        let jitter_range_ms = (exp.as_millis() as u64) / 10;
        let jitter_ms = if jitter_range_ms > 0 {
            rand::thread_rng().gen_range(0..=jitter_range_ms)
        } else {
            0
        };

        Some(exp + Duration::from_millis(jitter_ms))
    }
}

/// Run `operation` until it succeeds or the policy's attempt budget is
/// spent, sleeping the policy delay between attempts. Returns the last
/// error on exhaustion.
pub async fn with_retries<T, E, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => match policy.next_delay(attempt) {
                Some(delay) => {
                    tracing::debug!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "External call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(err),
            },
        }
    }
}
