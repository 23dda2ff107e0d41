use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout};

use crate::client::ClientError;

/// Configuration for per-call timeouts and retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
    /// Upper bound on a single attempt.
    pub attempt_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            attempt_timeout_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// Calculate the delay after a given failed attempt using exponential backoff.
    /// delay = base_delay_ms * 2^(attempt - 1)
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Run `call` until it succeeds, fails with a non-transient error, or the
    /// attempt budget runs out. Each attempt is bounded by
    /// `attempt_timeout_ms`.
    pub async fn run<T, F, Fut>(&self, operation: &str, id: &str, mut call: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = match timeout(Duration::from_millis(self.attempt_timeout_ms), call()).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout(self.attempt_timeout_ms)),
            };
            match result {
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay_ms = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        operation,
                        execution_id = id,
                        attempt,
                        max_attempts,
                        delay_ms,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    sleep(Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
