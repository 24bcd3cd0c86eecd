//! Bounded exponential backoff for transport-level failures.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{ClientError, TransportError};

pub const DEFAULT_HTTP_ATTEMPTS: u32 = 4;

/// Delay before retry `k` (1-based) is `min(max, initial * 2^(k-1))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub max_attempts: u32,
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_HTTP_ATTEMPTS,
            initial: Duration::from_secs(1),
            max: Duration::from_secs(8),
        }
    }
}

impl Backoff {
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.max)
    }

    /// Run `op` until it succeeds or `max_attempts` is spent.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn retry<T, F, Fut>(&self, mut op: F) -> Result<T, TransportError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(source) if attempt >= max_attempts => {
                    return Err(TransportError {
                        attempts: attempt,
                        source,
                    });
                }
                Err(err) => {
                    let delay = self.delay(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "model request failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
