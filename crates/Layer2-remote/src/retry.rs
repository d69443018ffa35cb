//! Retry logic with exponential backoff
//!
//! Used for the task-creation call. Refresh calls are not retried here;
//! the polling loop absorbs transient refresh failures on its own cadence.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,

    /// Initial delay between retries (milliseconds)
    pub initial_delay_ms: u64,

    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,

    /// Maximum delay between retries (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30000,
        }
    }
}

impl RetryConfig {
    /// Create a config with no retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculate delay for a given attempt (0-indexed), with jitter
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay_ms as f64);

        // 20% jitter (0.8 to 1.2) to avoid thundering herds
        let jitter_factor = 0.8 + jitter_unit() * 0.4;

        Duration::from_millis((capped_delay * jitter_factor) as u64)
    }
}

/// Cheap pseudo-random value in [0, 1) from the clock's subsecond nanos
fn jitter_unit() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClassification {
    /// Should retry (transient error)
    Retry,

    /// Should not retry (permanent error)
    NoRetry,

    /// Rate limited - use provided delay if available
    RateLimited { retry_after_ms: Option<u64> },
}

/// Trait for errors that can be classified for retry
pub trait RetryableError {
    fn classify(&self) -> RetryClassification;
}

/// Execute an async operation with retry logic
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: RetryableError + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                let delay = match e.classify() {
                    RetryClassification::NoRetry => {
                        debug!("{}: non-retryable error: {}", operation_name, e);
                        return Err(e);
                    }
                    RetryClassification::Retry => config.delay_for_attempt(attempt),
                    RetryClassification::RateLimited { retry_after_ms } => retry_after_ms
                        .map(Duration::from_millis)
                        .unwrap_or_else(|| config.delay_for_attempt(attempt)),
                };

                if attempt >= config.max_retries {
                    warn!(
                        "{}: giving up after {} attempts: {}",
                        operation_name,
                        attempt + 1,
                        e
                    );
                    return Err(e);
                }

                debug!(
                    "{}: attempt {} failed ({}), retrying in {:?}",
                    operation_name,
                    attempt + 1,
                    e,
                    delay
                );

                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
