//! Batcher configuration and per-drain metrics.

use std::time::Duration;

/// Configuration for a [`RequestBatcher`](crate::batch::RequestBatcher)
/// instance.
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    /// Queue length that triggers an immediate drain.
    pub max_batch_size: usize,
    /// How long to accumulate before draining a partial batch.
    pub batch_interval: Duration,
    /// Per-request execution budget within a drain.
    pub request_timeout: Duration,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 10,
            batch_interval: Duration::from_millis(25),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl BatcherConfig {
    /// Creates configuration from environment variables.
    ///
    /// Environment variables:
    /// - `COURIER_BATCH_SIZE`: queue length triggering an immediate drain
    /// - `COURIER_BATCH_INTERVAL_MS`: accumulation window in milliseconds
    /// - `COURIER_BATCH_TIMEOUT_MS`: per-request timeout in milliseconds
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("COURIER_BATCH_SIZE") {
            if let Ok(size) = val.trim().parse::<usize>() {
                config.max_batch_size = size.max(1);
            }
        }
        if let Ok(val) = std::env::var("COURIER_BATCH_INTERVAL_MS") {
            if let Ok(ms) = val.trim().parse() {
                config.batch_interval = Duration::from_millis(ms);
            }
        }
        if let Ok(val) = std::env::var("COURIER_BATCH_TIMEOUT_MS") {
            if let Ok(ms) = val.trim().parse() {
                config.request_timeout = Duration::from_millis(ms);
            }
        }

        config
    }
}

/// Aggregated metrics for one drain. Logged and emitted, never stored.
#[derive(Debug, Clone, Copy)]
pub struct BatchOutcome {
    /// Requests extracted in this drain.
    pub size: usize,
    /// Wall time from extraction to the last settlement.
    pub duration: Duration,
    /// Requests that settled successfully.
    pub succeeded: usize,
    /// Requests that settled with an error (including timeouts).
    pub failed: usize,
}
