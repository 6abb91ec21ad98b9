//! Notification dispatch types and configuration.

use std::time::Duration;

/// One recipient of a notification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTarget {
    /// Platform-scoped recipient identifier.
    pub user_id: String,
    /// Message text to deliver.
    pub message: String,
}

impl NotificationTarget {
    /// Build a target from user id and message.
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
        }
    }
}

/// Configuration for a
/// [`NotificationDispatcher`](crate::notify::NotificationDispatcher).
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Total transport attempts per recipient, including the first.
    pub max_retries: u32,
    /// Recipients dispatched concurrently per chunk.
    pub chunk_size: usize,
    /// Pause between chunks, respecting downstream throughput ceilings.
    pub chunk_pause: Duration,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            chunk_size: 30,
            chunk_pause: Duration::from_millis(1000),
        }
    }
}

impl NotifyConfig {
    /// Creates configuration from environment variables.
    ///
    /// Environment variables:
    /// - `COURIER_NOTIFY_RETRIES`: total attempts per recipient
    /// - `COURIER_NOTIFY_CHUNK_SIZE`: recipients per chunk
    /// - `COURIER_NOTIFY_CHUNK_PAUSE_MS`: pause between chunks in milliseconds
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("COURIER_NOTIFY_RETRIES") {
            if let Ok(retries) = val.trim().parse::<u32>() {
                config.max_retries = retries.max(1);
            }
        }
        if let Ok(val) = std::env::var("COURIER_NOTIFY_CHUNK_SIZE") {
            if let Ok(size) = val.trim().parse::<usize>() {
                config.chunk_size = size.max(1);
            }
        }
        if let Ok(val) = std::env::var("COURIER_NOTIFY_CHUNK_PAUSE_MS") {
            if let Ok(ms) = val.trim().parse() {
                config.chunk_pause = Duration::from_millis(ms);
            }
        }

        config
    }
}
