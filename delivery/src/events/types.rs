//! Event types for the delivery pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event kinds emitted by the delivery pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A rate limit check refused a request.
    #[serde(rename = "rate-limit.exceeded")]
    RateLimitExceeded,
    /// A rate limit counter was reset.
    #[serde(rename = "rate-limit.reset")]
    RateLimitReset,
    /// A request batch finished draining.
    #[serde(rename = "batch.drained")]
    BatchDrained,
    /// A notification could not be delivered.
    #[serde(rename = "notification.failed")]
    NotificationFailed,
}

impl EventKind {
    /// Parse from a string (e.g., `"rate-limit.exceeded"`).
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "rate-limit.exceeded" => Some(Self::RateLimitExceeded),
            "rate-limit.reset" => Some(Self::RateLimitReset),
            "batch.drained" => Some(Self::BatchDrained),
            "notification.failed" => Some(Self::NotificationFailed),
            _ => None,
        }
    }

    /// Convert to the dot-separated string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded => "rate-limit.exceeded",
            Self::RateLimitReset => "rate-limit.reset",
            Self::BatchDrained => "batch.drained",
            Self::NotificationFailed => "notification.failed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event delivered to subscribers.
///
/// Ephemeral: created at emit time and consumed synchronously by the
/// subscribers registered at that moment.
#[derive(Debug, Clone)]
pub struct Event {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub id: Uuid,
    /// What happened.
    pub kind: EventKind,
    /// Event-specific data.
    pub payload: serde_json::Value,
    /// Component that emitted the event (e.g., `"ratelimit"`, `"batcher"`).
    pub source: &'static str,
    /// When the event was emitted (UTC).
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event stamped with the current time.
    pub fn new(kind: EventKind, payload: serde_json::Value, source: &'static str) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            payload,
            source,
            timestamp: Utc::now(),
        }
    }
}
