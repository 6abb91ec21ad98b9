//! Rate limiting types.

use serde::{Deserialize, Serialize};

/// Identity of the caller a limit check applies to.
///
/// The default limit key is `{platform}_{user_id}`, so one user gets
/// independent budgets per platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Platform tag (e.g., `"telegram"`, `"discord"`).
    pub platform: String,
    /// Platform-scoped user identifier.
    pub user_id: String,
}

impl RequestContext {
    /// Build a context from platform and user id.
    pub fn new(platform: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            user_id: user_id.into(),
        }
    }

    /// The default limit key for this context.
    pub fn limit_key(&self) -> String {
        format!("{}_{}", self.platform, self.user_id)
    }
}

/// Counter persisted in the external store, one entry per key per window.
///
/// Replaced wholesale when a new window starts; the store's TTL tracks the
/// remaining window length.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitState {
    /// Requests admitted so far in the current window.
    pub count: u32,
    /// Unix timestamp in milliseconds when the window ends.
    pub reset_at: i64,
}

/// Point-in-time answer from a rate limit check. Not stored.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitResult {
    /// Whether the request is admitted.
    pub allowed: bool,
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Requests left in the current window after this check.
    pub remaining: u32,
    /// Unix timestamp in milliseconds when the window resets.
    pub reset_at: i64,
}

/// Escalating block entry for repeat offenders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlockState {
    /// Consecutive violations recorded while the entry was alive.
    pub offences: u32,
    /// Unix timestamp in milliseconds when the block lifts.
    pub blocked_until: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limit_key() {
        let ctx = RequestContext::new("telegram", "12345");
        assert_eq!(ctx.limit_key(), "telegram_12345");
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let state = RateLimitState {
            count: 7,
            reset_at: 1_700_000_000_000,
        };
        let raw = serde_json::to_string(&state).unwrap();
        let parsed: RateLimitState = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.count, 7);
        assert_eq!(parsed.reset_at, state.reset_at);
    }
}
