//! Fixed-window admission control over an external counter store.
//!
//! The read-increment-write cycle is deliberately non-atomic across the store
//! round-trip: two near-simultaneous checks on one key can both observe the
//! pre-increment count and both be admitted. This is accepted approximate
//! limiting; callers that need hard guarantees must serialize their checks.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use crate::events::{EventBus, EventKind};
use crate::ratelimit::store::{CounterStore, StoreError};
use crate::ratelimit::{BlockState, RateLimitConfig, RateLimitResult, RateLimitState, RequestContext};

/// Ceiling for escalating block durations.
pub const MAX_BLOCK_TTL_SECS: u64 = 3600;

/// Escalating TTL for repeat offenders: doubles per offence, capped at one
/// hour.
pub fn exponential_ttl(base_secs: u64, offence: u32) -> u64 {
    base_secs
        .saturating_mul(1u64 << offence.min(31))
        .min(MAX_BLOCK_TTL_SECS)
}

/// Per-key admission controller.
///
/// Counters live in the injected [`CounterStore`]; denials and resets are
/// reported on the [`EventBus`]. Store failures always fail open.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    bus: Arc<EventBus>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Creates a new rate limiter instance.
    pub fn new(store: Arc<dyn CounterStore>, bus: Arc<EventBus>, config: RateLimitConfig) -> Self {
        Self { store, bus, config }
    }

    /// Returns the configuration for this rate limiter.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Checks and increments the rate limit for a caller.
    ///
    /// `key` overrides the default `{platform}_{user_id}` limit key. When the
    /// budget is exhausted a `rate-limit.exceeded` event is emitted; when the
    /// store is unreachable the check fails open with the full budget.
    #[tracing::instrument(skip(self, ctx), fields(platform = %ctx.platform))]
    pub async fn check(&self, ctx: &RequestContext, key: Option<&str>) -> RateLimitResult {
        let key = key.map_or_else(|| ctx.limit_key(), ToString::to_string);
        let storage_key = self.build_key("count", &key);
        let now = Utc::now().timestamp_millis();

        let state = match self.store.get(&storage_key).await {
            Ok(Some(raw)) => match serde_json::from_str::<RateLimitState>(&raw) {
                Ok(state) => Some(state),
                Err(e) => return self.fail_open(&key, now, &StoreError::Malformed(e)),
            },
            Ok(None) => None,
            Err(e) => return self.fail_open(&key, now, &e),
        };

        // Fresh window when no live counter exists or the previous one ended.
        let (count, reset_at) = match state {
            Some(state) if state.reset_at > now => (state.count, state.reset_at),
            _ => (0, now + self.config.window_ms as i64),
        };

        let limit = self.config.max_requests;
        if count >= limit {
            debug!(key = %key, count, limit, "rate limit exceeded");
            self.bus.emit(
                EventKind::RateLimitExceeded,
                json!({
                    "platform": ctx.platform,
                    "user_id": ctx.user_id,
                    "key": key,
                    "count": count,
                    "limit": limit,
                }),
                "ratelimit",
            );
            return RateLimitResult {
                allowed: false,
                limit,
                remaining: limit.saturating_sub(count),
                reset_at,
            };
        }

        let next = RateLimitState {
            count: count + 1,
            reset_at,
        };
        let raw = match serde_json::to_string(&next) {
            Ok(raw) => raw,
            Err(e) => return self.fail_open(&key, now, &StoreError::Malformed(e)),
        };
        if let Err(e) = self
            .store
            .put(&storage_key, raw, remaining_ttl_secs(reset_at, now))
            .await
        {
            return self.fail_open(&key, now, &e);
        }

        RateLimitResult {
            allowed: true,
            limit,
            remaining: limit.saturating_sub(count + 1),
            reset_at,
        }
    }

    /// Deletes the stored counter for `key` and emits `rate-limit.reset`.
    #[tracing::instrument(skip(self))]
    pub async fn reset(&self, key: &str) {
        let storage_key = self.build_key("count", key);
        if let Err(e) = self.store.delete(&storage_key).await {
            warn!(key = %key, error = %e, "failed to reset rate limit counter");
            return;
        }
        debug!(key = %key, "rate limit counter reset");
        self.bus
            .emit(EventKind::RateLimitReset, json!({ "key": key }), "ratelimit");
    }

    /// Records a violation for `key` and blocks it with an escalating TTL.
    ///
    /// Each consecutive violation while a block entry is alive doubles the
    /// block duration, capped at [`MAX_BLOCK_TTL_SECS`]. Returns the block
    /// duration in seconds. Store errors are logged, not raised.
    #[tracing::instrument(skip(self))]
    pub async fn record_violation(&self, key: &str) -> u64 {
        let block_key = self.build_key("block", key);
        let now = Utc::now().timestamp_millis();

        let offences = match self.store.get(&block_key).await {
            Ok(Some(raw)) => serde_json::from_str::<BlockState>(&raw)
                .map(|s| s.offences)
                .unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                warn!(key = %key, error = %e, "store error reading block entry");
                0
            }
        } + 1;

        let block_secs = exponential_ttl(self.config.block_base_secs, offences - 1);
        let state = BlockState {
            offences,
            blocked_until: now + (block_secs as i64) * 1000,
        };
        match serde_json::to_string(&state) {
            Ok(raw) => {
                if let Err(e) = self.store.put(&block_key, raw, block_secs).await {
                    warn!(key = %key, error = %e, "failed to persist block entry");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "failed to serialize block entry"),
        }

        warn!(
            key = %key,
            offences,
            block_secs,
            "delivery key blocked after repeated violations"
        );
        block_secs
    }

    /// Remaining block time in seconds for `key`.
    ///
    /// Returns `None` when the key is not blocked or the store is
    /// unavailable (fail open).
    pub async fn blocked_for(&self, key: &str) -> Option<u64> {
        let block_key = self.build_key("block", key);
        let raw = match self.store.get(&block_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %key, error = %e, "store error reading block entry");
                return None;
            }
        };
        let state: BlockState = serde_json::from_str(&raw).ok()?;
        let now = Utc::now().timestamp_millis();
        if state.blocked_until > now {
            Some(remaining_ttl_secs(state.blocked_until, now))
        } else {
            None
        }
    }

    /// Clears the block entry for `key`.
    pub async fn clear_block(&self, key: &str) {
        let block_key = self.build_key("block", key);
        if let Err(e) = self.store.delete(&block_key).await {
            warn!(key = %key, error = %e, "failed to clear block entry");
        } else {
            debug!(key = %key, "cleared block entry");
        }
    }

    /// Fail-open result: the caller is admitted with the full budget.
    fn fail_open(&self, key: &str, now: i64, error: &StoreError) -> RateLimitResult {
        warn!(key = %key, error = %error, "counter store error, failing open");
        RateLimitResult {
            allowed: true,
            limit: self.config.max_requests,
            remaining: self.config.max_requests,
            reset_at: now + self.config.window_ms as i64,
        }
    }

    /// Builds a store key with the configured prefix.
    fn build_key(&self, category: &str, key: &str) -> String {
        format!("{}:{}:{}", self.config.key_prefix, category, key)
    }
}

/// Whole seconds until `deadline_ms`, rounded up, at least 1.
fn remaining_ttl_secs(deadline_ms: i64, now_ms: i64) -> u64 {
    let remaining = deadline_ms.saturating_sub(now_ms).max(0) as u64;
    remaining.div_ceil(1000).max(1)
}
