//! Admission control for outbound delivery.
//!
//! Fixed-window counters over a pluggable key/value store, with presets for
//! common surfaces and escalating blocks for repeat offenders.

pub mod config;
pub mod limiter;
pub mod redis_store;
pub mod store;
pub mod types;

pub use config::RateLimitConfig;
pub use limiter::{exponential_ttl, RateLimiter, MAX_BLOCK_TTL_SECS};
pub use redis_store::{connect, RedisStore};
pub use store::{CounterStore, MemoryStore, StoreError};
pub use types::{BlockState, RateLimitResult, RateLimitState, RequestContext};
