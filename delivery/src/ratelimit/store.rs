//! Counter store seam and the in-memory implementation.
//!
//! The limiter persists window counters through this trait. Production
//! deployments use the Redis-backed store; tests and single-instance
//! deployments use [`MemoryStore`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::debug;

/// Errors from the external counter store.
///
/// Never surfaced past the limiter: any store failure triggers fail-open.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unreachable or rejected the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Stored entry could not be parsed.
    #[error("malformed store entry: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Async key/value store with per-entry TTL.
///
/// Values are JSON strings; expired entries read back as `None`.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Fetch the value at `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` at `key`, expiring after `ttl_secs` seconds.
    async fn put(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), StoreError>;

    /// Remove the value at `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Entry stored by [`MemoryStore`]: value plus absolute expiry (unix ms).
type Entry = (String, i64);

/// In-memory counter store.
///
/// Entries expire lazily on read; [`MemoryStore::spawn_janitor`] adds a
/// periodic sweep so idle keys do not accumulate. The janitor is an
/// explicitly scheduled task whose handle is aborted when the store drops.
pub struct MemoryStore {
    entries: Arc<DashMap<String, Entry>>,
    janitor: Option<JoinHandle<()>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a store without a background sweep (expiry on read only).
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            janitor: None,
        }
    }

    /// Create a store that sweeps expired entries every `period`.
    pub fn with_janitor(period: Duration) -> Self {
        let entries: Arc<DashMap<String, Entry>> = Arc::new(DashMap::new());
        let sweep_target = Arc::clone(&entries);
        let janitor = tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let now = Utc::now().timestamp_millis();
                let before = sweep_target.len();
                sweep_target.retain(|_, (_, expires_at)| *expires_at > now);
                let removed = before - sweep_target.len();
                if removed > 0 {
                    debug!(removed, "swept expired counter entries");
                }
            }
        });
        Self {
            entries,
            janitor: Some(janitor),
        }
    }

    /// Number of live (possibly expired, not yet swept) entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        if let Some(janitor) = self.janitor.take() {
            janitor.abort();
        }
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Utc::now().timestamp_millis();
        // Clone out of the map guard before any removal; removing while a
        // reference to the same key is held would deadlock.
        let entry = self.entries.get(key).map(|e| e.value().clone());
        match entry {
            Some((value, expires_at)) if expires_at > now => Ok(Some(value)),
            Some(_) => {
                self.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), StoreError> {
        let expires_at = Utc::now().timestamp_millis() + (ttl_secs as i64) * 1000;
        self.entries.insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
