//! Redis-backed counter store using `fred`.

use async_trait::async_trait;
use fred::prelude::*;
use tracing::info;

use crate::ratelimit::store::{CounterStore, StoreError};

/// Create and connect a Redis client.
pub async fn connect(redis_url: &str) -> Result<Client, Error> {
    let config = Config::from_url(redis_url)?;
    let client = Client::new(config, None, None, None);
    client.connect();
    client.wait_for_connect().await?;

    info!("Connected to Redis");
    Ok(client)
}

/// Counter store backed by a shared Redis client.
///
/// One client serves every limiter key; entries live under the limiter's
/// key prefix with native Redis TTLs.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
}

impl RedisStore {
    /// Wrap an already connected client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.client
            .get::<Option<String>, _>(key)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn put(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), StoreError> {
        self.client
            .set::<(), _, _>(
                key,
                value,
                Some(Expiration::EX(ttl_secs.max(1) as i64)),
                None,
                false,
            )
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .del::<(), _>(key)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
