//! Redis-backed secret store.
//!
//! Layout:
//! - `<storage key>` -> base64 ciphertext (plain string value)
//! - `<team id>` -> hash with field `access_token`

use crate::secret::store::{SecretStore, StoreError, StoreResult};
use async_trait::async_trait;
use fred::prelude::*;
use std::future::Future;
use std::time::Duration;
use tracing::info;

const ACCESS_TOKEN_FIELD: &str = "access_token";

pub struct RedisStore {
    client: Client,
    timeout: Duration,
    secret_ttl: Option<Duration>,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("timeout", &self.timeout)
            .field("secret_ttl", &self.secret_ttl)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to Redis and wait until the connection is ready.
    pub async fn connect(
        redis_url: &str,
        timeout: Duration,
        secret_ttl: Option<Duration>,
    ) -> StoreResult<Self> {
        let config = Config::from_url(redis_url).map_err(unavailable)?;
        let client = Client::new(config, None, None, None);
        client.connect();
        tokio::time::timeout(timeout, client.wait_for_connect())
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(unavailable)?;

        info!("Connected to Redis");
        Ok(Self {
            client,
            timeout,
            secret_ttl,
        })
    }

    async fn bounded<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, fred::error::Error>>,
    {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(unavailable)
    }
}

fn unavailable(err: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl SecretStore for RedisStore {
    async fn put(&self, storage_key: &str, ciphertext: &str) -> StoreResult<()> {
        let expire = self
            .secret_ttl
            .map(|ttl| Expiration::EX(ttl.as_secs() as i64));
        self.bounded(
            self.client
                .set::<(), _, _>(storage_key, ciphertext, expire, None, false),
        )
        .await
    }

    async fn get(&self, storage_key: &str) -> StoreResult<Option<String>> {
        self.bounded(self.client.get::<Option<String>, _>(storage_key))
            .await
    }

    async fn delete(&self, storage_key: &str) -> StoreResult<()> {
        self.bounded(self.client.del::<i64, _>(storage_key))
            .await
            .map(|_| ())
    }

    async fn team_access_token(&self, team_id: &str) -> StoreResult<Option<String>> {
        self.bounded(
            self.client
                .hget::<Option<String>, _, _>(team_id, ACCESS_TOKEN_FIELD),
        )
        .await
    }
}
