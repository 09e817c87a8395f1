use crate::{KeyValueStore, StoreError};
use async_trait::async_trait;
use rustis::client::Client;
use rustis::commands::{GenericCommands, StringCommands};
use std::time::Duration;

/// Redis backed store. Expiry is delegated to Redis (`SETEX`).
pub struct RedisStore {
    pub client: Client,
}

impl RedisStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn connect(uri: &str) -> Result<Self, StoreError> {
        let client = Client::connect(uri).await?;
        tracing::debug!("Connected redis response store");
        Ok(Self::new(client))
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> = self.client.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        // SETEX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        self.client.setex(key, seconds, value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _removed: usize = self.client.del(key).await?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish()
    }
}
