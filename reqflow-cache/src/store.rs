use crate::StoreError;
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

/// Minimal string store with per-key expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value; it expires
    /// after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

pub type AbstractStore = Arc<dyn KeyValueStore>;
