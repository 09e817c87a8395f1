//! Fetched responses kept in a key-value store, keyed by request
//! fingerprint, so repeated runs can replay them instead of refetching.
use crate::codec::{JsonCodec, ObjectCodec};
use crate::error::{CacheError, RequestError};
use crate::request::{Request, Transmissible};
use crate::response::Response;
use reqflow_cache::AbstractStore;
use reqflow_config::Settings;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(1200);
pub const DEFAULT_NAMESPACE: &str = "test";

#[derive(Clone)]
pub struct ResponseCache {
    store: AbstractStore,
    namespace: String,
    ttl: Duration,
    codec: Arc<dyn ObjectCodec>,
}

impl ResponseCache {
    pub fn new(store: AbstractStore, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            ttl: DEFAULT_CACHE_TTL,
            codec: Arc::new(JsonCodec),
        }
    }

    /// Namespace and ttl from the `http.cache` settings.
    pub fn from_settings(store: AbstractStore, settings: &Settings) -> Self {
        Self::new(store, settings.cache_namespace.clone()).with_ttl(settings.cache_ttl())
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Codec for payload attributes of the cached request.
    pub fn with_codec(mut self, codec: Arc<dyn ObjectCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// `response_cached:{namespace}:{fingerprint}`
    pub fn key(&self, request: &Request) -> String {
        format!(
            "response_cached:{}:{}",
            self.namespace,
            request.fingerprint()
        )
    }

    /// Store `response` under its request's key; `ttl` overrides the
    /// configured expiry.
    pub async fn write(
        &self,
        response: &Response,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let key = self.key(&response.request);
        let value = response
            .to_transmissible(self.codec.as_ref())
            .map_err(CacheError::Encode)?
            .to_json()?;
        self.store
            .set(&key, &value, ttl.unwrap_or(self.ttl))
            .await?;
        tracing::debug!("Cached response under {}", key);
        Ok(())
    }

    /// Cached response for `request`.
    ///
    /// An unreachable store reads as a miss. An entry that exists but
    /// cannot be decoded is an error.
    pub async fn read(&self, request: &Request) -> Result<Option<Response>, CacheError> {
        let key = self.key(request);
        let value = match self.store.get(&key).await {
            Ok(Some(value)) => value,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!("Response cache unavailable, reading {}: {}", key, e);
                return Ok(None);
            }
        };

        let transmissible = Transmissible::from_json(&value).map_err(|e| CacheError::Decode {
            key: key.clone(),
            source: RequestError::Decode {
                field: "response".into(),
                reason: e.to_string(),
            },
        })?;
        Response::from_transmissible(transmissible, self.codec.as_ref())
            .map(Some)
            .map_err(|source| CacheError::Decode { key, source })
    }

    pub async fn delete(&self, request: &Request) -> Result<(), CacheError> {
        self.store.delete(&self.key(request)).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("namespace", &self.namespace)
            .field("ttl", &self.ttl)
            .field("codec", &self.codec)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Payload;
    use async_trait::async_trait;
    use bytes::Bytes;
    use reqflow_cache::{KeyValueStore, MemoryStore, StoreError};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug)]
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Backend("connection refused".into()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".into()))
        }

        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".into()))
        }
    }

    fn response() -> Response {
        let request = Request::builder()
            .url("http://example.com/item")
            .extra("params", json!({"id": 3}))
            .extra("item", Payload::new("item", json!({"id": 3})))
            .build()
            .unwrap();
        Response {
            status: 200,
            url: request.url.clone(),
            headers: BTreeMap::from([("content-type".to_string(), "text/html".to_string())]),
            body: Bytes::from_static(b"<html></html>"),
            request,
        }
    }

    #[test]
    fn test_key_format() {
        let cache = ResponseCache::new(Arc::new(MemoryStore::new()), "news");
        let request = response().request;
        assert_eq!(
            cache.key(&request),
            format!("response_cached:news:{}", request.fingerprint())
        );
        assert_eq!(cache.ttl(), Duration::from_secs(1200));
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let cache = ResponseCache::new(Arc::new(MemoryStore::new()), DEFAULT_NAMESPACE);
        let response = response();

        assert!(cache.read(&response.request).await.unwrap().is_none());
        cache.write(&response, None).await.unwrap();
        assert_eq!(
            cache.read(&response.request).await.unwrap(),
            Some(response.clone())
        );

        cache.delete(&response.request).await.unwrap();
        assert!(cache.read(&response.request).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = ResponseCache::new(Arc::new(MemoryStore::new()), DEFAULT_NAMESPACE)
            .with_ttl(Duration::from_secs(60));
        let response = response();
        cache.write(&response, None).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.read(&response.request).await.unwrap().is_some());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.read(&response.request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_reads_as_miss() {
        let cache = ResponseCache::new(Arc::new(BrokenStore), DEFAULT_NAMESPACE);
        let response = response();
        assert!(cache.read(&response.request).await.unwrap().is_none());
        assert!(matches!(
            cache.write(&response, None).await,
            Err(CacheError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let cache = ResponseCache::new(store.clone(), DEFAULT_NAMESPACE);
        let request = response().request;
        store
            .set(&cache.key(&request), "{not json", Duration::from_secs(10))
            .await
            .unwrap();

        assert!(matches!(
            cache.read(&request).await,
            Err(CacheError::Decode { .. })
        ));
    }
}
