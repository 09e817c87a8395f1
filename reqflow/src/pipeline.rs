//! One fetch attempt for one [`Request`].
//!
//! Steps run in a fixed order, each one only filling in what the request
//! left unset:
//! 1. transport defaults (`timeout`, `stream`, `verify`)
//! 2. http method
//! 3. user agent
//! 4. proxy, waiting on the pool for at most `proxy_wait_timeout`
//! 5. session mode
//! 6. the transport call
//! 7. optional cache write
//!
//! There is no retry here; `retry_times` and `is_abandoned` belong to the
//! scheduler.
use crate::cache::ResponseCache;
use crate::error::FetchError;
use crate::request::{AttrValue, Request, TransportKey};
use crate::response::Response;
use crate::transport::{Dispatch, ReqwestTransport, SessionMode, Transport};
use reqflow_config::{ConfigError, Policy, ProxyProvider, Settings, UserAgentProvider};
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct Downloader {
    transport: Arc<dyn Transport>,
    settings: Settings,
    policy: Arc<Policy>,
    user_agents: Option<Arc<dyn UserAgentProvider>>,
    proxies: Option<Arc<dyn ProxyProvider>>,
    cache: Option<ResponseCache>,
}

impl Downloader {
    /// Pipeline over `transport`. The policy switches start from
    /// `settings`; the proxy pool is built from `settings.proxy` when
    /// proxying is enabled there.
    pub fn new(transport: Arc<dyn Transport>, settings: Settings) -> Self {
        Self {
            transport,
            policy: Arc::new(Policy::from_settings(&settings)),
            user_agents: None,
            proxies: settings.proxy_provider(),
            cache: None,
            settings,
        }
    }

    /// Reqwest-backed pipeline with the user-agent pool from
    /// `settings.user_agents_file`, if any.
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let user_agents = settings.user_agent_provider()?;
        let mut downloader = Self::new(Arc::new(ReqwestTransport::new()), settings);
        downloader.user_agents = user_agents;
        Ok(downloader)
    }

    /// Share policy switches with whoever flips them at runtime.
    pub fn with_policy(mut self, policy: Arc<Policy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_user_agents(mut self, provider: Arc<dyn UserAgentProvider>) -> Self {
        self.user_agents = Some(provider);
        self
    }

    pub fn with_proxy_provider(mut self, provider: Arc<dyn ProxyProvider>) -> Self {
        self.proxies = Some(provider);
        self
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn policy(&self) -> &Arc<Policy> {
        &self.policy
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Perform the http call for `request`.
    ///
    /// The resolved transport options (defaults, user agent, proxy) are
    /// written back into `request`, and the returned response carries a
    /// copy of it. With `save_cached` the response is also stored in the
    /// cache; a failing store is only logged.
    #[instrument(skip_all, fields(url = %request.url))]
    pub async fn fetch(
        &self,
        request: &mut Request,
        save_cached: bool,
    ) -> Result<Response, FetchError> {
        if request.url.is_empty() {
            return Err(FetchError::MissingUrl);
        }

        self.apply_defaults(request);
        let method = resolve_method(request)?;
        self.apply_user_agent(request)?;
        self.apply_proxy(request).await?;
        let session = self.session_mode(request);
        log_dispatch(request, &method, session);

        let raw = self
            .transport
            .request(Dispatch {
                method,
                url: &request.url,
                options: request.transport(),
                session,
            })
            .await?;
        let response = Response::from_raw(raw, request.clone());

        if save_cached {
            match &self.cache {
                Some(cache) => {
                    if let Err(e) = cache.write(&response, None).await {
                        warn!("Failed to cache response for {}: {}", request, e);
                    }
                }
                None => warn!("No response cache configured, {} not cached", request),
            }
        }
        Ok(response)
    }

    /// Read-through: a cached response if there is one, otherwise a live
    /// fetch, cached again when `save_cached` is set.
    pub async fn fetch_cached(
        &self,
        request: &mut Request,
        save_cached: bool,
    ) -> Result<Response, FetchError> {
        if let Some(cache) = &self.cache {
            if let Some(response) = cache.read(request).await? {
                debug!("Serving {} from cache", request);
                return Ok(response);
            }
            tracing::info!("Cache miss for {}, fetching", request);
        }
        self.fetch(request, save_cached).await
    }

    fn apply_defaults(&self, request: &mut Request) {
        let options = request.transport_mut();
        options.set_default(TransportKey::Timeout, self.settings.timeout);
        options.set_default(TransportKey::Stream, true);
        options.set_default(TransportKey::Verify, false);
    }

    fn apply_user_agent(&self, request: &mut Request) -> Result<(), FetchError> {
        let mut headers = match request.transport().get(TransportKey::Headers) {
            None => Map::new(),
            Some(AttrValue::Data(Value::Null)) => Map::new(),
            Some(AttrValue::Data(Value::Object(headers))) => headers.clone(),
            Some(_) => {
                return Err(crate::error::RequestError::InvalidField {
                    field: TransportKey::Headers.as_str().to_string(),
                    expected: "a mapping of header name to value",
                }
                .into())
            }
        };
        if headers.contains_key("user-agent") || headers.contains_key("User-Agent") {
            return Ok(());
        }

        let pooled = if request.random_user_agent && self.policy.random_headers() {
            self.user_agents.as_ref().map(|pool| pool.get_user_agent())
        } else {
            None
        };
        let user_agent = pooled.unwrap_or_else(|| self.settings.default_user_agent.clone());
        headers.insert("User-Agent".to_string(), Value::String(user_agent));
        request
            .transport_mut()
            .insert(TransportKey::Headers, Value::Object(headers));
        Ok(())
    }

    async fn apply_proxy(&self, request: &mut Request) -> Result<(), FetchError> {
        if request.transport().contains(TransportKey::Proxies) || !self.policy.proxy_enable() {
            return Ok(());
        }
        let Some(provider) = &self.proxies else {
            return Ok(());
        };

        let wait = self.settings.proxy_wait_timeout();
        let interval = self.settings.proxy_poll_interval();
        let proxy = tokio::time::timeout(wait, async {
            loop {
                match provider.get_proxy() {
                    Some(proxy) if !proxy.is_empty() => break proxy,
                    _ => {
                        debug!("No proxy available yet, waiting {:?}", interval);
                        tokio::time::sleep(interval).await;
                    }
                }
            }
        })
        .await
        .map_err(|_| FetchError::NoProxyAvailable(wait))?;

        request.transport_mut().insert(
            TransportKey::Proxies,
            json!({"http": proxy, "https": proxy}),
        );
        Ok(())
    }

    fn session_mode(&self, request: &Request) -> SessionMode {
        if request.use_session.unwrap_or_else(|| self.policy.use_session()) {
            SessionMode::Shared
        } else {
            SessionMode::OneOff
        }
    }
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("settings", &self.settings)
            .field("policy", &self.policy)
            .field("user_agents", &self.user_agents.is_some())
            .field("proxies", &self.proxies)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Explicit `method` attribute, else POST when `data` was given, else GET.
fn resolve_method(request: &Request) -> Result<Method, FetchError> {
    match request.attr("method") {
        None => {}
        Some(value) if value.is_null() || value.as_str() == Some("") => {}
        Some(value) => {
            let name = value
                .as_str()
                .ok_or_else(|| FetchError::InvalidMethod(format!("{:?}", value)))?;
            return Method::from_bytes(name.to_ascii_uppercase().as_bytes())
                .map_err(|_| FetchError::InvalidMethod(name.to_string()));
        }
    }
    if request.transport().contains(TransportKey::Data) {
        Ok(Method::POST)
    } else {
        Ok(Method::GET)
    }
}

fn log_dispatch(request: &Request, method: &Method, session: SessionMode) {
    let parser = request.parser_name.as_deref().unwrap_or_default();
    let callback = request
        .callback
        .as_ref()
        .map(|callback| callback.name.as_str())
        .unwrap_or("parser");
    debug!(
        "{}.{} request for url = {} method = {} session = {:?} options = {:?}",
        parser,
        callback,
        request.url,
        method,
        session,
        request.transport()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_resolution() {
        let mut request = Request::new("http://example.com").unwrap();
        assert_eq!(resolve_method(&request).unwrap(), Method::GET);

        request.set("data", json!(null)).unwrap();
        assert_eq!(resolve_method(&request).unwrap(), Method::POST);

        request.set("method", "put").unwrap();
        assert_eq!(resolve_method(&request).unwrap(), Method::PUT);

        request.set("method", "").unwrap();
        assert_eq!(resolve_method(&request).unwrap(), Method::POST);

        request.set("method", 5).unwrap();
        assert!(matches!(
            resolve_method(&request),
            Err(FetchError::InvalidMethod(_))
        ));
    }
}
