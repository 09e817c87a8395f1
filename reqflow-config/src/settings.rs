//! Process-level settings for the fetch pipeline.
//!
//! Everything lives under one `http` section:
//! ```yaml
//! http:
//!   use_session: false
//!   random_headers: true
//!   timeout: 22
//!   default_user_agent: "Mozilla/5.0 ..."
//!   user_agents_file: tests/user_agents.txt
//!   proxy:
//!     use: true
//!     uris:
//!       - http://proxy1.example.com:{8080-8082}
//!     wait_timeout: 30
//!   cache:
//!     namespace: test
//!     ttl: 1200
//! ```
//! Every key is optional.
use crate::{
    proxy::{ProxyConfig, ProxyProvider, RandomProxyProvider},
    user_agent::{RandomUserAgentProvider, UserAgentProvider},
    ConfigError,
};
use serde::{Deserialize, Serialize};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_14_2) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/73.0.3683.103 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub use_session: bool,
    pub random_headers: bool,
    /// Seconds, applied to both connect and read.
    pub timeout: u64,
    pub default_user_agent: String,
    pub user_agents_file: Option<PathBuf>,
    pub proxy: ProxyConfig,
    /// Upper bound for waiting on an empty proxy pool, seconds.
    pub proxy_wait_timeout: u64,
    /// Delay between two polls of an empty proxy pool, milliseconds.
    pub proxy_poll_interval: u64,
    pub cache_namespace: String,
    /// Seconds.
    pub cache_ttl: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_session: false,
            random_headers: true,
            timeout: 22,
            default_user_agent: DEFAULT_USER_AGENT.to_string(),
            user_agents_file: None,
            proxy: ProxyConfig::default(),
            proxy_wait_timeout: 30,
            proxy_poll_interval: 100,
            cache_namespace: "test".to_string(),
            cache_ttl: 1200,
        }
    }
}

impl Settings {
    /// Build settings from the `http` section of a config document.
    pub fn from_config(http_config: &serde_yaml::Value) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let proxy_section = &http_config["proxy"];
        let cache_section = &http_config["cache"];

        let proxy = if proxy_section.is_null() {
            defaults.proxy
        } else {
            ProxyConfig::from_config(proxy_section).ok_or_else(|| {
                ConfigError::InvalidValue {
                    key: "http.proxy.use".into(),
                    reason: "expected a boolean".into(),
                }
            })?
        };

        Ok(Self {
            use_session: read_bool(http_config, "use_session", defaults.use_session)?,
            random_headers: read_bool(
                http_config,
                "random_headers",
                defaults.random_headers,
            )?,
            timeout: read_u64(http_config, "timeout", defaults.timeout)?,
            default_user_agent: read_str(http_config, "default_user_agent")?
                .unwrap_or(defaults.default_user_agent),
            user_agents_file: read_str(http_config, "user_agents_file")?
                .map(PathBuf::from),
            proxy,
            proxy_wait_timeout: read_u64(
                proxy_section,
                "wait_timeout",
                defaults.proxy_wait_timeout,
            )?,
            proxy_poll_interval: read_u64(
                proxy_section,
                "poll_interval",
                defaults.proxy_poll_interval,
            )?,
            cache_namespace: read_str(cache_section, "namespace")?
                .unwrap_or(defaults.cache_namespace),
            cache_ttl: read_u64(cache_section, "ttl", defaults.cache_ttl)?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn proxy_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_wait_timeout)
    }

    pub fn proxy_poll_interval(&self) -> Duration {
        Duration::from_millis(self.proxy_poll_interval)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    /// Random proxy pool over the configured uris, if proxying is enabled.
    pub fn proxy_provider(&self) -> Option<Arc<dyn ProxyProvider>> {
        if !self.proxy.use_proxy {
            return None;
        }
        Some(Arc::new(RandomProxyProvider::new(self.proxy.clone())))
    }

    /// User agent pool loaded from `user_agents_file`, if one is configured.
    pub fn user_agent_provider(
        &self,
    ) -> Result<Option<Arc<dyn UserAgentProvider>>, ConfigError> {
        match &self.user_agents_file {
            Some(path) => {
                let provider = RandomUserAgentProvider::from_file(
                    path,
                    self.default_user_agent.clone(),
                )?;
                tracing::debug!(
                    "Loaded {} user agents from {}",
                    provider.len(),
                    path.display()
                );
                Ok(Some(Arc::new(provider)))
            }
            None => Ok(None),
        }
    }
}

fn read_bool(
    section: &serde_yaml::Value,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match section.get(key) {
        None | Some(serde_yaml::Value::Null) => Ok(default),
        Some(value) => value.as_bool().ok_or_else(|| invalid(key, "expected a boolean")),
    }
}

fn read_u64(
    section: &serde_yaml::Value,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match section.get(key) {
        None | Some(serde_yaml::Value::Null) => Ok(default),
        Some(value) => value
            .as_u64()
            .ok_or_else(|| invalid(key, "expected a non-negative integer")),
    }
}

fn read_str(
    section: &serde_yaml::Value,
    key: &str,
) -> Result<Option<String>, ConfigError> {
    match section.get(key) {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| invalid(key, "expected a string")),
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Global policy switches. Owned and flipped by the embedding
/// application, only read by the fetch pipeline.
#[derive(Debug, Default)]
pub struct Policy {
    use_session: AtomicBool,
    random_headers: AtomicBool,
    proxy_enable: AtomicBool,
}

impl Policy {
    pub fn new(use_session: bool, random_headers: bool, proxy_enable: bool) -> Self {
        Self {
            use_session: AtomicBool::new(use_session),
            random_headers: AtomicBool::new(random_headers),
            proxy_enable: AtomicBool::new(proxy_enable),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.use_session,
            settings.random_headers,
            settings.proxy.use_proxy,
        )
    }

    pub fn use_session(&self) -> bool {
        self.use_session.load(Ordering::Relaxed)
    }

    pub fn random_headers(&self) -> bool {
        self.random_headers.load(Ordering::Relaxed)
    }

    pub fn proxy_enable(&self) -> bool {
        self.proxy_enable.load(Ordering::Relaxed)
    }

    pub fn set_use_session(&self, value: bool) {
        self.use_session.store(value, Ordering::Relaxed);
    }

    pub fn set_random_headers(&self, value: bool) {
        self.random_headers.store(value, Ordering::Relaxed);
    }

    pub fn set_proxy_enable(&self, value: bool) {
        self.proxy_enable.store(value, Ordering::Relaxed);
    }
}
