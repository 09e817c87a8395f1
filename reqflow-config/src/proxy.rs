//! Proxy pools consulted by the fetch pipeline.
//!
//! A provider answers "give me a proxy uri right now"; `None` means the
//! pool is momentarily empty and the caller may poll again.
use rand::{rng, seq::IndexedRandom};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        LazyLock,
    },
};

pub trait ProxyProvider: Send + Sync + fmt::Debug {
    fn get_proxy(&self) -> Option<String>;
}

static PORT_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(\d+)-(\d+)\}").expect("Failed to compile port range regex")
});

/// The `http.proxy` section. `uris` holds the uris as written, port
/// ranges unexpanded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub use_proxy: bool,
    pub uris: Vec<String>,
}

impl ProxyConfig {
    /// `http://host:{8080-8082}` becomes three uris. A range that is
    /// reversed or out of port bounds is left as written.
    pub fn expand_uri(uri: &str) -> Vec<String> {
        let Some(captures) = PORT_RANGE_RE.captures(uri) else {
            return vec![uri.to_string()];
        };
        let bounds = (captures[1].parse::<u16>(), captures[2].parse::<u16>());
        match bounds {
            (Ok(first), Ok(last)) if first <= last => {
                let pattern = &captures[0];
                (first..=last)
                    .map(|port| uri.replacen(pattern, &port.to_string(), 1))
                    .collect()
            }
            _ => vec![uri.to_string()],
        }
    }

    /// Reads a `proxy` section; `None` when `use` is missing or not a
    /// boolean. Either a `uris` list or a single `uri` is accepted.
    pub fn from_config(section: &serde_yaml::Value) -> Option<Self> {
        let use_proxy = section.get("use")?.as_bool()?;
        let uris = match (section.get("uris"), section.get("uri")) {
            (Some(serde_yaml::Value::Sequence(items)), _) => items
                .iter()
                .filter_map(serde_yaml::Value::as_str)
                .map(str::to_string)
                .collect(),
            (_, Some(serde_yaml::Value::String(uri))) => vec![uri.clone()],
            _ => Vec::new(),
        };
        Some(Self { use_proxy, uris })
    }

    /// Every usable uri, ranges expanded. Empty when proxying is off.
    pub fn pool(&self) -> Vec<String> {
        if !self.use_proxy {
            return Vec::new();
        }
        self.uris
            .iter()
            .flat_map(|uri| Self::expand_uri(uri))
            .collect()
    }
}

/// Uniform random pick from the pool on every call.
#[derive(Debug, Clone)]
pub struct RandomProxyProvider {
    pool: Vec<String>,
}

impl RandomProxyProvider {
    pub fn new(config: ProxyConfig) -> Self {
        Self { pool: config.pool() }
    }

    pub fn from_config(section: &serde_yaml::Value) -> Option<Self> {
        ProxyConfig::from_config(section).map(Self::new)
    }
}

impl ProxyProvider for RandomProxyProvider {
    fn get_proxy(&self) -> Option<String> {
        self.pool.choose(&mut rng()).cloned()
    }
}

/// Cycles through the pool; safe to share between tasks.
#[derive(Debug)]
pub struct RoundRobinProxyProvider {
    pool: Vec<String>,
    next: AtomicUsize,
}

impl RoundRobinProxyProvider {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            pool: config.pool(),
            next: AtomicUsize::new(0),
        }
    }

    pub fn from_config(section: &serde_yaml::Value) -> Option<Self> {
        ProxyConfig::from_config(section).map(Self::new)
    }
}

impl ProxyProvider for RoundRobinProxyProvider {
    fn get_proxy(&self) -> Option<String> {
        if self.pool.is_empty() {
            return None;
        }
        let turn = self.next.fetch_add(1, Ordering::Relaxed);
        self.pool.get(turn % self.pool.len()).cloned()
    }
}
