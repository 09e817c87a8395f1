//! Configuration layer for reqflow.
//!
//! Holds everything the fetch pipeline only *reads*: YAML settings, the
//! global policy switches, and the proxy / user-agent providers.
pub mod config;
pub mod proxy;
pub mod settings;
pub mod user_agent;

pub use config::{ConfigError, Configurable};
pub use proxy::{ProxyConfig, ProxyProvider, RandomProxyProvider, RoundRobinProxyProvider};
pub use settings::{Policy, Settings, DEFAULT_USER_AGENT};
pub use user_agent::{RandomUserAgentProvider, StaticUserAgentProvider, UserAgentProvider};

// re-export
pub use serde_yaml;
