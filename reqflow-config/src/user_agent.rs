use crate::{config::load_text_file_lines, ConfigError};
use rand::{rng, seq::IndexedRandom};
use std::{fmt, path};

pub trait UserAgentProvider: Send + Sync + fmt::Debug {
    fn get_user_agent(&self) -> String;
}

/// Picks a random user agent from a fixed list.
#[derive(Debug, Clone)]
pub struct RandomUserAgentProvider {
    agents: Vec<String>,
    fallback: String,
}

impl RandomUserAgentProvider {
    /// `fallback` is returned when `agents` is empty.
    pub fn new(agents: Vec<String>, fallback: impl Into<String>) -> Self {
        Self {
            agents,
            fallback: fallback.into(),
        }
    }

    /// One user agent per line, blank lines ignored.
    pub fn from_file(
        file_path: impl AsRef<path::Path>,
        fallback: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let agents = load_text_file_lines(file_path)?;
        Ok(Self::new(agents, fallback))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl UserAgentProvider for RandomUserAgentProvider {
    fn get_user_agent(&self) -> String {
        self.agents
            .choose(&mut rng())
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[derive(Debug, Clone)]
pub struct StaticUserAgentProvider(pub String);

impl UserAgentProvider for StaticUserAgentProvider {
    fn get_user_agent(&self) -> String {
        self.0.clone()
    }
}
