//! YAML configuration documents and the text-file lists that go with
//! them (user agents, proxy lists).
use std::{fs, path};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("Line parsing error: {0}")]
    LineParse(String),
    #[error("Invalid config value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Anything holding a parsed YAML document.
pub trait Configurable {
    fn config(&self) -> &serde_yaml::Value;

    fn load_config(
        config_file_path: impl AsRef<path::Path>,
    ) -> Result<serde_yaml::Value, ConfigError> {
        let content = fs::read_to_string(config_file_path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Non-empty lines of a text file, trimmed.
    fn load_text_file_lines(
        file_path: impl AsRef<path::Path>,
    ) -> Result<Vec<String>, ConfigError> {
        load_text_file_lines(file_path)
    }

    /// Dot-path lookup, e.g. "http.proxy.use".
    fn get_config_value(&self, key: &str) -> Option<&serde_yaml::Value> {
        lookup_path(self.config(), key)
    }
}

pub fn load_text_file_lines(
    file_path: impl AsRef<path::Path>,
) -> Result<Vec<String>, ConfigError> {
    let bytes = fs::read(file_path)?;
    let content =
        String::from_utf8(bytes).map_err(|e| ConfigError::LineParse(e.to_string()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub(crate) fn lookup_path<'a>(
    config: &'a serde_yaml::Value,
    key: &str,
) -> Option<&'a serde_yaml::Value> {
    key.split('.').try_fold(config, |node, segment| {
        if segment.is_empty() {
            return None;
        }
        node.as_mapping()?.get(segment)
    })
}
