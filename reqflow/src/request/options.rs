use super::AttrValue;
use std::collections::BTreeMap;
use std::fmt;

/// Keys an HTTP call understands. Only these may live in `TransportOptions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransportKey {
    Params,
    Data,
    Headers,
    Cookies,
    Files,
    Auth,
    Timeout,
    AllowRedirects,
    Proxies,
    Hooks,
    Stream,
    Verify,
    Cert,
    Json,
}

impl TransportKey {
    pub const ALL: [TransportKey; 14] = [
        TransportKey::Params,
        TransportKey::Data,
        TransportKey::Headers,
        TransportKey::Cookies,
        TransportKey::Files,
        TransportKey::Auth,
        TransportKey::Timeout,
        TransportKey::AllowRedirects,
        TransportKey::Proxies,
        TransportKey::Hooks,
        TransportKey::Stream,
        TransportKey::Verify,
        TransportKey::Cert,
        TransportKey::Json,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKey::Params => "params",
            TransportKey::Data => "data",
            TransportKey::Headers => "headers",
            TransportKey::Cookies => "cookies",
            TransportKey::Files => "files",
            TransportKey::Auth => "auth",
            TransportKey::Timeout => "timeout",
            TransportKey::AllowRedirects => "allow_redirects",
            TransportKey::Proxies => "proxies",
            TransportKey::Hooks => "hooks",
            TransportKey::Stream => "stream",
            TransportKey::Verify => "verify",
            TransportKey::Cert => "cert",
            TransportKey::Json => "json",
        }
    }

    /// `None` when `name` is not on the allow-list.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

impl fmt::Display for TransportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The options handed to the transport for one call.
///
/// A request keeps its allow-listed attributes here and nowhere else, so
/// reading `request.get("headers")` and `options.get(TransportKey::Headers)`
/// always agree whichever side was written last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportOptions {
    values: BTreeMap<TransportKey, AttrValue>,
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: TransportKey) -> Option<&AttrValue> {
        self.values.get(&key)
    }

    /// Plain-data view of an option; handlers and payloads yield `None`.
    pub fn data(&self, key: TransportKey) -> Option<&serde_json::Value> {
        self.get(key).and_then(AttrValue::as_data)
    }

    pub fn contains(&self, key: TransportKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn insert(
        &mut self,
        key: TransportKey,
        value: impl Into<AttrValue>,
    ) -> Option<AttrValue> {
        self.values.insert(key, value.into())
    }

    /// Insert only when the key is unset.
    pub fn set_default(&mut self, key: TransportKey, value: impl Into<AttrValue>) {
        self.values.entry(key).or_insert_with(|| value.into());
    }

    pub fn remove(&mut self, key: TransportKey) -> Option<AttrValue> {
        self.values.remove(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TransportKey, &AttrValue)> {
        self.values.iter().map(|(key, value)| (*key, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
