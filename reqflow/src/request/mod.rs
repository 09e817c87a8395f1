//! The request descriptor: one "fetch this url with these options" unit of
//! work, plus the scheduling metadata a crawler needs to route it.
//!
//! Attributes come in three groups:
//! - named fields (`url`, `priority`, `callback`...), plain struct fields
//! - transport options, restricted to [`TransportKey`] names
//! - extension attributes, anything else the caller attaches
//!
//! [`Request::set`] and [`Request::get`] address all three by name. An
//! allow-listed name always lands in the transport options, which is the
//! only place it is stored, so the top-level attribute and the transport
//! option can never disagree.
//!
//! ```ignore
//! let request = Request::builder()
//!     .url("http://example.com/search")
//!     .priority(10)
//!     .callback("NewsSpider.parse_list")
//!     .extra("params", json!({"q": "rust"}))
//!     .extra("item", Payload::new("item", json!({"id": 1})))
//!     .build()?;
//! ```
mod options;
mod transmit;
mod value;

pub use options::{TransportKey, TransportOptions};
pub use transmit::{Field, Transmissible};
pub use value::{AttrValue, HandlerRef, Payload};

use crate::codec::ObjectCodec;
use crate::error::RequestError;
use crate::fingerprint::fingerprint;
use derive_builder::Builder;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_PRIORITY: i64 = 300;

#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(
    default,
    setter(into),
    build_fn(private, name = "build_fields", error = "RequestError")
)]
pub struct Request {
    pub url: String,
    /// Bumped by the scheduler on every failed attempt.
    pub retry_times: u32,
    /// Lower is served first.
    pub priority: i64,
    #[builder(setter(into, strip_option))]
    pub parser_name: Option<String>,
    #[builder(setter(into, strip_option))]
    pub callback: Option<HandlerRef>,
    pub filter_repeat: bool,
    /// When false the crawler hands the request to the callback without
    /// fetching it.
    pub auto_request: bool,
    pub request_sync: bool,
    /// `None` defers to the global session policy.
    #[builder(setter(into, strip_option))]
    pub use_session: Option<bool>,
    pub random_user_agent: bool,
    #[builder(setter(into, strip_option))]
    pub download_middleware: Option<HandlerRef>,
    /// Once set the scheduler must stop retrying.
    pub is_abandoned: bool,
    #[builder(setter(custom))]
    extras: BTreeMap<String, AttrValue>,
    #[builder(setter(skip))]
    transport: TransportOptions,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            url: String::new(),
            retry_times: 0,
            priority: DEFAULT_PRIORITY,
            parser_name: None,
            callback: None,
            filter_repeat: true,
            auto_request: true,
            request_sync: false,
            use_session: None,
            random_user_agent: true,
            download_middleware: None,
            is_abandoned: false,
            extras: BTreeMap::new(),
            transport: TransportOptions::new(),
        }
    }
}

impl RequestBuilder {
    /// Attach any other attribute. Allow-listed names become transport
    /// options, named fields are assigned, the rest is kept as extension.
    pub fn extra(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> &mut Self {
        self.extras
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn build(&self) -> Result<Request, RequestError> {
        let mut request = self.build_fields()?;
        for (key, value) in std::mem::take(&mut request.extras) {
            request.set(&key, value)?;
        }
        request.validate()?;
        Ok(request)
    }
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn new(url: impl Into<String>) -> Result<Self, RequestError> {
        Self::builder().url(url).build()
    }

    fn validate(&self) -> Result<(), RequestError> {
        validate_url(&self.url)
    }

    /// Assign an attribute by name.
    pub fn set(&mut self, key: &str, value: impl Into<AttrValue>) -> Result<(), RequestError> {
        let value = value.into();
        match key {
            "url" => {
                let url = expect_string(key, &value)?;
                validate_url(&url)?;
                self.url = url;
            }
            "retry_times" => {
                self.retry_times = u32::try_from(expect_int(key, &value)?)
                    .map_err(|_| invalid(key, "a non-negative integer"))?;
            }
            "priority" => self.priority = expect_int(key, &value)?,
            "parser_name" => self.parser_name = expect_opt_string(key, &value)?,
            "callback" => self.callback = expect_handler(key, value)?,
            "filter_repeat" => self.filter_repeat = expect_bool(key, &value)?,
            "auto_request" => self.auto_request = expect_bool(key, &value)?,
            "request_sync" => self.request_sync = expect_bool(key, &value)?,
            "use_session" => {
                self.use_session = match &value {
                    AttrValue::Data(serde_json::Value::Null) => None,
                    _ => Some(expect_bool(key, &value)?),
                }
            }
            "random_user_agent" => self.random_user_agent = expect_bool(key, &value)?,
            "download_middleware" => self.download_middleware = expect_handler(key, value)?,
            "is_abandoned" => self.is_abandoned = expect_bool(key, &value)?,
            _ => match TransportKey::parse(key) {
                Some(transport_key) => {
                    self.transport.insert(transport_key, value);
                }
                None => {
                    self.extras.insert(key.to_string(), value);
                }
            },
        }
        Ok(())
    }

    /// Read an attribute by name. Unset optional fields read as `None`.
    pub fn get(&self, key: &str) -> Option<AttrValue> {
        let value = match key {
            "url" => AttrValue::from(self.url.as_str()),
            "retry_times" => AttrValue::from(self.retry_times),
            "priority" => AttrValue::from(self.priority),
            "parser_name" => AttrValue::from(self.parser_name.clone()?),
            "callback" => AttrValue::from(self.callback.clone()?),
            "filter_repeat" => AttrValue::from(self.filter_repeat),
            "auto_request" => AttrValue::from(self.auto_request),
            "request_sync" => AttrValue::from(self.request_sync),
            "use_session" => AttrValue::from(self.use_session?),
            "random_user_agent" => AttrValue::from(self.random_user_agent),
            "download_middleware" => AttrValue::from(self.download_middleware.clone()?),
            "is_abandoned" => AttrValue::from(self.is_abandoned),
            _ => return self.attr(key).cloned(),
        };
        Some(value)
    }

    /// Borrow an extension attribute or transport option.
    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        match TransportKey::parse(key) {
            Some(transport_key) => self.transport.get(transport_key),
            None => self.extras.get(key),
        }
    }

    /// Remove an extension attribute or transport option.
    pub fn unset(&mut self, key: &str) -> Option<AttrValue> {
        match TransportKey::parse(key) {
            Some(transport_key) => self.transport.remove(transport_key),
            None => self.extras.remove(key),
        }
    }

    pub fn transport(&self) -> &TransportOptions {
        &self.transport
    }

    /// Writes here are visible through `get`/`attr` as top-level attributes.
    pub fn transport_mut(&mut self) -> &mut TransportOptions {
        &mut self.transport
    }

    pub fn extras(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.extras.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(
            &self.url,
            self.transport.get(TransportKey::Params),
            self.transport.get(TransportKey::Data),
        )
    }

    pub fn cmp_priority(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority)
    }

    /// Everything that differs from a fresh request, flattened. Handler
    /// references become their registered names and payloads go through
    /// `codec`.
    pub fn to_transmissible(
        &self,
        codec: &dyn ObjectCodec,
    ) -> Result<Transmissible, RequestError> {
        let defaults = Request::default();
        let mut out = Transmissible::new();

        let mut named = |key: &str, differs: bool| {
            if differs {
                if let Some(value) = self.get(key) {
                    out.insert(key, to_field(key, &value, codec)?);
                }
            }
            Ok::<_, RequestError>(())
        };
        named("url", self.url != defaults.url)?;
        named("retry_times", self.retry_times != defaults.retry_times)?;
        named("priority", self.priority != defaults.priority)?;
        named("parser_name", self.parser_name != defaults.parser_name)?;
        named("callback", self.callback != defaults.callback)?;
        named("filter_repeat", self.filter_repeat != defaults.filter_repeat)?;
        named("auto_request", self.auto_request != defaults.auto_request)?;
        named("request_sync", self.request_sync != defaults.request_sync)?;
        named("use_session", self.use_session != defaults.use_session)?;
        named(
            "random_user_agent",
            self.random_user_agent != defaults.random_user_agent,
        )?;
        named(
            "download_middleware",
            self.download_middleware != defaults.download_middleware,
        )?;
        named("is_abandoned", self.is_abandoned != defaults.is_abandoned)?;

        for (key, value) in &self.extras {
            out.insert(key.clone(), to_field(key, value, codec)?);
        }
        for (key, value) in self.transport.iter() {
            out.insert(key.as_str(), to_field(key.as_str(), value, codec)?);
        }
        Ok(out)
    }

    /// Rebuild a request; every entry goes through `set`, so defaults and
    /// the transport allow-list apply exactly as on construction.
    pub fn from_transmissible(
        transmissible: Transmissible,
        codec: &dyn ObjectCodec,
    ) -> Result<Self, RequestError> {
        let mut request = Request::default();
        for (key, field) in transmissible {
            let value = match field {
                Field::Value(value) => AttrValue::Data(value),
                Field::Encoded(bytes) => {
                    let payload = codec.decode(&bytes).map_err(|e| RequestError::Decode {
                        field: key.clone(),
                        reason: e.to_string(),
                    })?;
                    AttrValue::Object(payload)
                }
            };
            request.set(&key, value)?;
        }
        request.validate()?;
        Ok(request)
    }

    /// Copy through the transmissible form. Handlers come back as names.
    pub fn copy(&self, codec: &dyn ObjectCodec) -> Result<Self, RequestError> {
        Self::from_transmissible(self.to_transmissible(codec)?, codec)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Request {}>", self.url)
    }
}

fn to_field(key: &str, value: &AttrValue, codec: &dyn ObjectCodec) -> Result<Field, RequestError> {
    match value {
        AttrValue::Data(data) => Ok(Field::Value(data.clone())),
        AttrValue::Handler(handler) => {
            Ok(Field::Value(serde_json::Value::String(handler.registered_name())))
        }
        AttrValue::Object(payload) => {
            codec
                .encode(payload)
                .map(Field::Encoded)
                .map_err(|e| RequestError::Encode {
                    field: key.to_string(),
                    reason: e.to_string(),
                })
        }
    }
}

fn validate_url(url: &str) -> Result<(), RequestError> {
    if url.is_empty() {
        return Ok(());
    }
    url::Url::parse(url)
        .map(|_| ())
        .map_err(|e| RequestError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

fn invalid(field: &str, expected: &'static str) -> RequestError {
    RequestError::InvalidField {
        field: field.to_string(),
        expected,
    }
}

fn expect_bool(field: &str, value: &AttrValue) -> Result<bool, RequestError> {
    value.as_bool().ok_or_else(|| invalid(field, "a boolean"))
}

fn expect_int(field: &str, value: &AttrValue) -> Result<i64, RequestError> {
    value.as_i64().ok_or_else(|| invalid(field, "an integer"))
}

fn expect_string(field: &str, value: &AttrValue) -> Result<String, RequestError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(field, "a string"))
}

fn expect_opt_string(field: &str, value: &AttrValue) -> Result<Option<String>, RequestError> {
    if value.is_null() {
        return Ok(None);
    }
    expect_string(field, value).map(Some)
}

fn expect_handler(field: &str, value: AttrValue) -> Result<Option<HandlerRef>, RequestError> {
    match value {
        AttrValue::Handler(handler) => Ok(Some(handler)),
        AttrValue::Data(serde_json::Value::Null) => Ok(None),
        AttrValue::Data(serde_json::Value::String(name)) => Ok(Some(HandlerRef::parse(&name))),
        _ => Err(invalid(field, "a handler name")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use serde_json::json;

    fn sample() -> Request {
        Request::builder()
            .url("http://example.com/list")
            .priority(10)
            .parser_name("NewsSpider")
            .callback(HandlerRef::scoped("NewsSpider", "parse_list"))
            .use_session(true)
            .extra("params", json!({"page": 2}))
            .extra("headers", json!({"Accept": "text/html"}))
            .extra("method", "GET")
            .extra("item", Payload::new("item", json!({"id": 7})))
            .build()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let request = Request::builder().build().unwrap();
        assert_eq!(request, Request::default());
        assert_eq!(request.priority, DEFAULT_PRIORITY);
        assert!(request.filter_repeat);
        assert!(request.auto_request);
        assert!(request.random_user_agent);
        assert_eq!(request.use_session, None);
        assert!(request.transport().is_empty());
    }

    #[test]
    fn test_extras_are_routed() {
        let request = sample();

        assert_eq!(
            request.transport().data(TransportKey::Params),
            Some(&json!({"page": 2}))
        );
        assert_eq!(request.get("params"), Some(AttrValue::from(json!({"page": 2}))));
        assert_eq!(request.attr("method").and_then(AttrValue::as_str), Some("GET"));
        assert_eq!(request.transport().len(), 2);
        assert_eq!(request.extras().count(), 2);
    }

    #[test]
    fn test_named_field_through_extra() {
        let request = Request::builder()
            .url("http://example.com")
            .extra("priority", 5)
            .extra("callback", "parse")
            .build()
            .unwrap();
        assert_eq!(request.priority, 5);
        assert_eq!(request.callback, Some(HandlerRef::new("parse")));
        assert_eq!(request.extras().count(), 0);
    }

    #[test]
    fn test_set_transport_key_updates_options() {
        let mut request = Request::new("http://example.com").unwrap();
        for key in TransportKey::ALL {
            request.set(key.as_str(), json!(key.as_str())).unwrap();
            assert_eq!(
                request.transport().data(key),
                Some(&json!(key.as_str()))
            );
            assert_eq!(request.get(key.as_str()), Some(AttrValue::from(key.as_str())));
        }
        assert_eq!(request.extras().count(), 0);
    }

    #[test]
    fn test_transport_write_is_visible_as_attribute() {
        let mut request = Request::new("http://example.com").unwrap();
        request
            .transport_mut()
            .insert(TransportKey::Timeout, json!(5));
        assert_eq!(request.get("timeout"), Some(AttrValue::from(json!(5))));

        request.unset("timeout");
        assert!(!request.transport().contains(TransportKey::Timeout));
        assert_eq!(request.get("timeout"), None);
    }

    #[test]
    fn test_non_allow_listed_never_enter_transport() {
        let mut request = Request::new("http://example.com").unwrap();
        request.set("item", json!({"a": 1})).unwrap();
        request.set("method", "POST").unwrap();
        assert!(request.transport().is_empty());
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(matches!(
            Request::new("not a url"),
            Err(RequestError::InvalidUrl { .. })
        ));
        let mut request = Request::default();
        assert!(request.set("url", "::::").is_err());
        assert!(request.url.is_empty());
    }

    #[test]
    fn test_invalid_named_value_rejected() {
        let mut request = Request::default();
        assert!(matches!(
            request.set("priority", "high"),
            Err(RequestError::InvalidField { .. })
        ));
        assert!(request.set("retry_times", -1).is_err());
        assert!(request.set("filter_repeat", 1).is_err());
    }

    #[test]
    fn test_to_transmissible_skips_defaults() {
        let request = sample();
        let t = request.to_transmissible(&JsonCodec).unwrap();

        let keys: Vec<&str> = t.keys().collect();
        assert_eq!(
            keys,
            vec![
                "callback",
                "headers",
                "item",
                "method",
                "params",
                "parser_name",
                "priority",
                "url",
                "use_session"
            ]
        );
        assert_eq!(
            t.get("callback"),
            Some(&Field::Value(json!("NewsSpider.parse_list")))
        );
        assert!(matches!(t.get("item"), Some(Field::Encoded(_))));
        assert!(!t.contains_key("transport"));
        assert!(!t.contains_key("retry_times"));
    }

    #[test]
    fn test_round_trip_is_idempotent() {
        let request = sample();
        let first = request.to_transmissible(&JsonCodec).unwrap();
        let restored = Request::from_transmissible(first.clone(), &JsonCodec).unwrap();
        let second = restored.to_transmissible(&JsonCodec).unwrap();

        assert_eq!(first, second);
        assert_eq!(restored, request);
    }

    #[test]
    fn test_round_trip_through_json() {
        let request = sample();
        let wire = request.to_transmissible(&JsonCodec).unwrap().to_json().unwrap();
        let restored =
            Request::from_transmissible(Transmissible::from_json(&wire).unwrap(), &JsonCodec)
                .unwrap();
        assert_eq!(restored, request);
        assert_eq!(
            restored.attr("item").and_then(AttrValue::as_object),
            Some(&Payload::new("item", json!({"id": 7})))
        );
    }

    #[test]
    fn test_copy_normalizes_handlers() {
        let mut request = sample();
        request
            .set("on_error", HandlerRef::scoped("NewsSpider", "failed"))
            .unwrap();
        let copy = request.copy(&JsonCodec).unwrap();

        assert_eq!(copy.callback, request.callback);
        assert_eq!(
            copy.attr("on_error"),
            Some(&AttrValue::from("NewsSpider.failed"))
        );
        assert_eq!(copy.fingerprint(), request.fingerprint());
    }

    #[test]
    fn test_undecodable_field_is_named() {
        let mut t = sample().to_transmissible(&JsonCodec).unwrap();
        t.insert("item", Field::Encoded(b"garbage".to_vec()));

        match Request::from_transmissible(t, &JsonCodec) {
            Err(RequestError::Decode { field, .. }) => assert_eq!(field, "item"),
            other => panic!("Expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_fingerprint_ignores_metadata() {
        let base = sample();
        let mut other = base.clone();
        other.priority = 1;
        other.retry_times = 3;
        other.filter_repeat = false;
        other.is_abandoned = true;
        other.use_session = Some(false);
        other.set("headers", json!({"X": "y"})).unwrap();
        other.set("item", json!(null)).unwrap();

        assert_eq!(base.fingerprint(), other.fingerprint());
    }

    #[test]
    fn test_fingerprint_sensitive_to_params_and_data() {
        let one = Request::builder()
            .url("http://example.com")
            .extra("params", json!({"q": 1}))
            .build()
            .unwrap();
        let two = Request::builder()
            .url("http://example.com")
            .extra("params", json!({"q": 2}))
            .build()
            .unwrap();
        assert_ne!(one.fingerprint(), two.fingerprint());

        let mut with_data = one.clone();
        with_data.set("data", json!({"a": 1})).unwrap();
        assert_ne!(one.fingerprint(), with_data.fingerprint());
    }

    #[test]
    fn test_priority_order() {
        let high = Request::builder().priority(1).build().unwrap();
        let low = Request::builder().priority(500).build().unwrap();
        assert_eq!(high.cmp_priority(&low), Ordering::Less);
        assert_eq!(low.cmp_priority(&low.clone()), Ordering::Equal);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Request::new("http://example.com").unwrap().to_string(),
            "<Request http://example.com>"
        );
    }
}
