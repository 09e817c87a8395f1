//! `Transport` on top of reqwest.
//!
//! reqwest fixes proxies, TLS and redirect policy per client, so the
//! options are split in two: the client-level part forms a `ClientKey`,
//! the rest is applied to the individual request. Shared-session calls
//! reuse one pooled client per key for the whole process.
use super::{Dispatch, RawResponse, SessionMode, Transport, TransportError};
use crate::request::{TransportKey, TransportOptions};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{redirect, Certificate, Client, Identity, Proxy};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

/// Idle connections kept per host by shared-session clients.
pub const SESSION_POOL_SIZE: usize = 1000;

static SESSION: OnceLock<SessionPool> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Verify {
    Disabled,
    Enabled,
    CaBundle(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum ProxyScheme {
    Http,
    Https,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    verify: Verify,
    proxies: Vec<(ProxyScheme, String)>,
    cert: Option<(PathBuf, Option<PathBuf>)>,
    allow_redirects: bool,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

impl ClientKey {
    fn from_options(options: &TransportOptions) -> Result<Self, TransportError> {
        let (connect_timeout, read_timeout) = parse_timeout(options.data(TransportKey::Timeout))?;
        Ok(Self {
            verify: parse_verify(options.data(TransportKey::Verify))?,
            proxies: parse_proxies(options.data(TransportKey::Proxies))?,
            cert: parse_cert(options.data(TransportKey::Cert))?,
            allow_redirects: parse_allow_redirects(options.data(TransportKey::AllowRedirects))?,
            connect_timeout,
            read_timeout,
        })
    }

    fn build(&self, pooled: bool) -> Result<Client, TransportError> {
        let redirect_policy = if self.allow_redirects {
            redirect::Policy::default()
        } else {
            redirect::Policy::none()
        };
        let mut builder = Client::builder().use_rustls_tls().redirect(redirect_policy);

        match &self.verify {
            Verify::Disabled => builder = builder.danger_accept_invalid_certs(true),
            Verify::Enabled => {}
            Verify::CaBundle(path) => {
                let pem = std::fs::read(path)?;
                builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
            }
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = self.read_timeout {
            builder = builder.read_timeout(timeout);
        }
        // proxies come from the request only, never from the environment
        if self.proxies.is_empty() {
            builder = builder.no_proxy();
        }
        for (scheme, uri) in &self.proxies {
            let proxy = match scheme {
                ProxyScheme::Http => Proxy::http(uri.as_str())?,
                ProxyScheme::Https => Proxy::https(uri.as_str())?,
                ProxyScheme::All => Proxy::all(uri.as_str())?,
            };
            builder = builder.proxy(proxy);
        }
        if let Some((cert, key)) = &self.cert {
            let mut pem = std::fs::read(cert)?;
            if let Some(key) = key {
                pem.push(b'\n');
                pem.extend(std::fs::read(key)?);
            }
            builder = builder.identity(Identity::from_pem(&pem)?);
        }

        builder = if pooled {
            builder
                .pool_max_idle_per_host(SESSION_POOL_SIZE)
                .cookie_store(true)
        } else {
            builder.pool_max_idle_per_host(0)
        };
        Ok(builder.build()?)
    }
}

/// Clients kept by a [`SessionPool`] before the least recently used one
/// is dropped.
pub const SESSION_POOL_CLIENTS: usize = 64;

struct Pooled {
    client: Client,
    last_used: u64,
}

#[derive(Default)]
struct Clients {
    entries: HashMap<ClientKey, Pooled>,
    tick: u64,
}

/// Process-wide pooled clients, one per client-level configuration.
///
/// A shared session is therefore per configuration: requests that differ
/// in proxies, TLS verification, client certificate, redirect policy or
/// timeouts get separate clients, with separate connection pools and
/// cookie jars. At most `capacity` clients are kept; past that the least
/// recently used one is evicted and its cookies are lost.
pub struct SessionPool {
    clients: Mutex<Clients>,
    capacity: usize,
}

impl Default for SessionPool {
    fn default() -> Self {
        Self::with_capacity(SESSION_POOL_CLIENTS)
    }
}

impl SessionPool {
    /// Pool holding at most `capacity` clients (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            clients: Mutex::new(Clients::default()),
            capacity: capacity.max(1),
        }
    }

    /// The shared pool, created on first use.
    pub fn global() -> &'static SessionPool {
        SESSION.get_or_init(|| {
            tracing::debug!(
                "Creating shared http session pool ({} clients, {} idle connections per host)",
                SESSION_POOL_CLIENTS,
                SESSION_POOL_SIZE
            );
            SessionPool::default()
        })
    }

    fn client(&self, key: &ClientKey) -> Result<Client, TransportError> {
        let mut clients = self.clients.lock().map_err(|_| TransportError::Poisoned)?;
        clients.tick += 1;
        let tick = clients.tick;
        if let Some(pooled) = clients.entries.get_mut(key) {
            pooled.last_used = tick;
            return Ok(pooled.client.clone());
        }

        let client = key.build(true)?;
        if clients.entries.len() >= self.capacity {
            let oldest = clients
                .entries
                .iter()
                .min_by_key(|(_, pooled)| pooled.last_used)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                tracing::debug!("Session pool full, evicting client for {:?}", oldest);
                clients.entries.remove(&oldest);
            }
        }
        clients.entries.insert(
            key.clone(),
            Pooled {
                client: client.clone(),
                last_used: tick,
            },
        );
        Ok(client)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of distinct pooled clients.
    pub fn len(&self) -> usize {
        self.clients
            .lock()
            .map(|clients| clients.entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("clients", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    pub fn new() -> Self {
        Self
    }

    fn client(
        &self,
        options: &TransportOptions,
        session: SessionMode,
    ) -> Result<Client, TransportError> {
        let key = ClientKey::from_options(options)?;
        match session {
            SessionMode::Shared => SessionPool::global().client(&key),
            SessionMode::OneOff => key.build(false),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn request(&self, dispatch: Dispatch<'_>) -> Result<RawResponse, TransportError> {
        check_plain_data(dispatch.options)?;
        let client = self.client(dispatch.options, dispatch.session)?;
        let builder = client.request(dispatch.method.clone(), dispatch.url);
        let response = prepare(builder, dispatch.options).await?.send().await?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
        let body = response.bytes().await?;

        Ok(RawResponse {
            status,
            url,
            headers,
            body,
        })
    }
}

// Handlers and payloads mean nothing on the wire; hooks are the exception
// and get ignored later.
fn check_plain_data(options: &TransportOptions) -> Result<(), TransportError> {
    for (key, value) in options.iter() {
        if key != TransportKey::Hooks && value.as_data().is_none() {
            return Err(option_error(key, "expected plain data"));
        }
    }
    Ok(())
}

async fn prepare(
    mut builder: reqwest::RequestBuilder,
    options: &TransportOptions,
) -> Result<reqwest::RequestBuilder, TransportError> {
    if let Some(params) = options.data(TransportKey::Params) {
        builder = builder.query(&pairs(TransportKey::Params, params)?);
    }
    if let Some(headers) = options.data(TransportKey::Headers) {
        builder = builder.headers(header_map(headers)?);
    }
    if let Some(cookies) = options.data(TransportKey::Cookies) {
        if let Some(cookie) = cookie_header(cookies)? {
            builder = builder.header(COOKIE, cookie);
        }
    }
    if let Some(auth) = options.data(TransportKey::Auth) {
        builder = apply_auth(builder, auth)?;
    }
    // a form body given as `data` takes over from `json`
    if let Some(json) = options.data(TransportKey::Json) {
        if !json.is_null() {
            builder = builder.json(json);
        }
    }
    let data = options.data(TransportKey::Data);
    match options.data(TransportKey::Files) {
        Some(files) if !files.is_null() => {
            builder = builder.multipart(multipart_form(files, data).await?);
        }
        _ => {
            if let Some(data) = data {
                builder = apply_body(builder, data)?;
            }
        }
    }
    if options.contains(TransportKey::Hooks) {
        tracing::warn!("`hooks` are not supported by the reqwest transport, ignoring");
    }
    Ok(builder)
}

fn option_error(key: TransportKey, reason: impl Into<String>) -> TransportError {
    TransportError::InvalidOption {
        key: key.as_str().to_string(),
        reason: reason.into(),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn seconds(key: TransportKey, value: &Value) -> Result<Option<Duration>, TransportError> {
    if value.is_null() {
        return Ok(None);
    }
    let secs = value
        .as_f64()
        .filter(|secs| *secs > 0.0)
        .ok_or_else(|| option_error(key, "expected a positive number of seconds"))?;
    Duration::try_from_secs_f64(secs)
        .map(Some)
        .map_err(|e| option_error(key, format!("{} seconds: {}", secs, e)))
}

fn parse_timeout(
    value: Option<&Value>,
) -> Result<(Option<Duration>, Option<Duration>), TransportError> {
    let key = TransportKey::Timeout;
    match value {
        None | Some(Value::Null) => Ok((None, None)),
        Some(Value::Array(parts)) if parts.len() == 2 => {
            Ok((seconds(key, &parts[0])?, seconds(key, &parts[1])?))
        }
        Some(other) => {
            let timeout = seconds(key, other)?;
            Ok((timeout, timeout))
        }
    }
}

fn parse_verify(value: Option<&Value>) -> Result<Verify, TransportError> {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(true)) => Ok(Verify::Enabled),
        Some(Value::Bool(false)) => Ok(Verify::Disabled),
        Some(Value::String(path)) => Ok(Verify::CaBundle(PathBuf::from(path))),
        Some(_) => Err(option_error(
            TransportKey::Verify,
            "expected a boolean or a CA bundle path",
        )),
    }
}

fn parse_proxies(value: Option<&Value>) -> Result<Vec<(ProxyScheme, String)>, TransportError> {
    let mut proxies = match value {
        None | Some(Value::Null) => vec![],
        Some(Value::String(uri)) if uri.is_empty() => vec![],
        Some(Value::String(uri)) => vec![(ProxyScheme::All, uri.clone())],
        Some(Value::Object(map)) => {
            let mut proxies = Vec::with_capacity(map.len());
            for (scheme, uri) in map {
                let uri = match uri {
                    Value::Null => continue,
                    Value::String(uri) if uri.is_empty() => continue,
                    Value::String(uri) => uri.clone(),
                    _ => return Err(option_error(TransportKey::Proxies, "expected proxy uris")),
                };
                let scheme = match scheme.as_str() {
                    "http" => ProxyScheme::Http,
                    "https" => ProxyScheme::Https,
                    "all" => ProxyScheme::All,
                    other => {
                        tracing::warn!("Ignoring proxy for unsupported key `{}`", other);
                        continue;
                    }
                };
                proxies.push((scheme, uri));
            }
            proxies
        }
        Some(_) => {
            return Err(option_error(
                TransportKey::Proxies,
                "expected a mapping of scheme to proxy uri",
            ))
        }
    };
    proxies.sort();
    Ok(proxies)
}

fn parse_cert(value: Option<&Value>) -> Result<Option<(PathBuf, Option<PathBuf>)>, TransportError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(path)) => Ok(Some((PathBuf::from(path), None))),
        Some(Value::Array(parts)) if parts.len() == 2 => match (parts[0].as_str(), parts[1].as_str()) {
            (Some(cert), Some(key)) => Ok(Some((PathBuf::from(cert), Some(PathBuf::from(key))))),
            _ => Err(option_error(TransportKey::Cert, "expected [cert, key] paths")),
        },
        Some(_) => Err(option_error(
            TransportKey::Cert,
            "expected a pem path or [cert, key] paths",
        )),
    }
}

fn parse_allow_redirects(value: Option<&Value>) -> Result<bool, TransportError> {
    match value {
        None | Some(Value::Null) => Ok(true),
        Some(Value::Bool(allow)) => Ok(*allow),
        Some(_) => Err(option_error(TransportKey::AllowRedirects, "expected a boolean")),
    }
}

/// Flatten params / form data into key-value pairs. List values repeat
/// the key.
fn pairs(key: TransportKey, value: &Value) -> Result<Vec<(String, String)>, TransportError> {
    let mut out = Vec::new();
    match value {
        Value::Null => {}
        Value::String(encoded) => {
            out.extend(url::form_urlencoded::parse(encoded.as_bytes()).into_owned());
        }
        Value::Object(map) => {
            for (name, value) in map {
                match value {
                    Value::Null => {}
                    Value::Array(items) => {
                        out.extend(items.iter().map(|item| (name.clone(), scalar(item))));
                    }
                    other => out.push((name.clone(), scalar(other))),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                match item.as_array().map(Vec::as_slice) {
                    Some([name, value]) => out.push((scalar(name), scalar(value))),
                    _ => return Err(option_error(key, "expected [name, value] pairs")),
                }
            }
        }
        _ => return Err(option_error(key, "expected a mapping or an encoded string")),
    }
    Ok(out)
}

fn header_map(value: &Value) -> Result<HeaderMap, TransportError> {
    let key = TransportKey::Headers;
    let Value::Object(map) = value else {
        return Err(option_error(key, "expected a mapping of header name to value"));
    };
    let mut headers = HeaderMap::with_capacity(map.len());
    for (name, value) in map {
        if value.is_null() {
            continue;
        }
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| option_error(key, format!("`{}`: {}", name, e)))?;
        let header_value = HeaderValue::from_str(&scalar(value))
            .map_err(|e| option_error(key, format!("`{}`: {}", name, e)))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

fn cookie_header(value: &Value) -> Result<Option<String>, TransportError> {
    match value {
        Value::Null => Ok(None),
        Value::String(raw) => Ok(Some(raw.clone())),
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Object(map) => Ok(Some(
            map.iter()
                .map(|(name, value)| format!("{}={}", name, scalar(value)))
                .collect::<Vec<_>>()
                .join("; "),
        )),
        _ => Err(option_error(
            TransportKey::Cookies,
            "expected a mapping of cookie name to value",
        )),
    }
}

fn apply_auth(
    builder: reqwest::RequestBuilder,
    value: &Value,
) -> Result<reqwest::RequestBuilder, TransportError> {
    match value {
        Value::Null => Ok(builder),
        Value::Array(parts) => match parts.as_slice() {
            [Value::String(user)] => Ok(builder.basic_auth(user, None::<&str>)),
            [Value::String(user), Value::String(password)] => {
                Ok(builder.basic_auth(user, Some(password)))
            }
            _ => Err(option_error(TransportKey::Auth, "expected [user, password]")),
        },
        _ => Err(option_error(TransportKey::Auth, "expected [user, password]")),
    }
}

fn apply_body(
    builder: reqwest::RequestBuilder,
    value: &Value,
) -> Result<reqwest::RequestBuilder, TransportError> {
    match value {
        Value::Null => Ok(builder),
        Value::String(raw) => Ok(builder.body(raw.clone())),
        Value::Object(_) | Value::Array(_) => {
            Ok(builder.form(&pairs(TransportKey::Data, value)?))
        }
        other => Ok(builder.body(other.to_string())),
    }
}

async fn multipart_form(files: &Value, data: Option<&Value>) -> Result<Form, TransportError> {
    let key = TransportKey::Files;
    let mut form = Form::new();
    if let Some(data) = data {
        for (name, value) in pairs(TransportKey::Data, data)? {
            form = form.text(name, value);
        }
    }

    let Value::Object(files) = files else {
        return Err(option_error(key, "expected a mapping of field name to file path"));
    };
    for (field, entry) in files {
        let (file_name, path) = match entry {
            Value::String(path) => (file_name_of(path), PathBuf::from(path)),
            Value::Array(parts) => match parts.as_slice() {
                [Value::String(name), Value::String(path)] => (name.clone(), PathBuf::from(path)),
                _ => return Err(option_error(key, "expected [file name, path]")),
            },
            _ => return Err(option_error(key, "expected a path or [file name, path]")),
        };
        let bytes = tokio::fs::read(&path).await?;
        form = form.part(field.clone(), Part::bytes(bytes).file_name(file_name));
    }
    Ok(form)
}

fn file_name_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_key_defaults() {
        let key = ClientKey::from_options(&TransportOptions::new()).unwrap();
        assert_eq!(key.verify, Verify::Enabled);
        assert!(key.proxies.is_empty());
        assert!(key.allow_redirects);
        assert_eq!(key.connect_timeout, None);
    }

    #[test]
    fn test_client_key_from_options() {
        let mut options = TransportOptions::new();
        options.insert(TransportKey::Timeout, 22);
        options.insert(TransportKey::Verify, false);
        options.insert(TransportKey::AllowRedirects, false);
        options.insert(
            TransportKey::Proxies,
            json!({"https": "http://proxy:8080", "http": "http://proxy:8080", "ftp": "x"}),
        );

        let key = ClientKey::from_options(&options).unwrap();
        assert_eq!(key.connect_timeout, Some(Duration::from_secs(22)));
        assert_eq!(key.read_timeout, Some(Duration::from_secs(22)));
        assert_eq!(key.verify, Verify::Disabled);
        assert!(!key.allow_redirects);
        assert_eq!(
            key.proxies,
            vec![
                (ProxyScheme::Http, "http://proxy:8080".to_string()),
                (ProxyScheme::Https, "http://proxy:8080".to_string()),
            ]
        );
    }

    #[test]
    fn test_split_timeout() {
        let (connect, read) = parse_timeout(Some(&json!([3, 10.5]))).unwrap();
        assert_eq!(connect, Some(Duration::from_secs(3)));
        assert_eq!(read, Some(Duration::from_millis(10_500)));
        assert!(parse_timeout(Some(&json!("soon"))).is_err());
        assert!(parse_timeout(Some(&json!(-1))).is_err());
    }

    #[test]
    fn test_out_of_range_timeout_is_an_option_error() {
        assert!(matches!(
            parse_timeout(Some(&json!(1e20))),
            Err(TransportError::InvalidOption { ref key, .. }) if key == "timeout"
        ));
        assert!(parse_timeout(Some(&json!([1, f64::MAX]))).is_err());
        assert_eq!(
            parse_timeout(Some(&json!(86_400))).unwrap().0,
            Some(Duration::from_secs(86_400))
        );
    }

    #[test]
    fn test_empty_proxies_mean_none() {
        assert!(parse_proxies(Some(&json!({}))).unwrap().is_empty());
        assert!(parse_proxies(Some(&json!(""))).unwrap().is_empty());
        assert!(parse_proxies(Some(&json!(null))).unwrap().is_empty());
    }

    #[test]
    fn test_pairs() {
        assert_eq!(
            pairs(TransportKey::Params, &json!({"q": "rust", "page": 2, "tag": ["a", "b"]})).unwrap(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("q".to_string(), "rust".to_string()),
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
            ]
        );
        assert_eq!(
            pairs(TransportKey::Params, &json!("a=1&b=two")).unwrap(),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two".to_string()),
            ]
        );
        assert!(pairs(TransportKey::Params, &json!(5)).is_err());
    }

    #[test]
    fn test_header_map_rejects_bad_names() {
        assert!(header_map(&json!({"User-Agent": "x", "Accept": "*/*"})).is_ok());
        assert!(header_map(&json!({"bad header": "x"})).is_err());
        assert!(header_map(&json!(["User-Agent"])).is_err());
    }

    #[test]
    fn test_cookie_header() {
        assert_eq!(
            cookie_header(&json!({"a": "1", "b": 2})).unwrap().as_deref(),
            Some("a=1; b=2")
        );
        assert_eq!(cookie_header(&json!({})).unwrap(), None);
    }

    #[test]
    fn test_non_data_options_rejected() {
        let mut options = TransportOptions::new();
        options.insert(
            TransportKey::Data,
            crate::request::Payload::new("item", json!({})),
        );
        assert!(matches!(
            check_plain_data(&options),
            Err(TransportError::InvalidOption { .. })
        ));

        let mut options = TransportOptions::new();
        options.insert(
            TransportKey::Hooks,
            crate::request::HandlerRef::new("on_response"),
        );
        assert!(check_plain_data(&options).is_ok());
    }

    #[test]
    fn test_session_pool_reuses_clients() {
        let pool = SessionPool::default();
        let key = ClientKey::from_options(&TransportOptions::new()).unwrap();
        pool.client(&key).unwrap();
        pool.client(&key).unwrap();
        assert_eq!(pool.len(), 1);

        let mut options = TransportOptions::new();
        options.insert(TransportKey::Verify, false);
        let other = ClientKey::from_options(&options).unwrap();
        pool.client(&other).unwrap();
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_session_pool_evicts_least_recently_used() {
        let pool = SessionPool::with_capacity(2);
        let key = |option: Option<(TransportKey, bool)>| {
            let mut options = TransportOptions::new();
            if let Some((name, value)) = option {
                options.insert(name, value);
            }
            ClientKey::from_options(&options).unwrap()
        };
        let default = key(None);
        let insecure = key(Some((TransportKey::Verify, false)));
        let no_redirects = key(Some((TransportKey::AllowRedirects, false)));

        pool.client(&default).unwrap();
        pool.client(&insecure).unwrap();
        pool.client(&default).unwrap();
        pool.client(&no_redirects).unwrap();

        assert_eq!(pool.len(), 2);
        let clients = pool.clients.lock().unwrap();
        assert!(clients.entries.contains_key(&default));
        assert!(clients.entries.contains_key(&no_redirects));
        assert!(!clients.entries.contains_key(&insecure));
    }

    #[test]
    fn test_session_pool_stays_capped() {
        let pool = SessionPool::with_capacity(8);
        for port in 0..50 {
            let mut options = TransportOptions::new();
            options.insert(
                TransportKey::Proxies,
                json!({"http": format!("http://127.0.0.1:{}", 20_000 + port)}),
            );
            pool.client(&ClientKey::from_options(&options).unwrap()).unwrap();
        }
        assert_eq!(pool.len(), 8);
        assert_eq!(SessionPool::default().capacity(), SESSION_POOL_CLIENTS);
    }

    #[test]
    fn test_global_pool_created_once() {
        let handles: Vec<_> = (0..16)
            .map(|_| std::thread::spawn(|| SessionPool::global() as *const SessionPool as usize))
            .collect();
        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addresses.iter().all(|addr| *addr == addresses[0]));
    }
}
