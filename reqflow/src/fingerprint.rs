//! Request fingerprints used for de-duplication and cache keys.
//!
//! The digest covers the url, then the query params, then the body, in
//! that order. Persisted cache keys depend on it, so do not reorder.
use crate::request::AttrValue;

/// MD5 over `url + str(params) + str(data)`, as lowercase hex. Empty or
/// missing params/data contribute nothing.
pub fn fingerprint(url: &str, params: Option<&AttrValue>, data: Option<&AttrValue>) -> String {
    let mut input = String::from(url);
    for part in [params, data].into_iter().flatten() {
        if let Some(s) = stringify(part) {
            input.push_str(&s);
        }
    }
    format!("{:x}", md5::compute(input.as_bytes()))
}

// None for values that count as empty.
fn stringify(value: &AttrValue) -> Option<String> {
    match value {
        AttrValue::Data(data) => match data {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(false) => None,
            serde_json::Value::Number(n) if n.as_f64() == Some(0.0) => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(a) if a.is_empty() => None,
            serde_json::Value::Object(o) if o.is_empty() => None,
            other => Some(other.to_string()),
        },
        AttrValue::Handler(handler) => Some(handler.registered_name()),
        AttrValue::Object(payload) => Some(payload.data.to_string()),
    }
}
