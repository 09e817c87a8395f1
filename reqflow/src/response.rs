use crate::codec::ObjectCodec;
use crate::error::RequestError;
use crate::request::{Field, Request, Transmissible};
use crate::transport::RawResponse;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Result of one fetch attempt, tied to the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    /// Final url, after redirects.
    pub url: String,
    /// Repeated headers are joined with ", ".
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    pub request: Request,
}

impl Response {
    pub fn from_raw(raw: RawResponse, request: Request) -> Self {
        Self {
            status: raw.status,
            url: raw.url,
            headers: raw.headers,
            body: raw.body,
            request,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Flatten for storage. The body is kept as raw bytes and the request
    /// in its own transmissible form.
    pub fn to_transmissible(
        &self,
        codec: &dyn ObjectCodec,
    ) -> Result<Transmissible, RequestError> {
        let request = self.request.to_transmissible(codec)?;
        let request = serde_json::to_value(&request).map_err(|e| RequestError::Encode {
            field: "request".into(),
            reason: e.to_string(),
        })?;
        let headers = serde_json::to_value(&self.headers).map_err(|e| RequestError::Encode {
            field: "headers".into(),
            reason: e.to_string(),
        })?;

        let mut out = Transmissible::new();
        out.insert("status", Field::Value(self.status.into()));
        out.insert("url", Field::Value(self.url.clone().into()));
        out.insert("headers", Field::Value(headers));
        out.insert("body", Field::Encoded(self.body.to_vec()));
        out.insert("request", Field::Value(request));
        Ok(out)
    }

    /// Inverse of `to_transmissible`; the request is rebuilt through
    /// `Request::from_transmissible`.
    pub fn from_transmissible(
        mut transmissible: Transmissible,
        codec: &dyn ObjectCodec,
    ) -> Result<Self, RequestError> {
        let status = match transmissible.remove("status") {
            Some(Field::Value(value)) => value
                .as_u64()
                .and_then(|s| u16::try_from(s).ok())
                .ok_or_else(|| decode_error("status", "expected an http status code"))?,
            _ => return Err(decode_error("status", "missing")),
        };
        let url = match transmissible.remove("url") {
            Some(Field::Value(serde_json::Value::String(url))) => url,
            _ => return Err(decode_error("url", "missing")),
        };
        let headers = match transmissible.remove("headers") {
            Some(Field::Value(value)) => serde_json::from_value(value)
                .map_err(|e| decode_error("headers", &e.to_string()))?,
            _ => BTreeMap::new(),
        };
        let body = match transmissible.remove("body") {
            Some(Field::Encoded(bytes)) => Bytes::from(bytes),
            None => Bytes::new(),
            Some(Field::Value(_)) => return Err(decode_error("body", "expected raw bytes")),
        };
        let request = match transmissible.remove("request") {
            Some(Field::Value(value)) => {
                let request: Transmissible = serde_json::from_value(value)
                    .map_err(|e| decode_error("request", &e.to_string()))?;
                Request::from_transmissible(request, codec)?
            }
            _ => return Err(decode_error("request", "missing")),
        };

        Ok(Self {
            status,
            url,
            headers,
            body,
            request,
        })
    }
}

fn decode_error(field: &str, reason: &str) -> RequestError {
    RequestError::Decode {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::request::Payload;
    use serde_json::json;

    fn sample() -> Response {
        let request = Request::builder()
            .url("http://example.com/item")
            .extra("item", Payload::new("item", json!({"id": 1})))
            .build()
            .unwrap();
        Response {
            status: 200,
            url: "http://example.com/item".into(),
            headers: BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: Bytes::from_static(b"{\"ok\":true}"),
            request,
        }
    }

    #[test]
    fn test_accessors() {
        let response = sample();
        assert!(response.is_success());
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.text(), "{\"ok\":true}");
        assert_eq!(response.json::<serde_json::Value>().unwrap(), json!({"ok": true}));
    }

    #[test]
    fn test_transmissible_round_trip() {
        let response = sample();
        let stored = response.to_transmissible(&JsonCodec).unwrap().to_json().unwrap();
        let restored = Response::from_transmissible(
            Transmissible::from_json(&stored).unwrap(),
            &JsonCodec,
        )
        .unwrap();
        assert_eq!(restored, response);
    }

    #[test]
    fn test_missing_status_fails() {
        let mut t = sample().to_transmissible(&JsonCodec).unwrap();
        t.remove("status");
        assert!(matches!(
            Response::from_transmissible(t, &JsonCodec),
            Err(RequestError::Decode { ref field, .. }) if field == "status"
        ));
    }
}
