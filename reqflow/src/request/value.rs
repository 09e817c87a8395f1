use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// Symbolic reference to a handler (parser callback, download middleware).
///
/// Only the name crosses process boundaries; turning it back into a
/// function is up to whoever dispatches the response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerRef {
    pub scope: Option<String>,
    pub name: String,
}

impl HandlerRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            scope: None,
            name: name.into(),
        }
    }

    pub fn scoped(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
            name: name.into(),
        }
    }

    /// `scope.name`, or just `name` when unscoped.
    pub fn registered_name(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{}.{}", scope, self.name),
            None => self.name.clone(),
        }
    }

    /// Inverse of `registered_name`; the last dot separates scope and name.
    pub fn parse(registered: &str) -> Self {
        match registered.rsplit_once('.') {
            Some((scope, name)) if !scope.is_empty() && !name.is_empty() => {
                Self::scoped(scope, name)
            }
            _ => Self::new(registered),
        }
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.registered_name())
    }
}

impl From<&str> for HandlerRef {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for HandlerRef {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// Structured value attached to a request (a parsed item and the like).
/// It travels through the object codec instead of as plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub kind: String,
    pub data: serde_json::Value,
}

impl Payload {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    pub fn from_value<T: Serialize>(
        kind: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(kind, serde_json::to_value(value)?))
    }

    pub fn to_value<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

/// Value of a request attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Plain data: strings, numbers, maps of headers, query params...
    Data(serde_json::Value),
    Handler(HandlerRef),
    Object(Payload),
}

impl AttrValue {
    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            AttrValue::Data(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_data().and_then(|v| v.as_str())
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_data().and_then(|v| v.as_bool())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_data().and_then(|v| v.as_i64())
    }

    pub fn as_handler(&self) -> Option<&HandlerRef> {
        match self {
            AttrValue::Handler(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Payload> {
        match self {
            AttrValue::Object(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Data(serde_json::Value::Null))
    }
}

impl From<serde_json::Value> for AttrValue {
    fn from(value: serde_json::Value) -> Self {
        AttrValue::Data(value)
    }
}

impl From<HandlerRef> for AttrValue {
    fn from(value: HandlerRef) -> Self {
        AttrValue::Handler(value)
    }
}

impl From<Payload> for AttrValue {
    fn from(value: Payload) -> Self {
        AttrValue::Object(value)
    }
}

macro_rules! impl_from_data {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for AttrValue {
                fn from(value: $ty) -> Self {
                    AttrValue::Data(serde_json::Value::from(value))
                }
            }
        )*
    };
}

impl_from_data!(&str, String, bool, i32, i64, u32, u64, f64);
