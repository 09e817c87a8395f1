use crate::transport::TransportError;
use reqflow_cache::StoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid value for `{field}`: expected {expected}")]
    InvalidField { field: String, expected: &'static str },

    #[error("Failed to encode field `{field}`: {reason}")]
    Encode { field: String, reason: String },

    #[error("Failed to decode field `{field}`: {reason}")]
    Decode { field: String, reason: String },

    #[error("Builder error: {0}")]
    Builder(String),
}

impl From<derive_builder::UninitializedFieldError> for RequestError {
    fn from(e: derive_builder::UninitializedFieldError) -> Self {
        RequestError::Builder(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cached entry `{key}` cannot be decoded: {source}")]
    Decode {
        key: String,
        #[source]
        source: RequestError,
    },

    #[error("Response cannot be encoded: {0}")]
    Encode(#[source] RequestError),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request has no url")]
    MissingUrl,

    #[error("Invalid http method `{0}`")]
    InvalidMethod(String),

    #[error("No proxy available after waiting {0:?}")]
    NoProxyAvailable(Duration),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
