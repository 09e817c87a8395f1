//! The HTTP call itself, behind a trait so the pipeline can be driven by
//! anything that speaks "method + url + options".
mod client;

pub use client::{ReqwestTransport, SessionPool, SESSION_POOL_CLIENTS, SESSION_POOL_SIZE};

use crate::request::TransportOptions;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Invalid transport option `{key}`: {reason}")]
    InvalidOption { key: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session pool lock poisoned")]
    Poisoned,

    #[error("Transport error: {0}")]
    Other(String),
}

/// Which client carries the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Process-wide pooled client, kept alive across requests.
    Shared,
    /// Fresh client, dropped after the call.
    OneOff,
}

#[derive(Debug, Clone)]
pub struct Dispatch<'a> {
    pub method: Method,
    pub url: &'a str,
    pub options: &'a TransportOptions,
    pub session: SessionMode,
}

/// What came back over the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawResponse {
    pub status: u16,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, dispatch: Dispatch<'_>) -> Result<RawResponse, TransportError>;
}
