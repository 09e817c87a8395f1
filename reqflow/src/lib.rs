//! # reqflow
//!
//! Request descriptors and the fetch pipeline of a crawler.
//!
//! A [`Request`] says "fetch this url with these options" and carries the
//! scheduling metadata a crawler needs around it: priority, retry count,
//! callback names, dedup flags. The [`Downloader`] turns one request into
//! one http exchange, filling in method, user agent, proxy and session
//! from the global settings, and can keep the result in a
//! [`ResponseCache`] for replay.
//!
//! ## Modules
//!
//! - `request`: the descriptor, its transport options and transmissible form
//! - `fingerprint`: dedup / cache key of a request
//! - `pipeline`: the `Downloader`
//! - `transport`: the http call, with a reqwest implementation
//! - `cache`: fetched responses in a key-value store
//! - `queue`: in-process priority ordering of requests
pub mod cache;
pub mod codec;
pub mod error;
pub mod fingerprint;
pub mod pipeline;
pub mod prelude;
pub mod queue;
pub mod request;
pub mod response;
pub mod transport;

pub use cache::ResponseCache;
pub use error::{CacheError, FetchError, RequestError};
pub use pipeline::Downloader;
pub use queue::RequestQueue;
pub use request::{Request, RequestBuilder};
pub use response::Response;

pub use reqflow_cache as store;
pub use reqflow_config as config;
// re-export
pub use async_trait;
pub use reqwest;
pub use serde_json;
pub use tracing;
