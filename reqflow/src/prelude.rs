pub use crate::cache::ResponseCache;
pub use crate::codec::{JsonCodec, ObjectCodec};
pub use crate::error::{CacheError, FetchError, RequestError};
pub use crate::pipeline::Downloader;
pub use crate::queue::RequestQueue;
pub use crate::request::{
    AttrValue, HandlerRef, Payload, Request, RequestBuilder, Transmissible, TransportKey,
    TransportOptions,
};
pub use crate::response::Response;
pub use crate::transport::{ReqwestTransport, Transport};
pub use reqflow_cache::{AbstractStore, KeyValueStore, MemoryStore};
pub use reqflow_config::{Policy, ProxyProvider, Settings, UserAgentProvider};
