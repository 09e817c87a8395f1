//! Object codec for structured values crossing a serialization boundary.
use crate::request::Payload;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encode error: {0}")]
    Encode(String),
    #[error("Decode error: {0}")]
    Decode(String),
}

pub trait ObjectCodec: Send + Sync + fmt::Debug {
    fn encode(&self, payload: &Payload) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<Payload, CodecError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ObjectCodec for JsonCodec {
    fn encode(&self, payload: &Payload) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(payload).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Payload, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_codec() {
        let payload = Payload::new("item", json!({"title": "t", "tags": ["a", "b"]}));
        let bytes = JsonCodec.encode(&payload).unwrap();
        assert_eq!(JsonCodec.decode(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_json_codec_rejects_garbage() {
        assert!(matches!(
            JsonCodec.decode(b"\x00not json"),
            Err(CodecError::Decode(_))
        ));
    }
}
