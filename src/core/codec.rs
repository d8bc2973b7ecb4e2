use serde::Serialize;
use serde::de::DeserializeOwned;
use crate::core::error::{Error, ErrorKind, Result};

/// Freezes and thaws record payloads for the index `object` field and the
/// backing stores.
pub trait Codec: Send + Sync {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    fn content_type(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value)
            .map_err(|e| Error::new(ErrorKind::Decode, format!("encode: {}", e)))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes)
            .map_err(|e| Error::new(ErrorKind::Decode, format!("decode: {}", e)))
    }

    fn content_type(&self) -> &'static str {
        "application/octet-stream"
    }
}
