pub mod cache;
pub mod filesystem;
pub mod noop;
pub mod remote;

use std::fmt;
use crate::core::error::Result;
use crate::core::record::validate_identifier;

pub use cache::CacheBackingStore;
pub use filesystem::FileBackingStore;
pub use noop::NoOpBackingStore;
pub use remote::{InMemoryObjectStorage, ObjectStorageClient, RemoteObjectStore};

/// Address of one record payload: `{record_name}/{key}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    record_name: String,
    key: String,
}

impl StoreKey {
    /// Both parts must be usable as a single path segment
    pub fn new(record_name: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        let record_name = record_name.into();
        let key = key.into();
        validate_identifier("record name", &record_name)?;
        validate_identifier("primary key value", &key)?;
        Ok(StoreKey { record_name, key })
    }

    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.record_name, self.key)
    }
}

/// Pluggable persistence for encoded record payloads.
///
/// `retrieve` of an absent key is `Ok(None)`. Removing an absent key is not
/// an error.
pub trait BackingStore: Send + Sync {
    fn store(&self, key: &StoreKey, payload: &[u8]) -> Result<()>;

    fn retrieve(&self, key: &StoreKey) -> Result<Option<Vec<u8>>>;

    fn remove(&self, key: &StoreKey) -> Result<()>;

    /// Keys stored for one record kind, ascending
    fn keys(&self, record_name: &str) -> Result<Vec<String>>;

    fn name(&self) -> &str;
}
