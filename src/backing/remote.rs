use std::collections::BTreeMap;
use std::sync::Arc;
use parking_lot::RwLock;
use tracing::{debug, error, info};
use crate::backing::{BackingStore, StoreKey};
use crate::core::error::{Error, ErrorKind, Result};

/// Access-control setting applied to written objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl(pub String);

impl Acl {
    pub fn private() -> Self {
        Acl("private".to_string())
    }
}

/// Minimal object-storage client surface
pub trait ObjectStorageClient: Send + Sync {
    /// Bucket ACL; also serves as the credential/bucket probe
    fn bucket_acl(&self, bucket: &str) -> Result<Acl>;

    fn put(&self, bucket: &str, key: &str, bytes: &[u8], content_type: &str, acl: &Acl) -> Result<()>;

    /// `Ok(None)` when the object does not exist
    fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>>;

    fn delete(&self, bucket: &str, key: &str) -> Result<()>;

    /// Keys starting with `prefix`, ascending
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;
}

/// Object written to an [`InMemoryObjectStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub acl: Acl,
}

/// Object storage held in process memory, buckets created up front
#[derive(Default, Clone)]
pub struct InMemoryObjectStorage {
    buckets: Arc<RwLock<BTreeMap<String, BTreeMap<String, StoredObject>>>>,
}

impl InMemoryObjectStorage {
    pub fn new() -> Self {
        InMemoryObjectStorage::default()
    }

    pub fn with_bucket(self, bucket: &str) -> Self {
        self.buckets.write().entry(bucket.to_string()).or_default();
        self
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.buckets.read().get(bucket)?.get(key).cloned()
    }

    fn no_bucket(bucket: &str) -> Error {
        Error::new(ErrorKind::Io, format!("no such bucket: {}", bucket))
    }
}

impl ObjectStorageClient for InMemoryObjectStorage {
    fn bucket_acl(&self, bucket: &str) -> Result<Acl> {
        if self.buckets.read().contains_key(bucket) {
            Ok(Acl::private())
        } else {
            Err(Self::no_bucket(bucket))
        }
    }

    fn put(&self, bucket: &str, key: &str, bytes: &[u8], content_type: &str, acl: &Acl) -> Result<()> {
        let mut buckets = self.buckets.write();
        let objects = buckets.get_mut(bucket).ok_or_else(|| Self::no_bucket(bucket))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
                acl: acl.clone(),
            },
        );
        Ok(())
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let buckets = self.buckets.read();
        let objects = buckets.get(bucket).ok_or_else(|| Self::no_bucket(bucket))?;
        Ok(objects.get(key).map(|o| o.bytes.clone()))
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let mut buckets = self.buckets.write();
        let objects = buckets.get_mut(bucket).ok_or_else(|| Self::no_bucket(bucket))?;
        objects.remove(key);
        Ok(())
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let buckets = self.buckets.read();
        let objects = buckets.get(bucket).ok_or_else(|| Self::no_bucket(bucket))?;
        Ok(objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Objects under `{record}/{key}` in one bucket, every write carrying the
/// bucket's ACL
pub struct RemoteObjectStore {
    client: Box<dyn ObjectStorageClient>,
    bucket: String,
    acl: Acl,
    content_type: &'static str,
}

impl RemoteObjectStore {
    /// Probes the bucket ACL; a failed probe fails construction
    pub fn new(
        client: Box<dyn ObjectStorageClient>,
        bucket: impl Into<String>,
        content_type: &'static str,
    ) -> Result<Self> {
        let bucket = bucket.into();
        let acl = client.bucket_acl(&bucket).inspect_err(|err| {
            error!(bucket = %bucket, error = %err, "bucket probe failed");
        })?;
        info!(bucket = %bucket, acl = %acl.0, "remote object store ready");

        Ok(RemoteObjectStore {
            client,
            bucket,
            acl,
            content_type,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl BackingStore for RemoteObjectStore {
    fn store(&self, key: &StoreKey, payload: &[u8]) -> Result<()> {
        let object_key = key.to_string();
        self.client
            .put(&self.bucket, &object_key, payload, self.content_type, &self.acl)?;
        debug!(bucket = %self.bucket, key = %object_key, "object put");
        Ok(())
    }

    fn retrieve(&self, key: &StoreKey) -> Result<Option<Vec<u8>>> {
        self.client.get(&self.bucket, &key.to_string())
    }

    fn remove(&self, key: &StoreKey) -> Result<()> {
        self.client.delete(&self.bucket, &key.to_string())
    }

    fn keys(&self, record_name: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", record_name);
        let mut keys: Vec<String> = self
            .client
            .list(&self.bucket, &prefix)?
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .filter(|k| !k.contains('/'))
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn name(&self) -> &str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_bucket_fails_construction() {
        let client = InMemoryObjectStorage::new();
        let err = RemoteObjectStore::new(Box::new(client), "kira", "application/octet-stream")
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::Io);
    }

    #[test]
    fn writes_carry_acl_and_content_type() {
        let client = InMemoryObjectStorage::new().with_bucket("kira");
        let store = RemoteObjectStore::new(Box::new(client.clone()), "kira", "application/octet-stream").unwrap();
        let key = StoreKey::new("person", "1234").unwrap();

        store.store(&key, b"payload").unwrap();
        let object = client.object("kira", "person/1234").unwrap();
        assert_eq!(object.acl, Acl::private());
        assert_eq!(object.content_type, "application/octet-stream");
        assert_eq!(store.retrieve(&key).unwrap().unwrap(), b"payload");

        store.remove(&key).unwrap();
        assert!(store.retrieve(&key).unwrap().is_none());
    }

    #[test]
    fn keys_strip_the_record_prefix() {
        let client = InMemoryObjectStorage::new().with_bucket("kira");
        let store = RemoteObjectStore::new(Box::new(client), "kira", "application/octet-stream").unwrap();
        for (record, k) in [("ex", "2"), ("ex", "1"), ("exp", "9")] {
            store.store(&StoreKey::new(record, k).unwrap(), b"x").unwrap();
        }
        assert_eq!(store.keys("ex").unwrap(), vec!["1", "2"]);
    }
}
