use std::num::NonZeroUsize;
use std::sync::Arc;
use lru::LruCache;
use parking_lot::{const_mutex, Mutex};
use tracing::{debug, info};
use crate::backing::{BackingStore, StoreKey};
use crate::core::error::{Error, ErrorKind, Result};

type Region = Arc<Mutex<LruCache<StoreKey, Vec<u8>>>>;

static REGION: Mutex<Option<Region>> = const_mutex(None);

/// Process-wide cache region, created on first use with `capacity` entries.
/// Later calls return the existing region whatever capacity they ask for.
pub fn init(capacity: usize) -> Result<Region> {
    let mut global = REGION.lock();
    if let Some(region) = global.as_ref() {
        return Ok(region.clone());
    }

    let region = new_region(capacity)?;
    *global = Some(region.clone());
    info!(capacity, "cache region initialized");
    Ok(region)
}

/// Detach the process-wide region. Stores built before keep their handle;
/// stores built after start from an empty region.
pub fn shutdown() {
    if REGION.lock().take().is_some() {
        info!("cache region shut down");
    }
}

fn new_region(capacity: usize) -> Result<Region> {
    let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
        Error::new(ErrorKind::InvalidArgument, "cache capacity must be positive")
    })?;
    Ok(Arc::new(Mutex::new(LruCache::new(capacity))))
}

/// Bounded in-process store. Last write wins; nothing survives the process.
#[derive(Clone)]
pub struct CacheBackingStore {
    region: Region,
}

impl CacheBackingStore {
    /// Store over the shared process-wide region
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(CacheBackingStore { region: init(capacity)? })
    }

    /// Store over a region of its own, invisible to other stores
    pub fn isolated(capacity: usize) -> Result<Self> {
        Ok(CacheBackingStore { region: new_region(capacity)? })
    }

    pub fn len(&self) -> usize {
        self.region.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.region.lock().is_empty()
    }
}

impl BackingStore for CacheBackingStore {
    fn store(&self, key: &StoreKey, payload: &[u8]) -> Result<()> {
        self.region.lock().put(key.clone(), payload.to_vec());
        Ok(())
    }

    fn retrieve(&self, key: &StoreKey) -> Result<Option<Vec<u8>>> {
        let found = self.region.lock().get(key).cloned();
        debug!(key = %key, hit = found.is_some(), "cache lookup");
        Ok(found)
    }

    fn remove(&self, key: &StoreKey) -> Result<()> {
        self.region.lock().pop(key);
        Ok(())
    }

    fn keys(&self, record_name: &str) -> Result<Vec<String>> {
        let region = self.region.lock();
        let mut keys: Vec<String> = region
            .iter()
            .filter(|(k, _)| k.record_name() == record_name)
            .map(|(k, _)| k.key().to_string())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn name(&self) -> &str {
        "cache"
    }
}
