use crate::backing::{BackingStore, StoreKey};
use crate::core::error::Result;

/// Accepts everything, keeps nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpBackingStore;

impl BackingStore for NoOpBackingStore {
    fn store(&self, _key: &StoreKey, _payload: &[u8]) -> Result<()> {
        Ok(())
    }

    fn retrieve(&self, _key: &StoreKey) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn remove(&self, _key: &StoreKey) -> Result<()> {
        Ok(())
    }

    fn keys(&self, _record_name: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "noop"
    }
}
