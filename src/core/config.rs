use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Serialize, Deserialize};
use crate::core::error::Result;
use crate::core::retry::RetryPolicy;
use crate::storage::merge_policy::TieredMergePolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub index_path: PathBuf,

    // Index writer acquisition
    pub writer_max_attempts: u32,
    pub writer_retry_interval_ms: u64,

    // Filesystem backing store marker lock
    pub lock_timeout_ms: u64,
    pub lock_poll_interval_ms: u64,

    /// Segment count past which a commit merges the smallest segments
    pub max_segments: usize,

    pub default_limit: usize,
    pub cache_capacity: usize,
    pub default_sort_field: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            index_path: PathBuf::from("./kiradb-index"),
            writer_max_attempts: 5,
            writer_retry_interval_ms: 100,
            lock_timeout_ms: 5_000,
            lock_poll_interval_ms: 100,
            max_segments: 10,
            default_limit: 100,
            cache_capacity: 10_000,
            default_sort_field: "date".to_string(),
        }
    }
}

impl Config {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Config {
            index_path: index_path.into(),
            ..Config::default()
        }
    }

    /// Load from a JSON file; missing keys take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config = serde_json::from_str(&data)?;
        Ok(config)
    }

    pub fn writer_retry(&self) -> RetryPolicy {
        RetryPolicy::attempts(
            self.writer_max_attempts,
            Duration::from_millis(self.writer_retry_interval_ms),
        )
    }

    pub fn merge_policy(&self) -> TieredMergePolicy {
        TieredMergePolicy::new(self.max_segments)
    }

    pub fn lock_retry(&self) -> RetryPolicy {
        RetryPolicy::timeout(
            Duration::from_millis(self.lock_timeout_ms),
            Duration::from_millis(self.lock_poll_interval_ms),
        )
    }
}
