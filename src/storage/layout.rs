use std::path::{Path, PathBuf};
use std::fs;
use crate::core::error::Result;
use crate::storage::segment::SegmentId;

/// Directory structure of one index
#[derive(Debug, Clone)]
pub struct IndexLayout {
    pub base_dir: PathBuf,      // Root directory
    pub segments_dir: PathBuf,  // Document segments (.seg files)
    pub meta_dir: PathBuf,      // Checkpoint location
}

impl IndexLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        IndexLayout {
            segments_dir: base_dir.join("segments"),
            meta_dir: base_dir.join("meta"),
            base_dir,
        }
    }

    pub fn create_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.segments_dir)?;
        fs::create_dir_all(&self.meta_dir)?;
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.checkpoint_path().exists()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn segment_path(&self, id: &SegmentId) -> PathBuf {
        self.segments_dir.join(format!("{}.seg", id.0))
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.meta_dir.join("checkpoint.bin")
    }

    pub fn checkpoint_tmp_path(&self) -> PathBuf {
        self.meta_dir.join("checkpoint.bin.tmp")
    }

    pub fn write_lock_path(&self) -> PathBuf {
        self.base_dir.join("write.lock")
    }
}
