use std::collections::BTreeSet;
use std::fs;
use std::fs::File;
use std::io::Write;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::storage::layout::IndexLayout;
use crate::storage::segment::SegmentId;

/// Published state of an index: the live segment set and tombstones.
///
/// On disk: `[crc32 u32 LE][bincode body]`. Saved to a temporary file and
/// renamed over the previous checkpoint, so readers see the old or new
/// generation but never a mix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub generation: u64,
    pub segments: Vec<SegmentId>,
    pub deleted: BTreeSet<DocId>,
    pub next_doc_id: DocId,
    pub timestamp: DateTime<Utc>,
    pub doc_count: usize,
}

impl Checkpoint {
    pub fn empty() -> Self {
        Checkpoint {
            generation: 0,
            segments: Vec::new(),
            deleted: BTreeSet::new(),
            next_doc_id: DocId(0),
            timestamp: Utc::now(),
            doc_count: 0,
        }
    }

    /// Load checkpoint from disk; `None` when the index was never created
    pub fn load(layout: &IndexLayout) -> Result<Option<Self>> {
        let path = layout.checkpoint_path();
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(&path)?;
        if data.len() < 4 {
            return Err(Error::corrupt(format!("{} truncated", path.display())));
        }
        let (crc, body) = data.split_at(4);
        let expected = u32::from_le_bytes([crc[0], crc[1], crc[2], crc[3]]);
        if crc32fast::hash(body) != expected {
            return Err(Error::corrupt(format!("{} checksum mismatch", path.display())));
        }

        let checkpoint = bincode::deserialize(body)
            .map_err(|e| Error::corrupt(format!("{}: {}", path.display(), e)))?;
        Ok(Some(checkpoint))
    }

    /// Save checkpoint to disk atomically
    pub fn save(&self, layout: &IndexLayout) -> Result<()> {
        let body = bincode::serialize(self)?;
        let tmp = layout.checkpoint_tmp_path();

        let mut file = File::create(&tmp)?;
        file.write_all(&crc32fast::hash(&body).to_le_bytes())?;
        file.write_all(&body)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, layout.checkpoint_path())?;
        Ok(())
    }

    pub fn is_live(&self, doc_id: DocId) -> bool {
        !self.deleted.contains(&doc_id)
    }
}
