use std::fmt;
use uuid::Uuid;
use serde::{Deserialize, Serialize};
use crate::core::types::DocId;
use crate::index::document::IndexDocument;

/// Segment file name stem: `{root}/segments/{uuid}.seg`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn new() -> Self {
        SegmentId(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        SegmentId::new()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A finished, immutable segment file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub id: SegmentId,
    pub doc_count: u32,
    pub size_bytes: u64,
}

/// One index document as persisted, tagged with its writer-assigned id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub doc_id: DocId,
    pub document: IndexDocument,
}

/// Fixed-size preamble of a segment file, bincode-encoded into `SIZE` bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentHeader {
    pub version: u32,
    pub doc_count: u32,
    /// CRC32 of everything after the header
    pub checksum: u32,
    pub body_len: u64,
}

impl SegmentHeader {
    pub const VERSION: u32 = 1;
    pub const SIZE: usize = 24;
}
