use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use crc32fast::Hasher;
use crate::core::error::Result;
use crate::storage::layout::IndexLayout;
use crate::storage::segment::{Segment, SegmentHeader, SegmentId, StoredDocument};

// [ header, SegmentHeader::SIZE bytes ]
// [ u32 LE length | bincode StoredDocument ] * doc_count
pub struct SegmentWriter {
    id: SegmentId,
    out: BufWriter<File>,
    hasher: Hasher,
    doc_count: u32,
    body_len: u64,
}

impl SegmentWriter {
    /// Create the segment file with a zeroed header slot
    pub fn new(layout: &IndexLayout, id: SegmentId) -> Result<Self> {
        let mut out = BufWriter::with_capacity(64 * 1024, File::create(layout.segment_path(&id))?);
        out.write_all(&[0u8; SegmentHeader::SIZE])?;

        Ok(SegmentWriter {
            id,
            out,
            hasher: Hasher::new(),
            doc_count: 0,
            body_len: 0,
        })
    }

    pub fn write_document(&mut self, stored: &StoredDocument) -> Result<()> {
        let data = bincode::serialize(stored)?;
        let len = (data.len() as u32).to_le_bytes();

        self.hasher.update(&len);
        self.hasher.update(&data);
        self.out.write_all(&len)?;
        self.out.write_all(&data)?;

        self.body_len += (len.len() + data.len()) as u64;
        self.doc_count += 1;
        Ok(())
    }

    /// Fill in the header and sync. The segment is only readable after this.
    pub fn finish(self) -> Result<Segment> {
        let header = SegmentHeader {
            version: SegmentHeader::VERSION,
            doc_count: self.doc_count,
            checksum: self.hasher.finalize(),
            body_len: self.body_len,
        };

        let mut file = self.out.into_inner().map_err(|err| err.into_error())?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&bincode::serialize(&header)?)?;
        file.sync_all()?;

        Ok(Segment {
            id: self.id,
            doc_count: self.doc_count,
            size_bytes: SegmentHeader::SIZE as u64 + self.body_len,
        })
    }
}
