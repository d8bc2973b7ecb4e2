use std::fs;
use crate::core::error::{Error, Result};
use crate::storage::layout::IndexLayout;
use crate::storage::segment::{SegmentHeader, SegmentId, StoredDocument};

pub struct SegmentReader {
    pub segment_id: SegmentId,
    pub header: SegmentHeader,
    body: Vec<u8>,
}

impl SegmentReader {
    /// Read and verify a whole segment. Header, length or checksum damage is `CorruptIndex`.
    pub fn open(layout: &IndexLayout, segment_id: SegmentId) -> Result<Self> {
        let path = layout.segment_path(&segment_id);
        let mut data = fs::read(&path)?;

        if data.len() < SegmentHeader::SIZE {
            return Err(Error::corrupt(format!("segment {} truncated header", segment_id.0)));
        }
        let header: SegmentHeader = bincode::deserialize(&data[..SegmentHeader::SIZE])
            .map_err(|e| Error::corrupt(format!("segment {} header: {}", segment_id.0, e)))?;

        if header.version != SegmentHeader::VERSION {
            return Err(Error::corrupt(format!(
                "segment {} has unsupported version {}",
                segment_id.0, header.version
            )));
        }

        let body = data.split_off(SegmentHeader::SIZE);
        if body.len() as u64 != header.body_len {
            return Err(Error::corrupt(format!(
                "segment {} body is {} bytes, header says {}",
                segment_id.0,
                body.len(),
                header.body_len
            )));
        }
        if crc32fast::hash(&body) != header.checksum {
            return Err(Error::corrupt(format!("segment {} checksum mismatch", segment_id.0)));
        }

        Ok(SegmentReader { segment_id, header, body })
    }

    pub fn iter_documents(&self) -> DocumentIterator<'_> {
        DocumentIterator {
            reader: self,
            position: 0,
            remaining: self.header.doc_count,
        }
    }
}

/// Iterator over the documents of a verified segment
pub struct DocumentIterator<'a> {
    reader: &'a SegmentReader,
    position: usize,
    remaining: u32,
}

impl<'a> DocumentIterator<'a> {
    fn read_next(&mut self) -> Result<StoredDocument> {
        let body = &self.reader.body;
        let id = self.reader.segment_id.0;

        let len_end = self.position + 4;
        let len_bytes: [u8; 4] = body
            .get(self.position..len_end)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| Error::corrupt(format!("segment {} truncated length", id)))?;
        let len = u32::from_le_bytes(len_bytes) as usize;

        let doc_bytes = body
            .get(len_end..len_end + len)
            .ok_or_else(|| Error::corrupt(format!("segment {} truncated document", id)))?;
        let doc: StoredDocument = bincode::deserialize(doc_bytes)
            .map_err(|e| Error::corrupt(format!("segment {} document: {}", id, e)))?;

        self.position = len_end + len;
        Ok(doc)
    }
}

impl<'a> Iterator for DocumentIterator<'a> {
    type Item = Result<StoredDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        match self.read_next() {
            Ok(doc) => Some(Ok(doc)),
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (0, Some(remaining))
    }
}
