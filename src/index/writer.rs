use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use chrono::Utc;
use tracing::{debug, info, warn};
use crate::core::error::Result;
use crate::core::types::DocId;
use crate::index::document::{FieldMode, IndexDocument};
use crate::index::inverted::Term;
use crate::storage::checkpoint::Checkpoint;
use crate::storage::file_lock::FileLock;
use crate::storage::layout::IndexLayout;
use crate::storage::merge_policy::{MergePolicy, SegmentStats, TieredMergePolicy};
use crate::storage::segment::{Segment, SegmentHeader, SegmentId, StoredDocument};
use crate::storage::segment_reader::SegmentReader;
use crate::storage::segment_writer::SegmentWriter;

/// A segment of the current checkpoint and the documents written into it
struct PublishedSegment {
    segment: Segment,
    doc_ids: Vec<DocId>,
}

/// Single writer over an index directory.
///
/// Holds `write.lock` for its whole lifetime. Changes become visible to new
/// searchers only when [`close`](IndexWriter::close) publishes a checkpoint;
/// dropping a writer without closing discards them. Each commit consults the
/// merge policy, so the segment count stays bounded without `optimize`.
pub struct IndexWriter {
    layout: IndexLayout,
    checkpoint: Checkpoint,
    published: Vec<PublishedSegment>,
    merge_policy: Box<dyn MergePolicy>,
    documents: BTreeMap<DocId, IndexDocument>,
    added: BTreeSet<DocId>,
    deleted: BTreeSet<DocId>,
    next_doc_id: DocId,
    rewrite: bool,
    _lock: FileLock,
}

impl IndexWriter {
    /// Open a writer, creating the index if it does not exist yet.
    /// `Ok(None)` means another writer holds the lock.
    pub fn open(layout: &IndexLayout) -> Result<Option<Self>> {
        layout.create_dirs()?;

        let lock = match FileLock::try_exclusive(&layout.write_lock_path())? {
            Some(lock) => lock,
            None => return Ok(None),
        };

        let checkpoint = Checkpoint::load(layout)?.unwrap_or_else(Checkpoint::empty);
        let mut documents = BTreeMap::new();
        let mut published = Vec::with_capacity(checkpoint.segments.len());
        for segment_id in &checkpoint.segments {
            let reader = SegmentReader::open(layout, *segment_id)?;
            let mut doc_ids = Vec::with_capacity(reader.header.doc_count as usize);
            for stored in reader.iter_documents() {
                let stored = stored?;
                doc_ids.push(stored.doc_id);
                if checkpoint.is_live(stored.doc_id) {
                    documents.insert(stored.doc_id, stored.document);
                }
            }
            published.push(PublishedSegment {
                segment: Segment {
                    id: *segment_id,
                    doc_count: reader.header.doc_count,
                    size_bytes: SegmentHeader::SIZE as u64 + reader.header.body_len,
                },
                doc_ids,
            });
        }

        debug!(
            generation = checkpoint.generation,
            docs = documents.len(),
            "index writer opened"
        );

        Ok(Some(IndexWriter {
            layout: layout.clone(),
            next_doc_id: checkpoint.next_doc_id,
            checkpoint,
            published,
            merge_policy: Box::new(TieredMergePolicy::default()),
            documents,
            added: BTreeSet::new(),
            deleted: BTreeSet::new(),
            rewrite: false,
            _lock: lock,
        }))
    }

    pub fn with_merge_policy(mut self, policy: Box<dyn MergePolicy>) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn add_document(&mut self, document: IndexDocument) -> DocId {
        let doc_id = self.next_doc_id;
        self.next_doc_id = doc_id.next();
        self.documents.insert(doc_id, document);
        self.added.insert(doc_id);
        doc_id
    }

    /// Delete every document carrying `term` as an untokenized value
    pub fn delete_by_term(&mut self, term: &Term) -> usize {
        let matching: Vec<DocId> = self
            .documents
            .iter()
            .filter(|(_, doc)| has_exact_term(doc, term))
            .map(|(id, _)| *id)
            .collect();

        for doc_id in &matching {
            self.documents.remove(doc_id);
            if !self.added.remove(doc_id) {
                self.deleted.insert(*doc_id);
            }
        }
        matching.len()
    }

    /// Replace every document matching `term` with `document`
    pub fn upsert(&mut self, term: &Term, document: IndexDocument) -> DocId {
        let replaced = self.delete_by_term(term);
        if replaced > 1 {
            warn!(term = %term, replaced, "upsert replaced duplicate documents");
        }
        self.add_document(document)
    }

    pub fn delete_all(&mut self) {
        self.documents.clear();
        self.added.clear();
        self.rewrite = true;
    }

    /// Merge all live documents into a single segment on close
    pub fn optimize(&mut self) {
        self.rewrite = true;
    }

    pub fn doc_count(&self) -> usize {
        self.documents.len()
    }

    fn has_changes(&self) -> bool {
        self.rewrite || !self.added.is_empty() || !self.deleted.is_empty()
    }

    /// Commit: write new documents to a segment and publish a checkpoint
    pub fn close(mut self) -> Result<()> {
        if !self.has_changes() && self.layout.exists() {
            return Ok(());
        }

        let mut next = Checkpoint {
            generation: self.checkpoint.generation + 1,
            segments: Vec::new(),
            deleted: BTreeSet::new(),
            next_doc_id: self.next_doc_id,
            timestamp: Utc::now(),
            doc_count: self.documents.len(),
        };

        let obsolete = if self.rewrite {
            let ids: Vec<DocId> = self.documents.keys().copied().collect();
            if let Some(segment) = self.write_segment(&ids)? {
                next.segments.push(segment.segment.id);
            }
            std::mem::take(&mut self.checkpoint.segments)
        } else {
            let mut published = std::mem::take(&mut self.published);
            let mut deleted = &self.checkpoint.deleted | &self.deleted;
            let ids: Vec<DocId> = self.added.iter().copied().collect();
            if let Some(segment) = self.write_segment(&ids)? {
                published.push(segment);
            }

            let merged = self.merge(&mut published, &mut deleted)?;
            next.segments = published.iter().map(|p| p.segment.id).collect();
            next.deleted = deleted;
            merged
        };

        next.save(&self.layout)?;
        info!(
            generation = next.generation,
            segments = next.segments.len(),
            docs = next.doc_count,
            "index checkpoint published"
        );

        for segment_id in obsolete {
            if let Err(err) = fs::remove_file(self.layout.segment_path(&segment_id)) {
                warn!(segment = %segment_id.0, error = %err, "failed to remove merged segment");
            }
        }
        Ok(())
    }

    /// Fold the segments the merge policy selects into one new segment,
    /// dropping tombstones that pointed into them. Returns the retired ids.
    fn merge(&self, published: &mut Vec<PublishedSegment>, deleted: &mut BTreeSet<DocId>) -> Result<Vec<SegmentId>> {
        let stats: Vec<SegmentStats> = published
            .iter()
            .map(|p| SegmentStats {
                segment: p.segment,
                live_docs: p.doc_ids.iter().filter(|id| !deleted.contains(*id)).count() as u32,
            })
            .collect();
        if !self.merge_policy.should_merge(&stats) {
            return Ok(Vec::new());
        }
        let selected = self.merge_policy.select_segments_to_merge(&stats);
        if selected.is_empty() {
            return Ok(Vec::new());
        }

        let (merging, kept): (Vec<PublishedSegment>, Vec<PublishedSegment>) = std::mem::take(published)
            .into_iter()
            .partition(|p| selected.contains(&p.segment.id));
        *published = kept;

        let mut ids = Vec::new();
        for segment in &merging {
            for doc_id in &segment.doc_ids {
                if !deleted.remove(doc_id) {
                    ids.push(*doc_id);
                }
            }
        }
        ids.sort();
        if let Some(segment) = self.write_segment(&ids)? {
            published.push(segment);
        }

        debug!(merged = merging.len(), docs = ids.len(), "segments merged");
        Ok(merging.into_iter().map(|p| p.segment.id).collect())
    }

    fn write_segment(&self, ids: &[DocId]) -> Result<Option<PublishedSegment>> {
        if ids.is_empty() {
            return Ok(None);
        }

        let mut writer = SegmentWriter::new(&self.layout, SegmentId::new())?;
        let mut doc_ids = Vec::with_capacity(ids.len());
        for doc_id in ids {
            if let Some(document) = self.documents.get(doc_id) {
                writer.write_document(&StoredDocument {
                    doc_id: *doc_id,
                    document: document.clone(),
                })?;
                doc_ids.push(*doc_id);
            }
        }
        let segment = writer.finish()?;
        debug!(segment = %segment.id, docs = segment.doc_count, bytes = segment.size_bytes, "segment written");
        Ok(Some(PublishedSegment { segment, doc_ids }))
    }
}

fn has_exact_term(doc: &IndexDocument, term: &Term) -> bool {
    doc.fields.iter().any(|f| {
        f.mode == FieldMode::Exact && f.name == term.field && f.as_text() == Some(term.text.as_str())
    })
}
