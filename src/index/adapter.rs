use std::collections::BTreeSet;
use std::fs;
use parking_lot::Mutex;
use tracing::{debug, info};
use crate::analysis::{indexing_analyzer, stem_text};
use crate::core::error::Result;
use crate::core::record::TYPE_FIELD;
use crate::core::retry::{Attempt, RetryPolicy};
use crate::index::document::IndexDocument;
use crate::index::inverted::Term;
use crate::index::searcher::Searcher;
use crate::index::writer::IndexWriter;
use crate::query::ast::IndexQuery;
use crate::search::results::SortSpec;
use crate::storage::layout::IndexLayout;
use crate::storage::merge_policy::TieredMergePolicy;

/// One page of documents plus the number of matches before paging
#[derive(Debug, Clone, Default)]
pub struct DocumentPage {
    pub documents: Vec<IndexDocument>,
    pub total_hits: usize,
}

/// Upsert/lookup/search vocabulary over one index directory.
///
/// Writer acquisition is retried under `writer_retry`; every other failure is
/// surfaced as is. Threads of one process queue on an in-process gate before
/// contending for the cross-process `write.lock`.
pub struct IndexAdapter {
    layout: IndexLayout,
    writer_retry: RetryPolicy,
    merge_policy: TieredMergePolicy,
    gate: Mutex<()>,
}

impl IndexAdapter {
    pub fn new(layout: IndexLayout, writer_retry: RetryPolicy, merge_policy: TieredMergePolicy) -> Self {
        IndexAdapter {
            layout,
            writer_retry,
            merge_policy,
            gate: Mutex::new(()),
        }
    }

    pub fn layout(&self) -> &IndexLayout {
        &self.layout
    }

    fn acquire(&self, label: &str) -> Result<IndexWriter> {
        self.writer_retry.run(label, |attempt| {
            match IndexWriter::open(&self.layout)? {
                Some(writer) => Ok(Attempt::Done(
                    writer.with_merge_policy(Box::new(self.merge_policy.clone())),
                )),
                None => {
                    info!(label, attempt, "index writer busy");
                    Ok(Attempt::Retry)
                }
            }
        })
    }

    /// Run `op` against a freshly acquired writer. The writer is committed on
    /// success and released without publishing on failure.
    pub fn with_writer<T, F>(&self, label: &str, op: F) -> Result<T>
    where
        F: FnOnce(&mut IndexWriter) -> Result<T>,
    {
        let _gate = self.gate.lock();
        let mut writer = self.acquire(label)?;

        let value = op(&mut writer)?;
        writer.close()?;
        Ok(value)
    }

    pub fn upsert_document(&self, term: &Term, document: IndexDocument) -> Result<()> {
        self.with_writer("upsert", |writer| {
            writer.upsert(term, document);
            Ok(())
        })
    }

    pub fn delete_by_term(&self, term: &Term) -> Result<usize> {
        self.with_writer("delete", |writer| Ok(writer.delete_by_term(term)))
    }

    pub fn lookup_by_term(&self, term: &Term) -> Result<Option<IndexDocument>> {
        let searcher = Searcher::open(&self.layout)?;
        Ok(searcher.term_lookup(term).map(|(_, doc)| doc.clone()))
    }

    /// Documents of one record kind, optionally narrowed by `query`.
    /// Fetches `offset + limit` ranked hits and drops the first `offset`.
    pub fn search(
        &self,
        record_name: &str,
        query: Option<IndexQuery>,
        sort: &SortSpec,
        limit: usize,
        offset: usize,
    ) -> Result<DocumentPage> {
        let mut clauses = vec![IndexQuery::term(TYPE_FIELD, record_name)];
        clauses.extend(query);
        let query = IndexQuery::all_of(clauses);

        let searcher = Searcher::open(&self.layout)?;
        let results = searcher.search(&query, sort, offset.saturating_add(limit));
        debug!(
            record_name,
            generation = searcher.generation,
            total_hits = results.total_hits,
            offset,
            limit,
            took_ms = results.took_ms,
            "index search"
        );

        Ok(DocumentPage {
            documents: results.hits.into_iter().skip(offset).map(|hit| hit.document).collect(),
            total_hits: results.total_hits,
        })
    }

    /// Documents sharing terms with `source_text` in any of `fields`, best
    /// first, never including documents whose `exclude` term matches.
    pub fn related(
        &self,
        record_name: &str,
        source_text: &str,
        fields: &[String],
        limit: usize,
        exclude: Option<&Term>,
    ) -> Result<Vec<IndexDocument>> {
        let terms = similarity_terms(source_text);
        if terms.is_empty() || fields.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let query = IndexQuery::Similar {
            fields: fields.to_vec(),
            terms,
        };
        let page = self.search(record_name, Some(query), &SortSpec::Relevance, limit.saturating_add(1), 0)?;

        Ok(page
            .documents
            .into_iter()
            .filter(|doc| match exclude {
                Some(term) => doc.get(&term.field) != Some(term.text.as_str()),
                None => true,
            })
            .take(limit)
            .collect())
    }

    /// Destructive re-create: an empty, published index
    pub fn create_index(&self) -> Result<()> {
        self.with_writer("create", |writer| {
            writer.delete_all();
            Ok(())
        })?;
        info!(path = %self.layout.base_dir.display(), "index created");
        Ok(())
    }

    /// Remove all index state; later searches see an empty index
    pub fn delete_index(&self) -> Result<()> {
        let _gate = self.gate.lock();
        let writer = self.acquire("delete index")?;

        // checkpoint first so concurrent searchers see a missing index, not missing segments
        if self.layout.meta_dir.exists() {
            fs::remove_dir_all(&self.layout.meta_dir)?;
        }
        if self.layout.segments_dir.exists() {
            fs::remove_dir_all(&self.layout.segments_dir)?;
        }
        drop(writer);

        info!(path = %self.layout.base_dir.display(), "index deleted");
        Ok(())
    }

    pub fn optimize_index(&self) -> Result<()> {
        self.with_writer("optimize", |writer| {
            writer.optimize();
            Ok(())
        })?;
        info!(path = %self.layout.base_dir.display(), "index optimized");
        Ok(())
    }
}

/// Query terms for a similarity search, produced the way full-text fields
/// are indexed: literal and stemmed forms through the indexing analyzer.
pub fn similarity_terms(text: &str) -> Vec<String> {
    let doubled = format!("{}\n{}", text, stem_text(text));
    let unique: BTreeSet<String> = indexing_analyzer().terms(&doubled).into_iter().collect();
    unique.into_iter().collect()
}
