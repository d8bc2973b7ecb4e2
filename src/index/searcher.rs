use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use crate::analysis::indexing_analyzer;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::index::document::IndexDocument;
use crate::index::inverted::{InvertedIndex, Term};
use crate::index::posting::Posting;
use crate::query::ast::IndexQuery;
use crate::scoring::scorer::{BM25Scorer, DocStats, Scorer};
use crate::search::results::{ScoredDocument, SearchResults, SortSpec, TopKCollector};
use crate::storage::checkpoint::Checkpoint;
use crate::storage::layout::IndexLayout;
use crate::storage::segment_reader::SegmentReader;

const MAX_SNAPSHOT_ATTEMPTS: u32 = 3;

/// Point-in-time, read-only view of a published checkpoint
pub struct Searcher {
    pub generation: u64,
    documents: BTreeMap<DocId, IndexDocument>,
    index: InvertedIndex,
    scorer: Box<dyn Scorer>,
}

impl Searcher {
    /// Snapshot the latest checkpoint. A missing index is an empty snapshot.
    pub fn open(layout: &IndexLayout) -> Result<Self> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let checkpoint = match Checkpoint::load(layout)? {
                Some(checkpoint) => checkpoint,
                None => return Ok(Searcher::empty()),
            };

            // an optimize may retire segments between reading the checkpoint and the files
            let missing = checkpoint
                .segments
                .iter()
                .find(|id| !layout.segment_path(id).exists())
                .copied();

            match missing {
                None => match Searcher::load(layout, &checkpoint) {
                    Err(err) if err.kind == ErrorKind::Io && attempt < MAX_SNAPSHOT_ATTEMPTS => {
                        debug!(error = %err, attempt, "segment unreadable during open, reloading");
                    }
                    loaded => return loaded,
                },
                Some(segment_id) if attempt >= MAX_SNAPSHOT_ATTEMPTS => {
                    return Err(Error::corrupt(format!(
                        "checkpoint {} references missing segment {}",
                        checkpoint.generation, segment_id.0
                    )));
                }
                Some(segment_id) => {
                    debug!(segment = %segment_id.0, attempt, "segment retired during open, reloading");
                }
            }
        }
    }

    pub fn empty() -> Self {
        Searcher {
            generation: 0,
            documents: BTreeMap::new(),
            index: InvertedIndex::new(),
            scorer: Box::new(BM25Scorer::default()),
        }
    }

    fn load(layout: &IndexLayout, checkpoint: &Checkpoint) -> Result<Self> {
        let analyzer = indexing_analyzer();
        let mut documents = BTreeMap::new();
        let mut index = InvertedIndex::new();

        for segment_id in &checkpoint.segments {
            let reader = SegmentReader::open(layout, *segment_id)?;
            for stored in reader.iter_documents() {
                let stored = stored?;
                if !checkpoint.is_live(stored.doc_id) {
                    continue;
                }
                index.add_document(stored.doc_id, &stored.document, analyzer);
                documents.insert(stored.doc_id, stored.document);
            }
        }

        Ok(Searcher {
            generation: checkpoint.generation,
            documents,
            index,
            scorer: Box::new(BM25Scorer::default()),
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document(&self, doc_id: DocId) -> Option<&IndexDocument> {
        self.documents.get(&doc_id)
    }

    /// First (lowest id) document carrying `term`
    pub fn term_lookup(&self, term: &Term) -> Option<(DocId, &IndexDocument)> {
        let doc_id = self.index.search_term(term)?.first()?;
        self.documents.get(&doc_id).map(|doc| (doc_id, doc))
    }

    /// Ranked hits, at most `limit` of them, and the total number of matches
    pub fn search(&self, query: &IndexQuery, sort: &SortSpec, limit: usize) -> SearchResults {
        let start = std::time::Instant::now();
        let matches = self.evaluate(query);
        let total = matches.len();

        let hits = match sort {
            SortSpec::Relevance => {
                let mut collector = TopKCollector::new(limit);
                for (doc_id, score) in matches {
                    if let Some(document) = self.documents.get(&doc_id) {
                        collector.collect(ScoredDocument {
                            doc_id,
                            score,
                            document: document.clone(),
                        });
                    }
                }
                collector.get_results()
            }
            SortSpec::Field { name, reverse } => {
                let mut keyed: Vec<(Option<&str>, DocId, f32)> = matches
                    .into_iter()
                    .map(|(doc_id, score)| {
                        let key = self.documents.get(&doc_id).and_then(|d| d.get(name));
                        (key, doc_id, score)
                    })
                    .collect();

                keyed.sort_by(|a, b| {
                    let by_key = a.0.cmp(&b.0);
                    let by_key = if *reverse { by_key.reverse() } else { by_key };
                    by_key.then_with(|| a.1.cmp(&b.1))
                });

                keyed
                    .into_iter()
                    .take(limit)
                    .filter_map(|(_, doc_id, score)| {
                        self.documents.get(&doc_id).map(|document| ScoredDocument {
                            doc_id,
                            score,
                            document: document.clone(),
                        })
                    })
                    .collect()
            }
        };

        SearchResults {
            hits,
            total_hits: total,
            took_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn evaluate(&self, query: &IndexQuery) -> HashMap<DocId, f32> {
        match query {
            IndexQuery::All => self.documents.keys().map(|id| (*id, 1.0)).collect(),
            IndexQuery::Term { field, value } => self.score_term(&Term::new(field.as_str(), value.as_str())),
            IndexQuery::Match { field, text } => {
                let clauses: Vec<HashMap<DocId, f32>> = indexing_analyzer()
                    .terms(text)
                    .into_iter()
                    .map(|token| self.score_term(&Term::new(field.as_str(), token)))
                    .collect();
                intersect(clauses)
            }
            IndexQuery::Bool { must } => {
                if must.is_empty() {
                    return self.evaluate(&IndexQuery::All);
                }
                intersect(must.iter().map(|clause| self.evaluate(clause)).collect())
            }
            IndexQuery::Similar { fields, terms } => {
                let mut scores: HashMap<DocId, f32> = HashMap::new();
                for field in fields {
                    for text in terms {
                        for (doc_id, score) in self.score_term(&Term::new(field.as_str(), text.as_str())) {
                            *scores.entry(doc_id).or_insert(0.0) += score;
                        }
                    }
                }
                scores
            }
        }
    }

    fn score_term(&self, term: &Term) -> HashMap<DocId, f32> {
        let (list, info) = match (self.index.search_term(term), self.index.term_info(term)) {
            (Some(list), Some(info)) => (list, info),
            _ => return HashMap::new(),
        };
        let avg_doc_length = self.index.field_stats(&term.field).avg_length();

        list.postings
            .iter()
            .map(|posting: &Posting| {
                let stats = DocStats {
                    doc_length: posting.field_length as usize,
                    avg_doc_length,
                    total_docs: self.index.len(),
                };
                (posting.doc_id, self.scorer.score(posting, &info, &stats))
            })
            .collect()
    }
}

// Conjunction with summed scores; no clauses matches nothing
fn intersect(mut clauses: Vec<HashMap<DocId, f32>>) -> HashMap<DocId, f32> {
    clauses.sort_by_key(|clause| clause.len());
    let mut iter = clauses.into_iter();
    let mut result = match iter.next() {
        Some(first) => first,
        None => return HashMap::new(),
    };
    for clause in iter {
        result.retain(|doc_id, _| clause.contains_key(doc_id));
        for (doc_id, score) in result.iter_mut() {
            *score += clause.get(doc_id).copied().unwrap_or(0.0);
        }
    }
    result
}
