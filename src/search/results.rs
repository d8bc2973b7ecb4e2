use std::collections::BinaryHeap;
use std::cmp::Ordering;
use crate::core::types::DocId;
use crate::index::document::IndexDocument;

/// Result ordering requested from a searcher
#[derive(Debug, Clone, PartialEq)]
pub enum SortSpec {
    /// Raw string comparison on the field's first stored value; missing sorts lowest
    Field { name: String, reverse: bool },
    /// Descending relevance score
    Relevance,
}

impl SortSpec {
    pub fn field(name: impl Into<String>, reverse: bool) -> Self {
        SortSpec::Field { name: name.into(), reverse }
    }
}

/// Search results container
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub hits: Vec<ScoredDocument>,
    pub total_hits: usize,
    pub took_ms: u64,
}

/// Document with relevance score
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub doc_id: DocId,
    pub score: f32,
    pub document: IndexDocument,
}

// Heap order: the top is the hit to evict first (lowest score, then latest doc)
impl PartialEq for ScoredDocument {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredDocument {}

impl PartialOrd for ScoredDocument {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredDocument {
    fn cmp(&self, other: &Self) -> Ordering {
        other.score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

/// Top-K collector for relevance-ranked results
pub struct TopKCollector {
    pub heap: BinaryHeap<ScoredDocument>,
    pub k: usize,
    pub total_collected: usize,
}

impl TopKCollector {
    pub fn new(k: usize) -> Self {
        TopKCollector {
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
            k,
            total_collected: 0,
        }
    }

    pub fn collect(&mut self, scored_doc: ScoredDocument) {
        self.total_collected += 1;
        if self.k == 0 {
            return;
        }

        if self.heap.len() < self.k {
            self.heap.push(scored_doc);
        } else if let Some(worst) = self.heap.peek() {
            if scored_doc < *worst {
                self.heap.pop();
                self.heap.push(scored_doc);
            }
        }
    }

    /// Best first: score descending, then doc id ascending
    pub fn get_results(self) -> Vec<ScoredDocument> {
        self.heap.into_sorted_vec()
    }
}
