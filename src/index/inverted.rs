use std::collections::HashMap;
use std::fmt;
use crate::analysis::analyzer::Analyzer;
use crate::core::types::DocId;
use crate::index::document::{FieldMode, IndexDocument};
use crate::index::posting::{Posting, PostingList};

/// Exact (field, text) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term {
    pub field: String,
    pub text: String,
}

impl Term {
    pub fn new(field: impl Into<String>, text: impl Into<String>) -> Self {
        Term {
            field: field.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.text)
    }
}

/// Term statistics
#[derive(Debug, Clone)]
pub struct TermInfo {
    pub doc_freq: u32,        // Number of documents containing term
    pub idf: f32,             // Inverse document frequency
}

#[derive(Debug, Clone, Default)]
pub struct FieldStats {
    pub doc_count: u32,
    pub total_length: u64,
}

impl FieldStats {
    pub fn avg_length(&self) -> f32 {
        if self.doc_count == 0 {
            1.0
        } else {
            self.total_length as f32 / self.doc_count as f32
        }
    }
}

/// In-memory inverted index over one searcher snapshot
pub struct InvertedIndex {
    pub postings: HashMap<Term, PostingList>,
    pub field_stats: HashMap<String, FieldStats>,
    pub doc_count: usize,
}

impl InvertedIndex {
    pub fn new() -> Self {
        InvertedIndex {
            postings: HashMap::new(),
            field_stats: HashMap::new(),
            doc_count: 0,
        }
    }

    pub fn add_document(&mut self, doc_id: DocId, doc: &IndexDocument, analyzer: &Analyzer) {
        let mut field_terms: HashMap<&str, Vec<String>> = HashMap::new();

        for field in &doc.fields {
            let text = match (field.mode, field.as_text()) {
                (FieldMode::StoredOnly, _) | (_, None) => continue,
                (_, Some(text)) => text,
            };

            let terms = field_terms.entry(field.name.as_str()).or_default();
            match field.mode {
                FieldMode::Exact => terms.push(text.to_string()),
                FieldMode::Tokenized => terms.extend(analyzer.terms(text)),
                FieldMode::StoredOnly => {}
            }
        }

        for (field_name, terms) in field_terms {
            let field_length = terms.len() as u32;
            let stats = self.field_stats.entry(field_name.to_string()).or_default();
            stats.doc_count += 1;
            stats.total_length += field_length as u64;

            // Group tokens by term
            let mut term_freqs: HashMap<String, u32> = HashMap::new();
            for term in terms {
                *term_freqs.entry(term).or_insert(0) += 1;
            }

            for (text, term_freq) in term_freqs {
                self.postings
                    .entry(Term::new(field_name, text))
                    .or_insert_with(PostingList::new)
                    .add_posting(Posting {
                        doc_id,
                        term_freq,
                        field_length,
                    });
            }
        }

        self.doc_count += 1;
    }

    pub fn search_term(&self, term: &Term) -> Option<&PostingList> {
        self.postings.get(term)
    }

    pub fn term_info(&self, term: &Term) -> Option<TermInfo> {
        self.postings.get(term).map(|list| {
            let df = list.doc_freq() as f32;
            let n = self.doc_count as f32;
            TermInfo {
                doc_freq: list.doc_freq(),
                // BM25 idf, never negative
                idf: (1.0 + (n - df + 0.5) / (df + 0.5)).ln(),
            }
        })
    }

    pub fn field_stats(&self, field: &str) -> FieldStats {
        self.field_stats.get(field).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.doc_count
    }

    pub fn is_empty(&self) -> bool {
        self.doc_count == 0
    }
}

impl Default for InvertedIndex {
    fn default() -> Self {
        InvertedIndex::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::document::IndexField;

    fn doc(fields: Vec<IndexField>) -> IndexDocument {
        IndexDocument { fields }
    }

    #[test]
    fn exact_fields_are_single_terms() {
        let mut index = InvertedIndex::new();
        let analyzer = Analyzer::indexing();
        index.add_document(
            DocId(1),
            &doc(vec![IndexField::text("cat", "Home Goods", FieldMode::Exact)]),
            &analyzer,
        );

        assert!(index.search_term(&Term::new("cat", "Home Goods")).is_some());
        assert!(index.search_term(&Term::new("cat", "home")).is_none());
    }

    #[test]
    fn tokenized_fields_count_frequencies() {
        let mut index = InvertedIndex::new();
        let analyzer = Analyzer::indexing();
        index.add_document(
            DocId(4),
            &doc(vec![IndexField::text("body", "binary adder and binary numbers", FieldMode::Tokenized)]),
            &analyzer,
        );

        let list = index.search_term(&Term::new("body", "binary")).unwrap();
        assert_eq!(list.postings[0].term_freq, 2);
        assert_eq!(list.postings[0].field_length, 4);
        assert!(index.search_term(&Term::new("body", "and")).is_none());
    }

    #[test]
    fn stored_only_fields_are_not_indexed() {
        let mut index = InvertedIndex::new();
        let analyzer = Analyzer::indexing();
        index.add_document(
            DocId(1),
            &doc(vec![IndexField::binary("object", vec![1, 2, 3])]),
            &analyzer,
        );
        assert!(index.postings.is_empty());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn rarer_terms_have_higher_idf() {
        let mut index = InvertedIndex::new();
        let analyzer = Analyzer::indexing();
        for (id, text) in ["algorithm bisection", "algorithm quadi", "algorithm rootfinder"].iter().enumerate() {
            index.add_document(
                DocId(id as u64),
                &doc(vec![IndexField::text("body", *text, FieldMode::Tokenized)]),
                &analyzer,
            );
        }
        let common = index.term_info(&Term::new("body", "algorithm")).unwrap();
        let rare = index.term_info(&Term::new("body", "quadi")).unwrap();
        assert!(rare.idf > common.idf);
        assert!(common.idf > 0.0);
    }
}
