use crate::core::types::DocId;

#[derive(Debug, Clone)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_freq: u32,       // Term frequency in the field
    pub field_length: u32,    // Token count of the field, for length normalization
}

/// Posting list for a term
/// Note: Sorted by doc_id for efficient merging
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    pub postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self {
        PostingList {
            postings: Vec::new(),
        }
    }

    pub fn add_posting(&mut self, posting: Posting) {
        match self.postings.binary_search_by_key(&posting.doc_id.0, |p| p.doc_id.0) {
            Ok(pos) => {
                // same doc seen again for this term (repeated field name)
                let existing = &mut self.postings[pos];
                existing.term_freq += posting.term_freq;
                existing.field_length += posting.field_length;
            }
            Err(pos) => {
                self.postings.insert(pos, posting);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn doc_freq(&self) -> u32 {
        self.postings.len() as u32
    }

    pub fn first(&self) -> Option<DocId> {
        self.postings.first().map(|p| p.doc_id)
    }
}
