pub mod analyzer;
pub mod filter;
pub mod filters;
pub mod token;
pub mod tokenizer;

use std::sync::OnceLock;
use crate::analysis::analyzer::Analyzer;

static INDEXING: OnceLock<Analyzer> = OnceLock::new();
static STEMMING: OnceLock<Analyzer> = OnceLock::new();

pub fn indexing_analyzer() -> &'static Analyzer {
    INDEXING.get_or_init(Analyzer::indexing)
}

pub fn stemming_analyzer() -> &'static Analyzer {
    STEMMING.get_or_init(Analyzer::stemming)
}

/// Stemmed, stop-word-filtered rendering of `text`, words separated by single spaces
pub fn stem_text(text: &str) -> String {
    stemming_analyzer().terms(text).join(" ")
}
