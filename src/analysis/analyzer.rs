use rust_stemmers::Algorithm;
use crate::analysis::filter::TokenFilter;
use crate::analysis::filters::lowercase::{AlphabeticFilter, LowercaseFilter};
use crate::analysis::filters::stemmer::StemmerFilter;
use crate::analysis::filters::stopword::StopWordFilter;
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{StandardTokenizer, Tokenizer};

/// Text analysis pipeline
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name,
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);

        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }

        tokens
    }

    /// Token texts only, in order
    pub fn terms(&self, text: &str) -> Vec<String> {
        self.analyze(text).into_iter().map(|t| t.text).collect()
    }

    /// Analyzer for tokenized fields and full-text query strings.
    /// No stemming: tokenized values already carry their stemmed form.
    pub fn indexing() -> Self {
        Analyzer::new("indexing".to_string(),
                      Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
            .add_filter(Box::new(StopWordFilter::english()))
    }

    /// Letters-only words, stop words removed, English stemmer applied
    pub fn stemming() -> Self {
        Analyzer::new("stemming".to_string(),
                      Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
            .add_filter(Box::new(AlphabeticFilter))
            .add_filter(Box::new(StopWordFilter::english()))
            .add_filter(Box::new(StemmerFilter::new(Algorithm::English)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexing_drops_stop_words_but_keeps_numbers() {
        let terms = Analyzer::indexing().terms("The Soviet Computer Technology-1959");
        assert_eq!(terms, vec!["soviet", "computer", "technology", "1959"]);
    }

    #[test]
    fn stemming_keeps_letters_only() {
        let terms = Analyzer::stemming().terms("Computing 40 Square Roots");
        assert_eq!(terms, vec!["comput", "squar", "root"]);
    }
}
