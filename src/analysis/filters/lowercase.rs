use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

pub struct LowercaseFilter;

impl TokenFilter for LowercaseFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens.into_iter()
            .map(|mut token| {
                token.text = token.text.to_lowercase();
                token
            })
            .collect()
    }

    fn name(&self) -> &str {
        "lowercase"
    }
}

/// Drops tokens that are not purely alphabetic
pub struct AlphabeticFilter;

impl TokenFilter for AlphabeticFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens.into_iter()
            .filter(|token| token.text.chars().all(char::is_alphabetic))
            .collect()
    }

    fn name(&self) -> &str {
        "alphabetic"
    }
}
