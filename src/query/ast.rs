use serde::{Serialize, Deserialize};

/// Query tree evaluated by a [`Searcher`](crate::index::searcher::Searcher)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexQuery {
    /// Every live document
    All,
    /// Exact match of an untokenized value
    Term { field: String, value: String },
    /// Analyzed text; every remaining token must occur in the field (AND)
    Match { field: String, text: String },
    /// All clauses must match; scores add up
    Bool { must: Vec<IndexQuery> },
    /// Any term in any field (OR), ranked by BM25
    Similar { fields: Vec<String>, terms: Vec<String> },
}

impl IndexQuery {
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        IndexQuery::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matching(field: impl Into<String>, text: impl Into<String>) -> Self {
        IndexQuery::Match {
            field: field.into(),
            text: text.into(),
        }
    }

    /// Conjunction of `clauses`, flattening a single clause
    pub fn all_of(mut clauses: Vec<IndexQuery>) -> Self {
        match clauses.len() {
            0 => IndexQuery::All,
            1 => clauses.remove(0),
            _ => IndexQuery::Bool { must: clauses },
        }
    }
}
