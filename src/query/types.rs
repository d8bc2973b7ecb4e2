use serde::{Deserialize, Serialize};
use crate::core::error::Result;
use crate::core::record::{Field, FieldType, Record, RecordDescriptor};
use crate::query::ast::IndexQuery;
use crate::search::results::SortSpec;

pub const DEFAULT_LIMIT: usize = 100;

/// One `field matches value` constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldQuery {
    pub field: String,
    pub field_type: FieldType,
    pub match_string: String,
}

impl FieldQuery {
    pub fn new(field: &Field, match_string: impl Into<String>) -> Self {
        FieldQuery {
            field: field.name().to_string(),
            field_type: field.field_type(),
            match_string: match_string.into(),
        }
    }

    /// Full-text fields match analyzed text, everything else the exact value
    pub fn to_index_query(&self, descriptor: &RecordDescriptor) -> IndexQuery {
        let field = index_field_name(descriptor, &self.field);
        match self.field_type {
            FieldType::FullText => IndexQuery::matching(field, self.match_string.as_str()),
            _ => IndexQuery::term(field, self.match_string.as_str()),
        }
    }
}

/// Index field a record field is written under
pub fn index_field_name(descriptor: &RecordDescriptor, field: &str) -> String {
    match &descriptor.primary_key {
        Some(pk) if pk.name() == field => {
            crate::core::record::key_field_name(&descriptor.record_name, field)
        }
        _ => field.to_string(),
    }
}

/// Compound query over one record kind. Constraints are ANDed.
#[derive(Debug, Clone)]
pub struct Query {
    pub descriptor: RecordDescriptor,
    pub limit: usize,
    pub start: usize,
    pub sort_field: Option<String>,
    pub reverse: bool,
    pub queries: Vec<FieldQuery>,
}

impl Query {
    pub fn new<R: Record>(record: &R) -> Self {
        Query {
            descriptor: record.descriptor(),
            limit: DEFAULT_LIMIT,
            start: 0,
            sort_field: None,
            reverse: false,
            queries: Vec::new(),
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Number of ranked results to skip
    pub fn start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn sort_by(mut self, field: &Field, reverse: bool) -> Self {
        self.sort_field = Some(field.name().to_string());
        self.reverse = reverse;
        self
    }

    pub fn sort_by_named(self, name: &str, reverse: bool) -> Result<Self> {
        let field = self.descriptor.field_by_name(name)?.clone();
        Ok(self.sort_by(&field, reverse))
    }

    pub fn where_matches(mut self, field: &Field, match_string: impl Into<String>) -> Self {
        self.queries.push(FieldQuery::new(field, match_string));
        self
    }

    pub fn where_matches_named(self, name: &str, match_string: impl Into<String>) -> Result<Self> {
        let field = self.descriptor.field_by_name(name)?.clone();
        Ok(self.where_matches(&field, match_string))
    }

    pub fn record_name(&self) -> &str {
        &self.descriptor.record_name
    }

    /// Conjunction of all constraints; `None` when unconstrained
    pub fn to_index_query(&self) -> Option<IndexQuery> {
        if self.queries.is_empty() {
            return None;
        }
        let clauses = self
            .queries
            .iter()
            .map(|q| q.to_index_query(&self.descriptor))
            .collect();
        Some(IndexQuery::all_of(clauses))
    }

    /// Requested sort, or `default_field` descending
    pub fn sort_spec(&self, default_field: &str) -> SortSpec {
        match &self.sort_field {
            Some(name) => SortSpec::field(index_field_name(&self.descriptor, name), self.reverse),
            None => SortSpec::field(default_field, true),
        }
    }
}
