use serde::{Serialize, Deserialize};

/// How a field participates in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldMode {
    /// Whole value is a single term
    Exact,
    /// Value is analyzed into terms
    Tokenized,
    /// Retrievable but never matched
    StoredOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldData {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexField {
    pub name: String,
    pub data: FieldData,
    pub mode: FieldMode,
}

impl IndexField {
    pub fn text(name: impl Into<String>, value: impl Into<String>, mode: FieldMode) -> Self {
        IndexField {
            name: name.into(),
            data: FieldData::Text(value.into()),
            mode,
        }
    }

    pub fn binary(name: impl Into<String>, value: Vec<u8>) -> Self {
        IndexField {
            name: name.into(),
            data: FieldData::Binary(value),
            mode: FieldMode::StoredOnly,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            FieldData::Text(s) => Some(s),
            FieldData::Binary(_) => None,
        }
    }
}

/// Ordered field list; a name may repeat
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub fields: Vec<IndexField>,
}

impl IndexDocument {
    pub fn new() -> Self {
        IndexDocument { fields: Vec::new() }
    }

    pub fn add(&mut self, field: IndexField) {
        self.fields.push(field);
    }

    /// First text value stored under `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .filter(|f| f.name == name)
            .find_map(|f| f.as_text())
    }

    pub fn get_binary(&self, name: &str) -> Option<&[u8]> {
        self.fields.iter().filter(|f| f.name == name).find_map(|f| match &f.data {
            FieldData::Binary(bytes) => Some(bytes.as_slice()),
            FieldData::Text(_) => None,
        })
    }

    /// All text values as name -> first value, binary fields skipped
    pub fn text_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter_map(|f| f.as_text().map(|t| (f.name.as_str(), t)))
    }
}
