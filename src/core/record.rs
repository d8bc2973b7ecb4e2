use std::fmt;
use std::ops::BitOr;
use chrono::{DateTime, Timelike, Utc};
use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;
use crate::analysis::stem_text;
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::document::{FieldMode, IndexField};
use crate::index::inverted::Term;

/// Index field carrying the record kind
pub const TYPE_FIELD: &str = "type";
/// Stored-only field carrying the encoded object for INDEX mode
pub const OBJECT_FIELD: &str = "object";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Exact-match string
    String,
    Number,
    Date,
    /// Tokenized text
    FullText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Number(i64),
    Date(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    field_type: FieldType,
    value: Option<FieldValue>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType, value: Option<FieldValue>) -> Self {
        Field {
            name: name.into(),
            field_type,
            value,
        }
    }

    pub fn string<S: Into<String>>(name: impl Into<String>, value: Option<S>) -> Self {
        Field::new(name, FieldType::String, value.map(|v| FieldValue::Text(v.into())))
    }

    pub fn fulltext<S: Into<String>>(name: impl Into<String>, value: Option<S>) -> Self {
        Field::new(name, FieldType::FullText, value.map(|v| FieldValue::Text(v.into())))
    }

    pub fn number(name: impl Into<String>, value: Option<i64>) -> Self {
        Field::new(name, FieldType::Number, value.map(FieldValue::Number))
    }

    pub fn date(name: impl Into<String>, value: Option<DateTime<Utc>>) -> Self {
        Field::new(name, FieldType::Date, value.map(FieldValue::Date))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn value(&self) -> Option<&FieldValue> {
        self.value.as_ref()
    }

    /// Exact encoding of the value as it is written to (and matched in) the index
    pub fn encoded_value(&self) -> Result<Option<String>> {
        let value = match &self.value {
            Some(value) => value,
            None => return Ok(None),
        };

        let encoded = match (self.field_type, value) {
            (FieldType::String, FieldValue::Text(s)) => s.clone(),
            (FieldType::FullText, FieldValue::Text(s)) => s.clone(),
            (FieldType::Number, FieldValue::Number(n)) => n.to_string(),
            (FieldType::Date, FieldValue::Date(d)) => encode_date(d),
            (field_type, value) => {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("field '{}' is {:?} but holds {:?}", self.name, field_type, value),
                ));
            }
        };
        Ok(Some(encoded))
    }

    /// Map onto an index field stored under `key`. Absent values map to nothing.
    pub fn to_index_field(&self, key: &str) -> Result<Option<IndexField>> {
        let encoded = match self.encoded_value()? {
            Some(encoded) => encoded,
            None => return Ok(None),
        };

        let field = match self.field_type {
            FieldType::FullText => {
                // literal and stemmed forms share the field so either form matches
                let doubled = format!("{}\n{}", encoded, stem_text(&encoded));
                IndexField::text(key, doubled, FieldMode::Tokenized)
            }
            _ => IndexField::text(key, encoded, FieldMode::Exact),
        };
        Ok(Some(field))
    }
}

/// `YYYYMMDDhhmmss.ffff`: lexicographic order equals chronological order
pub fn encode_date(date: &DateTime<Utc>) -> String {
    format!(
        "{}.{:04}",
        date.format("%Y%m%d%H%M%S"),
        date.nanosecond() / 1_000_000 % 1000
    )
}

/// Bitmask of where a record's full payload lives
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StoreMode(u8);

impl StoreMode {
    pub const NONE: StoreMode = StoreMode(0);
    pub const INDEX: StoreMode = StoreMode(1);
    pub const BACKING: StoreMode = StoreMode(2);

    pub const fn contains(&self, other: StoreMode) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for StoreMode {
    type Output = StoreMode;

    fn bitor(self, rhs: StoreMode) -> StoreMode {
        StoreMode(self.0 | rhs.0)
    }
}

impl fmt::Debug for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(StoreMode::INDEX) {
            names.push("INDEX");
        }
        if self.contains(StoreMode::BACKING) {
            names.push("BACKING");
        }
        if names.is_empty() {
            names.push("NONE");
        }
        write!(f, "StoreMode({})", names.join("|"))
    }
}

/// Schema instance for one record: kind name, primary key, optional fields
/// and storage mode.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDescriptor {
    pub record_name: String,
    pub primary_key: Option<Field>,
    pub fields: Vec<Field>,
    pub store_mode: StoreMode,
}

impl RecordDescriptor {
    pub fn new(record_name: impl Into<String>) -> Self {
        RecordDescriptor {
            record_name: record_name.into(),
            primary_key: None,
            fields: Vec::new(),
            store_mode: StoreMode::NONE,
        }
    }

    pub fn with_primary_key(mut self, primary_key: Field) -> Self {
        self.primary_key = Some(primary_key);
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_store_mode(mut self, store_mode: StoreMode) -> Self {
        self.store_mode = store_mode;
        self
    }

    pub fn primary_key(&self) -> Result<&Field> {
        self.primary_key.as_ref().ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidArgument,
                format!("record '{}' has no primary key", self.record_name),
            )
        })
    }

    pub fn field_by_name(&self, name: &str) -> Result<&Field> {
        self.fields
            .iter()
            .chain(self.primary_key.iter())
            .find(|f| f.name() == name)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::NotFound,
                    format!("record '{}' has no field '{}'", self.record_name, name),
                )
            })
    }

    /// Index field name of the primary key
    pub fn key_field_name(&self) -> Result<String> {
        Ok(key_field_name(&self.record_name, self.primary_key()?.name()))
    }

    /// Exact term addressing this record in the index (upsert/lookup/delete)
    pub fn primary_key_term(&self) -> Result<Term> {
        let pk = self.primary_key()?;
        if pk.field_type() == FieldType::FullText {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("full-text field '{}' cannot be a primary key", pk.name()),
            ));
        }
        let value = pk.encoded_value()?.ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidArgument,
                format!("primary key '{}' of '{}' has no value", pk.name(), self.record_name),
            )
        })?;
        Ok(Term::new(self.key_field_name()?, value))
    }
}

pub fn key_field_name(record_name: &str, primary_key_name: &str) -> String {
    format!("{}_{}", record_name, primary_key_name)
}

/// Rejects identifiers that cannot be used as a single path segment or object key segment
pub fn validate_identifier(what: &str, value: &str) -> Result<()> {
    let unsafe_segment = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);

    if unsafe_segment {
        tracing::warn!(what, value, "rejecting path-unsafe identifier");
        return Err(Error::invalid_identifier(format!("invalid {}: '{}'", what, value)));
    }
    Ok(())
}

/// A typed object describable by a [`RecordDescriptor`].
///
/// Implementations rebuild the descriptor on every call; the payload itself is
/// frozen with the engine's codec, so records must also be serde types.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    fn descriptor(&self) -> RecordDescriptor;

    fn record_name(&self) -> &str;

    fn primary_key_name(&self) -> &str;
}
