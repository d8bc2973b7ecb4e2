use std::collections::BTreeMap;
use std::path::PathBuf;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use crate::backing::{
    BackingStore, CacheBackingStore, FileBackingStore, ObjectStorageClient, RemoteObjectStore, StoreKey,
};
use crate::core::codec::{BincodeCodec, Codec};
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::record::{
    key_field_name, validate_identifier, Record, RecordDescriptor, StoreMode, OBJECT_FIELD, TYPE_FIELD,
};
use crate::index::adapter::IndexAdapter;
use crate::index::document::{FieldMode, IndexDocument, IndexField};
use crate::index::inverted::Term;
use crate::query::types::{index_field_name, Query};
use crate::search::results::SortSpec;
use crate::storage::layout::IndexLayout;

/// A stored record as handed back to the caller, shaped by its store mode
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<T> {
    /// Primary key of a NONE-mode query hit
    Key(String),
    /// Indexed values of a NONE-mode record, by field name
    Fields(BTreeMap<String, String>),
    /// Decoded record (INDEX or BACKING mode)
    Object(T),
}

impl<T> Resolved<T> {
    pub fn into_object(self) -> Option<T> {
        match self {
            Resolved::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<&str> {
        match self {
            Resolved::Key(key) => Some(key),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Resolved::Fields(fields) => Some(fields),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResults<T> {
    pub hits: Vec<Resolved<T>>,
    /// Matches before `start`/`limit` were applied
    pub total_hits: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Also write the payload to the backing store when the record is BACKING-stored
    pub write_backing: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions { write_backing: true }
    }
}

struct Cursor {
    record_name: String,
    keys: Vec<String>,
    position: usize,
}

/// The object store: maps records onto index documents and routes full
/// payloads to the index, a backing store, or nowhere, per record store mode.
pub struct Core<C: Codec = BincodeCodec> {
    config: Config,
    index: IndexAdapter,
    codec: C,
    backing: Option<Box<dyn BackingStore>>,
    cache: Option<Box<dyn BackingStore>>,
    cursor: Mutex<Option<Cursor>>,
}

impl Core<BincodeCodec> {
    pub fn new(config: Config) -> Self {
        Core::with_codec(config, BincodeCodec)
    }

    pub fn open(index_path: impl Into<PathBuf>) -> Self {
        Core::new(Config::new(index_path))
    }

    /// Index plus a filesystem backing store rooted at `store_root`
    pub fn filesystem(config: Config, store_root: impl Into<PathBuf>) -> Result<Self> {
        let store = FileBackingStore::new(store_root, config.lock_retry())?;
        Ok(Core::new(config).with_backing_store(Box::new(store)))
    }

    /// Index plus a remote object store in `bucket`
    pub fn remote(config: Config, client: Box<dyn ObjectStorageClient>, bucket: &str) -> Result<Self> {
        let store = RemoteObjectStore::new(client, bucket, BincodeCodec.content_type())?;
        Ok(Core::new(config).with_backing_store(Box::new(store)))
    }
}

impl<C: Codec> Core<C> {
    pub fn with_codec(config: Config, codec: C) -> Self {
        let index = IndexAdapter::new(
            IndexLayout::new(&config.index_path),
            config.writer_retry(),
            config.merge_policy(),
        );
        Core {
            config,
            index,
            codec,
            backing: None,
            cache: None,
            cursor: Mutex::new(None),
        }
    }

    pub fn with_backing_store(mut self, store: Box<dyn BackingStore>) -> Self {
        info!(store = store.name(), "backing store set");
        self.backing = Some(store);
        self
    }

    /// Read-through cache in front of the backing store
    pub fn with_cache_store(mut self, cache: Box<dyn BackingStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Read-through cache over the shared process-wide cache region
    pub fn cached(self) -> Result<Self> {
        let cache = CacheBackingStore::new(self.config.cache_capacity)?;
        Ok(self.with_cache_store(Box::new(cache)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backing_store(&self) -> Option<&dyn BackingStore> {
        self.backing.as_deref()
    }

    fn require_backing(&self, record_name: &str) -> Result<&dyn BackingStore> {
        self.backing.as_deref().ok_or_else(|| {
            Error::new(
                ErrorKind::MissingBackingStore,
                format!("'{}' is BACKING-stored but no backing store is set", record_name),
            )
        })
    }

    pub fn store_object<T: Record>(&self, record: &T) -> Result<()> {
        self.store_object_with(record, StoreOptions::default())
    }

    pub fn store_object_with<T: Record>(&self, record: &T, options: StoreOptions) -> Result<()> {
        let descriptor = record.descriptor();
        validate_identifier("record name", &descriptor.record_name)?;
        validate_identifier("primary key name", descriptor.primary_key()?.name())?;

        let term = descriptor.primary_key_term()?;
        validate_identifier("primary key value", &term.text)?;
        let mode = descriptor.store_mode;

        let mut document = build_document(&descriptor)?;
        if mode.contains(StoreMode::INDEX) {
            document.add(IndexField::binary(OBJECT_FIELD, self.codec.encode(record)?));
        }

        let mut backed = false;
        if mode.contains(StoreMode::BACKING) && options.write_backing {
            let store = self.require_backing(&descriptor.record_name)?;
            let key = StoreKey::new(descriptor.record_name.as_str(), term.text.as_str())?;
            let payload = self.codec.encode(record)?;
            store.store(&key, &payload)?;
            self.cache_store(&key, &payload);
            backed = true;
        }

        if let Err(err) = self.index.upsert_document(&term, document) {
            if backed {
                error!(term = %term, error = %err, "object stored in backing store but not indexed");
                return Err(Error::new(
                    ErrorKind::PartialFailure { indexed: false, backed: true },
                    format!("{} stored but not indexed: {}", term, err),
                ));
            }
            return Err(err);
        }

        debug!(term = %term, mode = ?mode, "object stored");
        Ok(())
    }

    pub fn retrieve_object_by_primary_key<T: Record>(&self, prototype: &T, value: &str) -> Result<Option<Resolved<T>>> {
        let descriptor = prototype.descriptor();
        let key_field = key_field_name(&descriptor.record_name, prototype.primary_key_name());

        match self.index.lookup_by_term(&Term::new(key_field.as_str(), value))? {
            Some(document) => self.resolve(prototype, &descriptor, &document, false),
            None => Ok(None),
        }
    }

    /// Remove from the index and, for BACKING records, from the backing store.
    /// Both removals are attempted; `Ok(false)` means nothing was indexed under `value`.
    pub fn remove_object_by_primary_key<T: Record>(&self, prototype: &T, value: &str) -> Result<bool> {
        let descriptor = prototype.descriptor();
        let record_name = descriptor.record_name.as_str();
        validate_identifier("record name", record_name)?;
        validate_identifier("primary key value", value)?;
        let backed = descriptor.store_mode.contains(StoreMode::BACKING);
        if backed {
            self.require_backing(record_name)?;
        }

        let key_field = key_field_name(record_name, prototype.primary_key_name());
        let index_result = self.index.delete_by_term(&Term::new(key_field.as_str(), value));

        let backing_result = if backed {
            self.remove_backing(record_name, value)
        } else {
            Ok(())
        };

        match (index_result, backing_result) {
            (Ok(removed), Ok(())) => {
                debug!(record_name, value, removed, "object removed");
                Ok(removed > 0)
            }
            (Err(err), Ok(())) if !backed => Err(err),
            (index_result, backing_result) => {
                let indexed = index_result.is_ok();
                let stored = backing_result.is_ok();
                let mut context = format!("removing {}/{}", record_name, value);
                if let Err(err) = &index_result {
                    context.push_str(&format!("; index: {}", err));
                }
                if let Err(err) = &backing_result {
                    context.push_str(&format!("; backing store: {}", err));
                }
                error!(record_name, value, indexed, backed = stored, "partial remove");
                Err(Error::new(ErrorKind::PartialFailure { indexed, backed: stored }, context))
            }
        }
    }

    fn remove_backing(&self, record_name: &str, value: &str) -> Result<()> {
        let store = self.require_backing(record_name)?;
        let key = StoreKey::new(record_name, value)?;
        store.remove(&key)?;
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.remove(&key) {
                warn!(key = %key, error = %err, "cache remove failed, entry may be stale");
            }
        }
        Ok(())
    }

    /// The cache only ever mirrors the backing store; its failures are logged, not returned.
    fn cache_store(&self, key: &StoreKey, payload: &[u8]) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.store(key, payload) {
                warn!(key = %key, error = %err, "cache store failed");
            }
        }
    }

    /// Single-field form: `field` (by name) must match `match_string`
    pub fn execute_query<T: Record>(&self, prototype: &T, field: &str, match_string: &str) -> Result<QueryResults<T>> {
        let query = Query::new(prototype)
            .limit(self.config.default_limit)
            .where_matches_named(field, match_string)?;
        self.execute_query_with(prototype, &query)
    }

    pub fn execute_query_with<T: Record>(&self, prototype: &T, query: &Query) -> Result<QueryResults<T>> {
        let descriptor = &query.descriptor;
        validate_identifier("record name", &descriptor.record_name)?;
        if descriptor.store_mode.contains(StoreMode::BACKING) {
            self.require_backing(&descriptor.record_name)?;
        }

        let sort = query.sort_spec(&self.config.default_sort_field);
        let page = self.index.search(
            &descriptor.record_name,
            query.to_index_query(),
            &sort,
            query.limit,
            query.start,
        )?;

        let mut hits = Vec::with_capacity(page.documents.len());
        for document in &page.documents {
            match self.resolve(prototype, descriptor, document, true)? {
                Some(hit) => hits.push(hit),
                None => warn!(
                    record_name = %descriptor.record_name,
                    "indexed object missing from backing store"
                ),
            }
        }

        Ok(QueryResults {
            hits,
            total_hits: page.total_hits,
        })
    }

    /// Primary keys of records whose `fields` share the most terms with `text`,
    /// best first. `exclude_key` never appears in the result.
    pub fn related_objects<T: Record>(
        &self,
        prototype: &T,
        text: &str,
        fields: &[&str],
        limit: usize,
        exclude_key: Option<&str>,
    ) -> Result<Vec<String>> {
        let descriptor = prototype.descriptor();
        let key_field = key_field_name(&descriptor.record_name, prototype.primary_key_name());

        let mut index_fields = Vec::with_capacity(fields.len());
        for name in fields {
            descriptor.field_by_name(name)?;
            index_fields.push(index_field_name(&descriptor, name));
        }

        let exclude = exclude_key.map(|key| Term::new(key_field.as_str(), key));
        let documents = self.index.related(
            &descriptor.record_name,
            text,
            &index_fields,
            limit,
            exclude.as_ref(),
        )?;

        Ok(documents
            .iter()
            .filter_map(|doc| doc.get(&key_field).map(str::to_string))
            .collect())
    }

    /// Reset the cursor for this record kind and return its first object
    pub fn first_object<T: Record>(&self, prototype: &T) -> Result<Option<T>> {
        let descriptor = prototype.descriptor();
        validate_identifier("record name", &descriptor.record_name)?;
        let keys = self.cursor_keys(prototype, &descriptor)?;
        debug!(record_name = %descriptor.record_name, keys = keys.len(), "cursor reset");

        *self.cursor.lock() = Some(Cursor {
            record_name: descriptor.record_name.clone(),
            keys,
            position: 0,
        });
        self.next_object(prototype)
    }

    pub fn next_object<T: Record>(&self, prototype: &T) -> Result<Option<T>> {
        let descriptor = prototype.descriptor();
        loop {
            let key = {
                let mut guard = self.cursor.lock();
                let cursor = match guard.as_mut() {
                    Some(cursor) if cursor.record_name == descriptor.record_name => cursor,
                    _ => {
                        return Err(Error::new(
                            ErrorKind::InvalidState,
                            format!("next_object on '{}' without first_object", descriptor.record_name),
                        ));
                    }
                };
                match cursor.keys.get(cursor.position) {
                    Some(key) => {
                        cursor.position += 1;
                        key.clone()
                    }
                    None => return Ok(None),
                }
            };

            match self.load_object(prototype, &descriptor, &key)? {
                Some(object) => return Ok(Some(object)),
                None => debug!(key = %key, "cursor entry vanished, skipping"),
            }
        }
    }

    fn cursor_keys<T: Record>(&self, prototype: &T, descriptor: &RecordDescriptor) -> Result<Vec<String>> {
        let mode = descriptor.store_mode;
        if mode.contains(StoreMode::BACKING) {
            return self.require_backing(&descriptor.record_name)?.keys(&descriptor.record_name);
        }
        if !mode.contains(StoreMode::INDEX) {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("'{}' stores no objects to iterate", descriptor.record_name),
            ));
        }

        let key_field = key_field_name(&descriptor.record_name, prototype.primary_key_name());
        let page = self.index.search(
            &descriptor.record_name,
            None,
            &SortSpec::field(key_field.as_str(), false),
            usize::MAX,
            0,
        )?;
        Ok(page
            .documents
            .iter()
            .filter_map(|doc| doc.get(&key_field).map(str::to_string))
            .collect())
    }

    fn load_object<T: Record>(&self, prototype: &T, descriptor: &RecordDescriptor, key: &str) -> Result<Option<T>> {
        if descriptor.store_mode.contains(StoreMode::BACKING) {
            let key = StoreKey::new(descriptor.record_name.as_str(), key)?;
            return match self.fetch_backing(&descriptor.record_name, &key)? {
                Some(payload) => Ok(Some(self.codec.decode(&payload)?)),
                None => Ok(None),
            };
        }
        Ok(self
            .retrieve_object_by_primary_key(prototype, key)?
            .and_then(Resolved::into_object))
    }

    /// Rebuild the index entries of one record kind from its authoritative copy
    pub fn reindex<T: Record>(&self, prototype: &T) -> Result<usize> {
        let options = StoreOptions { write_backing: false };
        let mut count = 0;

        let mut next = self.first_object(prototype)?;
        while let Some(object) = next {
            self.store_object_with(&object, options)?;
            count += 1;
            next = self.next_object(prototype)?;
        }

        info!(record_name = prototype.record_name(), count, "reindexed");
        Ok(count)
    }

    /// Log every indexed document of `record_name` at debug level
    pub fn dump_documents(&self, record_name: &str) -> Result<usize> {
        let page = self.index.search(record_name, None, &SortSpec::Relevance, usize::MAX, 0)?;
        for document in &page.documents {
            let fields: Vec<(&str, &str)> = document.text_fields().collect();
            debug!(record_name, fields = ?fields, "doc");
        }
        Ok(page.documents.len())
    }

    pub fn create_index(&self) -> Result<()> {
        self.index.create_index()
    }

    pub fn delete_index(&self) -> Result<()> {
        self.index.delete_index()
    }

    pub fn optimize_index(&self) -> Result<()> {
        self.index.optimize_index()
    }

    fn fetch_backing(&self, record_name: &str, key: &StoreKey) -> Result<Option<Vec<u8>>> {
        if let Some(cache) = &self.cache {
            match cache.retrieve(key) {
                Ok(Some(payload)) => return Ok(Some(payload)),
                Ok(None) => {}
                Err(err) => warn!(key = %key, error = %err, "cache read failed, using backing store"),
            }
        }

        let payload = self.require_backing(record_name)?.retrieve(key)?;
        if let Some(payload) = &payload {
            self.cache_store(key, payload);
        }
        Ok(payload)
    }

    fn resolve<T: Record>(
        &self,
        prototype: &T,
        descriptor: &RecordDescriptor,
        document: &IndexDocument,
        for_query: bool,
    ) -> Result<Option<Resolved<T>>> {
        let record_name = descriptor.record_name.as_str();
        let pk_name = prototype.primary_key_name();
        let key_field = key_field_name(record_name, pk_name);
        let mode = descriptor.store_mode;

        if mode.is_none() {
            let key = document.get(&key_field).unwrap_or_default().to_string();
            if for_query {
                return Ok(Some(Resolved::Key(key)));
            }

            let mut fields = BTreeMap::new();
            fields.insert(pk_name.to_string(), key);
            for field in &descriptor.fields {
                if let Some(value) = document.get(field.name()) {
                    fields.insert(field.name().to_string(), value.to_string());
                }
            }
            return Ok(Some(Resolved::Fields(fields)));
        }

        if mode.contains(StoreMode::INDEX) {
            let payload = document.get_binary(OBJECT_FIELD).ok_or_else(|| {
                Error::new(
                    ErrorKind::Decode,
                    format!("indexed '{}' document carries no stored object", record_name),
                )
            })?;
            return Ok(Some(Resolved::Object(self.codec.decode(payload)?)));
        }

        // BACKING: address the store with the value that was actually indexed
        let indexed_key = document.get(&key_field).ok_or_else(|| {
            Error::corrupt(format!("'{}' document without '{}'", record_name, key_field))
        })?;
        let key = StoreKey::new(record_name, indexed_key)?;
        match self.fetch_backing(record_name, &key)? {
            Some(payload) => Ok(Some(Resolved::Object(self.codec.decode(&payload)?))),
            None => Ok(None),
        }
    }
}

/// Index document for a descriptor: kind, primary key, then every present field
fn build_document(descriptor: &RecordDescriptor) -> Result<IndexDocument> {
    let mut document = IndexDocument::new();
    document.add(IndexField::text(TYPE_FIELD, descriptor.record_name.as_str(), FieldMode::Exact));

    let pk = descriptor.primary_key()?;
    if let Some(field) = pk.to_index_field(&descriptor.key_field_name()?)? {
        document.add(field);
    }
    for field in &descriptor.fields {
        if let Some(mapped) = field.to_index_field(field.name())? {
            document.add(mapped);
        }
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use crate::core::record::Field;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Person {
        account: String,
        name: String,
    }

    impl Record for Person {
        fn descriptor(&self) -> RecordDescriptor {
            RecordDescriptor::new("person")
                .with_primary_key(Field::string("acct", Some(self.account.clone())))
                .with_field(Field::string("name", Some(self.name.clone())))
                .with_store_mode(StoreMode::INDEX)
        }

        fn record_name(&self) -> &str {
            "person"
        }

        fn primary_key_name(&self) -> &str {
            "acct"
        }
    }

    fn person(account: &str, name: &str) -> Person {
        Person {
            account: account.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn document_carries_type_key_and_fields() {
        let document = build_document(&person("1234", "John Smith").descriptor()).unwrap();
        assert_eq!(document.get(TYPE_FIELD), Some("person"));
        assert_eq!(document.get("person_acct"), Some("1234"));
        assert_eq!(document.get("name"), Some("John Smith"));
    }

    #[test]
    fn index_mode_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let core = Core::open(dir.path());
        let john = person("1234", "John Smith");

        core.store_object(&john).unwrap();
        let found = core
            .retrieve_object_by_primary_key(&person("", ""), "1234")
            .unwrap()
            .and_then(Resolved::into_object);
        assert_eq!(found, Some(john));
        assert!(core.retrieve_object_by_primary_key(&person("", ""), "9999").unwrap().is_none());
    }

    #[test]
    fn path_unsafe_key_is_rejected_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let core = Core::open(dir.path().join("index"));

        let err = core.store_object(&person("../1234", "Mallory")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRecordIdentifier);
        assert!(!dir.path().join("index").exists());
    }

    #[test]
    fn next_without_first_is_invalid_state() {
        let dir = tempfile::tempdir().unwrap();
        let core = Core::open(dir.path());
        let err = core.next_object(&person("", "")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
    }
}
