use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::{debug, error};
use crate::backing::{BackingStore, StoreKey};
use crate::core::error::{Error, Result};
use crate::core::record::validate_identifier;
use crate::core::retry::RetryPolicy;
use crate::storage::file_lock::FileLock;
use crate::storage::marker_lock::MarkerLock;

const LOCKS_DIR: &str = "locks";

/// On-disk store: objects at `{root}/{record}/{key}`, lock markers at
/// `{root}/locks/{record}/{key}`. `locks` is therefore not a usable record name.
///
/// Every read and write of an object file happens while holding its marker;
/// the file itself is additionally `flock`ed for the duration of the I/O.
pub struct FileBackingStore {
    root: PathBuf,
    lock_retry: RetryPolicy,
}

impl FileBackingStore {
    pub fn new(root: impl Into<PathBuf>, lock_retry: RetryPolicy) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(LOCKS_DIR))?;
        Ok(FileBackingStore { root, lock_retry })
    }

    fn record_dir(&self, record_name: &str) -> Result<PathBuf> {
        validate_identifier("record name", record_name)?;
        if record_name == LOCKS_DIR {
            return Err(Error::invalid_identifier(format!(
                "record name '{}' is reserved for lock markers",
                record_name
            )));
        }
        Ok(self.root.join(record_name))
    }

    pub fn object_path(&self, key: &StoreKey) -> Result<PathBuf> {
        Ok(self.record_dir(key.record_name())?.join(key.key()))
    }

    fn marker_path(&self, key: &StoreKey) -> PathBuf {
        self.root.join(LOCKS_DIR).join(key.record_name()).join(key.key())
    }

    fn lock(&self, key: &StoreKey) -> Result<MarkerLock> {
        MarkerLock::acquire(&self.marker_path(key), &self.lock_retry).inspect_err(|err| {
            if err.is_lock_timeout() {
                error!(key = %key, "lock timeout on backing object");
            }
        })
    }
}

impl BackingStore for FileBackingStore {
    fn store(&self, key: &StoreKey, payload: &[u8]) -> Result<()> {
        let path = self.object_path(key)?;
        let _marker = self.lock(key)?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        let mut guard = FileLock::lock(file, true)?;
        let file = guard.file_mut();
        file.set_len(0)?;
        file.write_all(payload)?;
        file.sync_all()?;

        debug!(key = %key, bytes = payload.len(), "object stored");
        Ok(())
    }

    fn retrieve(&self, key: &StoreKey) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(key)?;
        let _marker = self.lock(key)?;

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut guard = FileLock::lock(file, false)?;
        let mut payload = Vec::new();
        guard.file_mut().read_to_end(&mut payload)?;
        Ok(Some(payload))
    }

    fn remove(&self, key: &StoreKey) -> Result<()> {
        let path = self.object_path(key)?;
        let _marker = self.lock(key)?;

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key = %key, "object removed");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn keys(&self, record_name: &str) -> Result<Vec<String>> {
        let dir = self.record_dir(record_name)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn name(&self) -> &str {
        "filesystem"
    }
}
