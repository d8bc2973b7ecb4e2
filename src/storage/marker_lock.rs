use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use crate::core::error::Result;
use crate::core::retry::{Attempt, RetryPolicy};

/// Exclusive marker acquisition with bounded wait and guaranteed release.
///
/// The marker is a directory: creating it is atomic and fails if it already
/// exists, on every platform and across processes. Dropping the guard removes
/// the marker.
#[derive(Debug)]
pub struct MarkerLock {
    path: PathBuf,
}

impl MarkerLock {
    pub fn acquire(path: &Path, policy: &RetryPolicy) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let label = path.display().to_string();
        policy.run(&label, |attempt| match fs::create_dir(path) {
            Ok(()) => Ok(Attempt::Done(())),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                debug!(marker = %label, attempt, "lock in use");
                Ok(Attempt::Retry)
            }
            Err(err) => Err(err.into()),
        })?;

        Ok(MarkerLock { path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MarkerLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir(&self.path) {
            warn!(marker = %self.path.display(), error = %err, "failed to release lock marker");
        }
    }
}
