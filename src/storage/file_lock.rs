use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use crate::core::error::{Error, ErrorKind, Result};

/// OS advisory lock (`flock`) held for the lifetime of the value
pub struct FileLock {
    pub file: File,
    pub exclusive: bool,
}

impl FileLock {
    /// Non-blocking exclusive lock on `path`, created if missing.
    /// `Ok(None)` means another holder has it.
    pub fn try_exclusive(path: &Path) -> Result<Option<Self>> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        match flock(&file, true, false) {
            Ok(()) => Ok(Some(FileLock { file, exclusive: true })),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(Error::new(
                ErrorKind::Io,
                format!("lock {}: {}", path.display(), err),
            )),
        }
    }

    /// Blocking lock on an already open file
    pub fn lock(file: File, exclusive: bool) -> Result<Self> {
        flock(&file, exclusive, true)
            .map_err(|e| Error::new(ErrorKind::Io, format!("Failed to acquire lock: {}", e)))?;
        Ok(FileLock { file, exclusive })
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

#[cfg(unix)]
fn flock(file: &File, exclusive: bool, blocking: bool) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    use libc::{LOCK_EX, LOCK_NB, LOCK_SH};

    let mut operation = if exclusive { LOCK_EX } else { LOCK_SH };
    if !blocking {
        operation |= LOCK_NB;
    }

    let fd = file.as_raw_fd();
    // SAFETY: fd is owned by `file`, which outlives the call
    let rc = unsafe { libc::flock(fd, operation) };
    if rc == 0 {
        return Ok(());
    }

    // EWOULDBLOCK surfaces as io::ErrorKind::WouldBlock
    Err(io::Error::last_os_error())
}

#[cfg(not(unix))]
fn flock(_file: &File, _exclusive: bool, _blocking: bool) -> io::Result<()> {
    Ok(())
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::LOCK_UN;

            let fd = self.file.as_raw_fd();
            unsafe {
                libc::flock(fd, LOCK_UN);
            }
        }
    }
}
