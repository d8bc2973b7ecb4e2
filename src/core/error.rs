use thiserror::Error as ThisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Record name, key name or key value is not usable as a path segment
    InvalidRecordIdentifier,
    /// BACKING store mode requested but no backing store configured
    MissingBackingStore,
    /// Writer or filesystem lock not obtained within its bound
    LockTimeout,
    /// Structural damage detected in index files
    CorruptIndex,
    Io,
    NotFound,
    /// Codec could not round-trip a payload
    Decode,
    /// Only part of a multi-store operation took effect
    PartialFailure { indexed: bool, backed: bool },
    InvalidArgument,
    InvalidState,
}

#[derive(Debug, ThisError)]
#[error("{kind:?}: {context}")]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error { kind, context: context.into() }
    }

    pub fn invalid_identifier(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidRecordIdentifier, context)
    }

    pub fn corrupt(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::CorruptIndex, context)
    }

    pub fn is_lock_timeout(&self) -> bool {
        self.kind == ErrorKind::LockTimeout
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error {
            kind: ErrorKind::Decode,
            context: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::InvalidArgument,
            context: format!("config: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_kind_and_context() {
        let err = Error::new(ErrorKind::PartialFailure { indexed: false, backed: true }, "index write failed");
        let text = err.to_string();
        assert!(text.contains("PartialFailure"));
        assert!(text.contains("index write failed"));
    }

    #[test]
    fn io_errors_map_to_io_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert_eq!(err.kind, ErrorKind::Io);
    }
}
