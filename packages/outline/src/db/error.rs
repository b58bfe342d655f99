//! Storage Error Types
//!
//! Errors raised by [`DataStore`](super::DataStore) backends. The node store
//! wraps these into service-level errors or `SaveResult::error`.

use std::path::PathBuf;
use thiserror::Error;

/// Persistence backend errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal lock was poisoned by a panicking writer
    #[error("Failed to acquire storage lock")]
    LockPoisoned,

    /// Backend-specific failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::backend("disk full");
        assert_eq!(err.to_string(), "Storage backend error: disk full");

        let err = StorageError::io(
            "/tmp/nodes/a.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().starts_with("I/O error at /tmp/nodes/a.json"));

        assert_eq!(
            StorageError::LockPoisoned.to_string(),
            "Failed to acquire storage lock"
        );
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json")
            .expect_err("Should fail to parse");
        let err: StorageError = json_error.into();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
