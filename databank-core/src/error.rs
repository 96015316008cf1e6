//! Error types for databank operations

use std::path::PathBuf;
use thiserror::Error;

/// Unexpected operational failure raised by a driver.
///
/// Expected negative outcomes (an ID that is not stored, a key that was
/// already absent) are never errors; drivers report them as `Ok(None)` or
/// `Ok(false)`.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },

    #[error("{} is not a regular file", path.display())]
    NotARegularFile { path: PathBuf },

    #[error("{} is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Sync driver requires at least one tier")]
    NoTiers,

    #[error("Backend error: {reason}")]
    Backend { reason: String },
}

impl DriverError {
    /// Shorthand for a backend failure with a free-form reason.
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            reason: e.to_string(),
        }
    }
}

/// Failure decoding typed content out of an entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("Content width mismatch: expected {expected} bytes, got {actual}")]
    Width { expected: usize, actual: usize },

    #[error("Content is not valid UTF-8: {0}")]
    Utf8(String),
}

/// Result type alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display_not_a_regular_file() {
        let err = DriverError::NotARegularFile {
            path: PathBuf::from("/tmp/cache/abc"),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("/tmp/cache/abc"));
        assert!(msg.contains("not a regular file"));
    }

    #[test]
    fn test_driver_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = DriverError::from(io);
        assert!(matches!(err, DriverError::Io(_)));
        assert!(format!("{}", err).contains("denied"));
    }

    #[test]
    fn test_driver_error_from_serde_json() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = DriverError::from(parse);
        assert!(matches!(err, DriverError::Serialization { .. }));
    }

    #[test]
    fn test_backend_shorthand() {
        let err = DriverError::backend("disk offline");
        assert_eq!(format!("{}", err), "Backend error: disk offline");
    }

    #[test]
    fn test_content_error_display_width() {
        let err = ContentError::Width {
            expected: 8,
            actual: 3,
        };
        let msg = format!("{}", err);
        assert!(msg.contains('8'));
        assert!(msg.contains('3'));
    }
}
