//! Error types for the index core.
//!
//! Every failure falls into one of four families: on-disk format problems,
//! caller contract violations, I/O failures and lock timeouts. The remaining
//! variants cover argument validation and serialization plumbing.

use std::io;

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors raised by index storage and retrieval.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Unsupported or obsolete on-disk format, missing metadata, corrupt data.
    #[error("Format error: {0}")]
    Format(String),

    /// A caller broke an API contract (out-of-order terms, duplicate registration...).
    #[error("Contract violation: {0}")]
    Contract(String),

    /// I/O failure with the path that caused it.
    #[error("I/O error on '{path}': {source}")]
    IoAt {
        path: String,
        #[source]
        source: io::Error,
    },

    /// I/O failure without path context.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A lock could not be obtained before its timeout ran out.
    #[error("Timed out after {waited_ms}ms waiting for lock '{name}': {message}")]
    LockTimeout {
        name: String,
        waited_ms: u64,
        message: String,
    },

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid argument supplied by the caller.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A requested file, field or entry does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal invariant failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IndexError {
    /// Create a format error.
    pub fn format<S: Into<String>>(msg: S) -> Self {
        IndexError::Format(msg.into())
    }

    /// Create a contract violation.
    pub fn contract<S: Into<String>>(msg: S) -> Self {
        IndexError::Contract(msg.into())
    }

    /// Attach a path to an I/O error.
    pub fn io_at<S: Into<String>>(path: S, source: io::Error) -> Self {
        IndexError::IoAt {
            path: path.into(),
            source,
        }
    }

    /// Create a lock timeout error.
    pub fn lock_timeout<S: Into<String>, M: Into<String>>(name: S, waited_ms: u64, msg: M) -> Self {
        IndexError::LockTimeout {
            name: name.into(),
            waited_ms,
            message: msg.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        IndexError::InvalidArgument(msg.into())
    }

    /// Create a not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        IndexError::NotFound(msg.into())
    }

    /// Create an internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        IndexError::Internal(msg.into())
    }

    pub fn is_format_error(&self) -> bool {
        matches!(self, IndexError::Format(_) | IndexError::Json(_))
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self, IndexError::Contract(_))
    }

    pub fn is_io_error(&self) -> bool {
        matches!(self, IndexError::Io(_) | IndexError::IoAt { .. })
    }

    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, IndexError::LockTimeout { .. })
    }

    /// True when the underlying cause is a missing file.
    pub fn is_not_found(&self) -> bool {
        match self {
            IndexError::NotFound(_) => true,
            IndexError::Io(e) | IndexError::IoAt { source: e, .. } => {
                e.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(IndexError::format("bad").is_format_error());
        assert!(IndexError::contract("order").is_contract_violation());
        assert!(IndexError::lock_timeout("write", 100, "exists").is_lock_timeout());

        let io = IndexError::io_at("seg_1/documents.dat", io::Error::other("boom"));
        assert!(io.is_io_error());
        assert!(!io.is_lock_timeout());
        assert!(io.to_string().contains("seg_1/documents.dat"));
    }

    #[test]
    fn test_not_found_detection() {
        let err = IndexError::io_at("x", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.is_not_found());
        assert!(IndexError::not_found("field").is_not_found());
        assert!(!IndexError::internal("x").is_not_found());
    }
}
