//! Error types for the stylesnap library
//!
//! This module defines every error that can surface from hashing, diffing,
//! validation and chunked persistence. None of them is fatal: each one
//! degrades either to "no stored snapshot" or to "change rejected", and the
//! classifiers below let callers decide which path they are on.

use thiserror::Error;

/// Type alias for Results in the stylesnap library
pub type Result<T> = std::result::Result<T, SnapError>;

/// Main error type for all stylesnap operations
#[derive(Debug, Error)]
pub enum SnapError {
    /// Inbound payload or snapshot failed structural validation
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Persisted bytes failed to parse or validate
    #[error("Corrupted storage: {0}")]
    CorruptedStorage(String),

    /// The backend rejected a write or a verification read did not match
    #[error("Storage write failed for key '{key}': {reason}")]
    StorageWriteFailure {
        /// Backend key that failed
        key: String,
        /// What went wrong
        reason: String,
    },

    /// A chunk referenced by the metadata record is absent
    #[error("Missing chunk {index} of {expected}")]
    MissingChunk {
        /// Index of the first missing chunk
        index: usize,
        /// Chunk count recorded in the metadata
        expected: usize,
    },

    /// A diff was requested but nothing has been committed yet
    #[error("No stored snapshot")]
    NoStoredSnapshot,

    /// Errors reported by the key/value backend itself
    #[error("Backend error: {0}")]
    Backend(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Ignore pattern failed to compile
    #[error("Invalid ignore pattern: {0}")]
    InvalidPattern(String),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors from the file backend
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The new snapshot was staged and verified but could not be moved into
    /// place; the next load finishes the promotion
    #[error("Commit pending: {0}")]
    CommitPending(String),
}

impl From<globset::Error> for SnapError {
    fn from(err: globset::Error) -> Self {
        SnapError::InvalidPattern(err.to_string())
    }
}

impl SnapError {
    /// Create an invalid format error with a custom message
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        SnapError::InvalidFormat(msg.into())
    }

    /// Create a corrupted storage error with a custom message
    pub fn corrupted(msg: impl Into<String>) -> Self {
        SnapError::CorruptedStorage(msg.into())
    }

    /// Create a write failure for `key`
    pub fn write_failure(key: impl Into<String>, reason: impl Into<String>) -> Self {
        SnapError::StorageWriteFailure {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a backend error with a custom message
    pub fn backend(msg: impl Into<String>) -> Self {
        SnapError::Backend(msg.into())
    }

    /// Create a pending-commit error with the reason promotion stopped
    pub fn commit_pending(reason: impl Into<String>) -> Self {
        SnapError::CommitPending(reason.into())
    }

    /// Check if the caller can retry or carry on after this error
    ///
    /// A failed save leaves either the previous snapshot or a verified staged
    /// copy of the new one, and a missing baseline only means there is nothing
    /// to compare against yet.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SnapError::StorageWriteFailure { .. }
                | SnapError::CommitPending(_)
                | SnapError::NoStoredSnapshot
                | SnapError::Backend(_)
                | SnapError::Io(_)
        )
    }

    /// Check if this error means the persisted data cannot be trusted
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            SnapError::CorruptedStorage(_) | SnapError::MissingChunk { .. } | SnapError::Json(_)
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            SnapError::NoStoredSnapshot => {
                "No baseline snapshot has been committed yet. Commit the current state first.".to_string()
            }
            SnapError::StorageWriteFailure { key, .. } => {
                format!(
                    "Saving failed while writing '{}'. The previously committed snapshot is unchanged; try again.",
                    key
                )
            }
            SnapError::CommitPending(reason) => {
                format!(
                    "The new snapshot was saved but not yet moved into place ({}). It becomes the baseline on the next load; do not commit it again.",
                    reason
                )
            }
            SnapError::InvalidFormat(msg) => {
                format!("The change payload was rejected: {}", msg)
            }
            _ => self.to_string(),
        }
    }
}
