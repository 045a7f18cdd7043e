//! Error types for tissue.
//!
//! Structured variants for every condition the store surfaces, with
//! `#[from]` conversions for the cache engine, I/O, and JSON layers.
//! The CLI renders any of these as a one-line diagnostic on stderr and
//! exits 1.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for tissue operations.
#[derive(Error, Debug)]
pub enum TissueError {
    // === Store lifecycle ===
    /// Expected store directory is absent during open (distinct from init).
    #[error("No issue store found at '{path}' (run 'tissue init' first)")]
    StoreNotFound { path: PathBuf },

    // === Id resolution ===
    /// Resolution found no match.
    #[error("Issue not found: {input}")]
    IssueNotFound { input: String },

    /// Prefix or hash-suffix lookup matched more than one issue.
    #[error("Ambiguous issue id '{input}': matches {matches:?}")]
    IssueIdAmbiguous {
        input: String,
        matches: Vec<String>,
    },

    /// User-supplied lookup input contains disallowed characters.
    #[error("Invalid issue id '{input}': only letters, digits, '.' and '-' are allowed")]
    InvalidIdPrefix { input: String },

    /// Project prefix normalizes to the empty string.
    #[error("Invalid prefix '{input}': no letters or digits remain after normalization")]
    InvalidPrefix { input: String },

    /// 10 nonces exhausted without finding a unique issue id.
    #[error("Issue id collision: exhausted {attempts} attempts")]
    IssueIdCollision { attempts: u32 },

    // === Validation ===
    /// Status outside the canonical set.
    #[error("Invalid status: {status}")]
    InvalidStatus { status: String },

    /// Priority outside 1..=5.
    #[error("Priority must be 1-5, got: {priority}")]
    InvalidPriority { priority: i64 },

    /// Dependency kind outside the allowed trio.
    #[error("Invalid dependency kind: {kind} (expected blocks, parent, or relates)")]
    InvalidDepKind { kind: String },

    /// Dependency with src = dst.
    #[error("Issue cannot depend on itself: {id}")]
    SelfDependency { id: String },

    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    // === Log / importer ===
    /// A log record is missing a required field with its declared type.
    /// Only raised when applying to the cache; parse failures are warned
    /// and skipped instead.
    #[error("Malformed log record: {reason}")]
    MalformedRecord { reason: String },

    // === Contention ===
    /// Retries exhausted while another process held the writer slot.
    #[error("Store is busy: another process holds the write lock")]
    DatabaseBusy,

    // === Wrapped ===
    /// Unrecoverable cache-engine failure.
    #[error("Cache error: {0}")]
    Cache(#[from] rusqlite::Error),

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TissueError {
    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True if the underlying cause is writer-slot contention.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        match self {
            Self::DatabaseBusy => true,
            Self::Cache(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Exit code for the CLI. All surfaced errors exit 1.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        1
    }
}

/// Result type using `TissueError`.
pub type Result<T> = std::result::Result<T, TissueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TissueError::IssueNotFound {
            input: "acme-1z2x3c4v".to_string(),
        };
        assert_eq!(err.to_string(), "Issue not found: acme-1z2x3c4v");
    }

    #[test]
    fn test_validation_error() {
        let err = TissueError::validation("title", "cannot be empty");
        assert_eq!(err.to_string(), "Validation failed: title: cannot be empty");
    }

    #[test]
    fn test_busy_detection() {
        assert!(TissueError::DatabaseBusy.is_busy());

        let busy = TissueError::Cache(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ));
        assert!(busy.is_busy());

        let other = TissueError::IssueNotFound {
            input: "x".to_string(),
        };
        assert!(!other.is_busy());
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(TissueError::DatabaseBusy.exit_code(), 1);
    }
}
