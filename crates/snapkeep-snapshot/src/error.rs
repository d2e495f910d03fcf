//! Snapshot error types.

use snapkeep_storage::StorageError;
use thiserror::Error;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur during snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// No snapshot is stored under the requested name.
    #[error("Snapshot not found: {0}")]
    NotFound(String),

    /// Invalid scheduler or store configuration.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The target could not be captured or written back.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The backing store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SnapshotError {
    /// Create a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether this error only reports a missing snapshot.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors raised while reading fields from, or writing them back to, a target.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The target does not serialize to a struct-like object.
    #[error("Unsupported target shape: expected named fields, found {0}")]
    Unsupported(&'static str),

    /// A field value could not be encoded.
    #[error("Failed to capture target: {0}")]
    Encode(#[source] serde_json::Error),

    /// Captured values could not be decoded back into the target type.
    #[error("Failed to restore target: {0}")]
    Decode(#[source] serde_json::Error),

    /// Another thread panicked while holding the target lock.
    #[error("Target lock poisoned: {0}")]
    LockPoisoned(String),
}
