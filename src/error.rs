//! Error types for sync runs.
//!
//! Every fatal condition of a run maps onto one [`SyncError`] variant, and
//! every variant maps onto a process exit code.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::fs::StoreError;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Step of the transfer pipeline that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStep {
    Download,
    Upload,
}

impl std::fmt::Display for TransferStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferStep::Download => write!(f, "download"),
            TransferStep::Upload => write!(f, "upload"),
        }
    }
}

/// Main error type for bucketsync
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to set up {backend} client: {reason}")]
    Client { backend: String, reason: String },

    #[error("Failed to list source objects under '{prefix}': {reason}")]
    Listing { prefix: String, reason: String },

    #[error("Failed to stage {key} at {}: {reason}", .path.display())]
    Staging {
        key: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to {step} {key}: {reason}")]
    Transfer {
        key: String,
        step: TransferStep,
        reason: String,
        retryable: bool,
    },

    #[error("Transfer of {key} timed out after {}s", .after.as_secs())]
    Timeout { key: String, after: Duration },

    #[error("Upload failed for {key}: {reason}")]
    Verification { key: String, reason: String },

    #[error("Failed to stat destination object {key}: {reason}")]
    Stat { key: String, reason: String },

    #[error("{failed} of {total} objects failed to sync")]
    PartialFailure { failed: usize, total: usize },
}

impl SyncError {
    pub(crate) fn staging(key: &str, path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        SyncError::Staging {
            key: key.to_string(),
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn download_io(key: &str, err: std::io::Error) -> Self {
        SyncError::Transfer {
            key: key.to_string(),
            step: TransferStep::Download,
            reason: format!("local write failed: {}", err),
            retryable: false,
        }
    }

    pub(crate) fn upload_io(key: &str, err: std::io::Error) -> Self {
        SyncError::Transfer {
            key: key.to_string(),
            step: TransferStep::Upload,
            reason: format!("local read failed: {}", err),
            retryable: false,
        }
    }

    pub(crate) fn from_store(key: &str, step: TransferStep, err: StoreError) -> Self {
        SyncError::Transfer {
            key: key.to_string(),
            step,
            retryable: err.is_temporary(),
            reason: err.to_string(),
        }
    }

    /// Check if re-running the failed object's pipeline may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transfer { retryable, .. } => *retryable,
            SyncError::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Config(_) | SyncError::Client { .. } => 2,
            SyncError::Listing { .. } => 3,
            SyncError::Staging { .. } => 4,
            SyncError::Transfer { .. } | SyncError::Timeout { .. } => 5,
            SyncError::Verification { .. } => 6,
            SyncError::Stat { .. } => 7,
            SyncError::PartialFailure { .. } => 8,
        }
    }
}
