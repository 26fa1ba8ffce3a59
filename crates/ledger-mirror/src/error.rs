//! Error types for the Mirror.

use std::time::Duration;

use ledger_mirror_store::StoreError;
use ledger_mirror_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during Mirror operations.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// The attempt did not finish within the configured deadline.
    ///
    /// Windows applied before the deadline stay committed.
    #[error("sync deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// Result type for Mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;
