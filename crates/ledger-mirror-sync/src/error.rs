//! Error types for the sync module.

use thiserror::Error;

/// Errors that can occur during sync operations.
///
/// Every variant aborts the whole synchronization attempt.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote explicitly reported a failure.
    #[error("remote error: {0}")]
    Remote(String),

    /// The remote reported a position behind what is already committed locally.
    #[error("protocol violation: remote position {remote} is behind local position {local}")]
    ProtocolViolation { local: u64, remote: u64 },

    /// The remote call itself failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Message encoding or decoding failed.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] ledger_mirror_store::StoreError),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
