//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Read range extends past the storage capacity.
    #[error("range [{offset}..{end}) is outside storage capacity {capacity}")]
    OutOfRange { offset: u64, end: u64, capacity: u64 },

    /// Write targets bytes before the data partition.
    #[error("write at {offset} precedes data partition start {data_start}")]
    BelowPartition { offset: u64, data_start: u64 },

    /// Storage cannot grow far enough to hold bytes up to `end`.
    #[error("cannot grow storage to hold {end} bytes")]
    CapacityExceeded { end: u64 },

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock guarding storage state was poisoned.
    #[error("storage lock poisoned: {0}")]
    Poisoned(String),

    /// A blocking storage task failed to complete.
    #[error("storage task failed: {0}")]
    Task(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
