//! # Ledger Mirror Store
//!
//! Storage abstraction for ledger mirroring. Provides a trait-based interface
//! over the raw bytes of an append-only ledger with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! The store module abstracts ledger bytes behind the [`LedgerStorage`] trait,
//! allowing the sync loop to be storage-agnostic. The persistent
//! implementation is [`SqliteLedger`], with [`MemoryLedger`] for testing.
//!
//! ## Key Types
//!
//! - [`LedgerStorage`] - The async trait for all storage operations
//! - [`Uninitialized`] / [`Ready`] - Two-state handle; only `Ready` exposes storage
//! - [`SqliteLedger`] - SQLite-based persistent storage
//! - [`MemoryLedger`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ledger_mirror_store::{SqliteLedger, SqliteLedgerOptions, LedgerStorage};
//!
//! async fn example() {
//!     // Open a ledger file; it must be initialized before use
//!     let ledger = SqliteLedger::open("ledger.db", SqliteLedgerOptions::default())
//!         .unwrap()
//!         .initialize()
//!         .await
//!         .unwrap();
//!
//!     let next = ledger.next_write_position().await.unwrap();
//!     ledger.write(next, b"block bytes").await.unwrap();
//!     ledger.refresh().await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Page growth**: capacity grows in whole [`PAGE_SIZE`] pages
//! - **Committed view**: `next_write_position` changes only on `refresh()`
//! - **Partition guard**: writes below the data partition start are rejected

pub mod error;
pub mod handle;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use handle::{Ready, Uninitialized};
pub use memory::{MemoryLedger, MemoryLedgerBuilder};
pub use sqlite::{SqliteLedger, SqliteLedgerOptions};
pub use traits::{LedgerStorage, StorageExt, PAGE_SIZE};
