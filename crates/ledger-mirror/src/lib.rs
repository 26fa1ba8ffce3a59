//! # Ledger Mirror
//!
//! Keep a local append-only ledger in step with a remote replica, one cursor
//! window at a time.
//!
//! ## Overview
//!
//! Ledger Mirror provides:
//!
//! - **Cursors**: Compact query-string descriptors of byte windows
//! - **Window algorithm**: Which bytes to ask for next, clamped to the valid data
//! - **Storage**: An async capability trait with SQLite and in-memory ledgers
//! - **Sync**: A sequential fetch loop with divergence detection
//!
//! ## Key Concepts
//!
//! - **Frontier**: The first free offset of a ledger. Only bytes at or past it
//!   are ever written.
//! - **Caught up**: The empty cursor parked at the frontier.
//! - **Look-back**: Bytes preceding the frontier, sent so the remote can
//!   refuse a diverged history.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ledger_mirror::{Mirror, MirrorConfig};
//! use ledger_mirror::store::{SqliteLedger, SqliteLedgerOptions};
//! use ledger_mirror::sync::spawn_responder;
//!
//! async fn example() {
//!     // The replica, served from its own task
//!     let source = SqliteLedger::open("source.db", SqliteLedgerOptions::default())
//!         .unwrap()
//!         .initialize()
//!         .await
//!         .unwrap();
//!     let (remote, _responder) = spawn_responder(source, Default::default());
//!
//!     // The local ledger
//!     let local = SqliteLedger::open("mirror.db", SqliteLedgerOptions::default())
//!         .unwrap()
//!         .initialize()
//!         .await
//!         .unwrap();
//!
//!     let mut mirror = Mirror::new(local, remote, MirrorConfig::default());
//!     let report = mirror.sync().await.unwrap();
//!     println!("mirrored up to {}", report.final_position);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `ledger_mirror::core` - Cursor and window algorithm
//! - `ledger_mirror::store` - Storage abstraction, SQLite and memory ledgers
//! - `ledger_mirror::sync` - Fetch messages, remotes, responder and sync loop

pub mod error;
pub mod mirror;

// Re-export component crates
pub use ledger_mirror_core as core;
pub use ledger_mirror_store as store;
pub use ledger_mirror_sync as sync;

// Re-export main types for convenience
pub use error::{MirrorError, Result};
pub use mirror::{Mirror, MirrorConfig};

// Re-export commonly used types
pub use ledger_mirror_core::{Cursor, Direction, Geometry};
pub use ledger_mirror_store::{LedgerStorage, MemoryLedger, Ready, SqliteLedger, Uninitialized};
pub use ledger_mirror_sync::{FetchRequest, FetchResponse, Remote, SyncConfig, SyncReport};
