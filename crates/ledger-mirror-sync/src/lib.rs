//! # Ledger Mirror Sync
//!
//! Cursor-windowed synchronization of a local ledger from a remote replica.
//!
//! ## Overview
//!
//! The local side runs a [`SyncSession`]: it asks the [`Remote`] for the
//! window starting at its own write frontier, validates the returned cursor,
//! appends the bytes and repeats until the remote reports no more data. The
//! serving side is [`serve_fetch`], which any ledger can use to answer
//! requests, so mirrors can be chained.
//!
//! ## Key Properties
//!
//! - **Append-only**: bytes are only ever written at or past the local frontier
//! - **Resumable**: an aborted session leaves every applied window committed
//! - **Divergence detection**: requests carry the bytes preceding the frontier
//!   and the responder refuses to serve a diverged history
//! - **Sequential**: at most one fetch in flight per session
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ledger_mirror_store::MemoryLedger;
//! use ledger_mirror_sync::{MemoryRemote, SyncConfig, SyncSession};
//!
//! async fn example() {
//!     let source = MemoryLedger::builder()
//!         .contents(b"remote history".to_vec())
//!         .build()
//!         .initialize()
//!         .await
//!         .unwrap();
//!     let remote = MemoryRemote::new(Arc::new(source));
//!
//!     let local = MemoryLedger::new().initialize().await.unwrap();
//!     let report = SyncSession::new(&local, &remote, SyncConfig::default())
//!         .run()
//!         .await
//!         .unwrap();
//!     println!("synced to {}", report.final_position);
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Local                                   Remote
//!   |-- FetchRequest(position=F, before) -->|
//!   |<-- FetchResponse(cursor, data) -------|   write at cursor.position, refresh
//!   |-- FetchRequest(position=F', before) ->|
//!   |<-- FetchResponse(more=false) ---------|   done
//! ```

pub mod error;
pub mod messages;
pub mod protocol;
pub mod responder;
pub mod transport;

pub use error::{Result, SyncError};
pub use messages::{limits, FetchReply, FetchRequest, FetchResponse};
pub use protocol::{SyncConfig, SyncReport, SyncSession, DEFAULT_LOOK_BACK_BYTES};
pub use responder::{serve_fetch, verify_history, ResponderConfig};
pub use transport::{
    channel::spawn_responder, channel::ChannelRemote, memory::MemoryRemote, Remote,
};
