//! # Ledger Mirror Testkit
//!
//! Testing utilities for ledger mirroring.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known window and cursor cases with expected outputs
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A scripted remote, a side-effect counting storage wrapper
//!   and ledger shortcuts
//!
//! ## Golden Vectors
//!
//! Golden vectors pin the window algorithm across implementations:
//!
//! ```rust
//! use ledger_mirror_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, wire) in verify_all_vectors() {
//!     assert!(matches, "{}: {}", name, wire);
//! }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use ledger_mirror_testkit::generators::{geometry, max_window_bytes};
//!
//! proptest! {
//!     #[test]
//!     fn window_is_idempotent(g in geometry(), max in max_window_bytes()) {
//!         let first = g.window(0, max);
//!         prop_assert_eq!(g.window(first.position, max), first);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! Drive the sync loop against a script:
//!
//! ```rust,ignore
//! use ledger_mirror_core::Cursor;
//! use ledger_mirror_testkit::fixtures::{window_reply, ScriptedRemote};
//!
//! let remote = ScriptedRemote::new([window_reply(&Cursor::caught_up(0), b"")]);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{memory_ledger, pattern, window_reply, RecordingStorage, ScriptedRemote};
pub use generators::MirrorScenario;
pub use vectors::{all_vectors, verify_all_vectors, wire_vectors, WindowVector, WireVector};
