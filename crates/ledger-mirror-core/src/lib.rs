//! # Ledger Mirror Core
//!
//! Pure primitives for mirroring an append-only ledger: cursors and the
//! window algorithm.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over byte offsets.
//!
//! ## Key Types
//!
//! - [`Cursor`] - A window descriptor with its query-string wire codec
//! - [`Direction`] - Traversal direction of a cursor
//! - [`Geometry`] - A snapshot of storage bounds
//! - [`next_window`] - Compute the next window to request
//!
//! ## Example
//!
//! ```rust
//! use ledger_mirror_core::{next_window, Cursor};
//!
//! let cursor = next_window(0, 2048, 1000, 100, 512);
//! assert_eq!(cursor.response_bytes, 512);
//! assert!(cursor.more);
//!
//! let decoded = Cursor::parse(&cursor.to_wire_string());
//! assert!(decoded.wire_eq(&cursor));
//! ```

pub mod cursor;
pub mod window;

pub use cursor::{Cursor, Direction, UnknownDirection};
pub use window::{next_window, Geometry, DEFAULT_MAX_WINDOW_BYTES};
