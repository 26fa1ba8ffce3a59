//! Window algorithm: which byte range to request next.
//!
//! Given a snapshot of storage geometry and a requested start offset, compute
//! the cursor describing the next window. The function is total: every input
//! produces a cursor, and degenerate inputs produce the caught-up cursor.
//!
//! Algorithm:
//! 1. `start = max(data_start, requested_start)`
//! 2. `frontier = min(next_write, capacity)`
//! 3. `end = min(start + max_window_bytes, frontier)`
//! 4. `start >= capacity || start >= end` → caught up at `frontier`
//! 5. otherwise the window `[start, end)` with `more = end < frontier`

use serde::{Deserialize, Serialize};

use crate::cursor::{Cursor, Direction};

/// Default upper bound on a single window (1 MiB).
pub const DEFAULT_MAX_WINDOW_BYTES: u64 = 1024 * 1024;

/// Compute the next cursor to request.
///
/// - `data_start`: begin of the valid data partition.
/// - `capacity`: physical capacity of the storage.
/// - `next_write`: first free offset (end of valid data).
/// - `requested_start`: caller's desired window start.
/// - `max_window_bytes`: upper bound on `response_bytes`.
pub fn next_window(
    data_start: u64,
    capacity: u64,
    next_write: u64,
    requested_start: u64,
    max_window_bytes: u64,
) -> Cursor {
    let start = data_start.max(requested_start);
    let frontier = next_write.min(capacity);
    let end = start.saturating_add(max_window_bytes).min(frontier);

    if start >= capacity || start >= end {
        return Cursor::caught_up(frontier);
    }

    Cursor {
        data_begin_position: data_start,
        position: start,
        data_end_position: frontier,
        response_bytes: end - start,
        direction: Direction::Forward,
        more: end < frontier,
    }
}

/// A snapshot of storage geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    /// Begin of the valid data partition.
    pub data_start: u64,
    /// Physical capacity in bytes.
    pub capacity: u64,
    /// First free offset.
    pub next_write: u64,
}

impl Geometry {
    /// Create a geometry snapshot.
    pub const fn new(data_start: u64, capacity: u64, next_write: u64) -> Self {
        Self {
            data_start,
            capacity,
            next_write,
        }
    }

    /// The write frontier, clamped to capacity.
    pub fn frontier(&self) -> u64 {
        self.next_write.min(self.capacity)
    }

    /// The window starting at `requested_start`.
    pub fn window(&self, requested_start: u64, max_window_bytes: u64) -> Cursor {
        next_window(
            self.data_start,
            self.capacity,
            self.next_write,
            requested_start,
            max_window_bytes,
        )
    }

    /// The window resuming at the local write frontier.
    ///
    /// This is always the caught-up cursor; its `position` is what a
    /// replica asks its remote for.
    pub fn resume(&self, max_window_bytes: u64) -> Cursor {
        self.window(self.next_write, max_window_bytes)
    }
}
