//! Golden test vectors for the window algorithm and the cursor wire codec.
//!
//! These vectors pin down the exact cursors a responder must produce, so
//! every implementation serving the same ledger answers identically. They
//! serialize to JSON for sharing with other implementations.

use ledger_mirror_core::{next_window, Cursor, Direction};
use serde::{Deserialize, Serialize};

/// One window algorithm case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowVector {
    /// Human-readable name for the vector.
    pub name: String,
    pub data_start: u64,
    pub capacity: u64,
    pub next_write: u64,
    pub requested_start: u64,
    pub max_window_bytes: u64,
    /// The cursor the algorithm must return.
    pub expected: ExpectedWindow,
}

/// Expected output of a [`WindowVector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedWindow {
    pub data_begin_position: u64,
    pub position: u64,
    pub data_end_position: u64,
    pub response_bytes: u64,
    pub more: bool,
}

impl ExpectedWindow {
    /// The caught-up cursor at `frontier`.
    pub const fn caught_up(frontier: u64) -> Self {
        Self {
            data_begin_position: frontier,
            position: frontier,
            data_end_position: frontier,
            response_bytes: 0,
            more: false,
        }
    }

    /// True if `cursor` matches this expectation.
    pub fn matches(&self, cursor: &Cursor) -> bool {
        cursor.data_begin_position == self.data_begin_position
            && cursor.position == self.position
            && cursor.data_end_position == self.data_end_position
            && cursor.response_bytes == self.response_bytes
            && cursor.direction == Direction::Forward
            && cursor.more == self.more
    }
}

impl WindowVector {
    /// Run the window algorithm on this vector's inputs.
    pub fn compute(&self) -> Cursor {
        next_window(
            self.data_start,
            self.capacity,
            self.next_write,
            self.requested_start,
            self.max_window_bytes,
        )
    }
}

fn window(
    name: &str,
    (data_start, capacity, next_write, requested_start, max_window_bytes): (u64, u64, u64, u64, u64),
    expected: ExpectedWindow,
) -> WindowVector {
    WindowVector {
        name: name.to_string(),
        data_start,
        capacity,
        next_write,
        requested_start,
        max_window_bytes,
        expected,
    }
}

/// Get all window vectors.
pub fn all_vectors() -> Vec<WindowVector> {
    vec![
        window(
            "first window inside frontier",
            (0, 2048, 1000, 100, 512),
            ExpectedWindow {
                data_begin_position: 0,
                position: 100,
                data_end_position: 1000,
                response_bytes: 512,
                more: true,
            },
        ),
        window(
            "request before data partition is clamped",
            (100, 2048, 1000, 50, 512),
            ExpectedWindow {
                data_begin_position: 100,
                position: 100,
                data_end_position: 1000,
                response_bytes: 512,
                more: true,
            },
        ),
        window(
            "frontier clamped to capacity",
            (0, 1000, 2000, 100, 512),
            ExpectedWindow {
                data_begin_position: 0,
                position: 100,
                data_end_position: 1000,
                response_bytes: 512,
                more: true,
            },
        ),
        window(
            "final partial window",
            (0, 2048, 600, 100, 1024),
            ExpectedWindow {
                data_begin_position: 0,
                position: 100,
                data_end_position: 600,
                response_bytes: 500,
                more: false,
            },
        ),
        window(
            "window ends exactly at frontier",
            (0, 4096, 1024, 0, 1024),
            ExpectedWindow {
                data_begin_position: 0,
                position: 0,
                data_end_position: 1024,
                response_bytes: 1024,
                more: false,
            },
        ),
        window(
            "request at frontier is caught up",
            (0, 2048, 600, 600, 1024),
            ExpectedWindow::caught_up(600),
        ),
        window(
            "request past frontier is caught up",
            (0, 2048, 600, 900, 1024),
            ExpectedWindow::caught_up(600),
        ),
        window(
            "request past capacity is caught up",
            (0, 1000, 2000, 1500, 512),
            ExpectedWindow::caught_up(1000),
        ),
        window(
            "empty ledger with data partition",
            (4096, 65536, 4096, 0, 1024 * 1024),
            ExpectedWindow::caught_up(4096),
        ),
        window(
            "zero window size is caught up",
            (0, 2048, 1000, 100, 0),
            ExpectedWindow::caught_up(1000),
        ),
    ]
}

/// Verify all window vectors.
///
/// Returns `(name, matches, wire string of the computed cursor)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let cursor = v.compute();
            (v.name.clone(), v.expected.matches(&cursor), cursor.to_wire_string())
        })
        .collect()
}

/// One cursor wire string and the fields it must decode to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireVector {
    pub name: String,
    pub wire: String,
    pub position: u64,
    pub response_bytes: u64,
    pub direction: Direction,
    pub more: bool,
}

impl WireVector {
    /// True if `Cursor::parse` decodes this vector's wire string as expected.
    pub fn verify(&self) -> bool {
        let cursor = Cursor::parse(&self.wire);
        cursor.position == self.position
            && cursor.response_bytes == self.response_bytes
            && cursor.direction == self.direction
            && cursor.more == self.more
            && cursor.data_begin_position == 0
            && cursor.data_end_position == 0
    }
}

fn wire(
    name: &str,
    wire: &str,
    position: u64,
    response_bytes: u64,
    direction: Direction,
    more: bool,
) -> WireVector {
    WireVector {
        name: name.to_string(),
        wire: wire.to_string(),
        position,
        response_bytes,
        direction,
        more,
    }
}

/// Get all cursor wire vectors.
pub fn wire_vectors() -> Vec<WireVector> {
    use Direction::{Backward, Forward};

    vec![
        wire(
            "canonical response",
            "position=4096&response_bytes=512&direction=forward&more=true",
            4096,
            512,
            Forward,
            true,
        ),
        wire("request form", "position=77", 77, 0, Forward, false),
        wire("empty string", "", 0, 0, Forward, false),
        wire(
            "backward direction",
            "direction=backward&position=9",
            9,
            0,
            Backward,
            false,
        ),
        wire(
            "malformed values default",
            "position=abc&response_bytes=-5&direction=sideways&more=yes",
            0,
            0,
            Forward,
            false,
        ),
        wire(
            "unknown keys ignored",
            "foo=bar&position=12&baz&more=true",
            12,
            0,
            Forward,
            true,
        ),
        wire("last duplicate wins", "position=1&position=2", 2, 0, Forward, false),
        wire(
            "largest offset",
            "position=18446744073709551615",
            u64::MAX,
            0,
            Forward,
            false,
        ),
        wire(
            "overflowing offset defaults",
            "position=18446744073709551616",
            0,
            0,
            Forward,
            false,
        ),
    ]
}

/// Render window vectors as pretty JSON.
pub fn to_json(vectors: &[WindowVector]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(vectors)
}

/// Load window vectors from JSON.
pub fn from_json(json: &str) -> serde_json::Result<Vec<WindowVector>> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_window_vectors_pass() {
        for (name, matches, wire) in verify_all_vectors() {
            assert!(matches, "Vector '{}' produced {}", name, wire);
        }
    }

    #[test]
    fn test_all_wire_vectors_pass() {
        for vector in wire_vectors() {
            assert!(vector.verify(), "Wire vector '{}' decoded wrongly", vector.name);
        }
    }

    #[test]
    fn test_vectors_survive_json() {
        let vectors = all_vectors();
        let json = to_json(&vectors).unwrap();
        assert!(json.contains("\"requested_start\""));
        assert_eq!(from_json(&json).unwrap(), vectors);
    }

    #[test]
    fn test_wire_vector_direction_is_lowercase_in_json() {
        let json = serde_json::to_string(&wire_vectors()[3]).unwrap();
        assert!(json.contains("\"direction\":\"backward\""), "{}", json);
    }

    #[test]
    fn test_recomputing_returned_position_is_idempotent() {
        for vector in all_vectors() {
            let first = vector.compute();
            let again = next_window(
                vector.data_start,
                vector.capacity,
                vector.next_write,
                first.position,
                vector.max_window_bytes,
            );
            assert_eq!(first, again, "Vector '{}' not idempotent", vector.name);
        }
    }
}
