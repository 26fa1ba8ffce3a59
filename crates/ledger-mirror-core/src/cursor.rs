//! Cursor: a window descriptor over the ledger byte sequence.
//!
//! A cursor names a byte range (`position .. position + response_bytes`)
//! together with the valid-data bounds it was computed against and whether
//! more data follows the window.
//!
//! ## Wire format
//!
//! Cursors travel as ASCII query strings:
//!
//! ```text
//! position=4096&response_bytes=512&direction=forward&more=true
//! ```
//!
//! Only `position`, `response_bytes`, `direction` and `more` cross the wire.
//! `data_begin_position` and `data_end_position` are local bookkeeping and
//! always decode as zero.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Traversal direction of a cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards higher offsets.
    #[default]
    Forward,
    /// Towards lower offsets.
    Backward,
}

impl Direction {
    /// The wire token for this direction.
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a direction token is outside the wire vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDirection(pub String);

impl fmt::Display for UnknownDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown direction: {:?}", self.0)
    }
}

impl std::error::Error for UnknownDirection {}

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(Direction::Forward),
            "backward" => Ok(Direction::Backward),
            other => Err(UnknownDirection(other.to_string())),
        }
    }
}

/// Wire keys.
mod keys {
    pub const POSITION: &str = "position";
    pub const RESPONSE_BYTES: &str = "response_bytes";
    pub const DIRECTION: &str = "direction";
    pub const MORE: &str = "more";
}

/// One pagination window over the ledger.
///
/// Cursors are plain values: every step of a sync produces a new cursor
/// rather than mutating the previous one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    /// Offset where the valid data partition begins.
    pub data_begin_position: u64,
    /// Start offset of this window.
    pub position: u64,
    /// Offset one past the last byte known to exist (the write frontier).
    pub data_end_position: u64,
    /// Number of bytes spanned by this window.
    pub response_bytes: u64,
    /// Traversal direction.
    pub direction: Direction,
    /// True iff data exists beyond `position + response_bytes`.
    pub more: bool,
}

impl Cursor {
    /// The degenerate "nothing new to fetch" cursor parked at `frontier`.
    pub const fn caught_up(frontier: u64) -> Self {
        Self {
            data_begin_position: frontier,
            position: frontier,
            data_end_position: frontier,
            response_bytes: 0,
            direction: Direction::Forward,
            more: false,
        }
    }

    /// Decode a cursor from its wire string.
    ///
    /// Never fails: missing or malformed fields take their defaults
    /// (`0`, `0`, [`Direction::Forward`], `false`) and unknown keys are
    /// ignored. When a key repeats, the last occurrence wins.
    pub fn parse(wire: &str) -> Self {
        let mut cursor = Cursor::default();

        for pair in wire.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                keys::POSITION => cursor.position = value.parse().unwrap_or_default(),
                keys::RESPONSE_BYTES => {
                    cursor.response_bytes = value.parse().unwrap_or_default()
                }
                keys::DIRECTION => cursor.direction = value.parse().unwrap_or_default(),
                keys::MORE => cursor.more = value.parse().unwrap_or_default(),
                _ => {}
            }
        }

        cursor
    }

    /// The request form: only the position the responder needs.
    pub fn to_request_string(&self) -> String {
        format!("{}={}", keys::POSITION, self.position)
    }

    /// The full response descriptor a responder attaches to its payload.
    pub fn to_wire_string(&self) -> String {
        format!(
            "{}={}&{}={}&{}={}&{}={}",
            keys::POSITION,
            self.position,
            keys::RESPONSE_BYTES,
            self.response_bytes,
            keys::DIRECTION,
            self.direction,
            keys::MORE,
            self.more
        )
    }

    /// Offset one past the last byte of this window.
    pub const fn end_position(&self) -> u64 {
        self.position.saturating_add(self.response_bytes)
    }

    /// True for the degenerate cursor: empty window and nothing after it.
    pub const fn is_caught_up(&self) -> bool {
        self.response_bytes == 0 && !self.more
    }

    /// True if the wire-visible fields of both cursors agree.
    pub fn wire_eq(&self, other: &Cursor) -> bool {
        self.position == other.position
            && self.response_bytes == other.response_bytes
            && self.direction == other.direction
            && self.more == other.more
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire_string())
    }
}
