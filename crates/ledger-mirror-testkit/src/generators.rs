//! Proptest generators for property-based testing.

use proptest::prelude::*;

use ledger_mirror_core::{Cursor, Direction, Geometry};

/// Generate a Direction.
pub fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Forward), Just(Direction::Backward)]
}

/// Generate a cursor with only the wire-visible fields set.
pub fn wire_cursor() -> impl Strategy<Value = Cursor> {
    (any::<u64>(), any::<u64>(), direction(), any::<bool>()).prop_map(
        |(position, response_bytes, direction, more)| Cursor {
            data_begin_position: 0,
            position,
            data_end_position: 0,
            response_bytes,
            direction,
            more,
        },
    )
}

/// Generate an arbitrary cursor, local-only fields included.
pub fn cursor() -> impl Strategy<Value = Cursor> {
    (wire_cursor(), any::<u64>(), any::<u64>()).prop_map(|(mut cursor, begin, end)| {
        cursor.data_begin_position = begin;
        cursor.data_end_position = end;
        cursor
    })
}

/// Generate a storage geometry.
///
/// `next_write` never falls below `data_start`. Capacity is sometimes
/// smaller than `next_write` so frontier clamping gets exercised.
pub fn geometry() -> impl Strategy<Value = Geometry> {
    (0u64..1 << 20, 0u64..1 << 20, 0u64..1 << 21).prop_map(|(data_start, len, capacity)| {
        Geometry::new(data_start, capacity, data_start + len)
    })
}

/// Generate a window size, zero included.
pub fn max_window_bytes() -> impl Strategy<Value = u64> {
    prop_oneof![Just(0u64), 1u64..1 << 16, Just(1024 * 1024)]
}

/// Generate a query string mixing cursor keys, junk keys and junk values.
pub fn query_string() -> impl Strategy<Value = String> {
    let key = prop_oneof![
        Just("position".to_string()),
        Just("response_bytes".to_string()),
        Just("direction".to_string()),
        Just("more".to_string()),
        "[a-z_]{0,12}",
    ];
    let value = prop_oneof![
        any::<u64>().prop_map(|v| v.to_string()),
        Just("forward".to_string()),
        Just("backward".to_string()),
        Just("true".to_string()),
        Just("false".to_string()),
        "[^&]{0,24}",
    ];
    prop::collection::vec((key, value, any::<bool>()), 0..8).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(k, v, with_value)| if with_value { format!("{}={}", k, v) } else { k })
            .collect::<Vec<_>>()
            .join("&")
    })
}

/// Generate ledger bytes of at most `max_len`.
pub fn ledger_contents(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// A local ledger that holds a prefix of a remote ledger.
#[derive(Debug, Clone)]
pub struct MirrorScenario {
    /// Data partition start shared by both ledgers.
    pub data_start: u64,
    /// Everything the remote holds.
    pub remote_contents: Vec<u8>,
    /// How many of those bytes the local ledger already holds.
    pub local_prefix_len: usize,
    /// Responder window size.
    pub window_bytes: u64,
}

impl MirrorScenario {
    /// The bytes the local ledger starts with.
    pub fn local_contents(&self) -> Vec<u8> {
        self.remote_contents[..self.local_prefix_len].to_vec()
    }
}

impl Arbitrary for MirrorScenario {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (0u64..8192, ledger_contents(16 * 1024), any::<prop::sample::Index>(), 1u64..4096)
            .prop_map(|(data_start, remote_contents, prefix, window_bytes)| {
                let local_prefix_len = prefix.index(remote_contents.len() + 1);
                MirrorScenario {
                    data_start,
                    remote_contents,
                    local_prefix_len,
                    window_bytes,
                }
            })
            .boxed()
    }
}
