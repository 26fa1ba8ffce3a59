//! Serving side of the fetch protocol.
//!
//! A responder answers [`FetchRequest`]s from its own ledger: it computes the
//! window starting at the requested position, checks that the requester's
//! preceding bytes agree with its own history, and returns the window with
//! its cursor attached.

use bytes::Bytes;

use ledger_mirror_core::DEFAULT_MAX_WINDOW_BYTES;
use ledger_mirror_store::{LedgerStorage, Ready};

use crate::error::{Result, SyncError};
use crate::messages::{limits, FetchRequest, FetchResponse};

/// Bytes of context shown on each side of a divergence.
const DIVERGENCE_CONTEXT: usize = 8;

/// Configuration for serving fetches.
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Maximum bytes served per request.
    pub max_window_bytes: u64,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            max_window_bytes: DEFAULT_MAX_WINDOW_BYTES,
        }
    }
}

/// Answer one fetch request from `storage`.
///
/// A request without a cursor is served from the start of the data
/// partition. A request past this ledger's frontier gets the caught-up
/// cursor parked at the frontier.
pub async fn serve_fetch<S: LedgerStorage>(
    storage: &Ready<S>,
    request: &FetchRequest,
    config: &ResponderConfig,
) -> Result<FetchResponse> {
    request
        .validate_limits()
        .map_err(|reason| SyncError::Remote(reason.to_string()))?;

    let geometry = storage.geometry().await?;
    let requested = request
        .requested_position()
        .unwrap_or(geometry.data_start);

    if let Some(bytes_before) = &request.bytes_before {
        verify_history(storage, requested, bytes_before).await?;
    }

    let max_window_bytes = config.max_window_bytes.min(limits::MAX_RESPONSE_BYTES);
    let cursor = geometry.window(requested, max_window_bytes);

    let data = if cursor.response_bytes > 0 {
        Bytes::from(storage.read(cursor.position, cursor.response_bytes).await?)
    } else {
        Bytes::new()
    };

    tracing::debug!(
        requested,
        position = cursor.position,
        response_bytes = cursor.response_bytes,
        more = cursor.more,
        "serving fetch"
    );

    Ok(FetchResponse {
        cursor: cursor.to_wire_string(),
        data,
    })
}

/// Check that `bytes_before`, which a requester holds immediately before
/// `position`, matches this ledger's history.
///
/// Only the part of the range inside this ledger's committed data
/// `[data_start, frontier)` is compared; outside it there is nothing to
/// disagree with.
pub async fn verify_history<S: LedgerStorage>(
    storage: &Ready<S>,
    position: u64,
    bytes_before: &[u8],
) -> Result<()> {
    let geometry = storage.geometry().await?;
    let claimed_start = position.saturating_sub(bytes_before.len() as u64);

    let start = claimed_start.max(geometry.data_start);
    let end = position.min(geometry.frontier());
    if start >= end {
        return Ok(());
    }

    let ours = storage.read(start, end - start).await?;
    let skip = (start - claimed_start) as usize;
    let theirs = &bytes_before[skip..skip + ours.len()];

    match ours.iter().zip(theirs).position(|(a, b)| a != b) {
        None => Ok(()),
        Some(index) => {
            let offset = start + index as u64;
            let context = index..(index + DIVERGENCE_CONTEXT).min(ours.len());
            tracing::warn!(offset, position, "requester history diverges");
            Err(SyncError::Remote(format!(
                "history diverged at offset {}: requester={} responder={}",
                offset,
                hex::encode(&theirs[context.clone()]),
                hex::encode(&ours[context]),
            )))
        }
    }
}
