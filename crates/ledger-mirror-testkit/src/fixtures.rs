//! Test fixtures and helpers.
//!
//! Common setup code for sync and integration tests: a remote that replays a
//! script, a storage wrapper that counts side effects, and shortcuts for
//! building ledgers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use ledger_mirror_core::Cursor;
use ledger_mirror_store::{LedgerStorage, MemoryLedger, Ready, Uninitialized};
use ledger_mirror_sync::{FetchRequest, FetchResponse, Remote, SyncError};

/// Deterministic ledger bytes: `len` bytes of a repeating pattern.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// An initialized in-memory ledger holding `contents` at `data_start`.
pub async fn memory_ledger(data_start: u64, contents: Vec<u8>) -> Ready<MemoryLedger> {
    MemoryLedger::builder()
        .data_start(data_start)
        .contents(contents)
        .build()
        .initialize()
        .await
        .unwrap_or_else(|e| panic!("memory ledger failed to initialize: {}", e))
}

/// A response carrying `data` described by `cursor`.
pub fn window_reply(cursor: &Cursor, data: &[u8]) -> Result<FetchResponse, SyncError> {
    Ok(FetchResponse {
        cursor: cursor.to_wire_string(),
        data: Bytes::copy_from_slice(data),
    })
}

/// A remote that answers from a fixed list of replies.
///
/// Every request is recorded. Once the script runs out each further fetch
/// fails with a transport error.
#[derive(Default)]
pub struct ScriptedRemote {
    replies: Mutex<VecDeque<Result<FetchResponse, SyncError>>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl ScriptedRemote {
    /// Create a remote replaying `replies` in order.
    pub fn new(replies: impl IntoIterator<Item = Result<FetchResponse, SyncError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of fetches made so far.
    pub fn fetch_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl Remote for ScriptedRemote {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, SyncError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::Transport("script exhausted".into())))
    }
}

/// Wraps a storage backend and counts writes and refreshes.
///
/// Counting starts once the wrapper is initialized, so the refresh done by
/// [`Uninitialized::initialize`] is not included.
pub struct RecordingStorage<S> {
    inner: S,
    writes: AtomicUsize,
    refreshes: AtomicUsize,
    write_offsets: Mutex<Vec<u64>>,
}

impl<S: LedgerStorage> RecordingStorage<S> {
    /// Wrap `inner` and initialize the wrapper.
    pub async fn wrap(inner: S) -> ledger_mirror_store::Result<Ready<Self>> {
        let ready = Uninitialized::new(Self {
            inner,
            writes: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            write_offsets: Mutex::default(),
        })
        .initialize()
        .await?;
        ready.refreshes.store(0, Ordering::SeqCst);
        Ok(ready)
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Writes made since initialization.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Refreshes made since initialization.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Offsets of every write, in order.
    pub fn write_offsets(&self) -> Vec<u64> {
        self.write_offsets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl<S: LedgerStorage> LedgerStorage for RecordingStorage<S> {
    async fn data_partition_start(&self) -> ledger_mirror_store::Result<u64> {
        self.inner.data_partition_start().await
    }

    async fn storage_capacity(&self) -> ledger_mirror_store::Result<u64> {
        self.inner.storage_capacity().await
    }

    async fn next_write_position(&self) -> ledger_mirror_store::Result<u64> {
        self.inner.next_write_position().await
    }

    async fn read(&self, offset: u64, len: u64) -> ledger_mirror_store::Result<Vec<u8>> {
        self.inner.read(offset, len).await
    }

    async fn write(&self, offset: u64, data: &[u8]) -> ledger_mirror_store::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.write_offsets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(offset);
        self.inner.write(offset, data).await
    }

    async fn refresh(&self) -> ledger_mirror_store::Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.inner.refresh().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_mirror_core::Direction;

    #[tokio::test]
    async fn test_scripted_remote_replays_then_fails() {
        let remote = ScriptedRemote::new([window_reply(&Cursor::caught_up(5), b"")]);

        let first = remote.fetch(FetchRequest::default()).await.unwrap();
        assert!(first.parsed_cursor().is_caught_up());

        let second = remote.fetch(FetchRequest::default()).await;
        assert!(matches!(second, Err(SyncError::Transport(_))));
        assert_eq!(remote.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_recording_storage_counts_after_initialize() {
        let inner = memory_ledger(0, Vec::new()).await.into_inner();
        let storage = RecordingStorage::wrap(inner).await.unwrap();
        assert_eq!(storage.refresh_count(), 0);

        storage.write(0, b"ab").await.unwrap();
        storage.write(2, b"cd").await.unwrap();
        storage.refresh().await.unwrap();

        assert_eq!(storage.write_count(), 2);
        assert_eq!(storage.refresh_count(), 1);
        assert_eq!(storage.write_offsets(), vec![0, 2]);
        assert_eq!(storage.inner().committed_bytes().unwrap(), b"abcd");
    }

    #[test]
    fn test_window_reply_renders_cursor() {
        let cursor = Cursor {
            data_begin_position: 0,
            position: 8,
            data_end_position: 20,
            response_bytes: 4,
            direction: Direction::Forward,
            more: true,
        };
        let reply = window_reply(&cursor, b"wxyz").unwrap();
        assert_eq!(
            reply.cursor,
            "position=8&response_bytes=4&direction=forward&more=true"
        );
    }

    #[test]
    fn test_pattern_is_deterministic() {
        assert_eq!(pattern(300), pattern(300));
        assert_eq!(pattern(300)[251], 0);
    }
}
