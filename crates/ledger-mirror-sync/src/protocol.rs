//! Synchronization loop.
//!
//! Advances the local ledger to the remote frontier one window at a time.
//! Each round asks the remote for the window starting at the local write
//! frontier, checks that the answer does not go backwards, and appends the
//! returned bytes. The loop stops when the remote reports no more data.

use bytes::Bytes;

use ledger_mirror_core::{Cursor, DEFAULT_MAX_WINDOW_BYTES};
use ledger_mirror_store::{LedgerStorage, Ready};

use crate::error::{Result, SyncError};
use crate::messages::FetchRequest;
use crate::transport::Remote;

/// Default number of local bytes sent for the remote's history check.
pub const DEFAULT_LOOK_BACK_BYTES: u64 = 1024;

/// Result of a sync session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Number of fetches made.
    pub rounds: u64,
    /// Number of non-empty windows written locally.
    pub chunks_applied: u64,
    /// Total bytes written locally.
    pub bytes_written: u64,
    /// Local write frontier when the session finished.
    pub final_position: u64,
}

/// Configuration for sync behavior.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Window size used when computing the local cursor.
    pub max_window_bytes: u64,
    /// Bytes preceding the local frontier sent along with each request.
    ///
    /// Nothing is sent while the frontier is at or below this many bytes.
    pub look_back_bytes: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_window_bytes: DEFAULT_MAX_WINDOW_BYTES,
            look_back_bytes: DEFAULT_LOOK_BACK_BYTES,
        }
    }
}

/// One synchronization attempt against a remote.
///
/// The session borrows the storage for its whole lifetime, so nothing else
/// can hand the same `Ready` handle to a second attempt at the same time.
pub struct SyncSession<'a, S, R: ?Sized> {
    storage: &'a Ready<S>,
    remote: &'a R,
    config: SyncConfig,
}

impl<'a, S: LedgerStorage, R: Remote + ?Sized> SyncSession<'a, S, R> {
    /// Create a new sync session.
    pub fn new(storage: &'a Ready<S>, remote: &'a R, config: SyncConfig) -> Self {
        Self {
            storage,
            remote,
            config,
        }
    }

    /// Run rounds until the remote reports no more data.
    ///
    /// Any error aborts the session. Windows applied by earlier rounds stay
    /// committed, so a later session resumes from there.
    pub async fn run(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        loop {
            report.rounds += 1;
            if !self.round(&mut report).await? {
                break;
            }
        }

        report.final_position = self.storage.next_write_position().await?;
        tracing::info!(
            rounds = report.rounds,
            chunks = report.chunks_applied,
            bytes = report.bytes_written,
            position = report.final_position,
            "sync complete"
        );
        Ok(report)
    }

    /// Run one fetch and apply its result. Returns whether the remote has more.
    async fn round(&self, report: &mut SyncReport) -> Result<bool> {
        let local = self.local_cursor().await?;
        let bytes_before = self.bytes_before(local.position).await?;

        let request = FetchRequest::from_cursor(&local, bytes_before);
        let response = self.remote.fetch(request).await?;
        let remote = response.parsed_cursor();

        if remote.position < local.position {
            tracing::warn!(
                local = local.position,
                remote = remote.position,
                "remote went backwards"
            );
            return Err(SyncError::ProtocolViolation {
                local: local.position,
                remote: remote.position,
            });
        }

        tracing::debug!(
            round = report.rounds,
            local = %local,
            remote = %remote,
            bytes = response.data.len(),
            "fetched window"
        );

        if !response.data.is_empty() {
            self.storage.write(remote.position, &response.data).await?;
            self.storage.refresh().await?;
            report.chunks_applied += 1;
            report.bytes_written += response.data.len() as u64;
        }

        Ok(remote.more)
    }

    /// The window the local ledger would serve from its own frontier.
    ///
    /// This is always the caught-up cursor at the local frontier; its
    /// position is what gets requested.
    async fn local_cursor(&self) -> Result<Cursor> {
        let geometry = self.storage.geometry().await?;
        Ok(geometry.resume(self.config.max_window_bytes))
    }

    async fn bytes_before(&self, position: u64) -> Result<Option<Bytes>> {
        let look_back = self.config.look_back_bytes;
        if look_back == 0 || position <= look_back {
            return Ok(None);
        }

        let bytes = self.storage.read(position - look_back, look_back).await?;
        Ok(Some(Bytes::from(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use ledger_mirror_store::{MemoryLedger, StorageExt, Uninitialized};

    use crate::messages::FetchResponse;
    use crate::responder::ResponderConfig;
    use crate::transport::memory::MemoryRemote;

    /// Replies from a fixed script and records every request.
    struct Scripted {
        replies: Mutex<VecDeque<Result<FetchResponse>>>,
        requests: Mutex<Vec<FetchRequest>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<FetchResponse>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::default(),
            }
        }

        fn requests(&self) -> Vec<FetchRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Remote for Scripted {
        async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(SyncError::Transport("script exhausted".into())))
        }
    }

    /// Counts writes and refreshes made after initialization.
    struct Counting {
        inner: MemoryLedger,
        writes: AtomicUsize,
        refreshes: AtomicUsize,
    }

    #[async_trait]
    impl LedgerStorage for Counting {
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
            self.inner.write(offset, data).await
        }

        async fn refresh(&self) -> ledger_mirror_store::Result<()> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            self.inner.refresh().await
        }
    }

    async fn counting(contents: Vec<u8>) -> Ready<Counting> {
        let inner = memory(contents).await.into_inner();
        let ready = Uninitialized::new(Counting {
            inner,
            writes: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
        })
        .initialize()
        .await
        .unwrap();
        ready.refreshes.store(0, Ordering::SeqCst);
        ready
    }

    fn window(cursor: &str, data: &[u8]) -> Result<FetchResponse> {
        Ok(FetchResponse {
            cursor: cursor.to_string(),
            data: Bytes::copy_from_slice(data),
        })
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 256) as u8).collect()
    }

    async fn memory(contents: Vec<u8>) -> Ready<MemoryLedger> {
        MemoryLedger::builder()
            .contents(contents)
            .build()
            .initialize()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_two_chunks_two_writes_two_refreshes() {
        let storage = counting(Vec::new()).await;
        let remote = Scripted::new(vec![
            window("position=0&response_bytes=3&direction=forward&more=true", b"abc"),
            window("position=3&response_bytes=2&direction=forward&more=false", b"de"),
        ]);

        let report = SyncSession::new(&storage, &remote, SyncConfig::default())
            .run()
            .await
            .unwrap();

        let requests = remote.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].cursor.as_deref(), Some("position=0"));
        assert_eq!(requests[1].cursor.as_deref(), Some("position=3"));
        assert!(requests.iter().all(|r| r.bytes_before.is_none()));

        assert_eq!(storage.writes.load(Ordering::SeqCst), 2);
        assert_eq!(storage.refreshes.load(Ordering::SeqCst), 2);
        assert_eq!(storage.inner.committed_bytes().unwrap(), b"abcde");
        assert_eq!(
            report,
            SyncReport {
                rounds: 2,
                chunks_applied: 2,
                bytes_written: 5,
                final_position: 5,
            }
        );
    }

    #[tokio::test]
    async fn test_remote_behind_local_aborts_before_write() {
        let storage = counting(pattern(2000)).await;
        let remote = Scripted::new(vec![window(
            "position=100&response_bytes=10&direction=forward&more=true",
            &[0u8; 10],
        )]);

        let err = SyncSession::new(&storage, &remote, SyncConfig::default())
            .run()
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("2000") && message.contains("100"), "{}", message);
        assert!(matches!(
            err,
            SyncError::ProtocolViolation {
                local: 2000,
                remote: 100
            }
        ));
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
        assert_eq!(storage.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remote_error_propagates_unchanged() {
        let storage = counting(Vec::new()).await;
        let remote = Scripted::new(vec![Err(SyncError::Remote("ledger sealed".into()))]);

        let err = SyncSession::new(&storage, &remote, SyncConfig::default())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Remote(m) if m == "ledger sealed"));
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_far_ahead_remote_position_is_store_error() {
        let storage = memory(Vec::new()).await;
        let remote = Scripted::new(vec![window(
            "position=1125899906842624&response_bytes=1&direction=forward&more=false",
            b"z",
        )]);

        let err = SyncSession::new(&storage, &remote, SyncConfig::default())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Store(ledger_mirror_store::StoreError::CapacityExceeded { .. })
        ));
        assert_eq!(storage.next_write_position().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_error_mid_session_keeps_applied_windows() {
        let storage = counting(Vec::new()).await;
        let remote = Scripted::new(vec![
            window("position=0&response_bytes=4&direction=forward&more=true", b"keep"),
            Err(SyncError::Transport("connection reset".into())),
        ]);

        let err = SyncSession::new(&storage, &remote, SyncConfig::default())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Transport(_)));
        assert_eq!(storage.inner.committed_bytes().unwrap(), b"keep");
    }

    #[tokio::test]
    async fn test_caught_up_remote_writes_nothing() {
        let storage = counting(b"already".to_vec()).await;
        let remote = Scripted::new(vec![window(
            "position=7&response_bytes=0&direction=forward&more=false",
            b"",
        )]);

        let report = SyncSession::new(&storage, &remote, SyncConfig::default())
            .run()
            .await
            .unwrap();

        assert_eq!(report.rounds, 1);
        assert_eq!(report.chunks_applied, 0);
        assert_eq!(report.final_position, 7);
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
        assert_eq!(storage.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_look_back_sends_preceding_bytes() {
        let data = pattern(2000);
        let storage = counting(data.clone()).await;
        let remote = Scripted::new(vec![window(
            "position=2000&response_bytes=0&direction=forward&more=false",
            b"",
        )]);

        SyncSession::new(&storage, &remote, SyncConfig::default())
            .run()
            .await
            .unwrap();

        let sent = remote.requests()[0].bytes_before.clone().unwrap();
        assert_eq!(&sent[..], &data[2000 - 1024..]);
    }

    #[tokio::test]
    async fn test_look_back_skipped_at_threshold() {
        let storage = counting(pattern(1024)).await;
        let remote = Scripted::new(vec![window(
            "position=1024&response_bytes=0&direction=forward&more=false",
            b"",
        )]);

        SyncSession::new(&storage, &remote, SyncConfig::default())
            .run()
            .await
            .unwrap();

        assert!(remote.requests()[0].bytes_before.is_none());
    }

    #[tokio::test]
    async fn test_sync_from_memory_remote_in_windows() {
        let data = pattern(4500);
        let remote = MemoryRemote::with_config(
            Arc::new(memory(data.clone()).await),
            ResponderConfig {
                max_window_bytes: 1000,
            },
        );
        let local = memory(Vec::new()).await;

        let report = SyncSession::new(&local, &remote, SyncConfig::default())
            .run()
            .await
            .unwrap();

        assert_eq!(report.rounds, 5);
        assert_eq!(report.chunks_applied, 5);
        assert_eq!(report.bytes_written, 4500);
        assert_eq!(local.committed_bytes().unwrap(), data);

        // A second session finds nothing new.
        let again = SyncSession::new(&local, &remote, SyncConfig::default())
            .run()
            .await
            .unwrap();
        assert_eq!(again.rounds, 1);
        assert_eq!(again.chunks_applied, 0);
        assert_eq!(again.final_position, 4500);
    }

    #[tokio::test]
    async fn test_sync_picks_up_remote_growth() {
        let source = Arc::new(memory(pattern(3000)).await);
        let remote = MemoryRemote::new(Arc::clone(&source));
        let local = memory(Vec::new()).await;

        SyncSession::new(&local, &remote, SyncConfig::default())
            .run()
            .await
            .unwrap();

        let more = pattern(500);
        source.append_committed(3000, &more).await.unwrap();

        let report = SyncSession::new(&local, &remote, SyncConfig::default())
            .run()
            .await
            .unwrap();
        assert_eq!(report.bytes_written, 500);
        assert_eq!(local.committed_bytes().unwrap(), source.committed_bytes().unwrap());
    }

    #[tokio::test]
    async fn test_sync_rejects_diverged_local_history() {
        let mut forked = pattern(3000);
        forked[2500] ^= 0x55;

        let remote = MemoryRemote::new(Arc::new(memory(pattern(6000)).await));
        let local = memory(forked).await;

        let err = SyncSession::new(&local, &remote, SyncConfig::default())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Remote(m) if m.contains("offset 2500")));
        assert_eq!(local.next_write_position().await.unwrap(), 3000);
    }

    #[tokio::test]
    async fn test_local_ahead_of_remote_is_violation() {
        let remote = MemoryRemote::new(Arc::new(memory(pattern(100)).await));
        let local = memory(pattern(500)).await;

        let err = SyncSession::new(&local, &remote, SyncConfig::default())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::ProtocolViolation {
                local: 500,
                remote: 100
            }
        ));
    }

    #[tokio::test]
    async fn test_sync_respects_data_partition() {
        let source = MemoryLedger::builder()
            .data_start(4096)
            .contents(pattern(2048))
            .build()
            .initialize()
            .await
            .unwrap();
        let remote = MemoryRemote::new(Arc::new(source));
        let local = MemoryLedger::builder()
            .data_start(4096)
            .build()
            .initialize()
            .await
            .unwrap();

        let report = SyncSession::new(&local, &remote, SyncConfig::default())
            .run()
            .await
            .unwrap();

        assert_eq!(report.final_position, 4096 + 2048);
        assert_eq!(local.committed_bytes().unwrap(), pattern(2048));
    }
}
