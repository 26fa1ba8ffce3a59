//! Remote abstraction for the sync loop.
//!
//! The loop only needs one call: hand a [`FetchRequest`] to the replica and
//! get a [`FetchResponse`] back. Implementations may use HTTP, RPC, or any
//! other transport; two are provided here for in-process use.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::messages::{FetchRequest, FetchResponse};

/// The replica the local ledger is synchronized from.
///
/// Implementations must be thread-safe (Send + Sync). An explicit refusal by
/// the replica is [`SyncError::Remote`](crate::SyncError::Remote); a failed
/// call is [`SyncError::Transport`](crate::SyncError::Transport).
#[async_trait]
pub trait Remote: Send + Sync {
    /// Fetch the window described by `request`.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse>;
}

#[async_trait]
impl<R: Remote + ?Sized> Remote for Arc<R> {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        (**self).fetch(request).await
    }
}

#[async_trait]
impl<R: Remote + ?Sized> Remote for &R {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        (**self).fetch(request).await
    }
}

/// A remote served directly from a ledger in the same process.
///
/// Requests and replies still pass through their CBOR encoding so the
/// serving path matches a byte transport.
pub mod memory {
    use super::*;

    use ledger_mirror_store::{LedgerStorage, Ready};

    use crate::messages::FetchReply;
    use crate::responder::{serve_fetch, ResponderConfig};

    /// In-process remote backed by a shared ledger.
    pub struct MemoryRemote<S> {
        storage: Arc<Ready<S>>,
        config: ResponderConfig,
    }

    impl<S: LedgerStorage> MemoryRemote<S> {
        /// Serve from `storage` with default responder settings.
        pub fn new(storage: Arc<Ready<S>>) -> Self {
            Self::with_config(storage, ResponderConfig::default())
        }

        /// Serve from `storage` with the given responder settings.
        pub fn with_config(storage: Arc<Ready<S>>, config: ResponderConfig) -> Self {
            Self { storage, config }
        }

        /// The ledger being served.
        pub fn storage(&self) -> &Arc<Ready<S>> {
            &self.storage
        }
    }

    #[async_trait]
    impl<S: LedgerStorage> Remote for MemoryRemote<S> {
        async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
            let request = FetchRequest::from_cbor(&request.to_cbor()?)?;
            let reply = FetchReply::from(serve_fetch(&self.storage, &request, &self.config).await);
            FetchReply::from_cbor(&reply.to_cbor()?)?.into_result()
        }
    }
}

/// A remote reached through a tokio task that owns the serving ledger.
pub mod channel {
    use super::*;

    use ledger_mirror_store::{LedgerStorage, Ready};
    use tokio::sync::{mpsc, oneshot};
    use tokio::task::JoinHandle;

    use crate::error::SyncError;
    use crate::messages::FetchReply;
    use crate::responder::{serve_fetch, ResponderConfig};

    /// Requests queued before senders wait on the responder.
    const MAILBOX_CAPACITY: usize = 32;

    /// One CBOR-encoded request and where to send the CBOR-encoded reply.
    struct Envelope {
        request: Vec<u8>,
        reply: oneshot::Sender<Vec<u8>>,
    }

    /// Handle to a responder task. Cheap to clone.
    #[derive(Clone)]
    pub struct ChannelRemote {
        mailbox: mpsc::Sender<Envelope>,
    }

    /// Start a responder task serving `storage`.
    ///
    /// The task runs until every [`ChannelRemote`] handle is dropped, then
    /// hands the ledger back through its join handle.
    pub fn spawn_responder<S>(
        storage: Ready<S>,
        config: ResponderConfig,
    ) -> (ChannelRemote, JoinHandle<Ready<S>>)
    where
        S: LedgerStorage + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Envelope>(MAILBOX_CAPACITY);

        let handle = tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let reply = match FetchRequest::from_cbor(&envelope.request) {
                    Ok(request) => FetchReply::from(serve_fetch(&storage, &request, &config).await),
                    Err(e) => FetchReply::from(Err(e)),
                };

                match reply.to_cbor() {
                    // The requester may have given up; nothing to do then.
                    Ok(bytes) => {
                        let _ = envelope.reply.send(bytes);
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to encode fetch reply"),
                }
            }
            tracing::debug!("responder mailbox closed");
            storage
        });

        (ChannelRemote { mailbox: tx }, handle)
    }

    #[async_trait]
    impl Remote for ChannelRemote {
        async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
            let (reply_tx, reply_rx) = oneshot::channel();
            let envelope = Envelope {
                request: request.to_cbor()?,
                reply: reply_tx,
            };

            self.mailbox
                .send(envelope)
                .await
                .map_err(|_| SyncError::Transport("responder mailbox closed".into()))?;
            let bytes = reply_rx
                .await
                .map_err(|_| SyncError::Transport("responder dropped the request".into()))?;

            FetchReply::from_cbor(&bytes)?.into_result()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::channel::spawn_responder;
    use super::memory::MemoryRemote;
    use super::*;
    use crate::error::SyncError;
    use crate::responder::ResponderConfig;
    use ledger_mirror_store::MemoryLedger;

    async fn served(contents: &[u8]) -> ledger_mirror_store::Ready<MemoryLedger> {
        MemoryLedger::builder()
            .contents(contents.to_vec())
            .build()
            .initialize()
            .await
            .unwrap()
    }

    fn at(position: u64) -> FetchRequest {
        FetchRequest {
            cursor: Some(format!("position={}", position)),
            bytes_before: None,
        }
    }

    #[tokio::test]
    async fn test_memory_remote_fetch() {
        let remote = MemoryRemote::with_config(
            Arc::new(served(b"hello ledger").await),
            ResponderConfig {
                max_window_bytes: 5,
            },
        );

        let response = remote.fetch(at(6)).await.unwrap();
        assert_eq!(&response.data[..], b"ledge");
        assert_eq!(
            response.cursor,
            "position=6&response_bytes=5&direction=forward&more=true"
        );
    }

    #[tokio::test]
    async fn test_memory_remote_forwards_refusal() {
        let remote = MemoryRemote::new(Arc::new(served(b"abcdef").await));
        let request = FetchRequest {
            cursor: Some("position=4".into()),
            bytes_before: Some(bytes::Bytes::from_static(b"XXXX")),
        };

        let err = remote.fetch(request).await.unwrap_err();
        assert!(matches!(err, SyncError::Remote(m) if m.starts_with("history diverged at offset 0")));
    }

    #[tokio::test]
    async fn test_channel_remote_fetch_and_shutdown() {
        let (remote, handle) = spawn_responder(served(b"0123456789").await, ResponderConfig::default());

        let response = remote.fetch(at(3)).await.unwrap();
        assert_eq!(&response.data[..], b"3456789");
        assert!(!response.parsed_cursor().more);

        drop(remote);
        let storage = handle.await.unwrap();
        assert_eq!(storage.committed_bytes().unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn test_channel_remote_closed_mailbox_is_transport_error() {
        let (remote, handle) = spawn_responder(served(b"x").await, ResponderConfig::default());
        handle.abort();
        let _ = handle.await;

        let err = remote.fetch(at(0)).await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
    }

    #[tokio::test]
    async fn test_arc_remote_delegates() {
        let remote: Arc<dyn Remote> = Arc::new(MemoryRemote::new(Arc::new(served(b"ab").await)));
        let response = remote.fetch(FetchRequest::default()).await.unwrap();
        assert_eq!(&response.data[..], b"ab");
    }
}
