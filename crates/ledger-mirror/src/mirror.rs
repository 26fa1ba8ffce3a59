//! The Mirror: one local ledger kept in step with one remote.
//!
//! A Mirror owns a ready ledger and the remote it follows. It runs sync
//! attempts under an optional deadline and can serve its own data to
//! downstream mirrors.

use std::time::Duration;

use async_trait::async_trait;

use ledger_mirror_core::Cursor;
use ledger_mirror_store::{LedgerStorage, Ready};
use ledger_mirror_sync::{
    serve_fetch, FetchRequest, FetchResponse, Remote, ResponderConfig, SyncConfig, SyncError,
    SyncReport, SyncSession,
};

use crate::error::{MirrorError, Result};

/// Configuration for the Mirror.
#[derive(Debug, Clone, Default)]
pub struct MirrorConfig {
    /// Sync loop configuration.
    pub sync: SyncConfig,
    /// How this mirror serves its own data.
    pub responder: ResponderConfig,
    /// Upper bound on a whole sync attempt. `None` waits indefinitely.
    pub deadline: Option<Duration>,
}

/// The main Mirror struct.
///
/// Provides a unified API for:
/// - Synchronizing the local ledger from the remote
/// - Inspecting the local frontier
/// - Serving fetches from the local ledger
pub struct Mirror<S, R> {
    /// The local ledger.
    storage: Ready<S>,
    /// The replica being followed.
    remote: R,
    /// Configuration.
    config: MirrorConfig,
}

impl<S: LedgerStorage, R: Remote> Mirror<S, R> {
    /// Create a new mirror.
    pub fn new(storage: Ready<S>, remote: R, config: MirrorConfig) -> Self {
        Self {
            storage,
            remote,
            config,
        }
    }

    /// Get the local ledger.
    pub fn storage(&self) -> &Ready<S> {
        &self.storage
    }

    /// Get the remote.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Get the configuration.
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Take the mirror apart.
    pub fn into_parts(self) -> (Ready<S>, R) {
        (self.storage, self.remote)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sync Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Run one synchronization attempt.
    ///
    /// Takes `&mut self` so no two attempts share the ledger. If a deadline
    /// is configured the attempt is dropped when it expires; windows applied
    /// up to then stay committed.
    pub async fn sync(&mut self) -> Result<SyncReport> {
        let session = SyncSession::new(&self.storage, &self.remote, self.config.sync.clone());

        let report = match self.config.deadline {
            Some(deadline) => tokio::time::timeout(deadline, session.run())
                .await
                .map_err(|_| {
                    tracing::warn!(?deadline, "sync deadline exceeded");
                    MirrorError::DeadlineExceeded(deadline)
                })??,
            None => session.run().await?,
        };

        Ok(report)
    }

    /// The caught-up cursor at the local frontier.
    pub async fn frontier(&self) -> Result<Cursor> {
        let geometry = self.storage.geometry().await?;
        Ok(geometry.resume(self.config.sync.max_window_bytes))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Serving
    // ─────────────────────────────────────────────────────────────────────────

    /// Answer a fetch from this mirror's local ledger.
    pub async fn serve(&self, request: &FetchRequest) -> Result<FetchResponse> {
        Ok(serve_fetch(&self.storage, request, &self.config.responder).await?)
    }
}

/// A mirror is itself a remote, so mirrors can be chained.
#[async_trait]
impl<S: LedgerStorage, R: Remote> Remote for Mirror<S, R> {
    async fn fetch(&self, request: FetchRequest) -> std::result::Result<FetchResponse, SyncError> {
        serve_fetch(&self.storage, &request, &self.config.responder).await
    }
}
