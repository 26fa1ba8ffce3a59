//! Two-state storage handle.
//!
//! Backends are handed out as [`Uninitialized`]. The only way to reach the
//! storage operations is [`Uninitialized::initialize`], which loads the
//! committed view and yields a [`Ready`] handle. Everything that touches
//! ledger bytes (the sync loop, the responder) takes a `Ready`.

use std::ops::Deref;

use ledger_mirror_core::Geometry;

use crate::error::Result;
use crate::traits::{LedgerStorage, StorageExt};

/// Storage that has not yet loaded its committed view.
#[derive(Debug)]
pub struct Uninitialized<S> {
    storage: S,
}

impl<S: LedgerStorage> Uninitialized<S> {
    /// Wrap a backend that still needs initialization.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Load the committed view and unlock the storage operations.
    pub async fn initialize(self) -> Result<Ready<S>> {
        self.storage.refresh().await?;
        let geometry = self.storage.geometry().await?;
        tracing::debug!(
            data_start = geometry.data_start,
            capacity = geometry.capacity,
            next_write = geometry.next_write,
            "storage initialized"
        );
        Ok(Ready {
            storage: self.storage,
        })
    }
}

/// Storage whose committed view has been loaded.
#[derive(Debug)]
pub struct Ready<S> {
    storage: S,
}

impl<S: LedgerStorage> Ready<S> {
    /// Current storage geometry.
    pub async fn geometry(&self) -> Result<Geometry> {
        self.storage.geometry().await
    }

    /// Give up the handle and return the backend.
    pub fn into_inner(self) -> S {
        self.storage
    }
}

impl<S> Deref for Ready<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLedger;

    #[tokio::test]
    async fn test_initialize_loads_committed_view() {
        let ready = MemoryLedger::builder()
            .data_start(100)
            .contents(b"hello".to_vec())
            .build()
            .initialize()
            .await
            .unwrap();

        let geometry = ready.geometry().await.unwrap();
        assert_eq!(geometry.data_start, 100);
        assert_eq!(geometry.next_write, 105);
        assert_eq!(ready.read(100, 5).await.unwrap(), b"hello");
    }
}
