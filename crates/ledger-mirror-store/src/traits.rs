//! LedgerStorage trait: the capability interface over ledger bytes.
//!
//! The sync loop and the responder only ever talk to storage through this
//! trait, so they run unchanged against SQLite, memory, or a test double.

use std::sync::Arc;

use async_trait::async_trait;
use ledger_mirror_core::Geometry;

use crate::error::Result;

/// Size of one storage page. Capacity grows in whole pages.
pub const PAGE_SIZE: u64 = 64 * 1024;

/// Round `len` up to a whole number of pages.
pub(crate) fn round_up_to_page(len: u64) -> u64 {
    len.div_ceil(PAGE_SIZE).saturating_mul(PAGE_SIZE)
}

/// Async interface to an append-only ledger's backing bytes.
///
/// # Design Notes
///
/// - **Committed view**: `next_write_position` reflects data as of the last
///   `refresh()`. Bytes written since then are readable but not yet counted.
/// - **Growth**: a write past the current capacity grows the capacity.
/// - **Exclusivity**: callers hold the storage exclusively for the duration of
///   a sync attempt; implementations only guarantee memory safety, not
///   serialization of logically concurrent writers.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Offset where the valid data partition begins.
    async fn data_partition_start(&self) -> Result<u64>;

    /// Physical capacity in bytes.
    async fn storage_capacity(&self) -> Result<u64>;

    /// First free offset as of the last refresh.
    async fn next_write_position(&self) -> Result<u64>;

    /// Read `len` bytes starting at `offset`.
    ///
    /// Unwritten bytes inside capacity read as zero.
    async fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>>;

    /// Write `data` at `offset`, growing capacity if needed.
    async fn write(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Re-derive the committed view so reads and `next_write_position`
    /// observe every completed write.
    async fn refresh(&self) -> Result<()>;
}

#[async_trait]
impl<S: LedgerStorage + ?Sized> LedgerStorage for Arc<S> {
    async fn data_partition_start(&self) -> Result<u64> {
        (**self).data_partition_start().await
    }

    async fn storage_capacity(&self) -> Result<u64> {
        (**self).storage_capacity().await
    }

    async fn next_write_position(&self) -> Result<u64> {
        (**self).next_write_position().await
    }

    async fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        (**self).read(offset, len).await
    }

    async fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        (**self).write(offset, data).await
    }

    async fn refresh(&self) -> Result<()> {
        (**self).refresh().await
    }
}

/// Extension trait for common storage patterns.
pub trait StorageExt: LedgerStorage {
    /// Read the three geometry values in one call.
    fn geometry(&self) -> impl std::future::Future<Output = Result<Geometry>> + Send;

    /// Write and refresh, so the write is immediately part of the committed view.
    fn append_committed(
        &self,
        offset: u64,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

impl<S: LedgerStorage + ?Sized> StorageExt for S {
    async fn geometry(&self) -> Result<Geometry> {
        let data_start = self.data_partition_start().await?;
        let capacity = self.storage_capacity().await?;
        let next_write = self.next_write_position().await?;
        Ok(Geometry::new(data_start, capacity, next_write))
    }

    async fn append_committed(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.write(offset, data).await?;
        self.refresh().await
    }
}
