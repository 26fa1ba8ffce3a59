//! In-memory implementation of the LedgerStorage trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::{Result, StoreError};
use crate::handle::Uninitialized;
use crate::traits::{round_up_to_page, LedgerStorage};

/// In-memory ledger storage.
///
/// All data is lost when the ledger is dropped. Thread-safe via RwLock.
#[derive(Debug)]
pub struct MemoryLedger {
    inner: RwLock<MemoryLedgerInner>,
}

#[derive(Debug)]
struct MemoryLedgerInner {
    /// Bytes from `data_start` up to the highest write. Anything past the
    /// end, up to `capacity`, reads as zero.
    buf: Vec<u8>,

    /// Begin of the valid data partition.
    data_start: u64,

    /// Reported storage capacity. Grows in pages.
    capacity: u64,

    /// One past the highest byte written so far.
    written_end: u64,

    /// `next_write_position` as of the last refresh.
    committed_end: u64,
}

/// Builder for [`MemoryLedger`].
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerBuilder {
    data_start: u64,
    capacity: u64,
    contents: Vec<u8>,
}

impl MemoryLedgerBuilder {
    /// Offset of the data partition.
    pub fn data_start(mut self, data_start: u64) -> Self {
        self.data_start = data_start;
        self
    }

    /// Initial capacity in bytes. Raised as needed to fit the contents.
    pub fn capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Bytes already present at the start of the data partition.
    pub fn contents(mut self, contents: Vec<u8>) -> Self {
        self.contents = contents;
        self
    }

    /// Build the ledger. It must be initialized before use.
    pub fn build(self) -> Uninitialized<MemoryLedger> {
        let contents_end = self.data_start.saturating_add(self.contents.len() as u64);
        let capacity = if contents_end > self.capacity {
            round_up_to_page(contents_end)
        } else {
            self.capacity
        };

        let written_end = if self.contents.is_empty() {
            0
        } else {
            contents_end
        };

        Uninitialized::new(MemoryLedger {
            inner: RwLock::new(MemoryLedgerInner {
                buf: self.contents,
                data_start: self.data_start,
                capacity,
                written_end,
                committed_end: 0,
            }),
        })
    }
}

impl MemoryLedger {
    /// Start building an in-memory ledger.
    pub fn builder() -> MemoryLedgerBuilder {
        MemoryLedgerBuilder::default()
    }

    /// An empty ledger with the data partition at offset 0.
    pub fn new() -> Uninitialized<MemoryLedger> {
        Self::builder().build()
    }

    /// The committed bytes of the data partition.
    pub fn committed_bytes(&self) -> Result<Vec<u8>> {
        let inner = self.read_inner()?;
        let committed = inner.committed_end.saturating_sub(inner.data_start);
        let len = usize::try_from(committed).map_or(inner.buf.len(), |n| n.min(inner.buf.len()));
        Ok(inner.buf[..len].to_vec())
    }

    fn read_inner(&self) -> Result<RwLockReadGuard<'_, MemoryLedgerInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write_inner(&self) -> Result<RwLockWriteGuard<'_, MemoryLedgerInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

#[async_trait]
impl LedgerStorage for MemoryLedger {
    async fn data_partition_start(&self) -> Result<u64> {
        Ok(self.read_inner()?.data_start)
    }

    async fn storage_capacity(&self) -> Result<u64> {
        Ok(self.read_inner()?.capacity)
    }

    async fn next_write_position(&self) -> Result<u64> {
        Ok(self.read_inner()?.committed_end)
    }

    async fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        let inner = self.read_inner()?;
        let capacity = inner.capacity;

        let end = offset
            .checked_add(len)
            .filter(|end| *end <= capacity)
            .ok_or(StoreError::OutOfRange {
                offset,
                end: offset.saturating_add(len),
                capacity,
            })?;

        let size = usize::try_from(len).map_err(|_| StoreError::CapacityExceeded { end })?;
        let mut out = Vec::new();
        out.try_reserve_exact(size)
            .map_err(|_| StoreError::CapacityExceeded { end })?;
        out.resize(size, 0);

        // Copy whatever part of the range has been written.
        let buf_end = inner.data_start + inner.buf.len() as u64;
        let from = offset.max(inner.data_start);
        let to = end.min(buf_end);
        if from < to {
            let src = (from - inner.data_start) as usize..(to - inner.data_start) as usize;
            let dst = (from - offset) as usize;
            out[dst..dst + src.len()].copy_from_slice(&inner.buf[src]);
        }
        Ok(out)
    }

    async fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut inner = self.write_inner()?;

        if offset < inner.data_start {
            return Err(StoreError::BelowPartition {
                offset,
                data_start: inner.data_start,
            });
        }

        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(StoreError::OutOfRange {
                offset,
                end: u64::MAX,
                capacity: inner.capacity,
            })?;

        let needed = usize::try_from(end - inner.data_start)
            .map_err(|_| StoreError::CapacityExceeded { end })?;
        if needed > inner.buf.len() {
            let additional = needed - inner.buf.len();
            inner
                .buf
                .try_reserve_exact(additional)
                .map_err(|_| StoreError::CapacityExceeded { end })?;
            inner.buf.resize(needed, 0);
        }

        if end > inner.capacity {
            let grown = round_up_to_page(end);
            tracing::debug!(from = inner.capacity, to = grown, "growing memory ledger");
            inner.capacity = grown;
        }

        let start = (offset - inner.data_start) as usize;
        inner.buf[start..needed].copy_from_slice(data);
        inner.written_end = inner.written_end.max(end);
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        let mut inner = self.write_inner()?;
        inner.committed_end = inner.written_end.max(inner.data_start);
        Ok(())
    }
}
