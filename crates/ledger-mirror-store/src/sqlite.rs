//! SQLite implementation of the LedgerStorage trait.
//!
//! Ledger bytes are stored as fixed-size pages, one row per page, with the
//! geometry kept in a small key/value table. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::handle::Uninitialized;
use crate::migration;
use crate::traits::{round_up_to_page, LedgerStorage, PAGE_SIZE};

/// Keys of the `ledger_meta` table.
mod meta {
    pub const DATA_START: &str = "data_start";
    pub const CAPACITY: &str = "capacity";
    pub const WRITTEN_END: &str = "written_end";
}

/// Geometry used when creating a fresh ledger file.
///
/// Ignored when opening a file that already holds a ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqliteLedgerOptions {
    /// Offset of the data partition.
    pub data_start: u64,
    /// Initial capacity in bytes, rounded up to whole pages.
    pub capacity: u64,
}

/// SQLite-based ledger storage.
///
/// Thread-safe via internal Mutex. Byte operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteLedger {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
    /// `next_write_position` as of the last refresh.
    committed_end: AtomicU64,
}

impl SqliteLedger {
    /// Open a SQLite ledger at the given path.
    ///
    /// Creates the file, runs migrations and records `options` if the file
    /// holds no ledger yet.
    pub fn open(
        path: impl AsRef<Path>,
        options: SqliteLedgerOptions,
    ) -> Result<Uninitialized<Self>> {
        Self::from_connection(Connection::open(path)?, options)
    }

    /// Open an in-memory SQLite ledger.
    ///
    /// Useful for testing.
    pub fn open_memory(options: SqliteLedgerOptions) -> Result<Uninitialized<Self>> {
        Self::from_connection(Connection::open_in_memory()?, options)
    }

    fn from_connection(
        mut conn: Connection,
        options: SqliteLedgerOptions,
    ) -> Result<Uninitialized<Self>> {
        migration::migrate(&mut conn)?;

        let capacity = round_up_to_page(options.capacity.max(options.data_start));
        for (key, value) in [
            (meta::DATA_START, options.data_start),
            (meta::CAPACITY, capacity),
            (meta::WRITTEN_END, 0),
        ] {
            conn.execute(
                "INSERT OR IGNORE INTO ledger_meta (key, value) VALUES (?1, ?2)",
                params![key, to_sql_int(value)?],
            )?;
        }

        Ok(Uninitialized::new(Self {
            conn: Arc::new(Mutex::new(conn)),
            committed_end: AtomicU64::new(0),
        }))
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn to_sql_int(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("offset {} exceeds SQLite range", value)))
}

fn read_meta(conn: &Connection, key: &str) -> Result<u64> {
    let value: i64 = conn
        .query_row(
            "SELECT value FROM ledger_meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::InvalidData(format!("missing ledger metadata: {}", key)))?;

    u64::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("negative ledger metadata {}: {}", key, value)))
}

fn write_meta(conn: &Connection, key: &str, value: u64) -> Result<()> {
    conn.execute(
        "UPDATE ledger_meta SET value = ?2 WHERE key = ?1",
        params![key, to_sql_int(value)?],
    )?;
    Ok(())
}

fn load_page(conn: &Connection, page_index: u64) -> Result<Vec<u8>> {
    let data: Option<Vec<u8>> = conn
        .query_row(
            "SELECT data FROM ledger_pages WHERE page_index = ?1",
            params![to_sql_int(page_index)?],
            |row| row.get(0),
        )
        .optional()?;

    match data {
        Some(page) if page.len() as u64 == PAGE_SIZE => Ok(page),
        Some(page) => Err(StoreError::InvalidData(format!(
            "page {} has {} bytes, expected {}",
            page_index,
            page.len(),
            PAGE_SIZE
        ))),
        None => Ok(vec![0u8; PAGE_SIZE as usize]),
    }
}

fn store_page(conn: &Connection, page_index: u64, page: &[u8]) -> Result<()> {
    conn.execute(
        "INSERT INTO ledger_pages (page_index, data) VALUES (?1, ?2)
         ON CONFLICT(page_index) DO UPDATE SET data = excluded.data",
        params![to_sql_int(page_index)?, page],
    )?;
    Ok(())
}

#[async_trait]
impl LedgerStorage for SqliteLedger {
    async fn data_partition_start(&self) -> Result<u64> {
        self.blocking(|conn| read_meta(conn, meta::DATA_START)).await
    }

    async fn storage_capacity(&self) -> Result<u64> {
        self.blocking(|conn| read_meta(conn, meta::CAPACITY)).await
    }

    async fn next_write_position(&self) -> Result<u64> {
        Ok(self.committed_end.load(Ordering::Acquire))
    }

    async fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        self.blocking(move |conn| {
            let capacity = read_meta(conn, meta::CAPACITY)?;
            let end = offset
                .checked_add(len)
                .filter(|end| *end <= capacity)
                .ok_or(StoreError::OutOfRange {
                    offset,
                    end: offset.saturating_add(len),
                    capacity,
                })?;

            let mut out = Vec::with_capacity(len as usize);
            let mut pos = offset;
            while pos < end {
                let page_index = pos / PAGE_SIZE;
                let in_page = (pos % PAGE_SIZE) as usize;
                let take = ((end - pos) as usize).min(PAGE_SIZE as usize - in_page);

                let page = load_page(conn, page_index)?;
                out.extend_from_slice(&page[in_page..in_page + take]);
                pos += take as u64;
            }

            Ok(out)
        })
        .await
    }

    async fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        let data = data.to_vec();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let data_start = read_meta(&tx, meta::DATA_START)?;
            if offset < data_start {
                return Err(StoreError::BelowPartition { offset, data_start });
            }

            let capacity = read_meta(&tx, meta::CAPACITY)?;
            let end = offset
                .checked_add(data.len() as u64)
                .ok_or(StoreError::OutOfRange {
                    offset,
                    end: u64::MAX,
                    capacity,
                })?;

            let mut pos = offset;
            let mut remaining = &data[..];
            while !remaining.is_empty() {
                let page_index = pos / PAGE_SIZE;
                let in_page = (pos % PAGE_SIZE) as usize;
                let take = remaining.len().min(PAGE_SIZE as usize - in_page);

                let mut page = load_page(&tx, page_index)?;
                page[in_page..in_page + take].copy_from_slice(&remaining[..take]);
                store_page(&tx, page_index, &page)?;

                remaining = &remaining[take..];
                pos += take as u64;
            }

            if end > capacity {
                write_meta(&tx, meta::CAPACITY, round_up_to_page(end))?;
            }
            let written_end = read_meta(&tx, meta::WRITTEN_END)?;
            if end > written_end {
                write_meta(&tx, meta::WRITTEN_END, end)?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn refresh(&self) -> Result<()> {
        let committed = self
            .blocking(|conn| {
                let data_start = read_meta(conn, meta::DATA_START)?;
                let written_end = read_meta(conn, meta::WRITTEN_END)?;
                Ok(written_end.max(data_start))
            })
            .await?;

        self.committed_end.store(committed, Ordering::Release);
        Ok(())
    }
}
