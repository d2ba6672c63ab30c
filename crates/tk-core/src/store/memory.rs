//! In-memory storage engine
//!
//! Committed state is an immutable `Arc<Tables>`. Readers clone the `Arc`
//! and never wait on a writer. A single writer at a time works on a private
//! copy and publishes it on commit, so an abandoned transaction simply
//! drops its copy.
//!
//! Beginning a transaction clones every row, so its cost grows linearly
//! with the total number of comments across all posts.

use super::engine::{StorageEngine, TableRead, TableWrite};
use super::tables::Tables;
use crate::comment::Comment;
use crate::error::{Result, ThreadError};
use crate::types::{CommentId, PostId};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Default time a writer waits for the write lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable destination for committed tables
pub trait TableSink: Send + Sync {
    /// Persist the tables about to be published; failure aborts the commit
    fn persist(&self, tables: &Tables) -> Result<()>;
}

/// Single-writer slot; waiters sleep on the condvar until it is free
#[derive(Default)]
struct WriterSlot {
    busy: Mutex<bool>,
    released: Condvar,
}

/// Holds the writer slot until dropped
struct WriterGuard<'a> {
    slot: &'a WriterSlot,
}

impl Drop for WriterGuard<'_> {
    fn drop(&mut self) {
        // Only a bool is guarded, so a poisoned lock is still sound
        let mut busy = self.slot.busy.lock().unwrap_or_else(PoisonError::into_inner);
        *busy = false;
        drop(busy);
        self.slot.released.notify_one();
    }
}

/// In-memory storage engine
pub struct MemoryEngine {
    committed: RwLock<Arc<Tables>>,
    writer: WriterSlot,
    lock_timeout: Duration,
    sink: Option<Box<dyn TableSink>>,
}

impl MemoryEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::with_tables(Tables::new())
    }

    /// Create an engine over existing rows
    pub fn with_tables(tables: Tables) -> Self {
        Self {
            committed: RwLock::new(Arc::new(tables)),
            writer: WriterSlot::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            sink: None,
        }
    }

    /// Persist every commit through `sink` before publishing it
    pub fn with_sink(mut self, sink: impl TableSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Set how long `begin` waits for the current writer
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    fn acquire_writer(&self) -> Result<WriterGuard<'_>> {
        let started = Instant::now();
        let busy = self
            .writer
            .busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (mut busy, _) = self
            .writer
            .released
            .wait_timeout_while(busy, self.lock_timeout, |busy| *busy)
            .unwrap_or_else(PoisonError::into_inner);

        if *busy {
            return Err(ThreadError::LockTimeout {
                waited_ms: started.elapsed().as_millis() as u64,
            });
        }
        *busy = true;
        Ok(WriterGuard {
            slot: &self.writer,
        })
    }

    /// Open a transaction over rows loaded while holding the writer slot
    ///
    /// `refresh` runs once no other writer is active. The tables it returns
    /// replace the committed state before the transaction starts, and its
    /// second value is handed back alongside the transaction.
    pub fn begin_with<T>(
        &self,
        refresh: impl FnOnce() -> Result<(Tables, T)>,
    ) -> Result<(TablesTxn<'_>, T)> {
        let guard = self.acquire_writer()?;
        let (tables, extra) = refresh()?;
        let fresh = Arc::new(tables);
        *self
            .committed
            .write()
            .map_err(|_| ThreadError::LockPoisoned("committed tables"))? = Arc::clone(&fresh);
        Ok((self.start(guard, &fresh), extra))
    }

    fn start<'a>(&'a self, guard: WriterGuard<'a>, base: &Tables) -> TablesTxn<'a> {
        trace!("Transaction started");
        TablesTxn {
            _writer: guard,
            engine: self,
            working: base.clone(),
            dirty: false,
            finished: false,
        }
    }

    fn committed(&self) -> Result<Arc<Tables>> {
        self.committed
            .read()
            .map(|tables| Arc::clone(&*tables))
            .map_err(|_| ThreadError::LockPoisoned("committed tables"))
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine for MemoryEngine {
    type Snapshot = TablesSnapshot;
    type Txn<'a> = TablesTxn<'a>;

    fn snapshot(&self) -> Result<TablesSnapshot> {
        Ok(TablesSnapshot(self.committed()?))
    }

    fn begin(&self) -> Result<TablesTxn<'_>> {
        let guard = self.acquire_writer()?;
        let base = self.committed()?;
        Ok(self.start(guard, &base))
    }
}

/// Read-only view of committed tables
#[derive(Debug, Clone)]
pub struct TablesSnapshot(Arc<Tables>);

impl TablesSnapshot {
    pub fn tables(&self) -> &Tables {
        &self.0
    }
}

impl TableRead for TablesSnapshot {
    fn post_exists(&self, post_id: &PostId) -> bool {
        self.0.post_exists(post_id)
    }

    fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.0.comment(id)
    }

    fn comments_for_post(&self, post_id: &PostId) -> Vec<&Comment> {
        self.0.comments_for_post(post_id)
    }

    fn children_of(&self, id: CommentId) -> Vec<CommentId> {
        self.0.children_of(id)
    }

    fn path_scan(&self, prefix: &[CommentId]) -> Vec<CommentId> {
        self.0.path_scan(prefix)
    }

    fn count_for_post(&self, post_id: &PostId) -> u64 {
        self.0.count_for_post(post_id)
    }

    fn max_comment_id(&self) -> Option<CommentId> {
        self.0.max_comment_id()
    }
}

/// Write transaction over a private copy of the tables
pub struct TablesTxn<'a> {
    _writer: WriterGuard<'a>,
    engine: &'a MemoryEngine,
    working: Tables,
    dirty: bool,
    finished: bool,
}

impl TablesTxn<'_> {
    /// Rows as seen by this transaction
    pub fn tables(&self) -> &Tables {
        &self.working
    }
}

impl TableRead for TablesTxn<'_> {
    fn post_exists(&self, post_id: &PostId) -> bool {
        self.working.post_exists(post_id)
    }

    fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.working.comment(id)
    }

    fn comments_for_post(&self, post_id: &PostId) -> Vec<&Comment> {
        self.working.comments_for_post(post_id)
    }

    fn children_of(&self, id: CommentId) -> Vec<CommentId> {
        self.working.children_of(id)
    }

    fn path_scan(&self, prefix: &[CommentId]) -> Vec<CommentId> {
        self.working.path_scan(prefix)
    }

    fn count_for_post(&self, post_id: &PostId) -> u64 {
        self.working.count_for_post(post_id)
    }

    fn max_comment_id(&self) -> Option<CommentId> {
        self.working.max_comment_id()
    }
}

impl TableWrite for TablesTxn<'_> {
    fn insert_post(&mut self, post_id: PostId) -> Result<bool> {
        let inserted = self.working.insert_post(post_id);
        self.dirty |= inserted;
        Ok(inserted)
    }

    fn insert_comment(&mut self, comment: Comment) -> Result<()> {
        self.working.insert_comment(comment)?;
        self.dirty = true;
        Ok(())
    }

    fn delete_comments(&mut self, ids: &[CommentId]) -> Result<u64> {
        let removed = self.working.delete_comments(ids)?;
        self.dirty |= removed > 0;
        Ok(removed)
    }

    fn clear_parent(&mut self, parent: CommentId) -> Result<u64> {
        let updated = self.working.clear_parent(parent);
        self.dirty |= updated > 0;
        Ok(updated)
    }

    fn commit(mut self) -> Result<()> {
        self.finished = true;
        if !self.dirty {
            trace!("Transaction committed without changes");
            return Ok(());
        }

        let working = std::mem::take(&mut self.working);
        if let Some(sink) = &self.engine.sink {
            sink.persist(&working)?;
        }

        let mut committed = self
            .engine
            .committed
            .write()
            .map_err(|_| ThreadError::LockPoisoned("committed tables"))?;
        *committed = Arc::new(working);
        debug!("Transaction committed");
        Ok(())
    }
}

impl Drop for TablesTxn<'_> {
    fn drop(&mut self) {
        if !self.finished && self.dirty {
            debug!("Transaction rolled back");
        }
    }
}
