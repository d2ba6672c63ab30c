//! File-backed storage engine
//!
//! Rows live in memory exactly as in [`MemoryEngine`]; every commit writes the
//! full table snapshot to `comments.json` before it is published.
//!
//! Writers in different processes are serialized by an exclusive lock on
//! `comments.lock`. Each transaction reloads `comments.json` once it holds
//! that lock, so it always starts from the last committed file. Snapshots
//! show the rows as of the last `open` or `begin` in this process.

use crate::format::{check_schema_version, read_json, write_json_atomic, TablesFile};
use fs4::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tk_core::comment::Comment;
use tk_core::store::{
    MemoryEngine, StorageEngine, TableRead, TableSink, TableWrite, Tables, TablesSnapshot,
    TablesTxn,
};
use tk_core::{CommentId, PostId, Result, ThreadError};
use tracing::{debug, info, trace};

/// Name of the comment tables file inside the data directory
pub const TABLES_FILE: &str = "comments.json";

/// Name of the lock file that serializes writers across processes
pub const LOCK_FILE: &str = "comments.lock";

/// Platform data directory (`~/.threadkeeper` as a fallback)
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "threadkeeper", "threadkeeper")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".threadkeeper")
        })
}

/// Writes committed tables to disk
struct SnapshotSink {
    path: PathBuf,
}

impl TableSink for SnapshotSink {
    fn persist(&self, tables: &Tables) -> Result<()> {
        write_json_atomic(&self.path, &TablesFile::new(tables))
    }
}

/// Storage engine persisted to a data directory
pub struct FileSystemEngine {
    tables_path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
    inner: MemoryEngine,
}

impl FileSystemEngine {
    /// Open the data directory, creating it when missing
    pub fn open(base_dir: impl Into<PathBuf>, lock_timeout: Duration) -> Result<Self> {
        let base_dir = base_dir.into();
        ensure_dir(&base_dir)?;

        let tables_path = base_dir.join(TABLES_FILE);
        let tables = load_tables(&tables_path)?;
        info!(
            "Loaded {} comment(s) from {:?}",
            tables.comment_count(),
            tables_path
        );

        let inner = MemoryEngine::with_tables(tables)
            .with_lock_timeout(lock_timeout)
            .with_sink(SnapshotSink {
                path: tables_path.clone(),
            });

        Ok(Self {
            tables_path,
            lock_path: base_dir.join(LOCK_FILE),
            lock_timeout,
            inner,
        })
    }

    /// Path of the tables file
    pub fn tables_path(&self) -> &Path {
        &self.tables_path
    }

    /// Whether a tables file has been written yet
    pub fn is_initialized(&self) -> bool {
        self.tables_path.exists()
    }

    /// Write the current tables even if nothing changed
    pub fn flush(&self) -> Result<()> {
        let tx = self.begin()?;
        write_json_atomic(&self.tables_path, &TablesFile::new(tx.inner.tables()))
    }

    /// Highest comment id on disk, for seeding the id generator
    pub fn max_comment_id(&self) -> Result<Option<CommentId>> {
        Ok(self.inner.snapshot()?.max_comment_id())
    }

    fn lock_exclusive(&self) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;

        let started = Instant::now();
        let mut backoff = Duration::from_millis(1);
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(file),
                Err(err) if is_contended(&err) => {
                    let waited = started.elapsed();
                    if waited >= self.lock_timeout {
                        debug!("Gave up on {:?} after {:?}", self.lock_path, waited);
                        return Err(ThreadError::LockTimeout {
                            waited_ms: waited.as_millis() as u64,
                        });
                    }
                    std::thread::sleep(backoff);
                    backoff = (backoff * 2).min(Duration::from_millis(25));
                }
                Err(err) => return Err(ThreadError::Io(err)),
            }
        }
    }
}

impl StorageEngine for FileSystemEngine {
    type Snapshot = TablesSnapshot;
    type Txn<'a> = FileTxn<'a>;

    fn snapshot(&self) -> Result<TablesSnapshot> {
        self.inner.snapshot()
    }

    fn begin(&self) -> Result<FileTxn<'_>> {
        let (inner, lock) = self.inner.begin_with(|| {
            let lock = self.lock_exclusive()?;
            let tables = load_tables(&self.tables_path)?;
            trace!("Reloaded {} comment(s) under lock", tables.comment_count());
            Ok((tables, lock))
        })?;
        Ok(FileTxn { inner, _lock: lock })
    }
}

/// Write transaction holding the cross-process lock
///
/// The lock is released when the transaction is committed or dropped.
pub struct FileTxn<'a> {
    inner: TablesTxn<'a>,
    _lock: File,
}

impl TableRead for FileTxn<'_> {
    fn post_exists(&self, post_id: &PostId) -> bool {
        self.inner.post_exists(post_id)
    }

    fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.inner.comment(id)
    }

    fn comments_for_post(&self, post_id: &PostId) -> Vec<&Comment> {
        self.inner.comments_for_post(post_id)
    }

    fn children_of(&self, id: CommentId) -> Vec<CommentId> {
        self.inner.children_of(id)
    }

    fn path_scan(&self, prefix: &[CommentId]) -> Vec<CommentId> {
        self.inner.path_scan(prefix)
    }

    fn count_for_post(&self, post_id: &PostId) -> u64 {
        self.inner.count_for_post(post_id)
    }

    fn max_comment_id(&self) -> Option<CommentId> {
        self.inner.max_comment_id()
    }
}

impl TableWrite for FileTxn<'_> {
    fn insert_post(&mut self, post_id: PostId) -> Result<bool> {
        self.inner.insert_post(post_id)
    }

    fn insert_comment(&mut self, comment: Comment) -> Result<()> {
        self.inner.insert_comment(comment)
    }

    fn delete_comments(&mut self, ids: &[CommentId]) -> Result<u64> {
        self.inner.delete_comments(ids)
    }

    fn clear_parent(&mut self, parent: CommentId) -> Result<u64> {
        self.inner.clear_parent(parent)
    }

    fn commit(self) -> Result<()> {
        // The file is written before the lock is released
        let FileTxn { inner, _lock } = self;
        inner.commit()
    }
}

fn load_tables(path: &Path) -> Result<Tables> {
    match read_json::<TablesFile>(path)? {
        Some(file) => {
            check_schema_version(&file.schema_version)?;
            Ok(file.tables)
        }
        None => {
            debug!("No tables file at {:?}, starting empty", path);
            Ok(Tables::new())
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    // ERROR_LOCK_VIOLATION on Windows
    err.kind() == io::ErrorKind::WouldBlock || (cfg!(windows) && err.raw_os_error() == Some(33))
}

pub(crate) fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| {
            ThreadError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create data directory: {}", e),
            ))
        })?;
        debug!("Created data directory: {:?}", dir);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::temp_path;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tk_core::comment::NewComment;
    use tk_core::id::SequentialIdGenerator;
    use tk_core::store::CommentStore;
    use tk_core::UserId;

    const TIMEOUT: Duration = Duration::from_millis(500);

    fn open_store(dir: &Path) -> CommentStore<FileSystemEngine> {
        let engine = FileSystemEngine::open(dir, TIMEOUT).unwrap();
        let ids = SequentialIdGenerator::starting_after(engine.max_comment_id().unwrap());
        CommentStore::new(engine, Arc::new(ids))
    }

    fn comment(content: &str, parent: Option<CommentId>) -> NewComment {
        NewComment {
            post_id: PostId::from("post"),
            user_id: UserId::from("alice"),
            content: content.to_string(),
            parent_id: parent,
        }
    }

    #[test]
    fn test_open_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("data");

        let engine = FileSystemEngine::open(&dir, TIMEOUT).unwrap();
        assert!(dir.exists());
        assert!(!engine.is_initialized());

        engine.flush().unwrap();
        assert!(engine.is_initialized());
    }

    #[test]
    fn test_commits_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let (a, c) = {
            let store = open_store(temp.path());
            store.register_post(&PostId::from("post")).unwrap();
            let a = store.create(comment("A", None)).unwrap();
            let b = store.create(comment("B", Some(a.id))).unwrap();
            let c = store.create(comment("C", Some(b.id))).unwrap();
            store.delete_single(b.id).unwrap();
            (a.id, c.id)
        };

        let store = open_store(temp.path());
        let rows = store.fetch_subtree(&PostId::from("post")).unwrap();
        let ids: Vec<CommentId> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, c]);
        assert_eq!(rows[1].parent_id, None);
        assert_eq!(rows[1].depth, 2);

        // Ids keep growing after a reopen
        let d = store.create(comment("D", None)).unwrap();
        assert!(d.id > c);
    }

    #[test]
    fn test_rolled_back_transaction_is_not_written() {
        let temp = TempDir::new().unwrap();
        {
            let engine = FileSystemEngine::open(temp.path(), TIMEOUT).unwrap();
            let mut tx = engine.begin().unwrap();
            tx.insert_post(PostId::from("post")).unwrap();
        }

        let engine = FileSystemEngine::open(temp.path(), TIMEOUT).unwrap();
        assert!(!engine.is_initialized());
        assert!(!engine.snapshot().unwrap().post_exists(&PostId::from("post")));
    }

    #[test]
    fn test_commit_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let store = open_store(temp.path());
        store.register_post(&PostId::from("post")).unwrap();

        let path = store.engine().tables_path();
        assert!(path.exists());
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_rejects_newer_major_schema() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(TABLES_FILE),
            r#"{"schema_version":"2.0","tables":{"posts":[],"comments":{}}}"#,
        )
        .unwrap();

        let err = FileSystemEngine::open(temp.path(), TIMEOUT).err().unwrap();
        assert!(matches!(err, ThreadError::UnsupportedSchemaVersion(_)));
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(TABLES_FILE), "{ not json").unwrap();

        let err = FileSystemEngine::open(temp.path(), TIMEOUT).err().unwrap();
        assert!(err.to_string().contains("comments.json"));
    }

    #[test]
    fn test_two_engines_on_one_directory_keep_both_writes() {
        let temp = TempDir::new().unwrap();
        let first = open_store(temp.path());
        let second = open_store(temp.path());

        first.register_post(&PostId::from("post")).unwrap();
        let a = first.create(comment("A", None)).unwrap();
        // The second store opened before the post existed
        let b = second.create(comment("B", None)).unwrap();
        assert_ne!(a.id, b.id);

        let third = open_store(temp.path());
        assert_eq!(third.count(&PostId::from("post")).unwrap(), 2);
    }

    #[test]
    fn test_reply_to_comment_deleted_elsewhere_fails() {
        let temp = TempDir::new().unwrap();
        let first = open_store(temp.path());
        first.register_post(&PostId::from("post")).unwrap();
        let a = first.create(comment("A", None)).unwrap();

        let second = open_store(temp.path());
        first.delete_subtree(a.id).unwrap();

        let err = second.create(comment("reply", Some(a.id))).unwrap_err();
        assert!(matches!(err, ThreadError::ParentNotFound(id) if id == a.id));
    }

    #[test]
    fn test_writer_in_another_engine_times_out() {
        let temp = TempDir::new().unwrap();
        let holder = FileSystemEngine::open(temp.path(), TIMEOUT).unwrap();
        let waiter = FileSystemEngine::open(temp.path(), Duration::from_millis(30)).unwrap();

        let tx = holder.begin().unwrap();
        let err = waiter.begin().err().unwrap();
        assert!(matches!(err, ThreadError::LockTimeout { .. }));

        drop(tx);
        assert!(waiter.begin().is_ok());
    }

    #[test]
    fn test_deleted_newest_id_is_not_reissued() {
        let temp = TempDir::new().unwrap();
        let deleted = {
            let store = open_store(temp.path());
            store.register_post(&PostId::from("post")).unwrap();
            store.create(comment("A", None)).unwrap();
            let b = store.create(comment("B", None)).unwrap();
            store.delete_single(b.id).unwrap();
            b.id
        };

        let store = open_store(temp.path());
        let c = store.create(comment("C", None)).unwrap();
        assert!(c.id > deleted);
    }
}
