//! Storage engine contract
//!
//! An engine is a small relational store: a `posts` table and a flat
//! `comments` table with primary-key and foreign-key enforcement. It knows
//! nothing about trees; ancestry lives in each row's materialized path and
//! the engine only has to answer prefix scans over it.

use crate::comment::Comment;
use crate::error::Result;
use crate::types::{CommentId, PostId};

/// Read access to committed (or in-transaction) rows
pub trait TableRead {
    /// Check if a post is known
    fn post_exists(&self, post_id: &PostId) -> bool;

    /// Look up a comment by id
    fn comment(&self, id: CommentId) -> Option<&Comment>;

    /// All comments of a post, in no particular order
    fn comments_for_post(&self, post_id: &PostId) -> Vec<&Comment>;

    /// Ids of the comments whose `parent_id` is `id`
    fn children_of(&self, id: CommentId) -> Vec<CommentId>;

    /// Ids of the comments whose path starts with `prefix`, in path order
    fn path_scan(&self, prefix: &[CommentId]) -> Vec<CommentId>;

    /// Number of comments on a post
    fn count_for_post(&self, post_id: &PostId) -> u64;

    /// Highest comment id ever inserted, including deleted rows
    fn max_comment_id(&self) -> Option<CommentId>;
}

/// A write transaction
///
/// Changes become visible to readers only on [`commit`](TableWrite::commit).
/// Dropping the transaction without committing discards every change.
pub trait TableWrite: TableRead {
    /// Register a post; returns false when it already existed
    fn insert_post(&mut self, post_id: PostId) -> Result<bool>;

    /// Insert a comment row, enforcing keys and references
    fn insert_comment(&mut self, comment: Comment) -> Result<()>;

    /// Delete rows by id; returns the number removed
    ///
    /// Fails if a surviving row would still reference a deleted one.
    fn delete_comments(&mut self, ids: &[CommentId]) -> Result<u64>;

    /// Null out `parent_id` on every direct child of `parent`
    fn clear_parent(&mut self, parent: CommentId) -> Result<u64>;

    /// Make the changes durable and visible
    fn commit(self) -> Result<()>
    where
        Self: Sized;
}

/// Trait for storage engine implementations
pub trait StorageEngine: Send + Sync {
    /// Consistent view of committed state
    type Snapshot: TableRead;

    /// Write transaction
    type Txn<'a>: TableWrite
    where
        Self: 'a;

    /// Take a snapshot; never waits for writers
    fn snapshot(&self) -> Result<Self::Snapshot>;

    /// Open the write transaction, waiting for the current writer if any
    fn begin(&self) -> Result<Self::Txn<'_>>;
}
