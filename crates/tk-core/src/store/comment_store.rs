//! Comment persistence on top of a storage engine

use super::engine::{StorageEngine, TableRead, TableWrite};
use crate::comment::{Comment, CommentValidator, NewComment};
use crate::error::{IntegrityViolation, Result, ThreadError};
use crate::id::IdGenerator;
use crate::types::{CommentId, PostId};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Tree-aware comment persistence
///
/// Every mutating operation runs in exactly one engine transaction.
pub struct CommentStore<E: StorageEngine> {
    engine: E,
    ids: Arc<dyn IdGenerator>,
    validator: CommentValidator,
}

impl<E: StorageEngine> CommentStore<E> {
    /// Create a store over `engine`, taking ids from `ids`
    pub fn new(engine: E, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            engine,
            ids,
            validator: CommentValidator::new(),
        }
    }

    /// Replace the content validator
    pub fn with_validator(mut self, validator: CommentValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Get the underlying engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Make a post known to the store
    pub fn register_post(&self, post_id: &PostId) -> Result<bool> {
        let mut tx = self.engine.begin()?;
        let inserted = tx.insert_post(post_id.clone())?;
        tx.commit()?;
        if inserted {
            info!("Registered post {}", post_id);
        }
        Ok(inserted)
    }

    /// Create a comment, placing it under its parent when one is given
    pub fn create(&self, new: NewComment) -> Result<Comment> {
        self.validator.validate(&new)?;

        let mut tx = self.engine.begin()?;
        let comment = insert_placed(&mut tx, self.ids.as_ref(), new)?;
        tx.commit()?;

        debug!(
            "Created comment {} on post {} at depth {}",
            comment.id, comment.post_id, comment.depth
        );
        Ok(comment)
    }

    /// Get a comment by ID
    pub fn get(&self, id: CommentId) -> Result<Comment> {
        self.engine
            .snapshot()?
            .comment(id)
            .cloned()
            .ok_or(ThreadError::CommentNotFound(id))
    }

    /// All comments of a post, ancestors before descendants
    ///
    /// Sorting by path puts every parent before its replies, and since ids
    /// grow with time, siblings come out in creation order.
    pub fn fetch_subtree(&self, post_id: &PostId) -> Result<Vec<Comment>> {
        let snapshot = self.engine.snapshot()?;
        let mut rows: Vec<Comment> = snapshot
            .comments_for_post(post_id)
            .into_iter()
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(rows)
    }

    /// Delete a comment together with every comment whose path contains it
    pub fn delete_subtree(&self, id: CommentId) -> Result<u64> {
        let mut tx = self.engine.begin()?;
        let removed = delete_subtree_in(&mut tx, id)?;
        tx.commit()?;
        Ok(removed)
    }

    /// Delete only this comment, promoting its direct replies to roots
    pub fn delete_single(&self, id: CommentId) -> Result<u64> {
        let mut tx = self.engine.begin()?;
        let removed = delete_single_in(&mut tx, id)?;
        tx.commit()?;
        Ok(removed)
    }

    /// Number of comments on a post
    pub fn count(&self, post_id: &PostId) -> Result<u64> {
        Ok(self.engine.snapshot()?.count_for_post(post_id))
    }

    pub(crate) fn begin(&self) -> Result<E::Txn<'_>> {
        self.engine.begin()
    }
}

/// Insert a new row below its parent inside an open transaction
fn insert_placed<T: TableWrite>(
    tx: &mut T,
    ids: &dyn IdGenerator,
    new: NewComment,
) -> Result<Comment> {
    if !tx.post_exists(&new.post_id) {
        return Err(ThreadError::PostNotFound(new.post_id));
    }

    let parent = match new.parent_id {
        Some(parent_id) => {
            let parent = tx
                .comment(parent_id)
                .filter(|parent| parent.post_id == new.post_id)
                .ok_or(ThreadError::ParentNotFound(parent_id))?;
            Some(parent.clone())
        }
        None => None,
    };

    // Another process may have written ids this generator never issued
    if let Some(last) = tx.max_comment_id() {
        ids.advance_past(last);
    }

    let comment = Comment::placed_under(
        ids.next_id(),
        new.post_id,
        new.user_id,
        new.content,
        parent.as_ref(),
        Utc::now(),
    );

    tx.insert_comment(comment.clone()).map_err(|err| match err {
        ThreadError::Integrity(IntegrityViolation::MissingParent(parent))
        | ThreadError::Integrity(IntegrityViolation::CrossPostParent { parent, .. }) => {
            ThreadError::ParentNotFound(parent)
        }
        ThreadError::Integrity(IntegrityViolation::MissingPost(post)) => {
            ThreadError::PostNotFound(post)
        }
        other => other,
    })?;

    Ok(comment)
}

/// Remove `id` and its descendants inside an open transaction
pub(crate) fn delete_subtree_in<T: TableWrite>(tx: &mut T, id: CommentId) -> Result<u64> {
    let path = tx
        .comment(id)
        .map(|comment| comment.path.clone())
        .ok_or(ThreadError::CommentNotFound(id))?;

    let doomed = tx.path_scan(&path);
    tx.delete_comments(&doomed)
}

/// Promote the replies of `id` and remove it inside an open transaction
pub(crate) fn delete_single_in<T: TableWrite>(tx: &mut T, id: CommentId) -> Result<u64> {
    if tx.comment(id).is_none() {
        return Err(ThreadError::CommentNotFound(id));
    }

    let promoted = tx.clear_parent(id)?;
    if promoted > 0 {
        debug!("Promoted {} replies of comment {} to roots", promoted, id);
    }
    tx.delete_comments(&[id])
}
