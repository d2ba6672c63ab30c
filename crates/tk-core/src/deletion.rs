//! Deletion policy
//!
//! A delete runs `Validate → {Cascade | Reparent} → Commit`, all inside one
//! transaction. Any error drops the transaction, which rolls back whatever
//! the branch already wrote. Errors are returned as-is; nothing is retried.

use crate::comment::{DeleteCommentRequest, DeleteCommentResponse};
use crate::error::{Result, ThreadError};
use crate::store::{
    delete_single_in, delete_subtree_in, CommentStore, StorageEngine, TableRead, TableWrite,
};
use crate::types::CommentId;
use std::fmt;
use tracing::{info, warn};

/// Which comments a delete removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionMode {
    /// The comment and all of its descendants
    Cascade,
    /// Only the comment; its direct replies become roots
    Reparent,
}

impl DeletionMode {
    pub fn from_cascade(cascade: bool) -> Self {
        if cascade {
            DeletionMode::Cascade
        } else {
            DeletionMode::Reparent
        }
    }
}

impl fmt::Display for DeletionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletionMode::Cascade => write!(f, "cascade"),
            DeletionMode::Reparent => write!(f, "reparent"),
        }
    }
}

/// Runs deletes against a comment store
pub struct DeletionPolicy<'a, E: StorageEngine> {
    store: &'a CommentStore<E>,
}

impl<'a, E: StorageEngine> DeletionPolicy<'a, E> {
    pub fn new(store: &'a CommentStore<E>) -> Self {
        Self { store }
    }

    /// Delete according to `request.cascade`
    pub fn execute(&self, request: DeleteCommentRequest) -> Result<DeleteCommentResponse> {
        let mode = DeletionMode::from_cascade(request.cascade);
        let count = self.run(request.comment_id, mode).map_err(|err| {
            warn!(
                "Delete of comment {} ({}) aborted: {}",
                request.comment_id, mode, err
            );
            err
        })?;

        info!(
            "Deleted comment {} ({}), {} row(s) removed",
            request.comment_id, mode, count
        );
        Ok(DeleteCommentResponse {
            success: true,
            count,
        })
    }

    fn run(&self, id: CommentId, mode: DeletionMode) -> Result<u64> {
        let mut tx = self.store.begin()?;

        if tx.comment(id).is_none() {
            return Err(ThreadError::CommentNotFound(id));
        }

        let count = match mode {
            DeletionMode::Cascade => delete_subtree_in(&mut tx, id)?,
            DeletionMode::Reparent => delete_single_in(&mut tx, id)?,
        };

        tx.commit()?;
        Ok(count)
    }
}
