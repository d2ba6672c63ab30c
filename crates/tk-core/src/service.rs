//! Comment service
//!
//! The public face of the core crate. Composes the store, the tree builder,
//! the deletion policy and a [`UserResolver`] into create/list/delete/count.

use crate::comment::{
    build_forest, for_each_mut, walk, CommentView, DeleteCommentRequest, DeleteCommentResponse,
    ListCommentsRequest, ListCommentsResponse, NewComment, ThreadNode,
};
use crate::config::ListingConfig;
use crate::deletion::DeletionPolicy;
use crate::error::{Result, ThreadError};
use crate::resolver::UserResolver;
use crate::store::{CommentStore, StorageEngine};
use crate::types::{CommentId, PostId, UserId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Threaded comment service
pub struct CommentService<E: StorageEngine> {
    store: CommentStore<E>,
    users: Arc<dyn UserResolver>,
    listing: ListingConfig,
}

impl<E: StorageEngine> CommentService<E> {
    /// Create a service with default listing limits
    pub fn new(store: CommentStore<E>, users: Arc<dyn UserResolver>) -> Self {
        Self {
            store,
            users,
            listing: ListingConfig::default(),
        }
    }

    /// Replace the listing limits
    pub fn with_listing(mut self, listing: ListingConfig) -> Self {
        self.listing = listing;
        self
    }

    /// Get the underlying store
    pub fn store(&self) -> &CommentStore<E> {
        &self.store
    }

    /// Make a post available for comments
    pub fn register_post(&self, post_id: &PostId) -> Result<bool> {
        self.store.register_post(post_id)
    }

    /// Create a comment and return it with its author
    ///
    /// The author is resolved first so an unknown user never leaves a row
    /// behind.
    #[instrument(skip(self, new), fields(post = %new.post_id, user = %new.user_id))]
    pub fn create_comment(&self, new: NewComment) -> Result<CommentView> {
        let author = self.users.get_user(&new.user_id)?;
        let comment = self.store.create(new)?;
        Ok(CommentView { comment, author })
    }

    /// List a post's comments as a reply forest
    #[instrument(skip(self, request), fields(post = %request.post_id))]
    pub fn list_comments(&self, request: ListCommentsRequest) -> Result<ListCommentsResponse> {
        let (offset, limit) = self.page_window(&request)?;

        let rows = self.store.fetch_subtree(&request.post_id)?;
        let total = rows.len() as u64;
        let forest = build_forest(rows);

        let scoped = match request.parent_id {
            Some(parent_id) => take_replies(forest, parent_id)
                .ok_or(ThreadError::CommentNotFound(parent_id))?,
            None => forest,
        };

        let mut comments: Vec<ThreadNode> = scoped.into_iter().skip(offset).take(limit).collect();
        self.attach_authors(&mut comments)?;

        debug!(
            "Listed {} top-level thread(s) of {} comment(s)",
            comments.len(),
            total
        );
        Ok(ListCommentsResponse { comments, total })
    }

    /// Delete a comment, either with its whole subtree or alone
    pub fn delete_comment(&self, comment_id: CommentId, cascade: bool) -> Result<DeleteCommentResponse> {
        DeletionPolicy::new(&self.store).execute(DeleteCommentRequest {
            comment_id,
            cascade,
        })
    }

    /// Number of comments on a post
    pub fn count_comments(&self, post_id: &PostId) -> Result<u64> {
        self.store.count(post_id)
    }

    fn page_window(&self, request: &ListCommentsRequest) -> Result<(usize, usize)> {
        let page = request.page.unwrap_or(1);
        if page == 0 {
            return Err(ThreadError::Validation("page starts at 1".to_string()));
        }

        let limit = request.limit.unwrap_or(self.listing.default_limit);
        if limit == 0 {
            return Err(ThreadError::Validation(
                "limit must be greater than zero".to_string(),
            ));
        }
        let limit = limit.min(self.listing.max_limit);

        Ok(((page - 1).saturating_mul(limit), limit))
    }

    fn attach_authors(&self, forest: &mut [ThreadNode]) -> Result<()> {
        let distinct: BTreeSet<&UserId> = walk(forest).map(|(_, node)| &node.comment.user_id).collect();
        if distinct.is_empty() {
            return Ok(());
        }

        let ids: Vec<UserId> = distinct.into_iter().cloned().collect();
        let authors = self.users.get_users(&ids)?;

        for_each_mut(forest, |node| {
            node.author = authors.get(&node.comment.user_id).cloned();
        });
        Ok(())
    }
}

/// Detach the replies of `parent_id` from the forest
///
/// The detached nodes keep their kind.
fn take_replies(forest: Vec<ThreadNode>, parent_id: CommentId) -> Option<Vec<ThreadNode>> {
    let mut forest = forest;
    let mut stack: Vec<&mut ThreadNode> = forest.iter_mut().collect();

    while let Some(node) = stack.pop() {
        if node.id() == parent_id {
            return Some(std::mem::take(&mut node.replies));
        }
        stack.extend(node.replies.iter_mut());
    }
    None
}
