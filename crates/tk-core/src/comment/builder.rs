//! Builder for create requests

use super::model::NewComment;
use crate::error::{Result, ThreadError};
use crate::types::{CommentId, PostId, UserId};

/// Fluent construction of a [`NewComment`]
pub struct CommentBuilder {
    post_id: PostId,
    user_id: UserId,
    content: Option<String>,
    parent_id: Option<CommentId>,
}

impl CommentBuilder {
    /// Start a top-level comment on a post
    pub fn new(post_id: PostId, user_id: UserId) -> Self {
        Self {
            post_id,
            user_id,
            content: None,
            parent_id: None,
        }
    }

    /// Set the comment content
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Make this a reply to `parent_id`
    pub fn reply_to(mut self, parent_id: CommentId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Optional variant of [`reply_to`](Self::reply_to)
    pub fn parent(mut self, parent_id: Option<CommentId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Build the request
    pub fn build(self) -> Result<NewComment> {
        let content = self.content.ok_or_else(|| {
            ThreadError::Validation("Comment content is required".to_string())
        })?;

        if content.trim().is_empty() {
            return Err(ThreadError::Validation(
                "Comment content cannot be empty".to_string(),
            ));
        }

        Ok(NewComment {
            post_id: self.post_id,
            user_id: self.user_id,
            content,
            parent_id: self.parent_id,
        })
    }
}
