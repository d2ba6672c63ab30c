//! Comment data models

use super::tree::ThreadNode;
use crate::types::{CommentId, PostId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored comment row
///
/// `path` is the materialized ancestry: ids from the thread root down to
/// this comment, inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Unique comment identifier
    pub id: CommentId,
    /// Post the comment belongs to
    pub post_id: PostId,
    /// Author
    pub user_id: UserId,
    /// Comment content
    pub content: String,
    /// Comment this one replies to
    pub parent_id: Option<CommentId>,
    /// Distance from the thread root at creation time
    pub depth: u32,
    /// Ancestry from root to self
    pub path: Vec<CommentId>,
    /// When the comment was created
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Build a row placed under `parent`, or a new root when `parent` is None
    pub fn placed_under(
        id: CommentId,
        post_id: PostId,
        user_id: UserId,
        content: String,
        parent: Option<&Comment>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let (parent_id, depth, path) = match parent {
            Some(parent) => {
                let mut path = Vec::with_capacity(parent.path.len() + 1);
                path.extend_from_slice(&parent.path);
                path.push(id);
                (Some(parent.id), parent.depth + 1, path)
            }
            None => (None, 0, vec![id]),
        };

        Self {
            id,
            post_id,
            user_id,
            content,
            parent_id,
            depth,
            path,
            created_at,
        }
    }
}

/// Request to create a comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: PostId,
    pub user_id: UserId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
}

/// Author display information supplied by the user resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl UserInfo {
    /// Name to show next to a comment
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// A comment together with its resolved author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: UserInfo,
}

/// Request to list the comment tree of a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCommentsRequest {
    pub post_id: PostId,
    /// 1-based page over the top level of the returned forest
    #[serde(default)]
    pub page: Option<usize>,
    /// Top-level threads per page
    #[serde(default)]
    pub limit: Option<usize>,
    /// Restrict the listing to the replies of this comment
    ///
    /// The top level of a scoped listing keeps [`NodeKind::Reply`], since
    /// every node there still has a parent.
    ///
    /// [`NodeKind::Reply`]: crate::comment::NodeKind::Reply
    #[serde(default)]
    pub parent_id: Option<CommentId>,
}

impl ListCommentsRequest {
    /// Full tree of a post
    pub fn for_post(post_id: PostId) -> Self {
        Self {
            post_id,
            page: None,
            limit: None,
            parent_id: None,
        }
    }

    pub fn page(mut self, page: usize, limit: usize) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    pub fn under(mut self, parent_id: CommentId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Listing result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCommentsResponse {
    pub comments: Vec<ThreadNode>,
    /// Number of comments on the post, regardless of paging or scoping
    pub total: u64,
}

/// Request to delete a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCommentRequest {
    pub comment_id: CommentId,
    /// Remove the whole subtree instead of promoting the direct replies
    pub cascade: bool,
}

/// Outcome of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCommentResponse {
    pub success: bool,
    pub count: u64,
}
