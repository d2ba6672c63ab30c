//! Row storage shared by the engines

use super::engine::TableRead;
use super::index::CommentIndex;
use crate::comment::Comment;
use crate::error::{IntegrityViolation, Result, ThreadError};
use crate::types::{CommentId, PostId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::warn;

/// The `posts` and `comments` tables plus their indexes
#[derive(Debug, Clone, Default, Serialize)]
pub struct Tables {
    posts: BTreeSet<PostId>,
    comments: BTreeMap<CommentId, Comment>,
    /// Highest id ever inserted, kept after that row is deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    last_comment_id: Option<CommentId>,
    #[serde(skip)]
    index: CommentIndex,
}

impl Tables {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rows without re-checking references
    ///
    /// Rows that point at a missing parent are kept (a tree read will show
    /// them as orphans) but logged.
    pub fn from_rows(
        posts: impl IntoIterator<Item = PostId>,
        comments: impl IntoIterator<Item = Comment>,
    ) -> Self {
        let mut tables = Self {
            posts: posts.into_iter().collect(),
            comments: comments.into_iter().map(|c| (c.id, c)).collect(),
            last_comment_id: None,
            index: CommentIndex::new(),
        };
        tables.last_comment_id = tables.comments.keys().next_back().copied();
        for comment in tables.comments.values() {
            if let Some(parent) = comment.parent_id {
                if !tables.comments.contains_key(&parent) {
                    warn!("Comment {} references missing parent {}", comment.id, parent);
                }
            }
        }
        tables.rebuild_index();
        tables
    }

    /// Rebuild index (after deserialization)
    pub fn rebuild_index(&mut self) {
        self.index.rebuild(self.comments.values());
    }

    /// Total number of comment rows
    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    /// Register a post
    pub fn insert_post(&mut self, post_id: PostId) -> bool {
        self.posts.insert(post_id)
    }

    /// Insert a comment row, enforcing keys and references
    pub fn insert_comment(&mut self, comment: Comment) -> Result<()> {
        if self.comments.contains_key(&comment.id) {
            return Err(ThreadError::Integrity(IntegrityViolation::DuplicateKey(
                comment.id,
            )));
        }
        if !self.posts.contains(&comment.post_id) {
            return Err(ThreadError::Integrity(IntegrityViolation::MissingPost(
                comment.post_id,
            )));
        }
        if let Some(parent_id) = comment.parent_id {
            let parent = self.comments.get(&parent_id).ok_or(ThreadError::Integrity(
                IntegrityViolation::MissingParent(parent_id),
            ))?;
            if parent.post_id != comment.post_id {
                return Err(ThreadError::Integrity(IntegrityViolation::CrossPostParent {
                    parent: parent_id,
                    post: comment.post_id,
                }));
            }
        }

        self.last_comment_id = self.last_comment_id.max(Some(comment.id));
        self.index.add(&comment);
        self.comments.insert(comment.id, comment);
        Ok(())
    }

    /// Delete rows by id
    pub fn delete_comments(&mut self, ids: &[CommentId]) -> Result<u64> {
        let doomed: HashSet<CommentId> = ids.iter().copied().collect();

        // Restrict: refuse to strand replies that are not deleted with us
        for id in &doomed {
            if let Some(child) = self
                .index
                .children_of(*id)
                .into_iter()
                .find(|child| !doomed.contains(child))
            {
                warn!("Refusing to delete comment {} while reply {} remains", id, child);
                return Err(ThreadError::Integrity(
                    IntegrityViolation::ReferencedByReplies(*id),
                ));
            }
        }

        let mut removed = 0;
        for id in &doomed {
            if let Some(comment) = self.comments.remove(id) {
                self.index.remove(&comment);
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Null out `parent_id` on every direct child of `parent`
    pub fn clear_parent(&mut self, parent: CommentId) -> u64 {
        let children = self.index.children_of(parent);
        for child in &children {
            if let Some(comment) = self.comments.get_mut(child) {
                comment.parent_id = None;
            }
            self.index.unlink_child(parent, *child);
        }
        children.len() as u64
    }
}

impl TableRead for Tables {
    fn post_exists(&self, post_id: &PostId) -> bool {
        self.posts.contains(post_id)
    }

    fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.get(&id)
    }

    fn comments_for_post(&self, post_id: &PostId) -> Vec<&Comment> {
        self.index
            .get_by_post(post_id)
            .into_iter()
            .filter_map(|id| self.comments.get(&id))
            .collect()
    }

    fn children_of(&self, id: CommentId) -> Vec<CommentId> {
        self.index.children_of(id)
    }

    fn path_scan(&self, prefix: &[CommentId]) -> Vec<CommentId> {
        self.index.path_scan(prefix)
    }

    fn count_for_post(&self, post_id: &PostId) -> u64 {
        self.index.post_comment_count(post_id) as u64
    }

    fn max_comment_id(&self) -> Option<CommentId> {
        self.last_comment_id
    }
}

// Custom deserialization to rebuild index
impl<'de> Deserialize<'de> for Tables {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct TablesHelper {
            #[serde(default)]
            posts: BTreeSet<PostId>,
            #[serde(default)]
            comments: BTreeMap<CommentId, Comment>,
            #[serde(default)]
            last_comment_id: Option<CommentId>,
        }

        let helper = TablesHelper::deserialize(deserializer)?;
        let mut tables = Self::from_rows(helper.posts, helper.comments.into_values());
        tables.last_comment_id = tables.last_comment_id.max(helper.last_comment_id);
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use chrono::Utc;

    fn comment(id: u64, post: &str, parent: Option<&Comment>) -> Comment {
        Comment::placed_under(
            CommentId(id),
            PostId::from(post),
            UserId::from("user"),
            "text".to_string(),
            parent,
            Utc::now(),
        )
    }

    fn tables_with_posts(posts: &[&str]) -> Tables {
        let mut tables = Tables::new();
        for post in posts {
            tables.insert_post(PostId::from(*post));
        }
        tables
    }

    #[test]
    fn test_insert_enforces_post_reference() {
        let mut tables = tables_with_posts(&[]);
        let err = tables.insert_comment(comment(1, "p1", None)).unwrap_err();
        assert!(matches!(
            err,
            ThreadError::Integrity(IntegrityViolation::MissingPost(_))
        ));
    }

    #[test]
    fn test_insert_enforces_parent_reference() {
        let mut tables = tables_with_posts(&["p1", "p2"]);
        let a = comment(1, "p1", None);
        tables.insert_comment(a.clone()).unwrap();

        let ghost = comment(9, "p1", None);
        let err = tables
            .insert_comment(comment(2, "p1", Some(&ghost)))
            .unwrap_err();
        assert!(matches!(
            err,
            ThreadError::Integrity(IntegrityViolation::MissingParent(CommentId(9)))
        ));

        let err = tables.insert_comment(comment(3, "p2", Some(&a))).unwrap_err();
        assert!(matches!(
            err,
            ThreadError::Integrity(IntegrityViolation::CrossPostParent { .. })
        ));
    }

    #[test]
    fn test_duplicate_key() {
        let mut tables = tables_with_posts(&["p1"]);
        tables.insert_comment(comment(1, "p1", None)).unwrap();
        let err = tables.insert_comment(comment(1, "p1", None)).unwrap_err();
        assert!(matches!(
            err,
            ThreadError::Integrity(IntegrityViolation::DuplicateKey(CommentId(1)))
        ));
    }

    #[test]
    fn test_delete_restricts_stranded_replies() {
        let mut tables = tables_with_posts(&["p1"]);
        let a = comment(1, "p1", None);
        let b = comment(2, "p1", Some(&a));
        tables.insert_comment(a).unwrap();
        tables.insert_comment(b).unwrap();

        assert!(tables.delete_comments(&[CommentId(1)]).is_err());
        assert_eq!(tables.comment_count(), 2);

        assert_eq!(
            tables.delete_comments(&[CommentId(1), CommentId(2)]).unwrap(),
            2
        );
        assert_eq!(tables.comment_count(), 0);
    }

    #[test]
    fn test_clear_parent() {
        let mut tables = tables_with_posts(&["p1"]);
        let a = comment(1, "p1", None);
        let b = comment(2, "p1", Some(&a));
        let c = comment(3, "p1", Some(&a));
        tables.insert_comment(a).unwrap();
        tables.insert_comment(b).unwrap();
        tables.insert_comment(c).unwrap();

        assert_eq!(tables.clear_parent(CommentId(1)), 2);
        assert!(tables.children_of(CommentId(1)).is_empty());
        assert_eq!(tables.comment(CommentId(2)).unwrap().parent_id, None);
        assert_eq!(tables.delete_comments(&[CommentId(1)]).unwrap(), 1);
    }

    #[test]
    fn test_serialization_rebuilds_index() {
        let mut tables = tables_with_posts(&["p1"]);
        let a = comment(1, "p1", None);
        let b = comment(2, "p1", Some(&a));
        tables.insert_comment(a).unwrap();
        tables.insert_comment(b).unwrap();

        let json = serde_json::to_string(&tables).unwrap();
        let tables2: Tables = serde_json::from_str(&json).unwrap();

        assert_eq!(tables2.count_for_post(&PostId::from("p1")), 2);
        assert_eq!(tables2.children_of(CommentId(1)), vec![CommentId(2)]);
        assert_eq!(tables2.max_comment_id(), Some(CommentId(2)));
    }

    #[test]
    fn test_max_comment_id_survives_deleting_newest() {
        let mut tables = tables_with_posts(&["p1"]);
        tables.insert_comment(comment(1, "p1", None)).unwrap();
        tables.insert_comment(comment(2, "p1", None)).unwrap();
        tables.delete_comments(&[CommentId(2)]).unwrap();
        assert_eq!(tables.max_comment_id(), Some(CommentId(2)));

        let json = serde_json::to_string(&tables).unwrap();
        let reloaded: Tables = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded.comment_count(), 1);
        assert_eq!(reloaded.max_comment_id(), Some(CommentId(2)));
    }

    #[test]
    fn test_files_without_high_water_mark_use_highest_row() {
        let mut tables = tables_with_posts(&["p1"]);
        tables.insert_comment(comment(4, "p1", None)).unwrap();

        let mut value = serde_json::to_value(&tables).unwrap();
        value.as_object_mut().unwrap().remove("last_comment_id");
        let reloaded: Tables = serde_json::from_value(value).unwrap();
        assert_eq!(reloaded.max_comment_id(), Some(CommentId(4)));
    }
}
