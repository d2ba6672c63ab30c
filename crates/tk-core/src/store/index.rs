//! Secondary indexes over the comments table

use crate::comment::Comment;
use crate::types::{CommentId, PostId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Multi-dimensional index for comment rows
#[derive(Debug, Clone, Default)]
pub struct CommentIndex {
    /// Index by post
    by_post: HashMap<PostId, BTreeSet<CommentId>>,
    /// Index by parent comment
    by_parent: HashMap<CommentId, BTreeSet<CommentId>>,
    /// Ordered index by materialized path
    by_path: BTreeMap<Vec<CommentId>, CommentId>,
}

impl CommentIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a comment to the index
    pub fn add(&mut self, comment: &Comment) {
        self.by_post
            .entry(comment.post_id.clone())
            .or_default()
            .insert(comment.id);

        if let Some(parent) = comment.parent_id {
            self.by_parent.entry(parent).or_default().insert(comment.id);
        }

        self.by_path.insert(comment.path.clone(), comment.id);
    }

    /// Remove a comment from the index
    pub fn remove(&mut self, comment: &Comment) {
        if let Some(ids) = self.by_post.get_mut(&comment.post_id) {
            ids.remove(&comment.id);
            if ids.is_empty() {
                self.by_post.remove(&comment.post_id);
            }
        }

        if let Some(parent) = comment.parent_id {
            self.unlink_child(parent, comment.id);
        }

        // Replies are keyed under their own id as parent
        self.by_parent.remove(&comment.id);

        self.by_path.remove(&comment.path);
    }

    /// Forget that `child` replies to `parent`
    pub fn unlink_child(&mut self, parent: CommentId, child: CommentId) {
        if let Some(ids) = self.by_parent.get_mut(&parent) {
            ids.remove(&child);
            if ids.is_empty() {
                self.by_parent.remove(&parent);
            }
        }
    }

    /// Get comment ids by post
    pub fn get_by_post(&self, post_id: &PostId) -> Vec<CommentId> {
        self.by_post
            .get(post_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Get direct children of a comment
    pub fn children_of(&self, parent: CommentId) -> Vec<CommentId> {
        self.by_parent
            .get(&parent)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Ids whose path starts with `prefix`, in path order
    pub fn path_scan(&self, prefix: &[CommentId]) -> Vec<CommentId> {
        self.by_path
            .range(prefix.to_vec()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(_, id)| *id)
            .collect()
    }

    /// Get comment count for a post
    pub fn post_comment_count(&self, post_id: &PostId) -> usize {
        self.by_post.get(post_id).map(|ids| ids.len()).unwrap_or(0)
    }

    /// Clear the entire index
    pub fn clear(&mut self) {
        self.by_post.clear();
        self.by_parent.clear();
        self.by_path.clear();
    }

    /// Rebuild index from a collection of comments
    pub fn rebuild(&mut self, comments: impl IntoIterator<Item = impl std::borrow::Borrow<Comment>>) {
        self.clear();
        for comment in comments {
            self.add(comment.borrow());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use chrono::Utc;

    fn create_test_comment(post: &str, id: u64, parent: Option<&Comment>) -> Comment {
        Comment::placed_under(
            CommentId(id),
            PostId::from(post),
            UserId::from("user"),
            "Test".to_string(),
            parent,
            Utc::now(),
        )
    }

    #[test]
    fn test_add_and_get_by_post() {
        let mut index = CommentIndex::new();
        let a = create_test_comment("p1", 1, None);
        let b = create_test_comment("p1", 2, Some(&a));
        let c = create_test_comment("p2", 3, None);

        index.add(&a);
        index.add(&b);
        index.add(&c);

        assert_eq!(index.get_by_post(&PostId::from("p1")), vec![CommentId(1), CommentId(2)]);
        assert_eq!(index.post_comment_count(&PostId::from("p2")), 1);
        assert_eq!(index.post_comment_count(&PostId::from("p3")), 0);
    }

    #[test]
    fn test_children_of() {
        let mut index = CommentIndex::new();
        let a = create_test_comment("p1", 1, None);
        let b = create_test_comment("p1", 2, Some(&a));
        let c = create_test_comment("p1", 3, Some(&a));

        index.add(&a);
        index.add(&b);
        index.add(&c);

        assert_eq!(index.children_of(CommentId(1)), vec![CommentId(2), CommentId(3)]);
        assert!(index.children_of(CommentId(2)).is_empty());
    }

    #[test]
    fn test_path_scan() {
        let mut index = CommentIndex::new();
        let a = create_test_comment("p1", 1, None);
        let b = create_test_comment("p1", 2, Some(&a));
        let c = create_test_comment("p1", 3, Some(&b));
        let d = create_test_comment("p1", 4, Some(&a));
        let e = create_test_comment("p1", 5, None);

        for comment in [&a, &b, &c, &d, &e] {
            index.add(comment);
        }

        assert_eq!(index.path_scan(&b.path), vec![CommentId(2), CommentId(3)]);
        assert_eq!(
            index.path_scan(&a.path),
            vec![CommentId(1), CommentId(2), CommentId(3), CommentId(4)]
        );
        assert_eq!(index.path_scan(&e.path), vec![CommentId(5)]);
    }

    #[test]
    fn test_path_scan_does_not_match_numeric_prefixes() {
        let mut index = CommentIndex::new();
        let one = create_test_comment("p1", 1, None);
        let ten = create_test_comment("p1", 10, None);
        index.add(&one);
        index.add(&ten);

        assert_eq!(index.path_scan(&one.path), vec![CommentId(1)]);
    }

    #[test]
    fn test_remove() {
        let mut index = CommentIndex::new();
        let a = create_test_comment("p1", 1, None);
        let b = create_test_comment("p1", 2, Some(&a));

        index.add(&a);
        index.add(&b);
        index.remove(&b);

        assert!(index.children_of(CommentId(1)).is_empty());
        assert_eq!(index.path_scan(&a.path), vec![CommentId(1)]);
        assert_eq!(index.post_comment_count(&PostId::from("p1")), 1);
    }

    #[test]
    fn test_clear() {
        let mut index = CommentIndex::new();
        index.add(&create_test_comment("p1", 1, None));

        assert!(!index.by_post.is_empty());

        index.clear();

        assert!(index.by_post.is_empty());
        assert!(index.by_parent.is_empty());
        assert!(index.by_path.is_empty());
    }
}
