//! Assembling flat comment rows into reply trees

use super::model::{Comment, UserInfo};
use crate::types::CommentId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// How a node ended up where it is in the forest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Comment without a parent
    Root,
    /// Reply nested under its parent
    Reply,
    /// Declared parent was not among the rows; listed at the top level
    Orphan,
}

/// A comment and its nested replies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadNode {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserInfo>,
    pub kind: NodeKind,
    pub replies: Vec<ThreadNode>,
}

impl ThreadNode {
    fn new(comment: Comment, kind: NodeKind) -> Self {
        Self {
            comment,
            author: None,
            kind,
            replies: Vec::new(),
        }
    }

    pub fn id(&self) -> CommentId {
        self.comment.id
    }
}

// Flatten the subtree before dropping so deep threads do not recurse
impl Drop for ThreadNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

/// Build a forest from rows ordered ancestor-before-descendant
///
/// One pass, no recursion. Relative order of the input is kept both at the
/// top level and inside every reply list.
pub fn build_forest(rows: impl IntoIterator<Item = Comment>) -> Vec<ThreadNode> {
    let mut slots: Vec<Option<ThreadNode>> = Vec::new();
    let mut children: Vec<Vec<usize>> = Vec::new();
    let mut positions: HashMap<CommentId, usize> = HashMap::new();
    let mut roots = Vec::new();

    for comment in rows {
        let index = slots.len();
        let kind = match comment.parent_id {
            None => {
                roots.push(index);
                NodeKind::Root
            }
            Some(parent) => match positions.get(&parent) {
                Some(&parent_index) => {
                    children[parent_index].push(index);
                    NodeKind::Reply
                }
                None => {
                    warn!(
                        "Comment {} references missing parent {}, listing it as an orphan",
                        comment.id, parent
                    );
                    roots.push(index);
                    NodeKind::Orphan
                }
            },
        };

        positions.insert(comment.id, index);
        slots.push(Some(ThreadNode::new(comment, kind)));
        children.push(Vec::new());
    }

    // Children always sit after their parent, so folding from the back
    // finishes every subtree before its parent claims it.
    for index in (0..slots.len()).rev() {
        let replies: Vec<ThreadNode> = children[index]
            .iter()
            .filter_map(|&child| slots[child].take())
            .collect();
        if let Some(node) = slots[index].as_mut() {
            node.replies = replies;
        }
    }

    roots
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}

/// Depth-first, pre-order walk yielding (level, node)
pub struct Walk<'a> {
    stack: Vec<(usize, &'a ThreadNode)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a ThreadNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (level, node) = self.stack.pop()?;
        self.stack
            .extend(node.replies.iter().rev().map(|reply| (level + 1, reply)));
        Some((level, node))
    }
}

/// Walk every node of a forest in display order
pub fn walk(forest: &[ThreadNode]) -> Walk<'_> {
    Walk {
        stack: forest.iter().rev().map(|node| (0, node)).collect(),
    }
}

/// Visit every node of a forest mutably, parents before replies
pub fn for_each_mut(forest: &mut [ThreadNode], mut visit: impl FnMut(&mut ThreadNode)) {
    let mut stack: Vec<&mut ThreadNode> = forest.iter_mut().rev().collect();
    while let Some(node) = stack.pop() {
        visit(node);
        stack.extend(node.replies.iter_mut().rev());
    }
}

/// Total number of nodes in a forest
pub fn node_count(forest: &[ThreadNode]) -> usize {
    walk(forest).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PostId, UserId};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn row(id: u64, parent: Option<u64>, path: &[u64]) -> Comment {
        Comment {
            id: CommentId(id),
            post_id: PostId::from("post"),
            user_id: UserId::from("user"),
            content: format!("comment {}", id),
            parent_id: parent.map(CommentId),
            depth: path.len() as u32 - 1,
            path: path.iter().copied().map(CommentId).collect(),
            created_at: Utc::now(),
        }
    }

    fn shape(forest: &[ThreadNode]) -> Vec<(usize, u64)> {
        walk(forest).map(|(level, node)| (level, node.id().0)).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(build_forest(Vec::new()).is_empty());
    }

    #[test]
    fn test_nested_tree() {
        let rows = vec![
            row(1, None, &[1]),
            row(2, Some(1), &[1, 2]),
            row(4, Some(2), &[1, 2, 4]),
            row(3, Some(1), &[1, 3]),
            row(5, None, &[5]),
        ];

        let forest = build_forest(rows);

        assert_eq!(forest.len(), 2);
        assert_eq!(
            shape(&forest),
            vec![(0, 1), (1, 2), (2, 4), (1, 3), (0, 5)]
        );
        assert!(forest.iter().all(|n| n.kind == NodeKind::Root));
        assert_eq!(forest[0].replies[0].kind, NodeKind::Reply);
    }

    #[test]
    fn test_replies_match_parent_ids() {
        let rows = vec![
            row(1, None, &[1]),
            row(2, Some(1), &[1, 2]),
            row(3, Some(2), &[1, 2, 3]),
            row(6, Some(2), &[1, 2, 6]),
            row(7, Some(1), &[1, 7]),
        ];
        let forest = build_forest(rows.clone());

        for (_, node) in walk(&forest) {
            let mut expected: Vec<CommentId> = rows
                .iter()
                .filter(|r| r.parent_id == Some(node.id()))
                .map(|r| r.id)
                .collect();
            let mut actual: Vec<CommentId> = node.replies.iter().map(|r| r.id()).collect();
            expected.sort();
            actual.sort();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_missing_parent_becomes_orphan() {
        let rows = vec![row(1, None, &[1]), row(3, Some(2), &[1, 2, 3])];

        let forest = build_forest(rows);

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[1].id(), CommentId(3));
        assert_eq!(forest[1].kind, NodeKind::Orphan);
    }

    #[test]
    fn test_deep_chain_without_recursion() {
        // Paths are irrelevant to the builder; keep them short
        let rows: Vec<Comment> = (1..=20_000u64)
            .map(|id| row(id, if id == 1 { None } else { Some(id - 1) }, &[id]))
            .collect();

        let forest = build_forest(rows);

        assert_eq!(forest.len(), 1);
        assert_eq!(node_count(&forest), 20_000);
        let deepest = walk(&forest).map(|(level, _)| level).max();
        assert_eq!(deepest, Some(19_999));

        drop(forest);
    }

    #[test]
    fn test_for_each_mut_visits_all() {
        let rows = vec![
            row(1, None, &[1]),
            row(2, Some(1), &[1, 2]),
            row(3, None, &[3]),
        ];
        let mut forest = build_forest(rows);
        let mut visited = Vec::new();

        for_each_mut(&mut forest, |node| {
            node.comment.content = node.comment.content.to_uppercase();
            visited.push(node.id().0);
        });

        assert_eq!(visited, vec![1, 2, 3]);
        assert_eq!(forest[0].replies[0].comment.content, "COMMENT 2");
    }
}
