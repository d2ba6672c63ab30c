//! Comment id issuance

use crate::types::CommentId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of new comment ids
///
/// Implementations must hand out strictly increasing ids: sibling order in a
/// thread is the order of their ids.
pub trait IdGenerator: Send + Sync {
    /// Issue the next id
    fn next_id(&self) -> CommentId;

    /// Never issue `last` or anything below it from now on
    ///
    /// Called inside a write transaction with the highest id already stored.
    fn advance_past(&self, _last: CommentId) {}
}

/// Counter-based generator
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// Start issuing at 1
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start issuing at `first`
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Resume after the highest id already stored
    pub fn starting_after(last: Option<CommentId>) -> Self {
        Self::starting_at(last.map(|id| id.0 + 1).unwrap_or(1))
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> CommentId {
        CommentId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    fn advance_past(&self, last: CommentId) {
        self.next.fetch_max(last.0 + 1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIdGenerator::new();
        assert_eq!(ids.next_id(), CommentId(1));
        assert_eq!(ids.next_id(), CommentId(2));
    }

    #[test]
    fn test_resume_after_last() {
        assert_eq!(
            SequentialIdGenerator::starting_after(Some(CommentId(41))).next_id(),
            CommentId(42)
        );
        assert_eq!(
            SequentialIdGenerator::starting_after(None).next_id(),
            CommentId(1)
        );
    }

    #[test]
    fn test_advance_past_only_moves_forward() {
        let ids = SequentialIdGenerator::starting_at(5);
        ids.advance_past(CommentId(2));
        assert_eq!(ids.next_id(), CommentId(5));

        ids.advance_past(CommentId(9));
        assert_eq!(ids.next_id(), CommentId(10));
    }

    #[test]
    fn test_unique_across_threads() {
        let ids = Arc::new(SequentialIdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..250).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 1000);
    }
}
