//! Comment validation

use super::model::NewComment;
use crate::error::{Result, ThreadError};

/// Maximum comment length (default)
pub const MAX_COMMENT_LENGTH: usize = 10000;

/// Minimum comment length
pub const MIN_COMMENT_LENGTH: usize = 1;

/// Validator for new comments
#[derive(Debug, Clone)]
pub struct CommentValidator {
    max_length: usize,
    min_length: usize,
}

impl CommentValidator {
    /// Create a new validator with default settings
    pub fn new() -> Self {
        Self {
            max_length: MAX_COMMENT_LENGTH,
            min_length: MIN_COMMENT_LENGTH,
        }
    }

    /// Create a new validator with custom max length
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            min_length: MIN_COMMENT_LENGTH,
        }
    }

    /// Validate comment content
    pub fn validate_content(&self, content: &str) -> Result<()> {
        let length = content.trim().chars().count();

        if length < self.min_length {
            return Err(ThreadError::Validation(
                "Comment content cannot be empty".to_string(),
            ));
        }

        if length > self.max_length {
            return Err(ThreadError::Validation(format!(
                "Comment content exceeds maximum length of {} characters",
                self.max_length
            )));
        }

        Ok(())
    }

    /// Validate a create request
    pub fn validate(&self, new: &NewComment) -> Result<()> {
        if new.post_id.as_str().trim().is_empty() {
            return Err(ThreadError::Validation(
                "Post ID cannot be empty".to_string(),
            ));
        }
        if new.user_id.as_str().trim().is_empty() {
            return Err(ThreadError::Validation(
                "User ID cannot be empty".to_string(),
            ));
        }
        self.validate_content(&new.content)
    }
}

impl Default for CommentValidator {
    fn default() -> Self {
        Self::new()
    }
}
