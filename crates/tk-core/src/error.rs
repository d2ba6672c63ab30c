//! Error types for threadkeeper

use crate::types::{CommentId, PostId, UserId};
use std::fmt;
use thiserror::Error;

/// Main error type for threadkeeper
#[derive(Debug, Error)]
pub enum ThreadError {
    /// Malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Post not found
    #[error("Post not found: {0}")]
    PostNotFound(PostId),

    /// Parent comment missing or attached to a different post
    #[error("Parent comment not found: {0}")]
    ParentNotFound(CommentId),

    /// Comment not found
    #[error("Comment not found: {0}")]
    CommentNotFound(CommentId),

    /// Author not known to the user resolver
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// Constraint rejected by the storage engine
    #[error("Integrity violation: {0}")]
    Integrity(IntegrityViolation),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Write lock could not be acquired in time
    #[error("Timed out after {waited_ms}ms waiting for the write lock")]
    LockTimeout { waited_ms: u64 },

    /// A thread panicked while holding a storage lock
    #[error("Storage lock poisoned: {0}")]
    LockPoisoned(&'static str),

    /// Unsupported schema version
    #[error("Unsupported schema version: {0}")]
    UnsupportedSchemaVersion(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ThreadError>,
    },
}

/// Coarse classification used by boundary layers to pick a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Integrity,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::NotFound => write!(f, "not-found"),
            ErrorKind::Integrity => write!(f, "integrity"),
            ErrorKind::Storage => write!(f, "storage"),
        }
    }
}

/// Constraint violations reported by a storage engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// Primary key already taken
    DuplicateKey(CommentId),
    /// Row references a post that does not exist
    MissingPost(PostId),
    /// Row references a parent comment that does not exist
    MissingParent(CommentId),
    /// Row references a parent comment of another post
    CrossPostParent { parent: CommentId, post: PostId },
    /// Row cannot be deleted while replies still point at it
    ReferencedByReplies(CommentId),
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityViolation::DuplicateKey(id) => write!(f, "duplicate comment id {}", id),
            IntegrityViolation::MissingPost(post) => write!(f, "post {} does not exist", post),
            IntegrityViolation::MissingParent(parent) => {
                write!(f, "parent comment {} does not exist", parent)
            }
            IntegrityViolation::CrossPostParent { parent, post } => {
                write!(f, "parent comment {} does not belong to post {}", parent, post)
            }
            IntegrityViolation::ReferencedByReplies(id) => {
                write!(f, "comment {} is still referenced by replies", id)
            }
        }
    }
}

impl ThreadError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ThreadError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ThreadError::Validation(_) => ErrorKind::Validation,
            ThreadError::PostNotFound(_)
            | ThreadError::ParentNotFound(_)
            | ThreadError::CommentNotFound(_)
            | ThreadError::UserNotFound(_) => ErrorKind::NotFound,
            ThreadError::Integrity(_) => ErrorKind::Integrity,
            ThreadError::WithContext { source, .. } => source.kind(),
            ThreadError::Io(_)
            | ThreadError::Serde(_)
            | ThreadError::Toml(_)
            | ThreadError::Config(_)
            | ThreadError::LockTimeout { .. }
            | ThreadError::LockPoisoned(_)
            | ThreadError::UnsupportedSchemaVersion(_) => ErrorKind::Storage,
        }
    }

    /// Whether a caller may reasonably retry the request unchanged
    pub fn is_retryable(&self) -> bool {
        match self {
            ThreadError::Io(_) | ThreadError::LockTimeout { .. } => true,
            ThreadError::WithContext { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Result type alias for threadkeeper
pub type Result<T> = std::result::Result<T, ThreadError>;
