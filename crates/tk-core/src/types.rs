//! Core type definitions for threadkeeper

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a comment
///
/// Ids are issued in increasing order, so comparing two ids compares their
/// creation order. Materialized paths rely on this to sort siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub u64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CommentId {
    type Err = crate::ThreadError;

    fn from_str(s: &str) -> crate::Result<Self> {
        s.trim().parse::<u64>().map(CommentId).map_err(|_| {
            crate::ThreadError::Validation(format!("Invalid comment ID: {}", s))
        })
    }
}

/// Identifier of a post owned by the external posts subsystem
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    /// Create from a string with validation
    pub fn from_string(s: impl Into<String>) -> crate::Result<Self> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(crate::ThreadError::Validation(
                "Post ID cannot be empty".to_string(),
            ));
        }
        Ok(PostId(s))
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        PostId(s.to_string())
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a user owned by the external identity subsystem
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create from a string with validation
    pub fn from_string(s: impl Into<String>) -> crate::Result<Self> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(crate::ThreadError::Validation(
                "User ID cannot be empty".to_string(),
            ));
        }
        Ok(UserId(s))
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Schema version of persisted data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub major: u32,
    pub minor: u32,
}

impl ProtocolVersion {
    pub const V1_0: Self = Self { major: 1, minor: 0 };

    /// Check if this version is compatible with another version
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.major == other.major
    }

    /// Parse a "major.minor" string
    pub fn parse(s: &str) -> Option<Self> {
        let (major, minor) = s.split_once('.')?;
        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::V1_0
    }
}
