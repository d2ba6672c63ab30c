//! Comment module
//!
//! Comment rows, their validation, and assembly into reply trees.

pub mod model;
pub mod validator;
pub mod builder;
pub mod tree;

pub use model::*;
pub use validator::{CommentValidator, MAX_COMMENT_LENGTH, MIN_COMMENT_LENGTH};
pub use builder::CommentBuilder;
pub use tree::{build_forest, for_each_mut, node_count, walk, NodeKind, ThreadNode, Walk};
