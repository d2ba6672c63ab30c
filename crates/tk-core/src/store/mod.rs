//! Comment storage module
//!
//! A relational engine keeps comments as flat rows; [`CommentStore`] layers
//! tree semantics on top through materialized paths.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tk_core::id::SequentialIdGenerator;
//! use tk_core::store::{CommentStore, MemoryEngine};
//!
//! let store = CommentStore::new(MemoryEngine::new(), Arc::new(SequentialIdGenerator::new()));
//! store.register_post(&post_id)?;
//! let root = store.create(new_comment)?;
//! let rows = store.fetch_subtree(&post_id)?;
//! ```

mod comment_store;
mod engine;
mod index;
mod memory;
mod tables;

pub use comment_store::CommentStore;
pub(crate) use comment_store::{delete_single_in, delete_subtree_in};
pub use engine::{StorageEngine, TableRead, TableWrite};
pub use index::CommentIndex;
pub use memory::{MemoryEngine, TableSink, TablesSnapshot, TablesTxn, DEFAULT_LOCK_TIMEOUT};
pub use tables::Tables;
