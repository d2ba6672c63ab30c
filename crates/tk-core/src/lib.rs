//! tk-core - Core library for threadkeeper
//!
//! This crate provides threaded comments for posts: storage of comment rows
//! with materialized paths, assembly of those rows into reply trees, the
//! delete policy, and the service that ties them to an author directory.

pub mod error;
pub mod types;
pub mod config;
pub mod id;
pub mod comment;
pub mod store;
pub mod deletion;
pub mod resolver;
pub mod service;

pub use error::{ErrorKind, IntegrityViolation, Result, ThreadError};
pub use types::*;
