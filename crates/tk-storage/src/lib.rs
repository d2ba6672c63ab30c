//! tk-storage - Storage library for threadkeeper
//!
//! This crate provides the file-backed storage engine and user directory.

mod format;
mod fs_engine;
mod user_directory;

pub use format::{check_schema_version, TablesFile, UsersFile, CURRENT_SCHEMA_VERSION};
pub use fs_engine::{default_data_dir, FileSystemEngine, FileTxn, LOCK_FILE, TABLES_FILE};
pub use user_directory::{FileUserDirectory, USERS_FILE};
