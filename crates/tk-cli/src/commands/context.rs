//! Resolved configuration and storage handles shared by every command

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tk_core::comment::CommentValidator;
use tk_core::config::Config;
use tk_core::id::SequentialIdGenerator;
use tk_core::service::CommentService;
use tk_core::store::CommentStore;
use tk_storage::{default_data_dir, FileSystemEngine, FileUserDirectory};

/// Name of the configuration file inside the data directory
pub const CONFIG_FILE: &str = "config.toml";

/// Where configuration came from and where data lives
#[derive(Debug)]
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub data_dir: PathBuf,
}

impl AppContext {
    /// Resolve paths from flags, then configuration, then platform defaults
    pub fn resolve(config_flag: Option<PathBuf>, data_dir_flag: Option<PathBuf>) -> Result<Self> {
        let config_path = config_flag.unwrap_or_else(|| {
            data_dir_flag
                .clone()
                .unwrap_or_else(default_data_dir)
                .join(CONFIG_FILE)
        });

        let config = Config::load_or_default(&config_path)
            .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

        let data_dir = data_dir_flag
            .or_else(|| config.storage.data_dir.clone())
            .unwrap_or_else(default_data_dir);

        Ok(Self {
            config,
            config_path,
            data_dir,
        })
    }

    /// Open the comment tables
    pub fn open_engine(&self) -> Result<FileSystemEngine> {
        FileSystemEngine::open(&self.data_dir, self.config.storage.lock_timeout())
            .with_context(|| format!("Failed to open data directory {}", self.data_dir.display()))
    }

    /// Open the user directory
    pub fn open_users(&self) -> Result<FileUserDirectory> {
        FileUserDirectory::open(&self.data_dir)
            .with_context(|| format!("Failed to open users in {}", self.data_dir.display()))
    }

    /// Wire up a comment service over the data directory
    pub fn open_service(&self) -> Result<CommentService<FileSystemEngine>> {
        let engine = self.open_engine()?;
        let ids = SequentialIdGenerator::starting_after(engine.max_comment_id()?);
        let store = CommentStore::new(engine, Arc::new(ids))
            .with_validator(CommentValidator::with_max_length(self.config.comments.max_length));

        Ok(CommentService::new(store, Arc::new(self.open_users()?))
            .with_listing(self.config.listing.clone()))
    }
}
