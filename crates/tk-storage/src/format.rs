//! On-disk file formats and atomic file writes

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tk_core::comment::UserInfo;
use tk_core::store::Tables;
use tk_core::{ProtocolVersion, Result, ThreadError};
use tracing::{debug, info};

/// Current schema version of every file we write
pub const CURRENT_SCHEMA_VERSION: &str = "1.0";

/// Comment tables file (`comments.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesFile<T = Tables> {
    /// Schema version for compatibility checks
    pub schema_version: String,
    /// Post and comment rows
    pub tables: T,
    /// Extra fields for forward compatibility
    #[serde(flatten, default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl<T> TablesFile<T> {
    pub fn new(tables: T) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            tables,
            extra: HashMap::new(),
        }
    }
}

/// User directory file (`users.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersFile {
    pub schema_version: String,
    #[serde(default)]
    pub users: Vec<UserInfo>,
    #[serde(flatten, default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl UsersFile {
    pub fn new(users: Vec<UserInfo>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            users,
            extra: HashMap::new(),
        }
    }
}

/// Reject files written by an incompatible major version
pub fn check_schema_version(found: &str) -> Result<()> {
    let current = ProtocolVersion::V1_0;
    let version = ProtocolVersion::parse(found)
        .ok_or_else(|| ThreadError::UnsupportedSchemaVersion(found.to_string()))?;

    if !version.is_compatible(&current) {
        return Err(ThreadError::UnsupportedSchemaVersion(format!(
            "{} (expected {}.x)",
            found, current.major
        )));
    }
    if version != current {
        info!("Reading schema {} with {} reader", version, current);
    }
    Ok(())
}

/// Temporary sibling used for atomic writes
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

/// Write JSON atomically (write to temp, then rename)
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let temp_path = temp_path(path);

    let temp_file = fs::File::create(&temp_path).map_err(|e| {
        ThreadError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to create temp file {}: {}", temp_path.display(), e),
        ))
    })?;
    let mut writer = BufWriter::new(temp_file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| ThreadError::Io(e.into_error()))?
        .sync_all()?;

    // Rename is atomic on the same filesystem
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ThreadError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to rename temp file: {}", e),
        ))
    })?;

    debug!("Wrote {:?}", path);
    Ok(())
}

/// Read a JSON file, `None` when it does not exist
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ThreadError::Io(e)),
    };

    let value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ThreadError::from(e).with_context(format!("Failed to parse {}", path.display())))?;
    Ok(Some(value))
}
