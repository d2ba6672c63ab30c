//! File-backed user directory

use crate::format::{check_schema_version, read_json, write_json_atomic, UsersFile};
use crate::fs_engine::ensure_dir;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tk_core::comment::UserInfo;
use tk_core::resolver::UserResolver;
use tk_core::{Result, ThreadError, UserId};
use tracing::debug;

/// Name of the user directory file inside the data directory
pub const USERS_FILE: &str = "users.json";

/// Users stored in `users.json`
pub struct FileUserDirectory {
    path: PathBuf,
    users: RwLock<BTreeMap<UserId, UserInfo>>,
}

impl FileUserDirectory {
    /// Open the directory file under `base_dir`
    pub fn open(base_dir: &Path) -> Result<Self> {
        ensure_dir(base_dir)?;
        let path = base_dir.join(USERS_FILE);

        let users = match read_json::<UsersFile>(&path)? {
            Some(file) => {
                check_schema_version(&file.schema_version)?;
                file.users
            }
            None => Vec::new(),
        };
        debug!("Loaded {} user(s) from {:?}", users.len(), path);

        Ok(Self {
            path,
            users: RwLock::new(users.into_iter().map(|u| (u.id.clone(), u)).collect()),
        })
    }

    /// Add a user, replacing any entry with the same id
    ///
    /// Returns `true` when the id was new.
    pub fn upsert(&self, user: UserInfo) -> Result<bool> {
        let mut users = self
            .users
            .write()
            .map_err(|_| ThreadError::LockPoisoned("user directory"))?;

        let mut updated = users.clone();
        let is_new = updated.insert(user.id.clone(), user).is_none();
        write_json_atomic(&self.path, &UsersFile::new(updated.values().cloned().collect()))?;

        *users = updated;
        Ok(is_new)
    }

    /// All users ordered by id
    pub fn list(&self) -> Result<Vec<UserInfo>> {
        let users = self
            .users
            .read()
            .map_err(|_| ThreadError::LockPoisoned("user directory"))?;
        Ok(users.values().cloned().collect())
    }
}

impl UserResolver for FileUserDirectory {
    fn get_user(&self, id: &UserId) -> Result<UserInfo> {
        let users = self
            .users
            .read()
            .map_err(|_| ThreadError::LockPoisoned("user directory"))?;
        users
            .get(id)
            .cloned()
            .ok_or_else(|| ThreadError::UserNotFound(id.clone()))
    }

    fn get_users(&self, ids: &[UserId]) -> Result<HashMap<UserId, UserInfo>> {
        let users = self
            .users
            .read()
            .map_err(|_| ThreadError::LockPoisoned("user directory"))?;
        ids.iter()
            .map(|id| {
                users
                    .get(id)
                    .map(|user| (id.clone(), user.clone()))
                    .ok_or_else(|| ThreadError::UserNotFound(id.clone()))
            })
            .collect()
    }
}
