//! Author lookup collaborator

use crate::comment::UserInfo;
use crate::error::{Result, ThreadError};
use crate::types::UserId;
use std::collections::HashMap;
use std::sync::RwLock;

/// Resolves user ids to author display info
pub trait UserResolver: Send + Sync {
    /// Look up one user
    fn get_user(&self, id: &UserId) -> Result<UserInfo>;

    /// Look up several users at once
    ///
    /// The default asks for each id in turn; directories that can batch
    /// should override it.
    fn get_users(&self, ids: &[UserId]) -> Result<HashMap<UserId, UserInfo>> {
        ids.iter()
            .map(|id| Ok((id.clone(), self.get_user(id)?)))
            .collect()
    }
}

/// User directory held in memory
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, UserInfo>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a list of users
    pub fn with_users(users: impl IntoIterator<Item = UserInfo>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id.clone(), u)).collect()),
        }
    }

    /// Add or replace a user
    pub fn upsert(&self, user: UserInfo) -> Result<()> {
        let mut users = self
            .users
            .write()
            .map_err(|_| ThreadError::LockPoisoned("user directory"))?;
        users.insert(user.id.clone(), user);
        Ok(())
    }
}

impl UserResolver for InMemoryUserDirectory {
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
}
