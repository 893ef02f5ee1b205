//! User directory: the host-supplied source of identities and authorities.

use async_trait::async_trait;
use dashmap::DashMap;

use super::AuthError;
use crate::models::auth::Identity;

/// Loads identities for authentication, rotation and login.
///
/// Implementations return `Ok(None)` for unknown users and reserve `Err` for
/// backend failures.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn load_by_user_id(&self, user_id: i64) -> Result<Option<Identity>, AuthError>;

    async fn load_by_username(&self, username: &str) -> Result<Option<Identity>, AuthError>;
}

/// Directory held in memory. Used by the demo server and tests.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<i64, Identity>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded with `admin` (id 1) and `user` (id 2).
    pub fn demo() -> Self {
        let directory = Self::new();
        directory.insert(Identity::new(1, "admin", ["api:add", "api:query", "ROLE_ADMIN"]));
        directory.insert(Identity::new(2, "user", ["api:query", "ROLE_USER"]));
        directory
    }

    /// Add or replace a user.
    pub fn insert(&self, identity: Identity) {
        self.users.insert(identity.user_id, identity);
    }

    pub fn remove(&self, user_id: i64) -> Option<Identity> {
        self.users.remove(&user_id).map(|(_, identity)| identity)
    }

    /// Replace a user's authorities. Returns `false` if the user is unknown.
    pub fn set_authorities<I, S>(&self, user_id: i64, authorities: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self.users.get_mut(&user_id) {
            Some(mut identity) => {
                identity.authorities = authorities.into_iter().map(Into::into).collect();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn load_by_user_id(&self, user_id: i64) -> Result<Option<Identity>, AuthError> {
        Ok(self.users.get(&user_id).map(|identity| identity.clone()))
    }

    async fn load_by_username(&self, username: &str) -> Result<Option<Identity>, AuthError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.username == username)
            .map(|entry| entry.value().clone()))
    }
}
