//! User directory boundary
//!
//! Registration and authentication live outside this core; all it needs is a
//! way to resolve display names by id for the view projector.

use async_trait::async_trait;
use common::error::Result;
use common::model::user::User;
use dashmap::DashMap;
use uuid::Uuid;

/// Resolves users by id. Implemented by the external user system's adapter.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Get a user by ID
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
}

/// In-memory user directory, used for tests and demo wiring
pub struct InMemoryUserDirectory {
    /// Users by ID
    pub users: DashMap<Uuid, User>,
}

impl InMemoryUserDirectory {
    /// Create a new empty directory
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    /// Add or replace a user
    pub fn upsert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }
}
