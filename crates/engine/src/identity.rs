//! Identity/role collaborator trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use domain::Role;
use tokio::sync::RwLock;

use crate::error::Result;

/// Resolves a user to their role.
///
/// Authentication happens outside the engine; this is only the
/// `user_id -> role` lookup used to authorize transitions.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Returns `None` for users the directory does not know.
    async fn role_of(&self, user_id: UserId) -> Result<Option<Role>>;
}

/// In-memory role directory for tests and seeded deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRoleDirectory {
    roles: Arc<RwLock<HashMap<UserId, Role>>>,
}

impl InMemoryRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory from known `(user, role)` pairs.
    pub fn with_users(users: impl IntoIterator<Item = (UserId, Role)>) -> Self {
        Self {
            roles: Arc::new(RwLock::new(users.into_iter().collect())),
        }
    }

    pub async fn assign(&self, user_id: UserId, role: Role) {
        self.roles.write().await.insert(user_id, role);
    }

    pub async fn revoke(&self, user_id: UserId) {
        self.roles.write().await.remove(&user_id);
    }

    /// Returns the number of known users.
    pub async fn len(&self) -> usize {
        self.roles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.roles.read().await.is_empty()
    }
}

#[async_trait]
impl RoleDirectory for InMemoryRoleDirectory {
    async fn role_of(&self, user_id: UserId) -> Result<Option<Role>> {
        Ok(self.roles.read().await.get(&user_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_assign_and_revoke() {
        let directory = InMemoryRoleDirectory::new();
        let user = UserId::new();
        assert_eq!(directory.role_of(user).await.unwrap(), None);

        directory.assign(user, Role::Coordinator).await;
        assert_eq!(directory.role_of(user).await.unwrap(), Some(Role::Coordinator));
        assert_eq!(directory.len().await, 1);

        directory.revoke(user).await;
        assert!(directory.is_empty().await);
    }

    #[tokio::test]
    async fn test_with_users() {
        let admin = UserId::new();
        let directory = InMemoryRoleDirectory::with_users([(admin, Role::Admin)]);
        assert_eq!(directory.role_of(admin).await.unwrap(), Some(Role::Admin));
    }
}
