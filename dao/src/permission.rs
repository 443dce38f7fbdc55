use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;

use crate::DaoError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserEntity {
    pub name: Arc<str>,
}

#[automock]
#[async_trait]
pub trait PermissionDao {
    async fn has_privilege(&self, user: &str, privilege: &str) -> Result<bool, DaoError>;

    async fn find_user(&self, username: &str) -> Result<Option<UserEntity>, DaoError>;
    async fn create_user(&self, user: &UserEntity, process: &str) -> Result<(), DaoError>;
    async fn add_user_role(&self, user: &str, role: &str, process: &str) -> Result<(), DaoError>;
}
