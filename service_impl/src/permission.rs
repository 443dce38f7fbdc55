use std::sync::Arc;

use async_trait::async_trait;
use dao::PermissionDao;
use service::permission::{Authentication, ADMIN_PRIVILEGE, HR_PRIVILEGE};
use service::user_service::UserService;
use service::ServiceError;

const PERMISSION_SERVICE_PROCESS: &str = "permission-service";

pub trait PermissionServiceDeps {
    type Context: Clone + PartialEq + Eq + std::fmt::Debug + Send + Sync + 'static;
    type PermissionDao: PermissionDao + Send + Sync;
    type UserService: UserService<Context = Self::Context> + Send + Sync;
}

pub struct PermissionServiceImpl<Deps: PermissionServiceDeps> {
    pub permission_dao: Arc<Deps::PermissionDao>,
    pub user_service: Arc<Deps::UserService>,
}

#[async_trait]
impl<Deps: PermissionServiceDeps> service::PermissionService for PermissionServiceImpl<Deps> {
    type Context = Deps::Context;

    async fn current_user_id(
        &self,
        context: Authentication<Self::Context>,
    ) -> Result<Option<Arc<str>>, ServiceError> {
        match context {
            Authentication::Full => Ok(None),
            Authentication::Context(context) => {
                let current_user = self.user_service.current_user(context).await?;
                Ok(Some(current_user))
            }
        }
    }

    async fn check_permission(
        &self,
        privilege: &str,
        context: Authentication<Self::Context>,
    ) -> Result<(), ServiceError> {
        match context {
            Authentication::Full => Ok(()),
            Authentication::Context(context) => {
                let current_user = self.user_service.current_user(context).await?;
                if self
                    .permission_dao
                    .has_privilege(current_user.as_ref(), privilege)
                    .await?
                {
                    Ok(())
                } else {
                    Err(ServiceError::Forbidden)
                }
            }
        }
    }

    async fn check_only_full_authentication(
        &self,
        context: Authentication<Self::Context>,
    ) -> Result<(), ServiceError> {
        match context {
            Authentication::Full => Ok(()),
            Authentication::Context(_) => Err(ServiceError::Forbidden),
        }
    }

    async fn user_exists(
        &self,
        user: &str,
        context: Authentication<Self::Context>,
    ) -> Result<bool, ServiceError> {
        self.check_permission(HR_PRIVILEGE, context).await?;
        Ok(self
            .permission_dao
            .find_user(user)
            .await
            .map(|x| x.is_some())?)
    }

    async fn create_user(
        &self,
        user: &str,
        context: Authentication<Self::Context>,
    ) -> Result<(), ServiceError> {
        self.check_permission(ADMIN_PRIVILEGE, context).await?;
        self.permission_dao
            .create_user(
                &dao::UserEntity { name: user.into() },
                PERMISSION_SERVICE_PROCESS,
            )
            .await?;
        Ok(())
    }

    async fn add_user_role(
        &self,
        user: &str,
        role: &str,
        context: Authentication<Self::Context>,
    ) -> Result<(), ServiceError> {
        self.check_permission(ADMIN_PRIVILEGE, context).await?;
        self.permission_dao
            .add_user_role(user, role, PERMISSION_SERVICE_PROCESS)
            .await?;
        Ok(())
    }
}
