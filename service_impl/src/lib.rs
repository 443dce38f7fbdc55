use std::sync::Arc;

use async_trait::async_trait;

pub mod absence;
pub mod activity;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod csv_export;
pub mod employee;
pub mod import;
pub mod integration;
pub mod locks;
pub mod macros;
pub mod overtime;
pub mod overtime_adjustment;
pub mod permission;
pub mod project_assignment;
pub mod providers;
pub mod scheduler;
pub mod time_entry;
pub mod uuid_service;

#[cfg(test)]
mod test;

pub use permission::PermissionServiceImpl;

/// Always authenticates as `DEVUSER`. Used for local development and tests
/// without a login in front of the services.
pub struct UserServiceDev;

#[async_trait]
impl service::user_service::UserService for UserServiceDev {
    type Context = ();

    async fn current_user(
        &self,
        _context: Self::Context,
    ) -> Result<Arc<str>, service::ServiceError> {
        Ok("DEVUSER".into())
    }
}

/// The context is the name of the authenticated user.
pub struct UserServiceImpl;

#[async_trait]
impl service::user_service::UserService for UserServiceImpl {
    type Context = Arc<str>;

    async fn current_user(
        &self,
        context: Self::Context,
    ) -> Result<Arc<str>, service::ServiceError> {
        Ok(context)
    }
}
