use std::sync::Arc;

use crate::gen_service_impl;
use async_trait::async_trait;
use dao::{activity::ActivityDao, TransactionDao};
use service::{
    activity::{Activity, ActivityService, ActivityType},
    clock::ClockService,
    permission::{Authentication, HR_PRIVILEGE},
    uuid_service::UuidService,
    PermissionService, ServiceError,
};
use tracing::info;
use uuid::Uuid;

const ACTIVITY_SERVICE_PROCESS: &str = "activity-service";

/// User name recorded for work done without a calling user.
pub const SYSTEM_USER: &str = "system";

gen_service_impl! {
    struct ActivityServiceImpl: ActivityService = ActivityServiceDeps {
        ActivityDao: ActivityDao<Transaction = Self::Transaction> = activity_dao,
        PermissionService: PermissionService<Context = Self::Context> = permission_service,
        ClockService: ClockService = clock_service,
        UuidService: UuidService = uuid_service,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
    }
}

#[async_trait]
impl<Deps: ActivityServiceDeps> ActivityService for ActivityServiceImpl<Deps> {
    type Context = Deps::Context;
    type Transaction = Deps::Transaction;

    async fn log(
        &self,
        activity_type: ActivityType,
        employee_id: Option<Uuid>,
        message: &str,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let user = self
            .permission_service
            .current_user_id(context)
            .await?
            .unwrap_or_else(|| SYSTEM_USER.into());
        let activity = Activity {
            id: self
                .uuid_service
                .new_uuid(&format!("{}::log id", ACTIVITY_SERVICE_PROCESS)),
            activity_type,
            employee_id,
            message: message.into(),
            user,
            created: self.clock_service.date_time_now(),
        };
        info!(
            "{} by {}: {}",
            activity_type.code(),
            activity.user,
            activity.message
        );
        self.activity_dao
            .create(&(&activity).into(), ACTIVITY_SERVICE_PROCESS, tx.clone())
            .await?;
        self.transaction_dao.commit(tx).await?;
        Ok(())
    }

    async fn latest(
        &self,
        limit: u32,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Activity]>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;
        let activities = self
            .activity_dao
            .find_latest(limit, tx.clone())
            .await?
            .iter()
            .map(Activity::try_from)
            .collect::<Result<Arc<[Activity]>, ServiceError>>()?;
        self.transaction_dao.commit(tx).await?;
        Ok(activities)
    }
}
