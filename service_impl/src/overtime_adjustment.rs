use std::sync::Arc;

use crate::activity::SYSTEM_USER;
use crate::gen_service_impl;
use async_trait::async_trait;
use dao::{overtime_adjustment::OvertimeAdjustmentDao, TransactionDao};
use service::{
    activity::{ActivityService, ActivityType},
    clock::ClockService,
    employee::EmployeeService,
    overtime_adjustment::{AdjustmentStatus, OvertimeAdjustment, OvertimeAdjustmentService},
    permission::{Authentication, HR_PRIVILEGE},
    uuid_service::UuidService,
    PermissionService, ServiceError, ValidationFailureItem,
};
use tokio::join;
use uuid::Uuid;

const OVERTIME_ADJUSTMENT_SERVICE_PROCESS: &str = "overtime-adjustment-service";

gen_service_impl! {
    struct OvertimeAdjustmentServiceImpl: OvertimeAdjustmentService = OvertimeAdjustmentServiceDeps {
        OvertimeAdjustmentDao: OvertimeAdjustmentDao<Transaction = Self::Transaction> = overtime_adjustment_dao,
        EmployeeService: EmployeeService<Context = Self::Context, Transaction = Self::Transaction> = employee_service,
        ActivityService: ActivityService<Context = Self::Context, Transaction = Self::Transaction> = activity_service,
        PermissionService: PermissionService<Context = Self::Context> = permission_service,
        ClockService: ClockService = clock_service,
        UuidService: UuidService = uuid_service,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
    }
}

impl<Deps: OvertimeAdjustmentServiceDeps> OvertimeAdjustmentServiceImpl<Deps> {
    async fn decide(
        &self,
        id: Uuid,
        status: AdjustmentStatus,
        context: Authentication<Deps::Context>,
        tx: Option<Deps::Transaction>,
    ) -> Result<OvertimeAdjustment, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context.clone())
            .await?;

        let mut adjustment: OvertimeAdjustment = self
            .overtime_adjustment_dao
            .find_by_id(id, tx.clone())
            .await?
            .filter(|adjustment| adjustment.deleted.is_none())
            .as_ref()
            .map(OvertimeAdjustment::from)
            .ok_or(ServiceError::EntityNotFound(id))?;
        adjustment.status = adjustment.status.transition_to(status)?;
        adjustment.approved_by = Some(
            self.permission_service
                .current_user_id(context.clone())
                .await?
                .unwrap_or_else(|| SYSTEM_USER.into()),
        );
        adjustment.approved_at = Some(self.clock_service.date_time_now());
        adjustment.version = self.uuid_service.new_uuid(&format!(
            "{}::decide version",
            OVERTIME_ADJUSTMENT_SERVICE_PROCESS
        ));
        self.overtime_adjustment_dao
            .update(
                &(&adjustment).try_into()?,
                OVERTIME_ADJUSTMENT_SERVICE_PROCESS,
                tx.clone(),
            )
            .await?;
        self.activity_service
            .log(
                ActivityType::OvertimeAdjusted,
                Some(adjustment.employee_id),
                &format!(
                    "{} {} ({})",
                    adjustment.adjustment_type.label(),
                    adjustment.formatted_hours(),
                    adjustment.status.label()
                ),
                context,
                tx.clone().into(),
            )
            .await?;
        self.transaction_dao.commit(tx).await?;
        Ok(adjustment)
    }
}

#[async_trait]
impl<Deps: OvertimeAdjustmentServiceDeps> OvertimeAdjustmentService
    for OvertimeAdjustmentServiceImpl<Deps>
{
    type Context = Deps::Context;
    type Transaction = Deps::Transaction;

    async fn submit(
        &self,
        adjustment: &OvertimeAdjustment,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<OvertimeAdjustment, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context.clone())
            .await?;

        if adjustment.id != Uuid::nil() {
            return Err(ServiceError::IdSetOnCreate);
        }
        if adjustment.version != Uuid::nil() {
            return Err(ServiceError::VersionSetOnCreate);
        }
        if !adjustment.hours.is_finite() || adjustment.hours == 0.0 {
            return Err(ServiceError::ValidationError(
                [ValidationFailureItem::InvalidValue("hours".into())].into(),
            ));
        }
        self.employee_service
            .get(adjustment.employee_id, Authentication::Full, tx.clone().into())
            .await?;

        let author = self
            .permission_service
            .current_user_id(context)
            .await?
            .unwrap_or_else(|| SYSTEM_USER.into());
        let adjustment = OvertimeAdjustment {
            id: self.uuid_service.new_uuid(&format!(
                "{}::submit id",
                OVERTIME_ADJUSTMENT_SERVICE_PROCESS
            )),
            version: self.uuid_service.new_uuid(&format!(
                "{}::submit version",
                OVERTIME_ADJUSTMENT_SERVICE_PROCESS
            )),
            status: AdjustmentStatus::Pending,
            author,
            approved_by: None,
            approved_at: None,
            created: Some(self.clock_service.date_time_now()),
            deleted: None,
            ..adjustment.clone()
        };
        self.overtime_adjustment_dao
            .create(
                &(&adjustment).try_into()?,
                OVERTIME_ADJUSTMENT_SERVICE_PROCESS,
                tx.clone(),
            )
            .await?;
        self.transaction_dao.commit(tx).await?;
        Ok(adjustment)
    }

    async fn approve(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<OvertimeAdjustment, ServiceError> {
        self.decide(id, AdjustmentStatus::Approved, context, tx)
            .await
    }

    async fn reject(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<OvertimeAdjustment, ServiceError> {
        self.decide(id, AdjustmentStatus::Rejected, context, tx)
            .await
    }

    async fn list_by_employee(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[OvertimeAdjustment]>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let (hr_permission, is_employee) = join!(
            self.permission_service
                .check_permission(HR_PRIVILEGE, context.clone()),
            self.employee_service.verify_user_is_employee(
                employee_id,
                context.clone(),
                tx.clone().into()
            ),
        );
        hr_permission.or(is_employee)?;

        let adjustments = self
            .overtime_adjustment_dao
            .find_by_employee_id(employee_id, tx.clone())
            .await?
            .iter()
            .map(OvertimeAdjustment::from)
            .collect();
        self.transaction_dao.commit(tx).await?;
        Ok(adjustments)
    }

    async fn list_approved(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[OvertimeAdjustment]>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let (hr_permission, is_employee) = join!(
            self.permission_service
                .check_permission(HR_PRIVILEGE, context.clone()),
            self.employee_service.verify_user_is_employee(
                employee_id,
                context.clone(),
                tx.clone().into()
            ),
        );
        hr_permission.or(is_employee)?;

        let adjustments = self
            .overtime_adjustment_dao
            .find_approved_by_employee_id(employee_id, tx.clone())
            .await?
            .iter()
            .map(OvertimeAdjustment::from)
            .collect();
        self.transaction_dao.commit(tx).await?;
        Ok(adjustments)
    }

    async fn total_approved_hours(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<f64, ServiceError> {
        Ok(self
            .list_approved(employee_id, context, tx)
            .await?
            .iter()
            .map(|adjustment| adjustment.hours)
            .sum())
    }
}
