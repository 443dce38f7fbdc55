use std::sync::Arc;

use crate::activity::SYSTEM_USER;
use crate::gen_service_impl;
use async_trait::async_trait;
use dao::{absence::AbsenceDao, TransactionDao};
use peopleflow_utils::holiday::working_days_between;
use service::{
    absence::{approved_vacation_days, Absence, AbsenceService, AbsenceStatus, AbsenceType},
    activity::{ActivityService, ActivityType},
    clock::ClockService,
    config::ConfigService,
    employee::{Employee, EmployeeService},
    permission::{Authentication, HR_PRIVILEGE},
    time_entry::{DataSource, UpsertOutcome},
    uuid_service::UuidService,
    PermissionService, ServiceError, ValidationFailureItem,
};
use tokio::join;
use tracing::info;
use uuid::Uuid;

const ABSENCE_SERVICE_PROCESS: &str = "absence-service";

gen_service_impl! {
    struct AbsenceServiceImpl: AbsenceService = AbsenceServiceDeps {
        AbsenceDao: AbsenceDao<Transaction = Self::Transaction> = absence_dao,
        EmployeeService: EmployeeService<Context = Self::Context, Transaction = Self::Transaction> = employee_service,
        ActivityService: ActivityService<Context = Self::Context, Transaction = Self::Transaction> = activity_service,
        PermissionService: PermissionService<Context = Self::Context> = permission_service,
        ConfigService: ConfigService = config_service,
        ClockService: ClockService = clock_service,
        UuidService: UuidService = uuid_service,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
    }
}

fn activity_type_of(status: AbsenceStatus) -> ActivityType {
    match status {
        AbsenceStatus::Requested => ActivityType::AbsenceRequested,
        AbsenceStatus::Approved => ActivityType::AbsenceApproved,
        AbsenceStatus::Rejected => ActivityType::AbsenceRejected,
        AbsenceStatus::Cancelled => ActivityType::AbsenceCancelled,
    }
}

impl<Deps: AbsenceServiceDeps> AbsenceServiceImpl<Deps> {
    async fn check_hr_or_employee(
        &self,
        employee_id: Uuid,
        context: Authentication<Deps::Context>,
        tx: Deps::Transaction,
    ) -> Result<(), ServiceError> {
        let (hr_permission, is_employee) = join!(
            self.permission_service
                .check_permission(HR_PRIVILEGE, context.clone()),
            self.employee_service
                .verify_user_is_employee(employee_id, context, tx.into()),
        );
        hr_permission.or(is_employee)
    }

    /// Working days of the absence in the holiday region of the employee.
    async fn count_days(
        &self,
        absence: &Absence,
        employee: &Employee,
    ) -> Result<f64, ServiceError> {
        let config = self.config_service.get_config().await?;
        let region = employee.region_or(config.default_region);
        Ok(working_days_between(absence.start_date, absence.end_date, region) as f64)
    }

    async fn find_existing(
        &self,
        id: Uuid,
        tx: Deps::Transaction,
    ) -> Result<Absence, ServiceError> {
        self.absence_dao
            .find_by_id(id, tx)
            .await?
            .filter(|absence| absence.deleted.is_none())
            .as_ref()
            .map(Absence::from)
            .ok_or(ServiceError::EntityNotFound(id))
    }

    async fn change_status(
        &self,
        id: Uuid,
        to: AbsenceStatus,
        context: Authentication<Deps::Context>,
        tx: Option<Deps::Transaction>,
    ) -> Result<Absence, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let mut absence = self.find_existing(id, tx.clone()).await?;
        if to == AbsenceStatus::Cancelled {
            self.check_hr_or_employee(absence.employee_id, context.clone(), tx.clone())
                .await?;
        } else {
            self.permission_service
                .check_permission(HR_PRIVILEGE, context.clone())
                .await?;
        }
        absence.status = absence.status.transition_to(to)?;

        if to == AbsenceStatus::Approved && absence.absence_type == AbsenceType::Vacation {
            let employee = self
                .employee_service
                .get(absence.employee_id, Authentication::Full, tx.clone().into())
                .await?;
            let year = absence.start_date.year();
            let taken = approved_vacation_days(
                &self
                    .absence_dao
                    .find_by_employee_id_and_year(absence.employee_id, year, tx.clone())
                    .await?
                    .iter()
                    .map(Absence::from)
                    .collect::<Vec<_>>(),
                year,
            );
            let remaining = employee.annual_vacation_entitlement - taken;
            if absence.days > remaining {
                return Err(ServiceError::QuotaExceeded {
                    requested: absence.days,
                    remaining,
                });
            }
        }

        if to != AbsenceStatus::Cancelled {
            let user_id = self
                .permission_service
                .current_user_id(context.clone())
                .await?
                .unwrap_or_else(|| SYSTEM_USER.into());
            let approver_name: Arc<str> = match self
                .employee_service
                .current_employee(context.clone(), tx.clone().into())
                .await?
            {
                Some(approver) => approver.full_name().into(),
                None => user_id.clone(),
            };
            absence.approved_by = Some(user_id);
            absence.approver_name = Some(approver_name);
        }
        absence.version = self
            .uuid_service
            .new_uuid(&format!("{}::change_status version", ABSENCE_SERVICE_PROCESS));
        self.absence_dao
            .update(&(&absence).try_into()?, ABSENCE_SERVICE_PROCESS, tx.clone())
            .await?;
        self.activity_service
            .log(
                activity_type_of(to),
                Some(absence.employee_id),
                &format!(
                    "{} {} bis {} ({} Tage): {}",
                    absence.absence_type.label(),
                    absence.start_date,
                    absence.end_date,
                    absence.days,
                    absence.status.label()
                ),
                context,
                tx.clone().into(),
            )
            .await?;
        self.transaction_dao.commit(tx).await?;
        Ok(absence)
    }
}

#[async_trait]
impl<Deps: AbsenceServiceDeps> AbsenceService for AbsenceServiceImpl<Deps> {
    type Context = Deps::Context;
    type Transaction = Deps::Transaction;

    async fn request(
        &self,
        absence: &Absence,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Absence, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.check_hr_or_employee(absence.employee_id, context.clone(), tx.clone())
            .await?;

        if absence.id != Uuid::nil() {
            return Err(ServiceError::IdSetOnCreate);
        }
        if absence.version != Uuid::nil() {
            return Err(ServiceError::VersionSetOnCreate);
        }
        if absence.end_date < absence.start_date {
            return Err(ServiceError::ValidationError(
                [ValidationFailureItem::InvalidValue("end_date".into())].into(),
            ));
        }
        let employee = self
            .employee_service
            .get(absence.employee_id, Authentication::Full, tx.clone().into())
            .await?;
        let days = self.count_days(absence, &employee).await?;
        if days <= 0.0 {
            return Err(ServiceError::ValidationError(
                [ValidationFailureItem::InvalidValue("days".into())].into(),
            ));
        }

        let absence = Absence {
            id: self
                .uuid_service
                .new_uuid(&format!("{}::request id", ABSENCE_SERVICE_PROCESS)),
            version: self
                .uuid_service
                .new_uuid(&format!("{}::request version", ABSENCE_SERVICE_PROCESS)),
            days,
            status: AbsenceStatus::Requested,
            approved_by: None,
            approver_name: None,
            source: DataSource::Manual,
            foreign_key: None,
            created: Some(self.clock_service.date_time_now()),
            deleted: None,
            ..absence.clone()
        };
        self.absence_dao
            .create(&(&absence).try_into()?, ABSENCE_SERVICE_PROCESS, tx.clone())
            .await?;
        self.activity_service
            .log(
                ActivityType::AbsenceRequested,
                Some(absence.employee_id),
                &format!(
                    "{} für {} beantragt: {} bis {} ({} Tage)",
                    absence.absence_type.label(),
                    employee.full_name(),
                    absence.start_date,
                    absence.end_date,
                    absence.days
                ),
                context,
                tx.clone().into(),
            )
            .await?;
        self.transaction_dao.commit(tx).await?;
        Ok(absence)
    }

    async fn approve(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Absence, ServiceError> {
        self.change_status(id, AbsenceStatus::Approved, context, tx)
            .await
    }

    async fn reject(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Absence, ServiceError> {
        self.change_status(id, AbsenceStatus::Rejected, context, tx)
            .await
    }

    async fn cancel(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Absence, ServiceError> {
        self.change_status(id, AbsenceStatus::Cancelled, context, tx)
            .await
    }

    async fn list_for_year(
        &self,
        employee_id: Uuid,
        year: i32,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Absence]>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.check_hr_or_employee(employee_id, context, tx.clone())
            .await?;
        let absences = self
            .absence_dao
            .find_by_employee_id_and_year(employee_id, year, tx.clone())
            .await?
            .iter()
            .map(Absence::from)
            .collect();
        self.transaction_dao.commit(tx).await?;
        Ok(absences)
    }

    async fn remaining_vacation_days(
        &self,
        employee_id: Uuid,
        year: i32,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<f64, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let absences = self
            .list_for_year(employee_id, year, context, tx.clone().into())
            .await?;
        let employee = self
            .employee_service
            .get(employee_id, Authentication::Full, tx.clone().into())
            .await?;
        self.transaction_dao.commit(tx).await?;
        Ok(employee.annual_vacation_entitlement - approved_vacation_days(&absences, year))
    }

    async fn upsert_imported(
        &self,
        absence: &Absence,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(Absence, UpsertOutcome), ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;

        let foreign_key = match (absence.source, absence.foreign_key.as_deref()) {
            (DataSource::Manual, _) | (_, None) => {
                return Err(ServiceError::ValidationError(
                    [ValidationFailureItem::InvalidValue("foreign_key".into())].into(),
                ))
            }
            (_, Some(foreign_key)) => foreign_key,
        };
        if absence.end_date < absence.start_date {
            return Err(ServiceError::ValidationError(
                [ValidationFailureItem::InvalidValue("end_date".into())].into(),
            ));
        }
        let employee = self
            .employee_service
            .get(absence.employee_id, Authentication::Full, tx.clone().into())
            .await?;
        let days = self.count_days(absence, &employee).await?;

        let existing = self
            .absence_dao
            .find_by_source_and_foreign_key((&absence.source).into(), foreign_key, tx.clone())
            .await?;
        let result = match existing {
            Some(existing) if existing.deleted.is_some() => {
                (Absence::from(&existing), UpsertOutcome::SkippedDeleted)
            }
            Some(existing) => {
                // Imports never move an absence backwards in its lifecycle.
                let existing_status = AbsenceStatus::from(&existing.status);
                let status = if existing_status.can_transition_to(absence.status) {
                    absence.status
                } else {
                    existing_status
                };
                let updated = Absence {
                    id: existing.id,
                    status,
                    created: Some(existing.created),
                    approved_by: existing.approved_by.clone(),
                    approver_name: existing.approver_name.clone(),
                    deleted: None,
                    days,
                    version: self
                        .uuid_service
                        .new_uuid(&format!("{}::import version", ABSENCE_SERVICE_PROCESS)),
                    ..absence.clone()
                };
                self.absence_dao
                    .update(&(&updated).try_into()?, ABSENCE_SERVICE_PROCESS, tx.clone())
                    .await?;
                (updated, UpsertOutcome::Updated)
            }
            None => {
                let created = Absence {
                    id: self
                        .uuid_service
                        .new_uuid(&format!("{}::import id", ABSENCE_SERVICE_PROCESS)),
                    version: self
                        .uuid_service
                        .new_uuid(&format!("{}::import version", ABSENCE_SERVICE_PROCESS)),
                    created: Some(self.clock_service.date_time_now()),
                    deleted: None,
                    days,
                    ..absence.clone()
                };
                self.absence_dao
                    .create(&(&created).try_into()?, ABSENCE_SERVICE_PROCESS, tx.clone())
                    .await?;
                info!(
                    "Imported absence {} of {} from {}",
                    foreign_key,
                    employee.full_name(),
                    absence.source.code()
                );
                (created, UpsertOutcome::Created)
            }
        };
        self.transaction_dao.commit(tx).await?;
        Ok(result)
    }
}
