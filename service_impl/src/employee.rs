use std::sync::Arc;

use crate::gen_service_impl;
use async_trait::async_trait;
use dao::{employee::EmployeeDao, TransactionDao};
use service::{
    clock::ClockService,
    employee::{Employee, EmployeeService},
    integration::Provider,
    permission::{Authentication, HR_PRIVILEGE},
    uuid_service::UuidService,
    PermissionService, ServiceError, ValidationFailureItem,
};
use time::{Date, PrimitiveDateTime};
use tokio::join;
use uuid::Uuid;

const EMPLOYEE_SERVICE_PROCESS: &str = "employee-service";

gen_service_impl! {
    struct EmployeeServiceImpl: EmployeeService = EmployeeServiceDeps {
        EmployeeDao: EmployeeDao<Transaction = Self::Transaction> = employee_dao,
        PermissionService: PermissionService<Context = Self::Context> = permission_service,
        ClockService: ClockService = clock_service,
        UuidService: UuidService = uuid_service,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
    }
}

fn validate_contract(employee: &Employee) -> Vec<ValidationFailureItem> {
    let mut failures = Vec::new();
    if employee.first_name.trim().is_empty() {
        failures.push(ValidationFailureItem::InvalidValue("first_name".into()));
    }
    if employee.last_name.trim().is_empty() {
        failures.push(ValidationFailureItem::InvalidValue("last_name".into()));
    }
    if !employee.email.contains('@') {
        failures.push(ValidationFailureItem::InvalidValue("email".into()));
    }
    if !employee.weekly_hours_target.is_finite() || employee.weekly_hours_target < 0.0 {
        failures.push(ValidationFailureItem::InvalidValue(
            "weekly_hours_target".into(),
        ));
    }
    if !(1..=7).contains(&employee.working_days_per_week) {
        failures.push(ValidationFailureItem::InvalidValue(
            "working_days_per_week".into(),
        ));
    }
    if !employee.annual_vacation_entitlement.is_finite()
        || employee.annual_vacation_entitlement < 0.0
    {
        failures.push(ValidationFailureItem::InvalidValue(
            "annual_vacation_entitlement".into(),
        ));
    }
    failures
}

impl<Deps: EmployeeServiceDeps> EmployeeServiceImpl<Deps> {
    async fn find_existing(
        &self,
        id: Uuid,
        tx: Deps::Transaction,
    ) -> Result<dao::employee::EmployeeEntity, ServiceError> {
        self.employee_dao
            .find_by_id(id, tx)
            .await?
            .ok_or(ServiceError::EntityNotFound(id))
    }
}

#[async_trait]
impl<Deps: EmployeeServiceDeps> EmployeeService for EmployeeServiceImpl<Deps> {
    type Context = Deps::Context;
    type Transaction = Deps::Transaction;

    async fn get_all(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Employee]>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;
        let employees = self
            .employee_dao
            .all(tx.clone())
            .await?
            .iter()
            .map(Employee::from)
            .collect();
        self.transaction_dao.commit(tx).await?;
        Ok(employees)
    }

    async fn get_active(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Employee]>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;
        let employees = self
            .employee_dao
            .find_active(tx.clone())
            .await?
            .iter()
            .map(Employee::from)
            .collect();
        self.transaction_dao.commit(tx).await?;
        Ok(employees)
    }

    async fn get(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Employee, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let (hr_permission, is_employee) = join!(
            self.permission_service
                .check_permission(HR_PRIVILEGE, context.clone()),
            self.verify_user_is_employee(id, context.clone(), tx.clone().into()),
        );
        hr_permission.or(is_employee)?;
        let employee = self.find_existing(id, tx.clone()).await?;
        self.transaction_dao.commit(tx).await?;
        Ok((&employee).into())
    }

    async fn find_by_email(
        &self,
        email: &str,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Option<Employee>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;
        let employee = self.employee_dao.find_by_email(email, tx.clone()).await?;
        self.transaction_dao.commit(tx).await?;
        Ok(employee.as_ref().map(Employee::from))
    }

    async fn current_employee(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Option<Employee>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let Some(user_id) = self.permission_service.current_user_id(context).await? else {
            return Ok(None);
        };
        let employee = self
            .employee_dao
            .find_by_user_name(&user_id, tx.clone())
            .await?;
        self.transaction_dao.commit(tx).await?;
        Ok(employee.as_ref().map(Employee::from))
    }

    async fn create(
        &self,
        employee: &Employee,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Employee, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;

        if employee.id != Uuid::nil() {
            return Err(ServiceError::IdSetOnCreate);
        }
        if employee.version != Uuid::nil() {
            return Err(ServiceError::VersionSetOnCreate);
        }
        let mut failures = validate_contract(employee);
        if self
            .employee_dao
            .find_by_email(&employee.email, tx.clone())
            .await?
            .is_some()
        {
            failures.push(ValidationFailureItem::InvalidValue("email".into()));
        }
        if !failures.is_empty() {
            return Err(ServiceError::ValidationError(failures.into()));
        }

        let employee = Employee {
            id: self
                .uuid_service
                .new_uuid(&format!("{}::create id", EMPLOYEE_SERVICE_PROCESS)),
            version: self
                .uuid_service
                .new_uuid(&format!("{}::create version", EMPLOYEE_SERVICE_PROCESS)),
            email: employee.email.trim().into(),
            overtime_balance: 0.0,
            last_computed_at: None,
            created: Some(self.clock_service.date_time_now()),
            ..employee.clone()
        };
        self.employee_dao
            .create(&(&employee).try_into()?, EMPLOYEE_SERVICE_PROCESS, tx.clone())
            .await?;
        self.transaction_dao.commit(tx).await?;
        Ok(employee)
    }

    async fn update(
        &self,
        employee: &Employee,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Employee, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;

        let persisted = self.find_existing(employee.id, tx.clone()).await?;
        if persisted.version != employee.version {
            return Err(ServiceError::EntityConflicts(
                employee.id,
                employee.version,
                persisted.version,
            ));
        }
        let failures = validate_contract(employee);
        if !failures.is_empty() {
            return Err(ServiceError::ValidationError(failures.into()));
        }

        let employee = Employee {
            version: self
                .uuid_service
                .new_uuid(&format!("{}::update version", EMPLOYEE_SERVICE_PROCESS)),
            overtime_balance: persisted.overtime_balance,
            last_computed_at: persisted.last_computed_at,
            created: Some(persisted.created),
            ..employee.clone()
        };
        self.employee_dao
            .update(&(&employee).try_into()?, EMPLOYEE_SERVICE_PROCESS, tx.clone())
            .await?;
        self.transaction_dao.commit(tx).await?;
        Ok(employee)
    }

    async fn link_provider_identity(
        &self,
        id: Uuid,
        provider: Provider,
        foreign_id: &str,
        hire_date: Option<Date>,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Employee, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;

        let mut employee: Employee = (&self.find_existing(id, tx.clone()).await?).into();
        let identity = match provider {
            Provider::Timebutler => &mut employee.timebutler_id,
            Provider::Erfasst123 => &mut employee.erfasst123_id,
        };
        let identity_changed = identity.as_deref() != Some(foreign_id);
        if identity_changed {
            *identity = Some(foreign_id.into());
        }
        let hire_date_set = employee.hire_date.is_none() && hire_date.is_some();
        if hire_date_set {
            employee.hire_date = hire_date;
        }

        if identity_changed || hire_date_set {
            employee.version = self
                .uuid_service
                .new_uuid(&format!("{}::link version", EMPLOYEE_SERVICE_PROCESS));
            self.employee_dao
                .update(&(&employee).try_into()?, EMPLOYEE_SERVICE_PROCESS, tx.clone())
                .await?;
        }
        self.transaction_dao.commit(tx).await?;
        Ok(employee)
    }

    async fn update_overtime_cache(
        &self,
        id: Uuid,
        overtime_balance: f64,
        computed_at: PrimitiveDateTime,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;
        self.find_existing(id, tx.clone()).await?;
        self.employee_dao
            .update_overtime_cache(
                id,
                overtime_balance,
                computed_at,
                EMPLOYEE_SERVICE_PROCESS,
                tx.clone(),
            )
            .await?;
        self.transaction_dao.commit(tx).await?;
        Ok(())
    }

    async fn verify_user_is_employee(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let employee = self.find_existing(employee_id, tx.clone()).await?;
        let (Some(username), Some(employee_username)) = (
            self.permission_service.current_user_id(context).await?,
            employee.user_name,
        ) else {
            return Err(ServiceError::Forbidden);
        };
        self.transaction_dao.commit(tx).await?;
        if username == employee_username {
            Ok(())
        } else {
            Err(ServiceError::Forbidden)
        }
    }
}
