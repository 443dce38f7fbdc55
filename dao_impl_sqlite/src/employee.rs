use std::sync::Arc;

use crate::{
    format_date, format_date_time, format_optional_date_time, parse_date, parse_date_time,
    parse_optional_date_time, ResultDbErrorExt, TransactionImpl,
};
use async_trait::async_trait;
use dao::{
    employee::{EmployeeDao, EmployeeEntity, EmployeeStatusEntity, WorkTimeModelEntity},
    DaoError,
};
use sqlx::{query, query_as};
use time::PrimitiveDateTime;
use tracing::info;
use uuid::Uuid;

const EMPLOYEE_COLUMNS: &str = r"id, first_name, last_name, email, user_name, employee_number,
    department, weekly_hours_target, working_days_per_week, work_time_model, region,
    annual_vacation_entitlement, status, hire_date, timebutler_id, erfasst123_id,
    overtime_balance, last_computed_at, created, update_version";

#[derive(Debug, sqlx::FromRow)]
struct EmployeeDb {
    id: Vec<u8>,
    first_name: String,
    last_name: String,
    email: String,
    user_name: Option<String>,
    employee_number: Option<String>,
    department: Option<String>,
    weekly_hours_target: f64,
    working_days_per_week: i64,
    work_time_model: String,
    region: Option<String>,
    annual_vacation_entitlement: f64,
    status: String,
    hire_date: Option<String>,
    timebutler_id: Option<String>,
    erfasst123_id: Option<String>,
    overtime_balance: f64,
    last_computed_at: Option<String>,
    created: String,
    update_version: Vec<u8>,
}

fn work_time_model_code(model: WorkTimeModelEntity) -> &'static str {
    match model {
        WorkTimeModelEntity::FullTime => "fulltime",
        WorkTimeModelEntity::PartTime => "parttime",
        WorkTimeModelEntity::Flex => "flextime",
        WorkTimeModelEntity::Remote => "remote",
        WorkTimeModelEntity::Shift => "shift",
        WorkTimeModelEntity::Contract => "contract",
        WorkTimeModelEntity::Intern => "internship",
    }
}

fn parse_work_time_model(code: &str) -> Result<WorkTimeModelEntity, DaoError> {
    Ok(match code {
        "fulltime" => WorkTimeModelEntity::FullTime,
        "parttime" => WorkTimeModelEntity::PartTime,
        "flextime" => WorkTimeModelEntity::Flex,
        "remote" => WorkTimeModelEntity::Remote,
        "shift" => WorkTimeModelEntity::Shift,
        "contract" => WorkTimeModelEntity::Contract,
        "internship" => WorkTimeModelEntity::Intern,
        _ => return Err(DaoError::EnumValueNotFound(code.into())),
    })
}

fn status_code(status: EmployeeStatusEntity) -> &'static str {
    match status {
        EmployeeStatusEntity::Active => "active",
        EmployeeStatusEntity::Inactive => "inactive",
        EmployeeStatusEntity::OnLeave => "onleave",
        EmployeeStatusEntity::Remote => "remote",
    }
}

fn parse_status(code: &str) -> Result<EmployeeStatusEntity, DaoError> {
    Ok(match code {
        "active" => EmployeeStatusEntity::Active,
        "inactive" => EmployeeStatusEntity::Inactive,
        "onleave" => EmployeeStatusEntity::OnLeave,
        "remote" => EmployeeStatusEntity::Remote,
        _ => return Err(DaoError::EnumValueNotFound(code.into())),
    })
}

impl TryFrom<&EmployeeDb> for EmployeeEntity {
    type Error = DaoError;

    fn try_from(employee: &EmployeeDb) -> Result<Self, DaoError> {
        Ok(Self {
            id: Uuid::from_slice(employee.id.as_ref())?,
            first_name: employee.first_name.as_str().into(),
            last_name: employee.last_name.as_str().into(),
            email: employee.email.as_str().into(),
            user_name: employee.user_name.as_deref().map(Arc::from),
            employee_number: employee.employee_number.as_deref().map(Arc::from),
            department: employee.department.as_deref().map(Arc::from),
            weekly_hours_target: employee.weekly_hours_target,
            working_days_per_week: employee.working_days_per_week as u8,
            work_time_model: parse_work_time_model(&employee.work_time_model)?,
            region: employee.region.as_deref().map(Arc::from),
            annual_vacation_entitlement: employee.annual_vacation_entitlement,
            status: parse_status(&employee.status)?,
            hire_date: employee.hire_date.as_deref().map(parse_date).transpose()?,
            timebutler_id: employee.timebutler_id.as_deref().map(Arc::from),
            erfasst123_id: employee.erfasst123_id.as_deref().map(Arc::from),
            overtime_balance: employee.overtime_balance,
            last_computed_at: parse_optional_date_time(employee.last_computed_at.as_deref())?,
            created: parse_date_time(&employee.created)?,
            version: Uuid::from_slice(employee.update_version.as_ref())?,
        })
    }
}

pub struct EmployeeDaoImpl {
    pub _pool: Arc<sqlx::SqlitePool>,
}

impl EmployeeDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>) -> Self {
        Self { _pool: pool }
    }
}

impl EmployeeDaoImpl {
    async fn find_one(
        &self,
        condition: &str,
        value: &str,
        tx: TransactionImpl,
    ) -> Result<Option<EmployeeEntity>, DaoError> {
        query_as::<_, EmployeeDb>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employee WHERE {condition}"
        ))
        .bind(value)
        .fetch_optional(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .as_ref()
        .map(EmployeeEntity::try_from)
        .transpose()
    }
}

#[async_trait]
impl EmployeeDao for EmployeeDaoImpl {
    type Transaction = TransactionImpl;

    async fn all(&self, tx: Self::Transaction) -> Result<Arc<[EmployeeEntity]>, DaoError> {
        query_as::<_, EmployeeDb>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employee ORDER BY last_name, first_name"
        ))
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .iter()
        .map(EmployeeEntity::try_from)
        .collect()
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<EmployeeEntity>, DaoError> {
        query_as::<_, EmployeeDb>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employee WHERE id = ?"
        ))
        .bind(id.as_bytes().to_vec())
        .fetch_optional(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .as_ref()
        .map(EmployeeEntity::try_from)
        .transpose()
    }

    async fn find_by_email(
        &self,
        email: &str,
        tx: Self::Transaction,
    ) -> Result<Option<EmployeeEntity>, DaoError> {
        self.find_one("lower(email) = lower(?)", email.trim(), tx)
            .await
    }

    async fn find_by_user_name(
        &self,
        user_name: &str,
        tx: Self::Transaction,
    ) -> Result<Option<EmployeeEntity>, DaoError> {
        self.find_one("user_name = ?", user_name, tx).await
    }

    async fn create(
        &self,
        entity: &EmployeeEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        info!("Create employee {}", entity.id);
        query(
            r"INSERT INTO employee (id, first_name, last_name, email, user_name, employee_number,
                department, weekly_hours_target, working_days_per_week, work_time_model, region,
                annual_vacation_entitlement, status, hire_date, timebutler_id, erfasst123_id,
                overtime_balance, last_computed_at, created, update_process, update_version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entity.id.as_bytes().to_vec())
        .bind(entity.first_name.as_ref())
        .bind(entity.last_name.as_ref())
        .bind(entity.email.as_ref())
        .bind(entity.user_name.as_deref())
        .bind(entity.employee_number.as_deref())
        .bind(entity.department.as_deref())
        .bind(entity.weekly_hours_target)
        .bind(entity.working_days_per_week as i64)
        .bind(work_time_model_code(entity.work_time_model))
        .bind(entity.region.as_deref())
        .bind(entity.annual_vacation_entitlement)
        .bind(status_code(entity.status))
        .bind(entity.hire_date.map(format_date).transpose()?)
        .bind(entity.timebutler_id.as_deref())
        .bind(entity.erfasst123_id.as_deref())
        .bind(entity.overtime_balance)
        .bind(format_optional_date_time(entity.last_computed_at)?)
        .bind(format_date_time(entity.created)?)
        .bind(process)
        .bind(entity.version.as_bytes().to_vec())
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(())
    }

    async fn update(
        &self,
        entity: &EmployeeEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        query(
            r"UPDATE employee SET first_name = ?, last_name = ?, email = ?, user_name = ?,
                employee_number = ?, department = ?, weekly_hours_target = ?,
                working_days_per_week = ?, work_time_model = ?, region = ?,
                annual_vacation_entitlement = ?, status = ?, hire_date = ?, timebutler_id = ?,
                erfasst123_id = ?, update_process = ?, update_version = ?
            WHERE id = ?",
        )
        .bind(entity.first_name.as_ref())
        .bind(entity.last_name.as_ref())
        .bind(entity.email.as_ref())
        .bind(entity.user_name.as_deref())
        .bind(entity.employee_number.as_deref())
        .bind(entity.department.as_deref())
        .bind(entity.weekly_hours_target)
        .bind(entity.working_days_per_week as i64)
        .bind(work_time_model_code(entity.work_time_model))
        .bind(entity.region.as_deref())
        .bind(entity.annual_vacation_entitlement)
        .bind(status_code(entity.status))
        .bind(entity.hire_date.map(format_date).transpose()?)
        .bind(entity.timebutler_id.as_deref())
        .bind(entity.erfasst123_id.as_deref())
        .bind(process)
        .bind(entity.version.as_bytes().to_vec())
        .bind(entity.id.as_bytes().to_vec())
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(())
    }

    async fn update_overtime_cache(
        &self,
        id: Uuid,
        overtime_balance: f64,
        last_computed_at: PrimitiveDateTime,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        query(
            r"UPDATE employee SET overtime_balance = ?, last_computed_at = ?, update_process = ?
            WHERE id = ?",
        )
        .bind(overtime_balance)
        .bind(format_date_time(last_computed_at)?)
        .bind(process)
        .bind(id.as_bytes().to_vec())
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(())
    }
}
