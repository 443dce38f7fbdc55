use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use crate::DaoError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkTimeModelEntity {
    FullTime,
    PartTime,
    Flex,
    Remote,
    Shift,
    Contract,
    Intern,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmployeeStatusEntity {
    Active,
    Inactive,
    OnLeave,
    Remote,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmployeeEntity {
    pub id: Uuid,
    pub first_name: Arc<str>,
    pub last_name: Arc<str>,
    pub email: Arc<str>,
    pub user_name: Option<Arc<str>>,
    pub employee_number: Option<Arc<str>>,
    pub department: Option<Arc<str>>,

    pub weekly_hours_target: f64,
    pub working_days_per_week: u8,
    pub work_time_model: WorkTimeModelEntity,
    pub region: Option<Arc<str>>,
    pub annual_vacation_entitlement: f64,
    pub status: EmployeeStatusEntity,
    pub hire_date: Option<Date>,

    pub timebutler_id: Option<Arc<str>>,
    pub erfasst123_id: Option<Arc<str>>,

    pub overtime_balance: f64,
    pub last_computed_at: Option<PrimitiveDateTime>,

    pub created: PrimitiveDateTime,
    pub version: Uuid,
}

#[automock(type Transaction = crate::MockTransaction;)]
#[async_trait]
pub trait EmployeeDao {
    type Transaction: crate::Transaction;

    async fn all(&self, tx: Self::Transaction) -> Result<Arc<[EmployeeEntity]>, DaoError>;

    async fn find_by_id(
        &self,
        id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<EmployeeEntity>, DaoError>;

    /// Looks up an employee by email, ignoring case.
    async fn find_by_email(
        &self,
        email: &str,
        tx: Self::Transaction,
    ) -> Result<Option<EmployeeEntity>, DaoError>;

    async fn find_by_user_name(
        &self,
        user_name: &str,
        tx: Self::Transaction,
    ) -> Result<Option<EmployeeEntity>, DaoError>;

    async fn create(
        &self,
        entity: &EmployeeEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;

    async fn update(
        &self,
        entity: &EmployeeEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;

    /// Writes the cached overtime balance without touching the version.
    async fn update_overtime_cache(
        &self,
        id: Uuid,
        overtime_balance: f64,
        last_computed_at: PrimitiveDateTime,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;

    async fn find_active(&self, tx: Self::Transaction) -> Result<Arc<[EmployeeEntity]>, DaoError> {
        Ok(self
            .all(tx)
            .await?
            .iter()
            .filter(|employee| employee.status != EmployeeStatusEntity::Inactive)
            .cloned()
            .collect())
    }
}
