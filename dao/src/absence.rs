use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use crate::{DaoError, DataSourceEntity};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbsenceTypeEntity {
    Vacation,
    Sick,
    Special,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbsenceStatusEntity {
    Requested,
    Approved,
    Rejected,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AbsenceEntity {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub absence_type: AbsenceTypeEntity,
    pub start_date: Date,
    pub end_date: Date,
    pub days: f64,
    pub status: AbsenceStatusEntity,
    pub approved_by: Option<Arc<str>>,
    pub approver_name: Option<Arc<str>>,
    pub reason: Arc<str>,
    pub notes: Arc<str>,
    pub source: DataSourceEntity,
    pub foreign_key: Option<Arc<str>>,

    pub created: PrimitiveDateTime,
    pub deleted: Option<PrimitiveDateTime>,
    pub version: Uuid,
}

#[automock(type Transaction = crate::MockTransaction;)]
#[async_trait]
pub trait AbsenceDao {
    type Transaction: crate::Transaction;

    async fn find_by_id(
        &self,
        id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<AbsenceEntity>, DaoError>;

    async fn find_by_employee_id(
        &self,
        employee_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Arc<[AbsenceEntity]>, DaoError>;

    async fn find_by_source_and_foreign_key(
        &self,
        source: DataSourceEntity,
        foreign_key: &str,
        tx: Self::Transaction,
    ) -> Result<Option<AbsenceEntity>, DaoError>;

    async fn create(
        &self,
        entity: &AbsenceEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;

    async fn update(
        &self,
        entity: &AbsenceEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;

    /// Absences starting in the given calendar year.
    async fn find_by_employee_id_and_year(
        &self,
        employee_id: Uuid,
        year: i32,
        tx: Self::Transaction,
    ) -> Result<Arc<[AbsenceEntity]>, DaoError> {
        Ok(self
            .find_by_employee_id(employee_id, tx)
            .await?
            .iter()
            .filter(|absence| absence.start_date.year() == year)
            .cloned()
            .collect())
    }
}
