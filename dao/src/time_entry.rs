use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use peopleflow_utils::IsoWeek;
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use crate::{DaoError, DataSourceEntity};

#[derive(Clone, Debug, PartialEq)]
pub struct TimeEntryEntity {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub date: Date,
    pub start: PrimitiveDateTime,
    pub end: PrimitiveDateTime,
    pub duration_hours: f64,
    pub project_ref: Arc<str>,
    pub project_name: Arc<str>,
    pub activity_ref: Arc<str>,
    pub wage_type: Arc<str>,
    pub source: DataSourceEntity,
    pub foreign_key: Option<Arc<str>>,

    pub created: PrimitiveDateTime,
    pub deleted: Option<PrimitiveDateTime>,
    pub version: Uuid,
}

impl TimeEntryEntity {
    pub fn iso_week(&self) -> IsoWeek {
        IsoWeek::from_date(self.date)
    }
}

#[automock(type Transaction = crate::MockTransaction;)]
#[async_trait]
pub trait TimeEntryDao {
    type Transaction: crate::Transaction;

    async fn find_by_id(
        &self,
        id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<TimeEntryEntity>, DaoError>;

    /// All entries of an employee which are not deleted.
    async fn find_by_employee_id(
        &self,
        employee_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Arc<[TimeEntryEntity]>, DaoError>;

    /// Entries of all employees with `from <= date <= to`, not deleted.
    async fn find_by_date_range(
        &self,
        from: Date,
        to: Date,
        tx: Self::Transaction,
    ) -> Result<Arc<[TimeEntryEntity]>, DaoError>;

    /// Looks up the import key. Deleted entries are returned as well so a
    /// re-import never resurrects an entry which was removed on purpose.
    async fn find_by_source_and_foreign_key(
        &self,
        source: DataSourceEntity,
        foreign_key: &str,
        tx: Self::Transaction,
    ) -> Result<Option<TimeEntryEntity>, DaoError>;

    async fn create(
        &self,
        entity: &TimeEntryEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;

    async fn update(
        &self,
        entity: &TimeEntryEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;
}
