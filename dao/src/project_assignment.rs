use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use crate::{DaoError, DataSourceEntity};

#[derive(Clone, Debug, PartialEq)]
pub struct ProjectAssignmentEntity {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub project_id: Arc<str>,
    pub project_name: Arc<str>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub role: Arc<str>,
    pub source: DataSourceEntity,
    pub foreign_key: Option<Arc<str>>,

    pub created: PrimitiveDateTime,
    pub deleted: Option<PrimitiveDateTime>,
    pub version: Uuid,
}

#[automock(type Transaction = crate::MockTransaction;)]
#[async_trait]
pub trait ProjectAssignmentDao {
    type Transaction: crate::Transaction;

    async fn find_by_employee_id(
        &self,
        employee_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Arc<[ProjectAssignmentEntity]>, DaoError>;

    async fn find_by_source_and_foreign_key(
        &self,
        source: DataSourceEntity,
        foreign_key: &str,
        tx: Self::Transaction,
    ) -> Result<Option<ProjectAssignmentEntity>, DaoError>;

    async fn create(
        &self,
        entity: &ProjectAssignmentEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;

    async fn update(
        &self,
        entity: &ProjectAssignmentEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;
}
