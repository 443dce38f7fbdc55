use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use dao::project_assignment::ProjectAssignmentEntity;
use mockall::automock;
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use crate::permission::Authentication;
use crate::time_entry::{DataSource, UpsertOutcome};
use crate::ServiceError;

#[derive(Clone, Debug, PartialEq)]
pub struct ProjectAssignment {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub project_id: Arc<str>,
    pub project_name: Arc<str>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub role: Arc<str>,
    pub source: DataSource,
    pub foreign_key: Option<Arc<str>>,
    pub created: Option<PrimitiveDateTime>,
    pub deleted: Option<PrimitiveDateTime>,
    pub version: Uuid,
}

impl ProjectAssignment {
    pub fn is_active_on(&self, date: Date) -> bool {
        self.start_date <= date && self.end_date.is_none_or(|end_date| date <= end_date)
    }
}

impl From<&ProjectAssignmentEntity> for ProjectAssignment {
    fn from(assignment: &ProjectAssignmentEntity) -> Self {
        Self {
            id: assignment.id,
            employee_id: assignment.employee_id,
            project_id: assignment.project_id.clone(),
            project_name: assignment.project_name.clone(),
            start_date: assignment.start_date,
            end_date: assignment.end_date,
            role: assignment.role.clone(),
            source: (&assignment.source).into(),
            foreign_key: assignment.foreign_key.clone(),
            created: Some(assignment.created),
            deleted: assignment.deleted,
            version: assignment.version,
        }
    }
}
impl TryFrom<&ProjectAssignment> for ProjectAssignmentEntity {
    type Error = ServiceError;
    fn try_from(assignment: &ProjectAssignment) -> Result<Self, Self::Error> {
        Ok(Self {
            id: assignment.id,
            employee_id: assignment.employee_id,
            project_id: assignment.project_id.clone(),
            project_name: assignment.project_name.clone(),
            start_date: assignment.start_date,
            end_date: assignment.end_date,
            role: assignment.role.clone(),
            source: (&assignment.source).into(),
            foreign_key: assignment.foreign_key.clone(),
            created: assignment.created.ok_or(ServiceError::InternalError)?,
            deleted: assignment.deleted,
            version: assignment.version,
        })
    }
}

peopleflow_utils::derive_from_reference!(ProjectAssignmentEntity, ProjectAssignment);
peopleflow_utils::derive_try_from_reference!(
    ProjectAssignment,
    ProjectAssignmentEntity,
    ServiceError
);

#[automock(type Context=(); type Transaction=dao::MockTransaction;)]
#[async_trait]
pub trait ProjectAssignmentService {
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;
    type Transaction: dao::Transaction;

    async fn list_by_employee(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[ProjectAssignment]>, ServiceError>;

    /// Inserts or updates an assignment delivered by a provider, identified
    /// by source and foreign key.
    async fn upsert_imported(
        &self,
        assignment: &ProjectAssignment,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(ProjectAssignment, UpsertOutcome), ServiceError>;
}
