use std::sync::Arc;

use crate::gen_service_impl;
use async_trait::async_trait;
use dao::{project_assignment::ProjectAssignmentDao, TransactionDao};
use service::{
    clock::ClockService,
    employee::EmployeeService,
    permission::{Authentication, HR_PRIVILEGE},
    project_assignment::{ProjectAssignment, ProjectAssignmentService},
    time_entry::{DataSource, UpsertOutcome},
    uuid_service::UuidService,
    PermissionService, ServiceError, ValidationFailureItem,
};
use tokio::join;
use uuid::Uuid;

const PROJECT_ASSIGNMENT_SERVICE_PROCESS: &str = "project-assignment-service";

gen_service_impl! {
    struct ProjectAssignmentServiceImpl: ProjectAssignmentService = ProjectAssignmentServiceDeps {
        ProjectAssignmentDao: ProjectAssignmentDao<Transaction = Self::Transaction> = project_assignment_dao,
        EmployeeService: EmployeeService<Context = Self::Context, Transaction = Self::Transaction> = employee_service,
        PermissionService: PermissionService<Context = Self::Context> = permission_service,
        ClockService: ClockService = clock_service,
        UuidService: UuidService = uuid_service,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
    }
}

#[async_trait]
impl<Deps: ProjectAssignmentServiceDeps> ProjectAssignmentService
    for ProjectAssignmentServiceImpl<Deps>
{
    type Context = Deps::Context;
    type Transaction = Deps::Transaction;

    async fn list_by_employee(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[ProjectAssignment]>, ServiceError> {
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

        let assignments = self
            .project_assignment_dao
            .find_by_employee_id(employee_id, tx.clone())
            .await?
            .iter()
            .map(ProjectAssignment::from)
            .collect();
        self.transaction_dao.commit(tx).await?;
        Ok(assignments)
    }

    async fn upsert_imported(
        &self,
        assignment: &ProjectAssignment,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(ProjectAssignment, UpsertOutcome), ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;

        let foreign_key = match (assignment.source, assignment.foreign_key.as_deref()) {
            (DataSource::Manual, _) | (_, None) => {
                return Err(ServiceError::ValidationError(
                    [ValidationFailureItem::InvalidValue("foreign_key".into())].into(),
                ))
            }
            (_, Some(foreign_key)) => foreign_key,
        };

        let existing = self
            .project_assignment_dao
            .find_by_source_and_foreign_key((&assignment.source).into(), foreign_key, tx.clone())
            .await?;
        let result = match existing {
            Some(existing) if existing.deleted.is_some() => (
                ProjectAssignment::from(&existing),
                UpsertOutcome::SkippedDeleted,
            ),
            Some(existing) => {
                let updated = ProjectAssignment {
                    id: existing.id,
                    created: Some(existing.created),
                    deleted: None,
                    version: self.uuid_service.new_uuid(&format!(
                        "{}::import version",
                        PROJECT_ASSIGNMENT_SERVICE_PROCESS
                    )),
                    ..assignment.clone()
                };
                self.project_assignment_dao
                    .update(
                        &(&updated).try_into()?,
                        PROJECT_ASSIGNMENT_SERVICE_PROCESS,
                        tx.clone(),
                    )
                    .await?;
                (updated, UpsertOutcome::Updated)
            }
            None => {
                let created = ProjectAssignment {
                    id: self.uuid_service.new_uuid(&format!(
                        "{}::import id",
                        PROJECT_ASSIGNMENT_SERVICE_PROCESS
                    )),
                    version: self.uuid_service.new_uuid(&format!(
                        "{}::import version",
                        PROJECT_ASSIGNMENT_SERVICE_PROCESS
                    )),
                    created: Some(self.clock_service.date_time_now()),
                    deleted: None,
                    ..assignment.clone()
                };
                self.project_assignment_dao
                    .create(
                        &(&created).try_into()?,
                        PROJECT_ASSIGNMENT_SERVICE_PROCESS,
                        tx.clone(),
                    )
                    .await?;
                (created, UpsertOutcome::Created)
            }
        };
        self.transaction_dao.commit(tx).await?;
        Ok(result)
    }
}
