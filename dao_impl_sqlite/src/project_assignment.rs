use std::sync::Arc;

use crate::{
    format_date, format_date_time, format_optional_date_time, parse_date, parse_date_time,
    parse_optional_date_time, ResultDbErrorExt, TransactionImpl,
};
use async_trait::async_trait;
use dao::{
    project_assignment::{ProjectAssignmentDao, ProjectAssignmentEntity},
    DaoError, DataSourceEntity,
};
use sqlx::{query, query_as};
use uuid::Uuid;

const ASSIGNMENT_COLUMNS: &str = r"id, employee_id, project_id, project_name, start_date,
    end_date, role, source, foreign_key, created, deleted, update_version";

#[derive(Debug, sqlx::FromRow)]
struct ProjectAssignmentDb {
    id: Vec<u8>,
    employee_id: Vec<u8>,
    project_id: String,
    project_name: String,
    start_date: String,
    end_date: Option<String>,
    role: String,
    source: String,
    foreign_key: Option<String>,
    created: String,
    deleted: Option<String>,
    update_version: Vec<u8>,
}

impl TryFrom<&ProjectAssignmentDb> for ProjectAssignmentEntity {
    type Error = DaoError;

    fn try_from(assignment: &ProjectAssignmentDb) -> Result<Self, DaoError> {
        Ok(Self {
            id: Uuid::from_slice(assignment.id.as_ref())?,
            employee_id: Uuid::from_slice(assignment.employee_id.as_ref())?,
            project_id: assignment.project_id.as_str().into(),
            project_name: assignment.project_name.as_str().into(),
            start_date: parse_date(&assignment.start_date)?,
            end_date: assignment.end_date.as_deref().map(parse_date).transpose()?,
            role: assignment.role.as_str().into(),
            source: DataSourceEntity::from_code(&assignment.source)?,
            foreign_key: assignment.foreign_key.as_deref().map(Arc::from),
            created: parse_date_time(&assignment.created)?,
            deleted: parse_optional_date_time(assignment.deleted.as_deref())?,
            version: Uuid::from_slice(assignment.update_version.as_ref())?,
        })
    }
}

pub struct ProjectAssignmentDaoImpl {
    pub _pool: Arc<sqlx::SqlitePool>,
}

impl ProjectAssignmentDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>) -> Self {
        Self { _pool: pool }
    }
}

#[async_trait]
impl ProjectAssignmentDao for ProjectAssignmentDaoImpl {
    type Transaction = TransactionImpl;

    async fn find_by_employee_id(
        &self,
        employee_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Arc<[ProjectAssignmentEntity]>, DaoError> {
        query_as::<_, ProjectAssignmentDb>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM project_assignment
            WHERE employee_id = ? AND deleted IS NULL
            ORDER BY start_date"
        ))
        .bind(employee_id.as_bytes().to_vec())
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .iter()
        .map(ProjectAssignmentEntity::try_from)
        .collect()
    }

    async fn find_by_source_and_foreign_key(
        &self,
        source: DataSourceEntity,
        foreign_key: &str,
        tx: Self::Transaction,
    ) -> Result<Option<ProjectAssignmentEntity>, DaoError> {
        query_as::<_, ProjectAssignmentDb>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM project_assignment
            WHERE source = ? AND foreign_key = ?"
        ))
        .bind(source.code())
        .bind(foreign_key)
        .fetch_optional(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .as_ref()
        .map(ProjectAssignmentEntity::try_from)
        .transpose()
    }

    async fn create(
        &self,
        entity: &ProjectAssignmentEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        query(
            r"INSERT INTO project_assignment (id, employee_id, project_id, project_name,
                start_date, end_date, role, source, foreign_key, created, deleted,
                update_process, update_version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entity.id.as_bytes().to_vec())
        .bind(entity.employee_id.as_bytes().to_vec())
        .bind(entity.project_id.as_ref())
        .bind(entity.project_name.as_ref())
        .bind(format_date(entity.start_date)?)
        .bind(entity.end_date.map(format_date).transpose()?)
        .bind(entity.role.as_ref())
        .bind(entity.source.code())
        .bind(entity.foreign_key.as_deref())
        .bind(format_date_time(entity.created)?)
        .bind(format_optional_date_time(entity.deleted)?)
        .bind(process)
        .bind(entity.version.as_bytes().to_vec())
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(())
    }

    async fn update(
        &self,
        entity: &ProjectAssignmentEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        query(
            r"UPDATE project_assignment SET project_id = ?, project_name = ?, start_date = ?,
                end_date = ?, role = ?, deleted = ?, update_process = ?, update_version = ?
            WHERE id = ?",
        )
        .bind(entity.project_id.as_ref())
        .bind(entity.project_name.as_ref())
        .bind(format_date(entity.start_date)?)
        .bind(entity.end_date.map(format_date).transpose()?)
        .bind(entity.role.as_ref())
        .bind(format_optional_date_time(entity.deleted)?)
        .bind(process)
        .bind(entity.version.as_bytes().to_vec())
        .bind(entity.id.as_bytes().to_vec())
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(())
    }
}
