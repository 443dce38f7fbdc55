use std::sync::Arc;

use crate::{
    format_date, format_date_time, format_optional_date_time, parse_date, parse_date_time,
    parse_optional_date_time, ResultDbErrorExt, TransactionImpl,
};
use async_trait::async_trait;
use dao::{
    absence::{AbsenceDao, AbsenceEntity, AbsenceStatusEntity, AbsenceTypeEntity},
    DaoError, DataSourceEntity,
};
use sqlx::{query, query_as};
use tracing::info;
use uuid::Uuid;

const ABSENCE_COLUMNS: &str = r"id, employee_id, absence_type, start_date, end_date, days,
    status, approved_by, approver_name, reason, notes, source, foreign_key, created, deleted,
    update_version";

#[derive(Debug, sqlx::FromRow)]
struct AbsenceDb {
    id: Vec<u8>,
    employee_id: Vec<u8>,
    absence_type: String,
    start_date: String,
    end_date: String,
    days: f64,
    status: String,
    approved_by: Option<String>,
    approver_name: Option<String>,
    reason: String,
    notes: String,
    source: String,
    foreign_key: Option<String>,
    created: String,
    deleted: Option<String>,
    update_version: Vec<u8>,
}

fn absence_type_code(absence_type: AbsenceTypeEntity) -> &'static str {
    match absence_type {
        AbsenceTypeEntity::Vacation => "vacation",
        AbsenceTypeEntity::Sick => "sick",
        AbsenceTypeEntity::Special => "special",
    }
}

fn parse_absence_type(code: &str) -> Result<AbsenceTypeEntity, DaoError> {
    Ok(match code {
        "vacation" => AbsenceTypeEntity::Vacation,
        "sick" => AbsenceTypeEntity::Sick,
        "special" => AbsenceTypeEntity::Special,
        _ => return Err(DaoError::EnumValueNotFound(code.into())),
    })
}

fn status_code(status: AbsenceStatusEntity) -> &'static str {
    match status {
        AbsenceStatusEntity::Requested => "requested",
        AbsenceStatusEntity::Approved => "approved",
        AbsenceStatusEntity::Rejected => "rejected",
        AbsenceStatusEntity::Cancelled => "cancelled",
    }
}

fn parse_status(code: &str) -> Result<AbsenceStatusEntity, DaoError> {
    Ok(match code {
        "requested" => AbsenceStatusEntity::Requested,
        "approved" => AbsenceStatusEntity::Approved,
        "rejected" => AbsenceStatusEntity::Rejected,
        "cancelled" => AbsenceStatusEntity::Cancelled,
        _ => return Err(DaoError::EnumValueNotFound(code.into())),
    })
}

impl TryFrom<&AbsenceDb> for AbsenceEntity {
    type Error = DaoError;

    fn try_from(absence: &AbsenceDb) -> Result<Self, DaoError> {
        Ok(Self {
            id: Uuid::from_slice(absence.id.as_ref())?,
            employee_id: Uuid::from_slice(absence.employee_id.as_ref())?,
            absence_type: parse_absence_type(&absence.absence_type)?,
            start_date: parse_date(&absence.start_date)?,
            end_date: parse_date(&absence.end_date)?,
            days: absence.days,
            status: parse_status(&absence.status)?,
            approved_by: absence.approved_by.as_deref().map(Arc::from),
            approver_name: absence.approver_name.as_deref().map(Arc::from),
            reason: absence.reason.as_str().into(),
            notes: absence.notes.as_str().into(),
            source: DataSourceEntity::from_code(&absence.source)?,
            foreign_key: absence.foreign_key.as_deref().map(Arc::from),
            created: parse_date_time(&absence.created)?,
            deleted: parse_optional_date_time(absence.deleted.as_deref())?,
            version: Uuid::from_slice(absence.update_version.as_ref())?,
        })
    }
}

pub struct AbsenceDaoImpl {
    pub _pool: Arc<sqlx::SqlitePool>,
}

impl AbsenceDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>) -> Self {
        Self { _pool: pool }
    }
}

#[async_trait]
impl AbsenceDao for AbsenceDaoImpl {
    type Transaction = TransactionImpl;

    async fn find_by_id(
        &self,
        id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<AbsenceEntity>, DaoError> {
        query_as::<_, AbsenceDb>(&format!(
            "SELECT {ABSENCE_COLUMNS} FROM absence WHERE id = ? AND deleted IS NULL"
        ))
        .bind(id.as_bytes().to_vec())
        .fetch_optional(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .as_ref()
        .map(AbsenceEntity::try_from)
        .transpose()
    }

    async fn find_by_employee_id(
        &self,
        employee_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Arc<[AbsenceEntity]>, DaoError> {
        query_as::<_, AbsenceDb>(&format!(
            "SELECT {ABSENCE_COLUMNS} FROM absence
            WHERE employee_id = ? AND deleted IS NULL
            ORDER BY start_date"
        ))
        .bind(employee_id.as_bytes().to_vec())
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .iter()
        .map(AbsenceEntity::try_from)
        .collect()
    }

    async fn find_by_source_and_foreign_key(
        &self,
        source: DataSourceEntity,
        foreign_key: &str,
        tx: Self::Transaction,
    ) -> Result<Option<AbsenceEntity>, DaoError> {
        query_as::<_, AbsenceDb>(&format!(
            "SELECT {ABSENCE_COLUMNS} FROM absence WHERE source = ? AND foreign_key = ?"
        ))
        .bind(source.code())
        .bind(foreign_key)
        .fetch_optional(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .as_ref()
        .map(AbsenceEntity::try_from)
        .transpose()
    }

    async fn create(
        &self,
        entity: &AbsenceEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        info!("Create absence {} for employee {}", entity.id, entity.employee_id);
        query(
            r"INSERT INTO absence (id, employee_id, absence_type, start_date, end_date, days,
                status, approved_by, approver_name, reason, notes, source, foreign_key, created,
                deleted, update_process, update_version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entity.id.as_bytes().to_vec())
        .bind(entity.employee_id.as_bytes().to_vec())
        .bind(absence_type_code(entity.absence_type))
        .bind(format_date(entity.start_date)?)
        .bind(format_date(entity.end_date)?)
        .bind(entity.days)
        .bind(status_code(entity.status))
        .bind(entity.approved_by.as_deref())
        .bind(entity.approver_name.as_deref())
        .bind(entity.reason.as_ref())
        .bind(entity.notes.as_ref())
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
        entity: &AbsenceEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        query(
            r"UPDATE absence SET absence_type = ?, start_date = ?, end_date = ?, days = ?,
                status = ?, approved_by = ?, approver_name = ?, reason = ?, notes = ?,
                deleted = ?, update_process = ?, update_version = ?
            WHERE id = ?",
        )
        .bind(absence_type_code(entity.absence_type))
        .bind(format_date(entity.start_date)?)
        .bind(format_date(entity.end_date)?)
        .bind(entity.days)
        .bind(status_code(entity.status))
        .bind(entity.approved_by.as_deref())
        .bind(entity.approver_name.as_deref())
        .bind(entity.reason.as_ref())
        .bind(entity.notes.as_ref())
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
