use std::sync::Arc;

use crate::{
    format_date_time, format_optional_date_time, parse_date_time, parse_optional_date_time,
    ResultDbErrorExt, TransactionImpl,
};
use async_trait::async_trait;
use dao::{
    overtime_adjustment::{
        AdjustmentStatusEntity, AdjustmentTypeEntity, OvertimeAdjustmentDao,
        OvertimeAdjustmentEntity,
    },
    DaoError,
};
use sqlx::{query, query_as};
use tracing::info;
use uuid::Uuid;

const ADJUSTMENT_COLUMNS: &str = r"id, employee_id, adjustment_type, hours, reason, description,
    status, author, approved_by, approved_at, created, deleted, update_version";

#[derive(Debug, sqlx::FromRow)]
struct OvertimeAdjustmentDb {
    id: Vec<u8>,
    employee_id: Vec<u8>,
    adjustment_type: String,
    hours: f64,
    reason: String,
    description: String,
    status: String,
    author: String,
    approved_by: Option<String>,
    approved_at: Option<String>,
    created: String,
    deleted: Option<String>,
    update_version: Vec<u8>,
}

fn adjustment_type_code(adjustment_type: AdjustmentTypeEntity) -> &'static str {
    match adjustment_type {
        AdjustmentTypeEntity::Correction => "correction",
        AdjustmentTypeEntity::Manual => "manual",
        AdjustmentTypeEntity::Bonus => "bonus",
        AdjustmentTypeEntity::Penalty => "penalty",
    }
}

fn parse_adjustment_type(code: &str) -> Result<AdjustmentTypeEntity, DaoError> {
    Ok(match code {
        "correction" => AdjustmentTypeEntity::Correction,
        "manual" => AdjustmentTypeEntity::Manual,
        "bonus" => AdjustmentTypeEntity::Bonus,
        "penalty" => AdjustmentTypeEntity::Penalty,
        _ => return Err(DaoError::EnumValueNotFound(code.into())),
    })
}

fn status_code(status: AdjustmentStatusEntity) -> &'static str {
    match status {
        AdjustmentStatusEntity::Pending => "pending",
        AdjustmentStatusEntity::Approved => "approved",
        AdjustmentStatusEntity::Rejected => "rejected",
    }
}

fn parse_status(code: &str) -> Result<AdjustmentStatusEntity, DaoError> {
    Ok(match code {
        "pending" => AdjustmentStatusEntity::Pending,
        "approved" => AdjustmentStatusEntity::Approved,
        "rejected" => AdjustmentStatusEntity::Rejected,
        _ => return Err(DaoError::EnumValueNotFound(code.into())),
    })
}

impl TryFrom<&OvertimeAdjustmentDb> for OvertimeAdjustmentEntity {
    type Error = DaoError;

    fn try_from(adjustment: &OvertimeAdjustmentDb) -> Result<Self, DaoError> {
        Ok(Self {
            id: Uuid::from_slice(adjustment.id.as_ref())?,
            employee_id: Uuid::from_slice(adjustment.employee_id.as_ref())?,
            adjustment_type: parse_adjustment_type(&adjustment.adjustment_type)?,
            hours: adjustment.hours,
            reason: adjustment.reason.as_str().into(),
            description: adjustment.description.as_str().into(),
            status: parse_status(&adjustment.status)?,
            author: adjustment.author.as_str().into(),
            approved_by: adjustment.approved_by.as_deref().map(Arc::from),
            approved_at: parse_optional_date_time(adjustment.approved_at.as_deref())?,
            created: parse_date_time(&adjustment.created)?,
            deleted: parse_optional_date_time(adjustment.deleted.as_deref())?,
            version: Uuid::from_slice(adjustment.update_version.as_ref())?,
        })
    }
}

pub struct OvertimeAdjustmentDaoImpl {
    pub _pool: Arc<sqlx::SqlitePool>,
}

impl OvertimeAdjustmentDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>) -> Self {
        Self { _pool: pool }
    }
}

#[async_trait]
impl OvertimeAdjustmentDao for OvertimeAdjustmentDaoImpl {
    type Transaction = TransactionImpl;

    async fn find_by_id(
        &self,
        id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<OvertimeAdjustmentEntity>, DaoError> {
        query_as::<_, OvertimeAdjustmentDb>(&format!(
            "SELECT {ADJUSTMENT_COLUMNS} FROM overtime_adjustment WHERE id = ?"
        ))
        .bind(id.as_bytes().to_vec())
        .fetch_optional(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .as_ref()
        .map(OvertimeAdjustmentEntity::try_from)
        .transpose()
    }

    async fn dump_by_employee_id(
        &self,
        employee_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Arc<[OvertimeAdjustmentEntity]>, DaoError> {
        query_as::<_, OvertimeAdjustmentDb>(&format!(
            "SELECT {ADJUSTMENT_COLUMNS} FROM overtime_adjustment
            WHERE employee_id = ? ORDER BY created"
        ))
        .bind(employee_id.as_bytes().to_vec())
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .iter()
        .map(OvertimeAdjustmentEntity::try_from)
        .collect()
    }

    async fn create(
        &self,
        entity: &OvertimeAdjustmentEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        info!(
            "Create overtime adjustment {} for employee {}",
            entity.id, entity.employee_id
        );
        query(
            r"INSERT INTO overtime_adjustment (id, employee_id, adjustment_type, hours, reason,
                description, status, author, approved_by, approved_at, created, deleted,
                update_process, update_version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entity.id.as_bytes().to_vec())
        .bind(entity.employee_id.as_bytes().to_vec())
        .bind(adjustment_type_code(entity.adjustment_type))
        .bind(entity.hours)
        .bind(entity.reason.as_ref())
        .bind(entity.description.as_ref())
        .bind(status_code(entity.status))
        .bind(entity.author.as_ref())
        .bind(entity.approved_by.as_deref())
        .bind(format_optional_date_time(entity.approved_at)?)
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
        entity: &OvertimeAdjustmentEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        query(
            r"UPDATE overtime_adjustment SET adjustment_type = ?, hours = ?, reason = ?,
                description = ?, status = ?, approved_by = ?, approved_at = ?, deleted = ?,
                update_process = ?, update_version = ?
            WHERE id = ?",
        )
        .bind(adjustment_type_code(entity.adjustment_type))
        .bind(entity.hours)
        .bind(entity.reason.as_ref())
        .bind(entity.description.as_ref())
        .bind(status_code(entity.status))
        .bind(entity.approved_by.as_deref())
        .bind(format_optional_date_time(entity.approved_at)?)
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
