use std::sync::Arc;

use crate::{
    format_date, format_date_time, format_optional_date_time, parse_date, parse_date_time,
    parse_optional_date_time, ResultDbErrorExt, TransactionImpl,
};
use async_trait::async_trait;
use dao::{
    time_entry::{TimeEntryDao, TimeEntryEntity},
    DaoError, DataSourceEntity,
};
use sqlx::{query, query_as};
use time::Date;
use tracing::info;
use uuid::Uuid;

const TIME_ENTRY_COLUMNS: &str = r"id, employee_id, date, start_time, end_time, duration_hours,
    project_ref, project_name, activity_ref, wage_type, source, foreign_key, created, deleted,
    update_version";

#[derive(Debug, sqlx::FromRow)]
struct TimeEntryDb {
    id: Vec<u8>,
    employee_id: Vec<u8>,
    date: String,
    start_time: String,
    end_time: String,
    duration_hours: f64,
    project_ref: String,
    project_name: String,
    activity_ref: String,
    wage_type: String,
    source: String,
    foreign_key: Option<String>,
    created: String,
    deleted: Option<String>,
    update_version: Vec<u8>,
}

impl TryFrom<&TimeEntryDb> for TimeEntryEntity {
    type Error = DaoError;

    fn try_from(entry: &TimeEntryDb) -> Result<Self, DaoError> {
        Ok(Self {
            id: Uuid::from_slice(entry.id.as_ref())?,
            employee_id: Uuid::from_slice(entry.employee_id.as_ref())?,
            date: parse_date(&entry.date)?,
            start: parse_date_time(&entry.start_time)?,
            end: parse_date_time(&entry.end_time)?,
            duration_hours: entry.duration_hours,
            project_ref: entry.project_ref.as_str().into(),
            project_name: entry.project_name.as_str().into(),
            activity_ref: entry.activity_ref.as_str().into(),
            wage_type: entry.wage_type.as_str().into(),
            source: DataSourceEntity::from_code(&entry.source)?,
            foreign_key: entry.foreign_key.as_deref().map(Arc::from),
            created: parse_date_time(&entry.created)?,
            deleted: parse_optional_date_time(entry.deleted.as_deref())?,
            version: Uuid::from_slice(entry.update_version.as_ref())?,
        })
    }
}

pub struct TimeEntryDaoImpl {
    pub _pool: Arc<sqlx::SqlitePool>,
}

impl TimeEntryDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>) -> Self {
        Self { _pool: pool }
    }
}

#[async_trait]
impl TimeEntryDao for TimeEntryDaoImpl {
    type Transaction = TransactionImpl;

    async fn find_by_id(
        &self,
        id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<TimeEntryEntity>, DaoError> {
        query_as::<_, TimeEntryDb>(&format!(
            "SELECT {TIME_ENTRY_COLUMNS} FROM time_entry WHERE id = ?"
        ))
        .bind(id.as_bytes().to_vec())
        .fetch_optional(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .as_ref()
        .map(TimeEntryEntity::try_from)
        .transpose()
    }

    async fn find_by_employee_id(
        &self,
        employee_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Arc<[TimeEntryEntity]>, DaoError> {
        query_as::<_, TimeEntryDb>(&format!(
            "SELECT {TIME_ENTRY_COLUMNS} FROM time_entry
            WHERE employee_id = ? AND deleted IS NULL
            ORDER BY date, start_time"
        ))
        .bind(employee_id.as_bytes().to_vec())
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .iter()
        .map(TimeEntryEntity::try_from)
        .collect()
    }

    async fn find_by_date_range(
        &self,
        from: Date,
        to: Date,
        tx: Self::Transaction,
    ) -> Result<Arc<[TimeEntryEntity]>, DaoError> {
        query_as::<_, TimeEntryDb>(&format!(
            "SELECT {TIME_ENTRY_COLUMNS} FROM time_entry
            WHERE date >= ? AND date <= ? AND deleted IS NULL
            ORDER BY date, start_time"
        ))
        .bind(format_date(from)?)
        .bind(format_date(to)?)
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .iter()
        .map(TimeEntryEntity::try_from)
        .collect()
    }

    async fn find_by_source_and_foreign_key(
        &self,
        source: DataSourceEntity,
        foreign_key: &str,
        tx: Self::Transaction,
    ) -> Result<Option<TimeEntryEntity>, DaoError> {
        query_as::<_, TimeEntryDb>(&format!(
            "SELECT {TIME_ENTRY_COLUMNS} FROM time_entry WHERE source = ? AND foreign_key = ?"
        ))
        .bind(source.code())
        .bind(foreign_key)
        .fetch_optional(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .as_ref()
        .map(TimeEntryEntity::try_from)
        .transpose()
    }

    async fn create(
        &self,
        entity: &TimeEntryEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        info!("Create time entry {} for employee {}", entity.id, entity.employee_id);
        query(
            r"INSERT INTO time_entry (id, employee_id, date, start_time, end_time, duration_hours,
                project_ref, project_name, activity_ref, wage_type, source, foreign_key, created,
                deleted, update_process, update_version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entity.id.as_bytes().to_vec())
        .bind(entity.employee_id.as_bytes().to_vec())
        .bind(format_date(entity.date)?)
        .bind(format_date_time(entity.start)?)
        .bind(format_date_time(entity.end)?)
        .bind(entity.duration_hours)
        .bind(entity.project_ref.as_ref())
        .bind(entity.project_name.as_ref())
        .bind(entity.activity_ref.as_ref())
        .bind(entity.wage_type.as_ref())
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
        entity: &TimeEntryEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        query(
            r"UPDATE time_entry SET date = ?, start_time = ?, end_time = ?, duration_hours = ?,
                project_ref = ?, project_name = ?, activity_ref = ?, wage_type = ?, deleted = ?,
                update_process = ?, update_version = ?
            WHERE id = ?",
        )
        .bind(format_date(entity.date)?)
        .bind(format_date_time(entity.start)?)
        .bind(format_date_time(entity.end)?)
        .bind(entity.duration_hours)
        .bind(entity.project_ref.as_ref())
        .bind(entity.project_name.as_ref())
        .bind(entity.activity_ref.as_ref())
        .bind(entity.wage_type.as_ref())
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
