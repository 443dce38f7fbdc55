use std::sync::Arc;

use crate::{format_date_time, parse_date_time, ResultDbErrorExt, TransactionImpl};
use async_trait::async_trait;
use dao::{
    activity::{ActivityDao, ActivityEntity},
    DaoError,
};
use sqlx::{query, query_as};
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
struct ActivityDb {
    id: Vec<u8>,
    activity_type: String,
    employee_id: Option<Vec<u8>>,
    message: String,
    user: String,
    created: String,
}

impl TryFrom<&ActivityDb> for ActivityEntity {
    type Error = DaoError;

    fn try_from(activity: &ActivityDb) -> Result<Self, DaoError> {
        Ok(Self {
            id: Uuid::from_slice(activity.id.as_ref())?,
            activity_type: activity.activity_type.as_str().into(),
            employee_id: activity
                .employee_id
                .as_deref()
                .map(Uuid::from_slice)
                .transpose()?,
            message: activity.message.as_str().into(),
            user: activity.user.as_str().into(),
            created: parse_date_time(&activity.created)?,
        })
    }
}

pub struct ActivityDaoImpl {
    pub _pool: Arc<sqlx::SqlitePool>,
}

impl ActivityDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>) -> Self {
        Self { _pool: pool }
    }
}

#[async_trait]
impl ActivityDao for ActivityDaoImpl {
    type Transaction = TransactionImpl;

    async fn create(
        &self,
        entity: &ActivityEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        query(
            r"INSERT INTO activity (id, activity_type, employee_id, message, user, created,
                update_process)
            VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entity.id.as_bytes().to_vec())
        .bind(entity.activity_type.as_ref())
        .bind(entity.employee_id.map(|id| id.as_bytes().to_vec()))
        .bind(entity.message.as_ref())
        .bind(entity.user.as_ref())
        .bind(format_date_time(entity.created)?)
        .bind(process)
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(())
    }

    async fn find_latest(
        &self,
        limit: u32,
        tx: Self::Transaction,
    ) -> Result<Arc<[ActivityEntity]>, DaoError> {
        query_as::<_, ActivityDb>(
            r"SELECT id, activity_type, employee_id, message, user, created FROM activity
            ORDER BY created DESC, rowid DESC
            LIMIT ?",
        )
        .bind(limit)
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .iter()
        .map(ActivityEntity::try_from)
        .collect()
    }
}
