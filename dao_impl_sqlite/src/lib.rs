use std::sync::Arc;

use async_trait::async_trait;
use dao::{DaoError, Transaction, UserEntity};
use sqlx::{query, query_as, SqlitePool};
use time::{format_description::well_known::Iso8601, Date, PrimitiveDateTime};
use tokio::sync::Mutex;

pub mod absence;
pub mod activity;
pub mod employee;
pub mod integration;
pub mod overtime_adjustment;
pub mod project_assignment;
pub mod time_entry;

pub trait ResultDbErrorExt<T, E> {
    fn map_db_error(self) -> Result<T, DaoError>;
}
impl<T, E: std::error::Error + Send + Sync + 'static> ResultDbErrorExt<T, E> for Result<T, E> {
    fn map_db_error(self) -> Result<T, DaoError> {
        self.map_err(|err| DaoError::DatabaseQueryError(Box::new(err)))
    }
}

pub(crate) fn format_date(date: Date) -> Result<String, DaoError> {
    Ok(date.format(&Iso8601::DATE)?)
}

pub(crate) fn parse_date(value: &str) -> Result<Date, DaoError> {
    Ok(Date::parse(value, &Iso8601::DATE)?)
}

pub(crate) fn format_date_time(date_time: PrimitiveDateTime) -> Result<String, DaoError> {
    Ok(date_time.format(&Iso8601::DATE_TIME)?)
}

pub(crate) fn parse_date_time(value: &str) -> Result<PrimitiveDateTime, DaoError> {
    Ok(PrimitiveDateTime::parse(value, &Iso8601::DATE_TIME)?)
}

pub(crate) fn parse_optional_date_time(
    value: Option<&str>,
) -> Result<Option<PrimitiveDateTime>, DaoError> {
    value.map(parse_date_time).transpose()
}

pub(crate) fn format_optional_date_time(
    value: Option<PrimitiveDateTime>,
) -> Result<Option<String>, DaoError> {
    value.map(format_date_time).transpose()
}

pub struct PermissionDaoImpl {
    pool: Arc<SqlitePool>,
}
impl PermissionDaoImpl {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CountDb {
    results: i64,
}

#[derive(sqlx::FromRow)]
struct UserDb {
    name: String,
}

#[async_trait]
impl dao::PermissionDao for PermissionDaoImpl {
    async fn has_privilege(&self, user: &str, privilege: &str) -> Result<bool, DaoError> {
        let result = query_as::<_, CountDb>(
            r"SELECT count(*) as results FROM user
                INNER JOIN user_role ON user.name = user_role.user_name
                INNER JOIN role ON user_role.role_name = role.name
                INNER JOIN role_privilege ON role.name = role_privilege.role_name
                WHERE role_privilege.privilege_name = ? AND user.name = ?",
        )
        .bind(privilege)
        .bind(user)
        .fetch_one(self.pool.as_ref())
        .await
        .map_db_error()?;
        Ok(result.results > 0)
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserEntity>, DaoError> {
        let result = query_as::<_, UserDb>(r"SELECT name FROM user WHERE name = ?")
            .bind(username)
            .fetch_optional(self.pool.as_ref())
            .await
            .map_db_error()?;
        Ok(result.map(|row| UserEntity {
            name: row.name.into(),
        }))
    }

    async fn create_user(&self, user: &UserEntity, process: &str) -> Result<(), DaoError> {
        query(r"INSERT INTO user (name, update_process) VALUES (?, ?)")
            .bind(user.name.as_ref())
            .bind(process)
            .execute(self.pool.as_ref())
            .await
            .map_db_error()?;
        Ok(())
    }

    async fn add_user_role(&self, user: &str, role: &str, process: &str) -> Result<(), DaoError> {
        query(r"INSERT INTO user_role (user_name, role_name, update_process) VALUES (?, ?, ?)")
            .bind(user)
            .bind(role)
            .bind(process)
            .execute(self.pool.as_ref())
            .await
            .map_db_error()?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct TransactionImpl {
    tx: Arc<Mutex<sqlx::Transaction<'static, sqlx::Sqlite>>>,
}

impl Transaction for TransactionImpl {}

pub struct TransactionDaoImpl {
    pool: Arc<SqlitePool>,
}
impl TransactionDaoImpl {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}
#[async_trait]
impl dao::TransactionDao for TransactionDaoImpl {
    type Transaction = TransactionImpl;

    async fn new_transaction(&self) -> Result<Self::Transaction, DaoError> {
        let tx = self.pool.begin().await.map_db_error()?;
        Ok(TransactionImpl {
            tx: Arc::new(tx.into()),
        })
    }

    async fn use_transaction(
        &self,
        tx: Option<Self::Transaction>,
    ) -> Result<Self::Transaction, DaoError> {
        match tx {
            Some(tx) => Ok(tx),
            None => self.new_transaction().await,
        }
    }

    async fn commit(&self, transaction: Self::Transaction) -> Result<(), DaoError> {
        if let Some(tx) = Arc::into_inner(transaction.tx) {
            tx.into_inner().commit().await.map_db_error()?;
        }
        Ok(())
    }
}
