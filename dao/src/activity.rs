use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::DaoError;

#[derive(Clone, Debug, PartialEq)]
pub struct ActivityEntity {
    pub id: Uuid,
    pub activity_type: Arc<str>,
    pub employee_id: Option<Uuid>,
    pub message: Arc<str>,
    pub user: Arc<str>,
    pub created: PrimitiveDateTime,
}

#[automock(type Transaction = crate::MockTransaction;)]
#[async_trait]
pub trait ActivityDao {
    type Transaction: crate::Transaction;

    async fn create(
        &self,
        entity: &ActivityEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;

    /// Newest first.
    async fn find_latest(
        &self,
        limit: u32,
        tx: Self::Transaction,
    ) -> Result<Arc<[ActivityEntity]>, DaoError>;
}
