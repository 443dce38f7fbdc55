use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use crate::DaoError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderEntity {
    Timebutler,
    Erfasst123,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IntegrationEntity {
    pub id: Uuid,
    pub provider: ProviderEntity,
    pub name: Arc<str>,
    /// Encrypted, never stored in plain text.
    pub credentials: Arc<str>,
    pub active: bool,
    pub auto_sync: bool,
    pub sync_start_date: Option<Date>,
    pub last_sync_at: Option<PrimitiveDateTime>,
    pub metadata: BTreeMap<Arc<str>, Arc<str>>,

    pub created: PrimitiveDateTime,
    pub version: Uuid,
}

#[automock(type Transaction = crate::MockTransaction;)]
#[async_trait]
pub trait IntegrationDao {
    type Transaction: crate::Transaction;

    async fn all(&self, tx: Self::Transaction) -> Result<Arc<[IntegrationEntity]>, DaoError>;

    async fn find_by_provider(
        &self,
        provider: ProviderEntity,
        tx: Self::Transaction,
    ) -> Result<Option<IntegrationEntity>, DaoError>;

    async fn create(
        &self,
        entity: &IntegrationEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;

    /// Updates the integration and replaces its metadata.
    async fn update(
        &self,
        entity: &IntegrationEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;
}
