use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    format_date, format_date_time, format_optional_date_time, parse_date, parse_date_time,
    parse_optional_date_time, ResultDbErrorExt, TransactionImpl,
};
use async_trait::async_trait;
use dao::{
    integration::{IntegrationDao, IntegrationEntity, ProviderEntity},
    DaoError,
};
use sqlx::{query, query_as};
use tracing::info;
use uuid::Uuid;

const INTEGRATION_COLUMNS: &str = r"id, provider, name, credentials, active, auto_sync,
    sync_start_date, last_sync_at, created, update_version";

#[derive(Debug, sqlx::FromRow)]
struct IntegrationDb {
    id: Vec<u8>,
    provider: String,
    name: String,
    credentials: String,
    active: bool,
    auto_sync: bool,
    sync_start_date: Option<String>,
    last_sync_at: Option<String>,
    created: String,
    update_version: Vec<u8>,
}

#[derive(Debug, sqlx::FromRow)]
struct MetadataDb {
    key: String,
    value: String,
}

fn provider_code(provider: ProviderEntity) -> &'static str {
    match provider {
        ProviderEntity::Timebutler => "timebutler",
        ProviderEntity::Erfasst123 => "123erfasst",
    }
}

fn parse_provider(code: &str) -> Result<ProviderEntity, DaoError> {
    Ok(match code {
        "timebutler" => ProviderEntity::Timebutler,
        "123erfasst" => ProviderEntity::Erfasst123,
        _ => return Err(DaoError::EnumValueNotFound(code.into())),
    })
}

impl IntegrationDb {
    fn to_entity(
        &self,
        metadata: BTreeMap<Arc<str>, Arc<str>>,
    ) -> Result<IntegrationEntity, DaoError> {
        Ok(IntegrationEntity {
            id: Uuid::from_slice(self.id.as_ref())?,
            provider: parse_provider(&self.provider)?,
            name: self.name.as_str().into(),
            credentials: self.credentials.as_str().into(),
            active: self.active,
            auto_sync: self.auto_sync,
            sync_start_date: self.sync_start_date.as_deref().map(parse_date).transpose()?,
            last_sync_at: parse_optional_date_time(self.last_sync_at.as_deref())?,
            metadata,
            created: parse_date_time(&self.created)?,
            version: Uuid::from_slice(self.update_version.as_ref())?,
        })
    }
}

pub struct IntegrationDaoImpl {
    pub _pool: Arc<sqlx::SqlitePool>,
}

impl IntegrationDaoImpl {
    pub fn new(pool: Arc<sqlx::SqlitePool>) -> Self {
        Self { _pool: pool }
    }

    async fn load_metadata(
        &self,
        integration_id: &[u8],
        tx: &TransactionImpl,
    ) -> Result<BTreeMap<Arc<str>, Arc<str>>, DaoError> {
        Ok(query_as::<_, MetadataDb>(
            r"SELECT key, value FROM integration_metadata WHERE integration_id = ?",
        )
        .bind(integration_id.to_vec())
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?
        .into_iter()
        .map(|row| (Arc::from(row.key), Arc::from(row.value)))
        .collect())
    }

    async fn store_metadata(
        &self,
        entity: &IntegrationEntity,
        process: &str,
        tx: &TransactionImpl,
    ) -> Result<(), DaoError> {
        query(r"DELETE FROM integration_metadata WHERE integration_id = ?")
            .bind(entity.id.as_bytes().to_vec())
            .execute(tx.tx.lock().await.as_mut())
            .await
            .map_db_error()?;
        for (key, value) in entity.metadata.iter() {
            query(
                r"INSERT INTO integration_metadata (integration_id, key, value, update_process)
                VALUES (?, ?, ?, ?)",
            )
            .bind(entity.id.as_bytes().to_vec())
            .bind(key.as_ref())
            .bind(value.as_ref())
            .bind(process)
            .execute(tx.tx.lock().await.as_mut())
            .await
            .map_db_error()?;
        }
        Ok(())
    }

    async fn combine(
        &self,
        rows: Vec<IntegrationDb>,
        tx: &TransactionImpl,
    ) -> Result<Vec<IntegrationEntity>, DaoError> {
        let mut entities = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let metadata = self.load_metadata(&row.id, tx).await?;
            entities.push(row.to_entity(metadata)?);
        }
        Ok(entities)
    }
}

#[async_trait]
impl IntegrationDao for IntegrationDaoImpl {
    type Transaction = TransactionImpl;

    async fn all(&self, tx: Self::Transaction) -> Result<Arc<[IntegrationEntity]>, DaoError> {
        let rows = query_as::<_, IntegrationDb>(&format!(
            "SELECT {INTEGRATION_COLUMNS} FROM integration ORDER BY provider"
        ))
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(self.combine(rows, &tx).await?.into())
    }

    async fn find_by_provider(
        &self,
        provider: ProviderEntity,
        tx: Self::Transaction,
    ) -> Result<Option<IntegrationEntity>, DaoError> {
        let rows = query_as::<_, IntegrationDb>(&format!(
            "SELECT {INTEGRATION_COLUMNS} FROM integration WHERE provider = ?"
        ))
        .bind(provider_code(provider))
        .fetch_all(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        Ok(self.combine(rows, &tx).await?.into_iter().next())
    }

    async fn create(
        &self,
        entity: &IntegrationEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        info!("Create integration for {}", provider_code(entity.provider));
        query(
            r"INSERT INTO integration (id, provider, name, credentials, active, auto_sync,
                sync_start_date, last_sync_at, created, update_process, update_version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entity.id.as_bytes().to_vec())
        .bind(provider_code(entity.provider))
        .bind(entity.name.as_ref())
        .bind(entity.credentials.as_ref())
        .bind(entity.active)
        .bind(entity.auto_sync)
        .bind(entity.sync_start_date.map(format_date).transpose()?)
        .bind(format_optional_date_time(entity.last_sync_at)?)
        .bind(format_date_time(entity.created)?)
        .bind(process)
        .bind(entity.version.as_bytes().to_vec())
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        self.store_metadata(entity, process, &tx).await
    }

    async fn update(
        &self,
        entity: &IntegrationEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError> {
        query(
            r"UPDATE integration SET name = ?, credentials = ?, active = ?, auto_sync = ?,
                sync_start_date = ?, last_sync_at = ?, update_process = ?, update_version = ?
            WHERE id = ?",
        )
        .bind(entity.name.as_ref())
        .bind(entity.credentials.as_ref())
        .bind(entity.active)
        .bind(entity.auto_sync)
        .bind(entity.sync_start_date.map(format_date).transpose()?)
        .bind(format_optional_date_time(entity.last_sync_at)?)
        .bind(process)
        .bind(entity.version.as_bytes().to_vec())
        .bind(entity.id.as_bytes().to_vec())
        .execute(tx.tx.lock().await.as_mut())
        .await
        .map_db_error()?;
        self.store_metadata(entity, process, &tx).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use dao::integration::{IntegrationDao, IntegrationEntity, ProviderEntity};
    use time::macros::{date, datetime};
    use uuid::uuid;

    use super::IntegrationDaoImpl;
    use crate::test_support::setup;

    fn integration() -> IntegrationEntity {
        IntegrationEntity {
            id: uuid!("a1b2c3d4-e5f6-4a7b-8c9d-0e1f2a3b4c01"),
            provider: ProviderEntity::Timebutler,
            name: "Timebutler".into(),
            credentials: "encrypted".into(),
            active: true,
            auto_sync: true,
            sync_start_date: Some(date!(2025-01-01)),
            last_sync_at: None,
            metadata: BTreeMap::from([(Arc::from("lastImportedCount"), Arc::from("3"))]),
            created: datetime!(2025-01-01 08:00:00),
            version: uuid!("a1b2c3d4-e5f6-4a7b-8c9d-0e1f2a3b4cff"),
        }
    }

    #[tokio::test]
    async fn test_update_replaces_metadata() {
        let (pool, tx) = setup().await;
        let dao = IntegrationDaoImpl::new(pool);
        dao.create(&integration(), "test", tx.clone())
            .await
            .unwrap();

        let updated = IntegrationEntity {
            last_sync_at: Some(datetime!(2025-02-01 03:00:00)),
            metadata: BTreeMap::from([(Arc::from("lastError"), Arc::from("timeout"))]),
            ..integration()
        };
        dao.update(&updated, "test", tx.clone()).await.unwrap();

        let loaded = dao
            .find_by_provider(ProviderEntity::Timebutler, tx.clone())
            .await
            .unwrap();
        assert_eq!(loaded, Some(updated));
        assert!(dao
            .find_by_provider(ProviderEntity::Erfasst123, tx.clone())
            .await
            .unwrap()
            .is_none());
        assert_eq!(dao.all(tx.clone()).await.unwrap().len(), 1);
    }
}
