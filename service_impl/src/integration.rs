use std::collections::BTreeMap;
use std::sync::Arc;

use crate::gen_service_impl;
use async_trait::async_trait;
use dao::{
    integration::{IntegrationDao, IntegrationEntity},
    TransactionDao,
};
use service::{
    activity::{ActivityService, ActivityType},
    clock::ClockService,
    crypto::CredentialCipher,
    integration::{
        Integration, IntegrationService, IntegrationSettings, Provider, METADATA_LAST_ERROR,
    },
    permission::{Authentication, ADMIN_PRIVILEGE, HR_PRIVILEGE},
    uuid_service::UuidService,
    PermissionService, ServiceError, ValidationFailureItem,
};
use tracing::warn;

const INTEGRATION_SERVICE_PROCESS: &str = "integration-service";

gen_service_impl! {
    struct IntegrationServiceImpl: IntegrationService = IntegrationServiceDeps {
        IntegrationDao: IntegrationDao<Transaction = Self::Transaction> = integration_dao,
        ActivityService: ActivityService<Context = Self::Context, Transaction = Self::Transaction> = activity_service,
        PermissionService: PermissionService<Context = Self::Context> = permission_service,
        CredentialCipher: CredentialCipher = credential_cipher,
        ClockService: ClockService = clock_service,
        UuidService: UuidService = uuid_service,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
    }
}

impl<Deps: IntegrationServiceDeps> IntegrationServiceImpl<Deps> {
    async fn find_entity(
        &self,
        provider: Provider,
        tx: Deps::Transaction,
    ) -> Result<IntegrationEntity, ServiceError> {
        self.integration_dao
            .find_by_provider((&provider).into(), tx)
            .await?
            .ok_or_else(|| ServiceError::IntegrationNotConfigured(provider.code().into()))
    }
}

#[async_trait]
impl<Deps: IntegrationServiceDeps> IntegrationService for IntegrationServiceImpl<Deps> {
    type Context = Deps::Context;
    type Transaction = Deps::Transaction;

    async fn get_all(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Integration]>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;
        let integrations = self
            .integration_dao
            .all(tx.clone())
            .await?
            .iter()
            .map(Integration::from)
            .collect();
        self.transaction_dao.commit(tx).await?;
        Ok(integrations)
    }

    async fn get(
        &self,
        provider: Provider,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Integration, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;
        let integration = self.find_entity(provider, tx.clone()).await?;
        self.transaction_dao.commit(tx).await?;
        Ok((&integration).into())
    }

    async fn configure(
        &self,
        provider: Provider,
        settings: &IntegrationSettings,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Integration, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(ADMIN_PRIVILEGE, context)
            .await?;

        let credentials = match settings.credentials.as_deref() {
            Some(credentials) if !credentials.trim().is_empty() => {
                Some(self.credential_cipher.encrypt(credentials.trim())?)
            }
            Some(_) => {
                return Err(ServiceError::ValidationError(
                    [ValidationFailureItem::InvalidValue("credentials".into())].into(),
                ))
            }
            None => None,
        };
        let name: Arc<str> = if settings.name.trim().is_empty() {
            provider.display_name().into()
        } else {
            settings.name.trim().into()
        };
        let version = self
            .uuid_service
            .new_uuid(&format!("{}::configure version", INTEGRATION_SERVICE_PROCESS));

        let existing = self
            .integration_dao
            .find_by_provider((&provider).into(), tx.clone())
            .await?;
        let integration = match existing {
            Some(existing) => {
                let mut metadata = existing.metadata.clone();
                metadata.remove(METADATA_LAST_ERROR);
                let integration = IntegrationEntity {
                    name,
                    credentials: credentials.unwrap_or_else(|| existing.credentials.clone()),
                    active: true,
                    auto_sync: settings.auto_sync,
                    sync_start_date: settings.sync_start_date,
                    metadata,
                    version,
                    ..existing
                };
                self.integration_dao
                    .update(&integration, INTEGRATION_SERVICE_PROCESS, tx.clone())
                    .await?;
                integration
            }
            None => {
                let Some(credentials) = credentials else {
                    return Err(ServiceError::ValidationError(
                        [ValidationFailureItem::InvalidValue("credentials".into())].into(),
                    ));
                };
                let integration = IntegrationEntity {
                    id: self
                        .uuid_service
                        .new_uuid(&format!("{}::configure id", INTEGRATION_SERVICE_PROCESS)),
                    provider: (&provider).into(),
                    name,
                    credentials,
                    active: true,
                    auto_sync: settings.auto_sync,
                    sync_start_date: settings.sync_start_date,
                    last_sync_at: None,
                    metadata: BTreeMap::new(),
                    created: self.clock_service.date_time_now(),
                    version,
                };
                self.integration_dao
                    .create(&integration, INTEGRATION_SERVICE_PROCESS, tx.clone())
                    .await?;
                integration
            }
        };
        self.transaction_dao.commit(tx).await?;
        Ok((&integration).into())
    }

    async fn deactivate(
        &self,
        provider: Provider,
        reason: &str,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Integration, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(ADMIN_PRIVILEGE, context.clone())
            .await?;

        let mut integration = self.find_entity(provider, tx.clone()).await?;
        integration.active = false;
        integration
            .metadata
            .insert(METADATA_LAST_ERROR.into(), reason.into());
        integration.version = self
            .uuid_service
            .new_uuid(&format!("{}::deactivate version", INTEGRATION_SERVICE_PROCESS));
        self.integration_dao
            .update(&integration, INTEGRATION_SERVICE_PROCESS, tx.clone())
            .await?;
        warn!("Integration {} deactivated: {}", provider, reason);
        self.activity_service
            .log(
                ActivityType::IntegrationDeactivated,
                None,
                &format!("Integration {} deaktiviert: {}", provider, reason),
                context,
                tx.clone().into(),
            )
            .await?;
        self.transaction_dao.commit(tx).await?;
        Ok((&integration).into())
    }

    async fn credentials(
        &self,
        provider: Provider,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<str>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_only_full_authentication(context)
            .await?;
        let integration = self.find_entity(provider, tx.clone()).await?;
        self.transaction_dao.commit(tx).await?;
        if integration.credentials.is_empty() {
            return Err(ServiceError::IntegrationNotConfigured(provider.code().into()));
        }
        self.credential_cipher.decrypt(&integration.credentials)
    }

    async fn record_sync(
        &self,
        provider: Provider,
        synced_at: Option<time::PrimitiveDateTime>,
        metadata: BTreeMap<Arc<str>, Arc<str>>,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Integration, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;

        let mut integration = self.find_entity(provider, tx.clone()).await?;
        if synced_at.is_some() {
            integration.last_sync_at = synced_at;
        }
        integration.metadata.extend(metadata);
        integration.version = self
            .uuid_service
            .new_uuid(&format!("{}::record_sync version", INTEGRATION_SERVICE_PROCESS));
        self.integration_dao
            .update(&integration, INTEGRATION_SERVICE_PROCESS, tx.clone())
            .await?;
        self.transaction_dao.commit(tx).await?;
        Ok((&integration).into())
    }
}
