use std::collections::BTreeMap;
use std::fmt::{Debug, Display};
use std::sync::Arc;

use async_trait::async_trait;
use dao::integration::{IntegrationEntity, ProviderEntity};
use mockall::automock;
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use crate::permission::Authentication;
use crate::time_entry::DataSource;
use crate::ServiceError;

pub const METADATA_LAST_ERROR: &str = "lastError";
pub const METADATA_IMPORTED_EMPLOYEES: &str = "importedEmployees";
pub const METADATA_IMPORTED_TIME_ENTRIES: &str = "importedTimeEntries";
pub const METADATA_IMPORTED_ABSENCES: &str = "importedAbsences";
pub const METADATA_IMPORTED_PLANNINGS: &str = "importedPlannings";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Provider {
    Timebutler,
    Erfasst123,
}

impl Provider {
    pub fn all() -> &'static [Provider] {
        &[Provider::Timebutler, Provider::Erfasst123]
    }

    pub fn code(&self) -> &'static str {
        match self {
            Provider::Timebutler => "timebutler",
            Provider::Erfasst123 => "123erfasst",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Timebutler => "Timebutler",
            Provider::Erfasst123 => "123erfasst",
        }
    }

    /// Source tag of records imported from this provider.
    pub fn data_source(&self) -> DataSource {
        match self {
            Provider::Timebutler => DataSource::Timebutler,
            Provider::Erfasst123 => DataSource::Erfasst123,
        }
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl From<&ProviderEntity> for Provider {
    fn from(provider: &ProviderEntity) -> Self {
        match provider {
            ProviderEntity::Timebutler => Self::Timebutler,
            ProviderEntity::Erfasst123 => Self::Erfasst123,
        }
    }
}
impl From<&Provider> for ProviderEntity {
    fn from(provider: &Provider) -> Self {
        match provider {
            Provider::Timebutler => Self::Timebutler,
            Provider::Erfasst123 => Self::Erfasst123,
        }
    }
}

/// Configured connection to a provider. The credentials are never part of
/// the model, only whether some are stored.
#[derive(Clone, Debug, PartialEq)]
pub struct Integration {
    pub id: Uuid,
    pub provider: Provider,
    pub name: Arc<str>,
    pub has_credentials: bool,
    pub active: bool,
    pub auto_sync: bool,
    pub sync_start_date: Option<Date>,
    pub last_sync_at: Option<PrimitiveDateTime>,
    pub metadata: BTreeMap<Arc<str>, Arc<str>>,
    pub created: Option<PrimitiveDateTime>,
    pub version: Uuid,
}

impl From<&IntegrationEntity> for Integration {
    fn from(integration: &IntegrationEntity) -> Self {
        Self {
            id: integration.id,
            provider: (&integration.provider).into(),
            name: integration.name.clone(),
            has_credentials: !integration.credentials.is_empty(),
            active: integration.active,
            auto_sync: integration.auto_sync,
            sync_start_date: integration.sync_start_date,
            last_sync_at: integration.last_sync_at,
            metadata: integration.metadata.clone(),
            created: Some(integration.created),
            version: integration.version,
        }
    }
}

peopleflow_utils::derive_from_reference!(IntegrationEntity, Integration);

/// Settings of an integration as entered by an administrator.
#[derive(Clone, Debug, PartialEq)]
pub struct IntegrationSettings {
    pub name: Arc<str>,
    /// Plain text. The API token for Timebutler, `email:password` for
    /// 123erfasst. `None` keeps the stored credentials.
    pub credentials: Option<Arc<str>>,
    pub auto_sync: bool,
    pub sync_start_date: Option<Date>,
}

#[automock(type Context=(); type Transaction=dao::MockTransaction;)]
#[async_trait]
pub trait IntegrationService {
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;
    type Transaction: dao::Transaction;

    async fn get_all(
        &self,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Integration]>, ServiceError>;

    /// Fails with `IntegrationNotConfigured` if the provider was never set up.
    async fn get(
        &self,
        provider: Provider,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Integration, ServiceError>;

    /// Creates or updates the integration and activates it.
    async fn configure(
        &self,
        provider: Provider,
        settings: &IntegrationSettings,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Integration, ServiceError>;

    async fn deactivate(
        &self,
        provider: Provider,
        reason: &str,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Integration, ServiceError>;

    /// Decrypted credentials. Only available with full authentication.
    async fn credentials(
        &self,
        provider: Provider,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<str>, ServiceError>;

    /// Merges the metadata into the stored one and sets `last_sync_at` if given.
    async fn record_sync(
        &self,
        provider: Provider,
        synced_at: Option<PrimitiveDateTime>,
        metadata: BTreeMap<Arc<str>, Arc<str>>,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Integration, ServiceError>;
}
