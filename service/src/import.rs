use std::fmt::Debug;

use async_trait::async_trait;
use mockall::automock;
use time::Date;
use tokio_util::sync::CancellationToken;

use crate::integration::Provider;
use crate::permission::Authentication;
use crate::ServiceError;

/// Counters of one import run of a provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub from: Option<Date>,
    pub to: Option<Date>,
    pub people_fetched: u32,
    pub employees_matched: u32,
    pub time_entries_created: u32,
    pub time_entries_updated: u32,
    /// Records deleted locally which the provider still delivers.
    pub skipped_deleted: u32,
    /// Records of people no local employee matches.
    pub skipped_unmatched: u32,
    /// Records rejected as invalid or referring to unknown data.
    pub skipped_invalid: u32,
    pub absences_imported: u32,
    pub plannings_imported: u32,
}

impl ImportReport {
    pub fn time_entries_imported(&self) -> u32 {
        self.time_entries_created + self.time_entries_updated
    }
}

#[automock(type Context=();)]
#[async_trait]
pub trait ImportService {
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;

    /// Pulls people, time entries, absences and plannings of the provider
    /// and writes them through the stores. Every record is committed on its
    /// own, so an aborted run keeps what it imported so far.
    ///
    /// Rejected credentials deactivate the integration. Cancellation is
    /// checked after every response of the provider.
    async fn import_provider(
        &self,
        provider: Provider,
        cancellation: CancellationToken,
        context: Authentication<Self::Context>,
    ) -> Result<ImportReport, ServiceError>;

    async fn test_connection(
        &self,
        provider: Provider,
        context: Authentication<Self::Context>,
    ) -> Result<(), ServiceError>;

    /// Removes duplicate time entries of every employee. Returns the number
    /// of removed entries.
    async fn cleanup_duplicates(
        &self,
        context: Authentication<Self::Context>,
    ) -> Result<u32, ServiceError>;
}
