use crate::import::ImportReport;
use crate::integration::Provider;
use crate::overtime::RecomputeReport;
use crate::ServiceError;
use async_trait::async_trait;
use mockall::automock;
use std::fmt::Debug;
use std::sync::Arc;

/// Result of the import of one provider during a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderSync {
    pub provider: Provider,
    pub report: Option<ImportReport>,
    /// Message of the error which aborted the import.
    pub error: Option<Arc<str>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    Completed {
        providers: Arc<[ProviderSync]>,
        recompute: Option<RecomputeReport>,
    },
    /// Another tick was still running.
    Skipped,
    Cancelled,
}

#[automock(type Context=();)]
#[async_trait]
pub trait SchedulerService {
    /// The type of the authentication context your scheduler might need to pass
    /// to other services when invoking them.
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;

    /// Starts the periodic sync in a background task. The first tick runs
    /// immediately. Calling it on a running scheduler does nothing.
    async fn start(&self) -> Result<(), ServiceError>;

    /// Cancels the sync and waits for the running tick to finish. Calling it
    /// on a stopped scheduler does nothing.
    async fn stop(&self) -> Result<(), ServiceError>;

    async fn is_running(&self) -> bool;

    /// One sync: imports every active provider with auto sync, then
    /// recomputes all overtime balances. Dropped if a tick is in flight.
    async fn tick(&self) -> Result<TickOutcome, ServiceError>;

    /// Schedules the nightly duplicate cleanup.
    /// The `cron` parameter is a cron expression with seconds (e.g. `"0 0 3 * * *"`).
    async fn schedule_duplicate_cleanup(&self, cron: &str) -> Result<(), ServiceError>;
}
