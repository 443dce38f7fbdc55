use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::gen_service_impl;
use async_trait::async_trait;
use chrono::Local;
use service::{
    config::ConfigService,
    import::ImportService,
    integration::IntegrationService,
    overtime::OvertimeService,
    permission::Authentication,
    scheduler::{ProviderSync, SchedulerService, TickOutcome},
    ServiceError, ValidationFailureItem,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_cron::{Job, Scheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

gen_service_impl! {
    struct SchedulerServiceImpl: SchedulerService = SchedulerServiceDeps {
        ImportService: ImportService<Context = Self::Context> = import_service,
        IntegrationService: IntegrationService<Context = Self::Context, Transaction = Self::Transaction> = integration_service,
        OvertimeService: OvertimeService<Context = Self::Context, Transaction = Self::Transaction> = overtime_service,
        ConfigService: ConfigService = config_service,
    }
    ; custom_fields {
        cron_scheduler: Arc<Mutex<Scheduler<Local>>> = cron_scheduler,
        sync_loop: Arc<Mutex<Option<SyncLoop>>> = sync_loop,
        tick_lock: Arc<Mutex<()>> = tick_lock,
        cleanup_scheduled: Arc<AtomicBool> = cleanup_scheduled,
    }
}

/// The background task of a started scheduler.
pub struct SyncLoop {
    cancellation: CancellationToken,
    handle: JoinHandle<()>,
}

/// The part of the scheduler which is moved into the background task.
struct Ticker<Deps: SchedulerServiceDeps> {
    import_service: Arc<Deps::ImportService>,
    integration_service: Arc<Deps::IntegrationService>,
    overtime_service: Arc<Deps::OvertimeService>,
    tick_lock: Arc<Mutex<()>>,
}

impl<Deps: SchedulerServiceDeps> Ticker<Deps> {
    async fn tick(&self, cancellation: &CancellationToken) -> Result<TickOutcome, ServiceError> {
        let Ok(_guard) = self.tick_lock.try_lock() else {
            info!("Previous sync is still running, skipping this one");
            return Ok(TickOutcome::Skipped);
        };
        if cancellation.is_cancelled() {
            return Ok(TickOutcome::Cancelled);
        }

        let integrations = self
            .integration_service
            .get_all(Authentication::Full, None)
            .await?;
        let mut providers = Vec::new();
        for integration in integrations
            .iter()
            .filter(|integration| integration.active && integration.auto_sync)
        {
            if cancellation.is_cancelled() {
                return Ok(TickOutcome::Cancelled);
            }
            let provider = integration.provider;
            match self
                .import_service
                .import_provider(provider, cancellation.clone(), Authentication::Full)
                .await
            {
                Ok(report) => providers.push(ProviderSync {
                    provider,
                    report: Some(report),
                    error: None,
                }),
                Err(ServiceError::Cancelled) => return Ok(TickOutcome::Cancelled),
                Err(err) => {
                    warn!("Sync of {} failed: {}", provider, err);
                    providers.push(ProviderSync {
                        provider,
                        report: None,
                        error: Some(err.to_string().into()),
                    });
                }
            }
        }
        if cancellation.is_cancelled() {
            return Ok(TickOutcome::Cancelled);
        }

        let recompute = match self
            .overtime_service
            .recompute_all(Authentication::Full)
            .await
        {
            Ok(report) => Some(report),
            Err(err) => {
                error!("Overtime recompute failed: {}", err);
                None
            }
        };
        Ok(TickOutcome::Completed {
            providers: providers.into(),
            recompute,
        })
    }
}

/// Six fields, the first one being the seconds.
fn validate_cron(cron: &str) -> Result<(), ServiceError> {
    if cron.split_whitespace().count() == 6 {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(
            [ValidationFailureItem::InvalidValue("cleanup_cron".into())].into(),
        ))
    }
}

impl<Deps: SchedulerServiceDeps> SchedulerServiceImpl<Deps> {
    pub fn new(
        import_service: Arc<Deps::ImportService>,
        integration_service: Arc<Deps::IntegrationService>,
        overtime_service: Arc<Deps::OvertimeService>,
        config_service: Arc<Deps::ConfigService>,
    ) -> Self {
        Self {
            import_service,
            integration_service,
            overtime_service,
            config_service,
            cron_scheduler: Arc::new(Mutex::new(Scheduler::local())),
            sync_loop: Arc::new(Mutex::new(None)),
            tick_lock: Arc::new(Mutex::new(())),
            cleanup_scheduled: Arc::new(AtomicBool::new(false)),
        }
    }

    fn ticker(&self) -> Ticker<Deps> {
        Ticker {
            import_service: self.import_service.clone(),
            integration_service: self.integration_service.clone(),
            overtime_service: self.overtime_service.clone(),
            tick_lock: self.tick_lock.clone(),
        }
    }
}

#[async_trait]
impl<Deps: SchedulerServiceDeps + 'static> SchedulerService for SchedulerServiceImpl<Deps> {
    type Context = Deps::Context;

    async fn start(&self) -> Result<(), ServiceError> {
        let mut sync_loop = self.sync_loop.lock().await;
        if sync_loop.is_some() {
            debug!("Scheduler is already running");
            return Ok(());
        }
        let config = self.config_service.get_config().await?;

        let cancellation = CancellationToken::new();
        let loop_cancellation = cancellation.clone();
        let ticker = self.ticker();
        let sync_interval = config.sync_interval;
        let handle = tokio::spawn(async move {
            info!("Starting the sync loop, interval {:?}", sync_interval);
            let mut interval = tokio::time::interval(sync_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = loop_cancellation.cancelled() => break,
                    _ = interval.tick() => {
                        match ticker.tick(&loop_cancellation).await {
                            Ok(outcome) => debug!("Sync tick finished: {:?}", outcome),
                            Err(err) => error!("Sync tick failed: {}", err),
                        }
                    }
                }
            }
            info!("Sync loop stopped");
        });
        *sync_loop = Some(SyncLoop {
            cancellation,
            handle,
        });
        drop(sync_loop);

        if !self.cleanup_scheduled.swap(true, Ordering::SeqCst) {
            self.schedule_duplicate_cleanup(&config.cleanup_cron).await?;
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        let Some(SyncLoop {
            cancellation,
            handle,
        }) = self.sync_loop.lock().await.take()
        else {
            debug!("Scheduler is not running");
            return Ok(());
        };
        cancellation.cancel();
        if let Err(err) = handle.await {
            error!("Sync loop ended abnormally: {}", err);
            return Err(ServiceError::InternalError);
        }
        Ok(())
    }

    async fn is_running(&self) -> bool {
        self.sync_loop
            .lock()
            .await
            .as_ref()
            .is_some_and(|sync_loop| !sync_loop.handle.is_finished())
    }

    async fn tick(&self) -> Result<TickOutcome, ServiceError> {
        let cancellation = match self.sync_loop.lock().await.as_ref() {
            Some(sync_loop) => sync_loop.cancellation.clone(),
            None => CancellationToken::new(),
        };
        self.ticker().tick(&cancellation).await
    }

    async fn schedule_duplicate_cleanup(&self, cron: &str) -> Result<(), ServiceError> {
        validate_cron(cron)?;
        let mut scheduler = self.cron_scheduler.lock().await;
        let import_service = self.import_service.clone();

        scheduler.add(Job::new(cron, move || {
            let import_service = import_service.clone();
            async move {
                match import_service
                    .cleanup_duplicates(Authentication::Full)
                    .await
                {
                    Ok(removed) => info!("Nightly cleanup removed {} duplicates", removed),
                    Err(err) => error!("Nightly duplicate cleanup failed: {:?}", err),
                }
            }
        }));

        info!("Scheduled duplicate cleanup with cron expression: {}", cron);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_cron() {
        assert!(validate_cron("0 0 3 * * *").is_ok());
        assert!(validate_cron("0 3 * * *").is_err());
        assert!(validate_cron("").is_err());
    }
}
