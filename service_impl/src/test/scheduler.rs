use std::collections::BTreeMap;
use std::sync::Arc;

use crate::scheduler::{SchedulerServiceDeps, SchedulerServiceImpl};
use crate::test::error_test::*;
use dao::MockTransaction;
use mockall::predicate::{always, eq};
use service::config::{Config, MockConfigService};
use service::import::{ImportReport, MockImportService};
use service::integration::{Integration, MockIntegrationService, Provider};
use service::overtime::{MockOvertimeService, RecomputeOutcome, RecomputeReport};
use service::permission::Authentication;
use service::scheduler::{SchedulerService, TickOutcome};
use service::{ServiceError, ValidationFailureItem};
use uuid::uuid;

fn integration(provider: Provider, active: bool, auto_sync: bool) -> Integration {
    Integration {
        id: uuid!("3B5D7F91-A2C4-4E6A-8B0D-F1E3C5A7B901"),
        provider,
        name: provider.to_string().into(),
        has_credentials: true,
        active,
        auto_sync,
        sync_start_date: None,
        last_sync_at: None,
        metadata: BTreeMap::new(),
        created: Some(generate_default_datetime()),
        version: uuid!("3B5D7F91-A2C4-4E6A-8B0D-F1E3C5A7B902"),
    }
}

fn recompute_report() -> RecomputeReport {
    RecomputeReport {
        outcomes: Arc::new([(
            uuid!("3B5D7F91-A2C4-4E6A-8B0D-F1E3C5A7B910"),
            RecomputeOutcome::Recomputed(1.5),
        )]),
    }
}

pub struct SchedulerServiceDependencies {
    pub import_service: MockImportService,
    pub integration_service: MockIntegrationService,
    pub overtime_service: MockOvertimeService,
    pub config_service: MockConfigService,
}

impl SchedulerServiceDeps for SchedulerServiceDependencies {
    type Context = ();
    type Transaction = MockTransaction;
    type ImportService = MockImportService;
    type IntegrationService = MockIntegrationService;
    type OvertimeService = MockOvertimeService;
    type ConfigService = MockConfigService;
}

impl SchedulerServiceDependencies {
    pub fn build_service(self) -> SchedulerServiceImpl<SchedulerServiceDependencies> {
        SchedulerServiceImpl::new(
            self.import_service.into(),
            self.integration_service.into(),
            self.overtime_service.into(),
            self.config_service.into(),
        )
    }
}

/// Timebutler syncs automatically, 123erfasst is configured for manual
/// imports only.
pub fn build_dependencies() -> SchedulerServiceDependencies {
    let mut integration_service = MockIntegrationService::new();
    integration_service.expect_get_all().returning(|_, _| {
        Ok(Arc::new([
            integration(Provider::Timebutler, true, true),
            integration(Provider::Erfasst123, true, false),
        ]))
    });

    let mut overtime_service = MockOvertimeService::new();
    overtime_service
        .expect_recompute_all()
        .returning(|_| Ok(recompute_report()));

    let mut config_service = MockConfigService::new();
    config_service
        .expect_get_config()
        .returning(|| Ok(Config::default()));

    SchedulerServiceDependencies {
        import_service: MockImportService::new(),
        integration_service,
        overtime_service,
        config_service,
    }
}

#[tokio::test]
async fn test_tick_imports_auto_sync_providers() {
    let mut deps = build_dependencies();
    deps.import_service
        .expect_import_provider()
        .with(eq(Provider::Timebutler), always(), eq(Authentication::Full))
        .times(1)
        .returning(|_, _, _| Ok(ImportReport::default()));
    deps.import_service
        .expect_import_provider()
        .with(eq(Provider::Erfasst123), always(), always())
        .never();
    let service = deps.build_service();

    let outcome = service.tick().await.unwrap();
    let TickOutcome::Completed {
        providers,
        recompute,
    } = outcome
    else {
        panic!("Expected a completed tick, got {:?}", outcome);
    };
    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0].provider, Provider::Timebutler);
    assert_eq!(providers[0].report, Some(ImportReport::default()));
    assert_eq!(recompute, Some(recompute_report()));
}

#[tokio::test]
async fn test_tick_recomputes_after_failed_import() {
    let mut deps = build_dependencies();
    deps.import_service
        .expect_import_provider()
        .returning(|_, _, _| Err(ServiceError::Transport("timeout".into())));
    deps.overtime_service.checkpoint();
    deps.overtime_service
        .expect_recompute_all()
        .times(1)
        .returning(|_| Ok(recompute_report()));
    let service = deps.build_service();

    let outcome = service.tick().await.unwrap();
    let TickOutcome::Completed { providers, .. } = outcome else {
        panic!("Expected a completed tick, got {:?}", outcome);
    };
    assert_eq!(providers[0].report, None);
    assert!(providers[0]
        .error
        .as_deref()
        .is_some_and(|error| error.contains("timeout")));
}

#[tokio::test]
async fn test_cancelled_import_ends_tick() {
    let mut deps = build_dependencies();
    deps.import_service
        .expect_import_provider()
        .returning(|_, _, _| Err(ServiceError::Cancelled));
    deps.overtime_service.checkpoint();
    deps.overtime_service.expect_recompute_all().never();
    let service = deps.build_service();

    assert_eq!(service.tick().await.unwrap(), TickOutcome::Cancelled);
}

#[tokio::test]
async fn test_tick_is_skipped_while_another_runs() {
    let mut deps = build_dependencies();
    deps.integration_service.checkpoint();
    deps.integration_service.expect_get_all().never();
    deps.overtime_service.checkpoint();
    deps.overtime_service.expect_recompute_all().never();
    let service = deps.build_service();

    let _running = service.tick_lock.lock().await;
    assert_eq!(service.tick().await.unwrap(), TickOutcome::Skipped);
}

#[tokio::test]
async fn test_start_and_stop() {
    let mut deps = build_dependencies();
    deps.import_service
        .expect_import_provider()
        .returning(|_, _, _| Ok(ImportReport::default()));
    deps.import_service
        .expect_cleanup_duplicates()
        .returning(|_| Ok(0));
    let service = deps.build_service();

    assert!(!service.is_running().await);
    service.start().await.unwrap();
    assert!(service.is_running().await);
    // A second start keeps the running loop.
    service.start().await.unwrap();
    assert!(service.is_running().await);

    service.stop().await.unwrap();
    assert!(!service.is_running().await);
    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_schedule_cleanup_rejects_five_fields() {
    let service = build_dependencies().build_service();
    let result = service.schedule_duplicate_cleanup("0 3 * * *").await;
    test_validation_error(
        &result,
        &ValidationFailureItem::InvalidValue("cleanup_cron".into()),
        1,
    );
}
