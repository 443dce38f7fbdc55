
use std::sync::Arc;

use dao_impl_sqlite::{
    absence::AbsenceDaoImpl, activity::ActivityDaoImpl, employee::EmployeeDaoImpl,
    integration::IntegrationDaoImpl, overtime_adjustment::OvertimeAdjustmentDaoImpl,
    project_assignment::ProjectAssignmentDaoImpl, time_entry::TimeEntryDaoImpl,
    PermissionDaoImpl, TransactionDaoImpl, TransactionImpl,
};
use service::config::{Config, ConfigService as _};
use service::provider::ProviderClient;
use service::scheduler::SchedulerService as _;
use service_impl::permission::PermissionServiceDeps;
use service_impl::providers::{erfasst123::Erfasst123Client, timebutler::TimebutlerClient};
use sqlx::SqlitePool;
#[cfg(feature = "json_logging")]
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(feature = "mock_auth")]
type UserService = service_impl::UserServiceDev;
#[cfg(feature = "mock_auth")]
type Context = ();
#[cfg(not(feature = "mock_auth"))]
type UserService = service_impl::UserServiceImpl;
#[cfg(not(feature = "mock_auth"))]
type Context = Arc<str>;
type Transaction = TransactionImpl;
type TransactionDao = TransactionDaoImpl;
type PermissionDao = PermissionDaoImpl;
type EmployeeDao = EmployeeDaoImpl;
type TimeEntryDao = TimeEntryDaoImpl;
type AbsenceDao = AbsenceDaoImpl;
type OvertimeAdjustmentDao = OvertimeAdjustmentDaoImpl;
type ProjectAssignmentDao = ProjectAssignmentDaoImpl;
type IntegrationDao = IntegrationDaoImpl;
type ActivityDao = ActivityDaoImpl;

/// The configuration is read once at startup.
type ConfigService = service_impl::config::StaticConfigService;
type ClockService = service_impl::clock::ClockServiceImpl;
type UuidService = service_impl::uuid_service::UuidServiceImpl;
type CredentialCipher = service_impl::crypto::AesGcmCredentialCipher;

pub struct PermissionServiceDependencies;
impl PermissionServiceDeps for PermissionServiceDependencies {
    type Context = Context;
    type PermissionDao = PermissionDao;
    type UserService = UserService;
}
type PermissionService = service_impl::PermissionServiceImpl<PermissionServiceDependencies>;

pub struct ActivityServiceDependencies;
impl service_impl::activity::ActivityServiceDeps for ActivityServiceDependencies {
    type Context = Context;
    type Transaction = Transaction;
    type ActivityDao = ActivityDao;
    type PermissionService = PermissionService;
    type ClockService = ClockService;
    type UuidService = UuidService;
    type TransactionDao = TransactionDao;
}
type ActivityService = service_impl::activity::ActivityServiceImpl<ActivityServiceDependencies>;

pub struct EmployeeServiceDependencies;
impl service_impl::employee::EmployeeServiceDeps for EmployeeServiceDependencies {
    type Context = Context;
    type Transaction = Transaction;
    type EmployeeDao = EmployeeDao;
    type PermissionService = PermissionService;
    type ClockService = ClockService;
    type UuidService = UuidService;
    type TransactionDao = TransactionDao;
}
type EmployeeService = service_impl::employee::EmployeeServiceImpl<EmployeeServiceDependencies>;

pub struct TimeEntryServiceDependencies;
impl service_impl::time_entry::TimeEntryServiceDeps for TimeEntryServiceDependencies {
    type Context = Context;
    type Transaction = Transaction;
    type TimeEntryDao = TimeEntryDao;
    type EmployeeService = EmployeeService;
    type ActivityService = ActivityService;
    type PermissionService = PermissionService;
    type ClockService = ClockService;
    type UuidService = UuidService;
    type TransactionDao = TransactionDao;
}
type TimeEntryService =
    service_impl::time_entry::TimeEntryServiceImpl<TimeEntryServiceDependencies>;

pub struct AbsenceServiceDependencies;
impl service_impl::absence::AbsenceServiceDeps for AbsenceServiceDependencies {
    type Context = Context;
    type Transaction = Transaction;
    type AbsenceDao = AbsenceDao;
    type EmployeeService = EmployeeService;
    type ActivityService = ActivityService;
    type PermissionService = PermissionService;
    type ConfigService = ConfigService;
    type ClockService = ClockService;
    type UuidService = UuidService;
    type TransactionDao = TransactionDao;
}
type AbsenceService = service_impl::absence::AbsenceServiceImpl<AbsenceServiceDependencies>;

pub struct OvertimeAdjustmentServiceDependencies;
impl service_impl::overtime_adjustment::OvertimeAdjustmentServiceDeps
    for OvertimeAdjustmentServiceDependencies
{
    type Context = Context;
    type Transaction = Transaction;
    type OvertimeAdjustmentDao = OvertimeAdjustmentDao;
    type EmployeeService = EmployeeService;
    type ActivityService = ActivityService;
    type PermissionService = PermissionService;
    type ClockService = ClockService;
    type UuidService = UuidService;
    type TransactionDao = TransactionDao;
}
type OvertimeAdjustmentService = service_impl::overtime_adjustment::OvertimeAdjustmentServiceImpl<
    OvertimeAdjustmentServiceDependencies,
>;

pub struct ProjectAssignmentServiceDependencies;
impl service_impl::project_assignment::ProjectAssignmentServiceDeps
    for ProjectAssignmentServiceDependencies
{
    type Context = Context;
    type Transaction = Transaction;
    type ProjectAssignmentDao = ProjectAssignmentDao;
    type EmployeeService = EmployeeService;
    type PermissionService = PermissionService;
    type ClockService = ClockService;
    type UuidService = UuidService;
    type TransactionDao = TransactionDao;
}
type ProjectAssignmentService = service_impl::project_assignment::ProjectAssignmentServiceImpl<
    ProjectAssignmentServiceDependencies,
>;

pub struct IntegrationServiceDependencies;
impl service_impl::integration::IntegrationServiceDeps for IntegrationServiceDependencies {
    type Context = Context;
    type Transaction = Transaction;
    type IntegrationDao = IntegrationDao;
    type ActivityService = ActivityService;
    type PermissionService = PermissionService;
    type CredentialCipher = CredentialCipher;
    type ClockService = ClockService;
    type UuidService = UuidService;
    type TransactionDao = TransactionDao;
}
type IntegrationService =
    service_impl::integration::IntegrationServiceImpl<IntegrationServiceDependencies>;

pub struct OvertimeServiceDependencies;
impl service_impl::overtime::OvertimeServiceDeps for OvertimeServiceDependencies {
    type Context = Context;
    type Transaction = Transaction;
    type EmployeeService = EmployeeService;
    type TimeEntryService = TimeEntryService;
    type OvertimeAdjustmentService = OvertimeAdjustmentService;
    type ActivityService = ActivityService;
    type PermissionService = PermissionService;
    type ClockService = ClockService;
    type TransactionDao = TransactionDao;
}
type OvertimeService = service_impl::overtime::OvertimeServiceImpl<OvertimeServiceDependencies>;

pub struct CsvExportServiceDependencies;
impl service_impl::csv_export::CsvExportServiceDeps for CsvExportServiceDependencies {
    type Context = Context;
    type Transaction = Transaction;
    type EmployeeService = EmployeeService;
    type TimeEntryService = TimeEntryService;
    type PermissionService = PermissionService;
    type TransactionDao = TransactionDao;
}
type CsvExportService =
    service_impl::csv_export::CsvExportServiceImpl<CsvExportServiceDependencies>;

pub struct ImportServiceDependencies;
impl service_impl::import::ImportServiceDeps for ImportServiceDependencies {
    type Context = Context;
    type Transaction = Transaction;
    type EmployeeService = EmployeeService;
    type TimeEntryService = TimeEntryService;
    type AbsenceService = AbsenceService;
    type ProjectAssignmentService = ProjectAssignmentService;
    type IntegrationService = IntegrationService;
    type ActivityService = ActivityService;
    type PermissionService = PermissionService;
    type ConfigService = ConfigService;
    type ClockService = ClockService;
    type TransactionDao = TransactionDao;
}
type ImportService = service_impl::import::ImportServiceImpl<ImportServiceDependencies>;

pub struct SchedulerServiceDependencies;
impl service_impl::scheduler::SchedulerServiceDeps for SchedulerServiceDependencies {
    type Context = Context;
    type Transaction = Transaction;
    type ImportService = ImportService;
    type IntegrationService = IntegrationService;
    type OvertimeService = OvertimeService;
    type ConfigService = ConfigService;
}
type SchedulerService =
    service_impl::scheduler::SchedulerServiceImpl<SchedulerServiceDependencies>;

/// All services, wired against one database pool.
#[derive(Clone)]
pub struct ServiceState {
    pub permission_service: Arc<PermissionService>,
    pub activity_service: Arc<ActivityService>,
    pub employee_service: Arc<EmployeeService>,
    pub time_entry_service: Arc<TimeEntryService>,
    pub absence_service: Arc<AbsenceService>,
    pub overtime_adjustment_service: Arc<OvertimeAdjustmentService>,
    pub project_assignment_service: Arc<ProjectAssignmentService>,
    pub integration_service: Arc<IntegrationService>,
    pub overtime_service: Arc<OvertimeService>,
    pub csv_export_service: Arc<CsvExportService>,
    pub import_service: Arc<ImportService>,
    pub scheduler_service: Arc<SchedulerService>,
}

impl ServiceState {
    pub fn new(
        pool: Arc<SqlitePool>,
        config: Config,
        providers: Arc<[Arc<dyn ProviderClient>]>,
    ) -> Self {
        let transaction_dao = Arc::new(TransactionDao::new(pool.clone()));

        #[cfg(feature = "mock_auth")]
        let user_service = service_impl::UserServiceDev;
        #[cfg(not(feature = "mock_auth"))]
        let user_service = service_impl::UserServiceImpl;
        let permission_service = Arc::new(service_impl::PermissionServiceImpl {
            permission_dao: PermissionDao::new(pool.clone()).into(),
            user_service: Arc::new(user_service),
        });
        let clock_service = Arc::new(service_impl::clock::ClockServiceImpl);
        let uuid_service = Arc::new(service_impl::uuid_service::UuidServiceImpl);
        let credential_cipher = Arc::new(CredentialCipher::new(config.encryption_key.as_deref()));
        let config_service = Arc::new(service_impl::config::StaticConfigService(config));

        let activity_service = Arc::new(ActivityService {
            activity_dao: Arc::new(ActivityDao::new(pool.clone())),
            permission_service: permission_service.clone(),
            clock_service: clock_service.clone(),
            uuid_service: uuid_service.clone(),
            transaction_dao: transaction_dao.clone(),
        });
        let employee_service = Arc::new(EmployeeService {
            employee_dao: Arc::new(EmployeeDao::new(pool.clone())),
            permission_service: permission_service.clone(),
            clock_service: clock_service.clone(),
            uuid_service: uuid_service.clone(),
            transaction_dao: transaction_dao.clone(),
        });
        let time_entry_service = Arc::new(TimeEntryService {
            time_entry_dao: Arc::new(TimeEntryDao::new(pool.clone())),
            employee_service: employee_service.clone(),
            activity_service: activity_service.clone(),
            permission_service: permission_service.clone(),
            clock_service: clock_service.clone(),
            uuid_service: uuid_service.clone(),
            transaction_dao: transaction_dao.clone(),
            employee_locks: Arc::new(service_impl::locks::EmployeeLocks::new()),
        });
        let absence_service = Arc::new(AbsenceService {
            absence_dao: Arc::new(AbsenceDao::new(pool.clone())),
            employee_service: employee_service.clone(),
            activity_service: activity_service.clone(),
            permission_service: permission_service.clone(),
            config_service: config_service.clone(),
            clock_service: clock_service.clone(),
            uuid_service: uuid_service.clone(),
            transaction_dao: transaction_dao.clone(),
        });
        let overtime_adjustment_service = Arc::new(OvertimeAdjustmentService {
            overtime_adjustment_dao: Arc::new(OvertimeAdjustmentDao::new(pool.clone())),
            employee_service: employee_service.clone(),
            activity_service: activity_service.clone(),
            permission_service: permission_service.clone(),
            clock_service: clock_service.clone(),
            uuid_service: uuid_service.clone(),
            transaction_dao: transaction_dao.clone(),
        });
        let project_assignment_service = Arc::new(ProjectAssignmentService {
            project_assignment_dao: Arc::new(ProjectAssignmentDao::new(pool.clone())),
            employee_service: employee_service.clone(),
            permission_service: permission_service.clone(),
            clock_service: clock_service.clone(),
            uuid_service: uuid_service.clone(),
            transaction_dao: transaction_dao.clone(),
        });
        let integration_service = Arc::new(IntegrationService {
            integration_dao: Arc::new(IntegrationDao::new(pool.clone())),
            activity_service: activity_service.clone(),
            permission_service: permission_service.clone(),
            credential_cipher,
            clock_service: clock_service.clone(),
            uuid_service: uuid_service.clone(),
            transaction_dao: transaction_dao.clone(),
        });
        let overtime_service = Arc::new(OvertimeService {
            employee_service: employee_service.clone(),
            time_entry_service: time_entry_service.clone(),
            overtime_adjustment_service: overtime_adjustment_service.clone(),
            activity_service: activity_service.clone(),
            permission_service: permission_service.clone(),
            clock_service: clock_service.clone(),
            transaction_dao: transaction_dao.clone(),
        });
        let csv_export_service = Arc::new(CsvExportService {
            employee_service: employee_service.clone(),
            time_entry_service: time_entry_service.clone(),
            permission_service: permission_service.clone(),
            transaction_dao: transaction_dao.clone(),
        });
        let import_service = Arc::new(ImportService {
            employee_service: employee_service.clone(),
            time_entry_service: time_entry_service.clone(),
            absence_service: absence_service.clone(),
            project_assignment_service: project_assignment_service.clone(),
            integration_service: integration_service.clone(),
            activity_service: activity_service.clone(),
            permission_service: permission_service.clone(),
            config_service: config_service.clone(),
            clock_service: clock_service.clone(),
            transaction_dao: transaction_dao.clone(),
            providers,
        });
        let scheduler_service = Arc::new(SchedulerService::new(
            import_service.clone(),
            integration_service.clone(),
            overtime_service.clone(),
            config_service,
        ));

        Self {
            permission_service,
            activity_service,
            employee_service,
            time_entry_service,
            absence_service,
            overtime_adjustment_service,
            project_assignment_service,
            integration_service,
            overtime_service,
            csv_export_service,
            import_service,
            scheduler_service,
        }
    }
}

/// The adapters of all supported providers, sharing one HTTP client.
fn provider_clients(client: reqwest::Client, config: &Config) -> Arc<[Arc<dyn ProviderClient>]> {
    Arc::new([
        Arc::new(TimebutlerClient::new(
            client.clone(),
            &config.timebutler_base_url,
            config.http_timeout,
        )) as Arc<dyn ProviderClient>,
        Arc::new(Erfasst123Client::new(
            client,
            &config.erfasst123_base_url,
            config.http_timeout,
        )),
    ])
}

async fn create_admin_user(pool: Arc<SqlitePool>, username: &str) {
    use dao::PermissionDao;
    let permission_dao = PermissionDaoImpl::new(pool.clone());

    let existing = permission_dao
        .find_user(username)
        .await
        .expect("Expected to look up users");
    if existing.is_none() {
        permission_dao
            .create_user(
                &dao::UserEntity {
                    name: username.into(),
                },
                "first-start",
            )
            .await
            .unwrap_or_else(|_| panic!("Expected being able to create the {}", username));
        permission_dao
            .add_user_role(username, "admin", "first-start")
            .await
            .unwrap_or_else(|_| panic!("Expected being able to make {} an admin", username));
    }
}

#[tokio::main]
async fn main() {
    let version = env!("CARGO_PKG_VERSION");

    #[cfg(feature = "local_logging")]
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::TRACE)
        .pretty()
        .with_file(true)
        .finish();

    #[cfg(feature = "json_logging")]
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_span_list(true)
        .with_file(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    tracing::info!("PeopleFlow backend version: {}", version);
    dotenvy::dotenv().ok();
    let config = service_impl::config::ConfigServiceImpl
        .get_config()
        .await
        .expect("Invalid configuration");
    if config.encryption_key.is_none() {
        tracing::warn!("PEOPLEFLOW_ENCRYPTION_KEY is not set, integrations cannot be configured");
    }

    let pool = Arc::new(
        SqlitePool::connect(&config.database_url)
            .await
            .expect("Could not connect to database"),
    );
    sqlx::migrate!("../migrations/sqlite")
        .run(pool.as_ref())
        .await
        .expect("Failed to run migrations");

    let http_client = reqwest::Client::builder()
        .build()
        .expect("Could not create the HTTP client");
    let providers = provider_clients(http_client, &config);
    let state = ServiceState::new(pool.clone(), config, providers);
    #[cfg(feature = "mock_auth")]
    create_admin_user(pool.clone(), "DEVUSER").await;
    create_admin_user(pool.clone(), "admin").await;

    state
        .scheduler_service
        .start()
        .await
        .expect("Expected the scheduler to start");

    tokio::signal::ctrl_c()
        .await
        .expect("Could not listen for the shutdown signal");
    tracing::info!("Shutting down");
    if let Err(err) = state.scheduler_service.stop().await {
        tracing::error!("Scheduler did not stop cleanly: {}", err);
    }
}
