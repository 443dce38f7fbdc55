use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use crate::gen_service_impl;
use async_trait::async_trait;
use dao::TransactionDao;
use service::{
    absence::{Absence, AbsenceService},
    activity::{ActivityService, ActivityType},
    clock::ClockService,
    config::ConfigService,
    employee::{Employee, EmployeeService},
    import::{ImportReport, ImportService},
    integration::{
        IntegrationService, Provider, METADATA_IMPORTED_ABSENCES, METADATA_IMPORTED_EMPLOYEES,
        METADATA_IMPORTED_PLANNINGS, METADATA_IMPORTED_TIME_ENTRIES, METADATA_LAST_ERROR,
    },
    permission::{Authentication, HR_PRIVILEGE},
    project_assignment::{ProjectAssignment, ProjectAssignmentService},
    provider::{ProviderClient, RemotePerson, RemoteTimeEntry},
    time_entry::{TimeEntry, TimeEntryService, UpsertOutcome},
    PermissionService, ServiceError,
};
use time::{Date, Month};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

gen_service_impl! {
    struct ImportServiceImpl: ImportService = ImportServiceDeps {
        EmployeeService: EmployeeService<Context = Self::Context, Transaction = Self::Transaction> = employee_service,
        TimeEntryService: TimeEntryService<Context = Self::Context, Transaction = Self::Transaction> = time_entry_service,
        AbsenceService: AbsenceService<Context = Self::Context, Transaction = Self::Transaction> = absence_service,
        ProjectAssignmentService: ProjectAssignmentService<Context = Self::Context, Transaction = Self::Transaction> = project_assignment_service,
        IntegrationService: IntegrationService<Context = Self::Context, Transaction = Self::Transaction> = integration_service,
        ActivityService: ActivityService<Context = Self::Context, Transaction = Self::Transaction> = activity_service,
        PermissionService: PermissionService<Context = Self::Context> = permission_service,
        ConfigService: ConfigService = config_service,
        ClockService: ClockService = clock_service,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
    }
    ; custom_fields {
        providers: Arc<[Arc<dyn ProviderClient>]> = providers
    }
}

/// Id of the employee in the provider.
fn foreign_id_of(employee: &Employee, provider: Provider) -> Option<&Arc<str>> {
    match provider {
        Provider::Timebutler => employee.timebutler_id.as_ref(),
        Provider::Erfasst123 => employee.erfasst123_id.as_ref(),
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Finds the local employee of a remote person. The email wins over the id
/// of the provider, which wins over the employee number.
#[derive(Debug, Default)]
pub(crate) struct EmployeeMatcher {
    by_email: HashMap<String, Uuid>,
    by_foreign_id: HashMap<Arc<str>, Uuid>,
    by_employee_number: HashMap<Arc<str>, Uuid>,
}

impl EmployeeMatcher {
    pub(crate) fn new(employees: &[Employee], provider: Provider) -> Self {
        let mut matcher = Self::default();
        for employee in employees {
            if !employee.email.trim().is_empty() {
                matcher
                    .by_email
                    .insert(normalize_email(&employee.email), employee.id);
            }
            if let Some(foreign_id) = foreign_id_of(employee, provider) {
                matcher.by_foreign_id.insert(foreign_id.clone(), employee.id);
            }
            if let Some(employee_number) = &employee.employee_number {
                matcher
                    .by_employee_number
                    .insert(employee_number.clone(), employee.id);
            }
        }
        matcher
    }

    pub(crate) fn match_person(&self, person: &RemotePerson) -> Option<Uuid> {
        person
            .email
            .as_deref()
            .and_then(|email| self.by_email.get(&normalize_email(email)))
            .or_else(|| self.by_foreign_id.get(&person.id))
            .or_else(|| {
                person
                    .employee_number
                    .as_ref()
                    .and_then(|number| self.by_employee_number.get(number))
            })
            .copied()
    }

    pub(crate) fn match_ids(
        &self,
        person_id: &Arc<str>,
        employee_number: Option<&Arc<str>>,
    ) -> Option<Uuid> {
        self.by_foreign_id
            .get(person_id)
            .or_else(|| employee_number.and_then(|number| self.by_employee_number.get(number)))
            .copied()
    }

    fn link(&mut self, person_id: Arc<str>, employee_id: Uuid) {
        self.by_foreign_id.insert(person_id, employee_id);
    }
}

async fn until_cancelled<T>(
    cancellation: &CancellationToken,
    request: impl Future<Output = Result<T, ServiceError>>,
) -> Result<T, ServiceError> {
    tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(ServiceError::Cancelled),
        result = request => result,
    }
}

fn time_entry_of(remote: &RemoteTimeEntry, employee_id: Uuid, provider: Provider) -> TimeEntry {
    TimeEntry {
        id: Uuid::nil(),
        employee_id,
        date: remote.date,
        start: remote.start,
        end: remote.end,
        duration_hours: remote.duration_hours,
        project_ref: remote.project_ref.clone(),
        project_name: remote.project_name.clone(),
        activity_ref: remote.activity_ref.clone(),
        wage_type: remote.wage_type.clone(),
        source: provider.data_source(),
        foreign_key: Some(remote.id.clone()),
        created: None,
        deleted: None,
        version: Uuid::nil(),
    }
}

/// Turns the rejection of a single record into a skip. Every other error
/// aborts the import.
fn skip_rejected<T>(
    result: Result<T, ServiceError>,
    provider: Provider,
    record: &str,
    report: &mut ImportReport,
) -> Result<Option<T>, ServiceError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err @ (ServiceError::ValidationError(_) | ServiceError::EntityNotFound(_))) => {
            warn!("Skip {} record {}: {}", provider, record, err);
            report.skipped_invalid += 1;
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

impl<Deps: ImportServiceDeps> ImportServiceImpl<Deps> {
    fn client(&self, provider: Provider) -> Result<Arc<dyn ProviderClient>, ServiceError> {
        self.providers
            .iter()
            .find(|client| client.provider() == provider)
            .cloned()
            .ok_or_else(|| ServiceError::IntegrationNotConfigured(provider.code().into()))
    }

    /// Start and end of the import window.
    async fn import_range(
        &self,
        sync_start_date: Option<Date>,
    ) -> Result<(Date, Date), ServiceError> {
        let config = self.config_service.get_config().await?;
        let to = self.clock_service.date_now();
        let from = match (sync_start_date, config.import_cutoff_date) {
            (Some(start), Some(cutoff)) => start.max(cutoff),
            (Some(date), None) | (None, Some(date)) => date,
            (None, None) => Date::from_calendar_date(to.year(), Month::January, 1)?,
        };
        Ok((from, to))
    }

    async fn run_import(
        &self,
        client: &dyn ProviderClient,
        cancellation: &CancellationToken,
        report: &mut ImportReport,
    ) -> Result<(), ServiceError> {
        let provider = client.provider();
        let integration = self
            .integration_service
            .get(provider, Authentication::Full, None)
            .await?;
        if !integration.active {
            return Err(ServiceError::IntegrationNotConfigured(provider.code().into()));
        }
        let credentials = self
            .integration_service
            .credentials(provider, Authentication::Full, None)
            .await?;
        let (from, to) = self.import_range(integration.sync_start_date).await?;
        report.from = Some(from);
        report.to = Some(to);
        info!("Importing {} from {} to {}", provider, from, to);

        let people = until_cancelled(cancellation, client.list_people(&credentials)).await?;
        report.people_fetched = people.len() as u32;
        let employees = self
            .employee_service
            .get_all(Authentication::Full, None)
            .await?;
        let mut matcher = EmployeeMatcher::new(&employees, provider);
        for person in people.iter() {
            let Some(employee_id) = matcher.match_person(person) else {
                debug!("No employee found for {} person {}", provider, person.id);
                continue;
            };
            let linked = self
                .employee_service
                .link_provider_identity(
                    employee_id,
                    provider,
                    &person.id,
                    person.hire_date,
                    Authentication::Full,
                    None,
                )
                .await;
            if skip_rejected(linked, provider, &person.id, report)?.is_none() {
                continue;
            }
            matcher.link(person.id.clone(), employee_id);
            report.employees_matched += 1;
        }

        let times =
            until_cancelled(cancellation, client.list_times(&credentials, from, to)).await?;
        for remote in times.iter() {
            let Some(employee_id) = matcher.match_person(&remote.person) else {
                report.skipped_unmatched += 1;
                continue;
            };
            let replaced = self
                .time_entry_service
                .replace_by_foreign_key(
                    &time_entry_of(remote, employee_id, provider),
                    Authentication::Full,
                    None,
                )
                .await;
            let Some((_, outcome)) = skip_rejected(replaced, provider, &remote.id, report)? else {
                continue;
            };
            match outcome {
                UpsertOutcome::Created => report.time_entries_created += 1,
                UpsertOutcome::Updated => report.time_entries_updated += 1,
                UpsertOutcome::SkippedDeleted => report.skipped_deleted += 1,
            }
        }

        for year in from.year()..=to.year() {
            let absences =
                until_cancelled(cancellation, client.list_absences(&credentials, year)).await?;
            for remote in absences.iter() {
                let Some(employee_id) =
                    matcher.match_ids(&remote.person_id, remote.employee_number.as_ref())
                else {
                    report.skipped_unmatched += 1;
                    continue;
                };
                let absence = Absence {
                    id: Uuid::nil(),
                    employee_id,
                    absence_type: remote.absence_type,
                    start_date: remote.start_date,
                    end_date: remote.end_date,
                    days: remote.workdays,
                    status: remote.status,
                    approved_by: None,
                    approver_name: None,
                    reason: remote.comment.clone(),
                    notes: "".into(),
                    source: provider.data_source(),
                    foreign_key: Some(remote.id.clone()),
                    created: None,
                    deleted: None,
                    version: Uuid::nil(),
                };
                let upserted = self
                    .absence_service
                    .upsert_imported(&absence, Authentication::Full, None)
                    .await;
                let Some((_, outcome)) = skip_rejected(upserted, provider, &remote.id, report)?
                else {
                    continue;
                };
                match outcome {
                    UpsertOutcome::SkippedDeleted => report.skipped_deleted += 1,
                    _ => report.absences_imported += 1,
                }
            }
        }

        let plannings =
            until_cancelled(cancellation, client.list_plannings(&credentials, from, to)).await?;
        for planning in plannings.iter() {
            for person in planning.persons.iter() {
                let Some(employee_id) = matcher.match_person(person) else {
                    report.skipped_unmatched += 1;
                    continue;
                };
                let foreign_key = planning.foreign_key_for(person);
                let assignment = ProjectAssignment {
                    id: Uuid::nil(),
                    employee_id,
                    project_id: planning.project_id.clone(),
                    project_name: planning.project_name.clone(),
                    start_date: planning.start_date,
                    end_date: planning.end_date,
                    role: "".into(),
                    source: provider.data_source(),
                    foreign_key: Some(foreign_key.clone()),
                    created: None,
                    deleted: None,
                    version: Uuid::nil(),
                };
                let upserted = self
                    .project_assignment_service
                    .upsert_imported(&assignment, Authentication::Full, None)
                    .await;
                let Some((_, outcome)) = skip_rejected(upserted, provider, &foreign_key, report)?
                else {
                    continue;
                };
                match outcome {
                    UpsertOutcome::SkippedDeleted => report.skipped_deleted += 1,
                    _ => report.plannings_imported += 1,
                }
            }
        }

        let metadata = BTreeMap::from([
            (
                Arc::<str>::from(METADATA_IMPORTED_EMPLOYEES),
                Arc::<str>::from(report.employees_matched.to_string()),
            ),
            (
                METADATA_IMPORTED_TIME_ENTRIES.into(),
                report.time_entries_imported().to_string().into(),
            ),
            (
                METADATA_IMPORTED_ABSENCES.into(),
                report.absences_imported.to_string().into(),
            ),
            (
                METADATA_IMPORTED_PLANNINGS.into(),
                report.plannings_imported.to_string().into(),
            ),
            (METADATA_LAST_ERROR.into(), "".into()),
        ]);
        self.integration_service
            .record_sync(
                provider,
                Some(self.clock_service.date_time_now()),
                metadata,
                Authentication::Full,
                None,
            )
            .await?;
        self.activity_service
            .log(
                ActivityType::SyncCompleted,
                None,
                &format!(
                    "{}: {} Mitarbeiter, {} Zeiteinträge, {} Abwesenheiten, {} Planungen importiert",
                    provider,
                    report.employees_matched,
                    report.time_entries_imported(),
                    report.absences_imported,
                    report.plannings_imported
                ),
                Authentication::Full,
                None,
            )
            .await?;
        Ok(())
    }

    async fn record_failure(
        &self,
        provider: Provider,
        err: &ServiceError,
    ) -> Result<(), ServiceError> {
        match err {
            ServiceError::IntegrationAuth(_) => {
                self.integration_service
                    .deactivate(provider, &err.to_string(), Authentication::Full, None)
                    .await?;
            }
            ServiceError::Cancelled => {
                info!("Import of {} cancelled", provider);
            }
            _ => {
                self.integration_service
                    .record_sync(
                        provider,
                        None,
                        BTreeMap::from([(METADATA_LAST_ERROR.into(), err.to_string().into())]),
                        Authentication::Full,
                        None,
                    )
                    .await?;
                self.activity_service
                    .log(
                        ActivityType::SyncFailed,
                        None,
                        &format!("{}: Synchronisierung fehlgeschlagen: {}", provider, err),
                        Authentication::Full,
                        None,
                    )
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<Deps: ImportServiceDeps> ImportService for ImportServiceImpl<Deps> {
    type Context = Deps::Context;

    async fn import_provider(
        &self,
        provider: Provider,
        cancellation: CancellationToken,
        context: Authentication<Self::Context>,
    ) -> Result<ImportReport, ServiceError> {
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;
        let client = self.client(provider)?;

        let mut report = ImportReport::default();
        match self
            .run_import(client.as_ref(), &cancellation, &mut report)
            .await
        {
            Ok(()) => {
                info!("Import of {} finished: {:?}", provider, report);
                Ok(report)
            }
            Err(err) => {
                error!("Import of {} failed: {}", provider, err);
                if let Err(record_err) = self.record_failure(provider, &err).await {
                    warn!(
                        "Could not record the failed import of {}: {}",
                        provider, record_err
                    );
                }
                Err(err)
            }
        }
    }

    async fn test_connection(
        &self,
        provider: Provider,
        context: Authentication<Self::Context>,
    ) -> Result<(), ServiceError> {
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;
        let client = self.client(provider)?;
        let credentials = self
            .integration_service
            .credentials(provider, Authentication::Full, None)
            .await?;
        client.test_connection(&credentials).await
    }

    async fn cleanup_duplicates(
        &self,
        context: Authentication<Self::Context>,
    ) -> Result<u32, ServiceError> {
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;
        let employees = self
            .employee_service
            .get_all(Authentication::Full, None)
            .await?;
        let mut removed = 0;
        for employee in employees.iter() {
            match self
                .time_entry_service
                .remove_duplicates(employee.id, Authentication::Full, None)
                .await
            {
                Ok(count) => removed += count,
                Err(err) => error!(
                    "Could not remove duplicates of {} ({}): {}",
                    employee.full_name(),
                    employee.id,
                    err
                ),
            }
        }
        info!("Duplicate cleanup removed {} time entries", removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service::config::Config;
    use uuid::uuid;

    fn employee(id: Uuid, email: &str) -> Employee {
        Employee {
            id,
            ..Employee::with_defaults("Erika", "Muster", email, &Config::default())
        }
    }

    fn person(id: &str, email: Option<&str>, employee_number: Option<&str>) -> RemotePerson {
        RemotePerson {
            id: id.into(),
            first_name: "Erika".into(),
            last_name: "Muster".into(),
            email: email.map(Arc::from),
            employee_number: employee_number.map(Arc::from),
            department: None,
            hire_date: None,
            active: true,
        }
    }

    #[test]
    fn test_email_match_ignores_case() {
        let id = uuid!("9C1D7E0C-2A33-4B5E-9C1F-6E3D0A1B2C3D");
        let matcher =
            EmployeeMatcher::new(&[employee(id, "Erika@Example.org")], Provider::Timebutler);
        assert_eq!(
            matcher.match_person(&person("17", Some(" erika@example.ORG"), None)),
            Some(id)
        );
        assert_eq!(matcher.match_person(&person("17", Some("max@example.org"), None)), None);
    }

    #[test]
    fn test_falls_back_to_foreign_id_and_employee_number() {
        let linked = uuid!("0F3E0B5A-6C1D-4E2F-8A9B-1C2D3E4F5A6B");
        let numbered = uuid!("7A8B9C0D-1E2F-4A3B-8C4D-5E6F7A8B9C0D");
        let employees = [
            Employee {
                erfasst123_id: Some("p-4711".into()),
                ..employee(linked, "linked@example.org")
            },
            Employee {
                employee_number: Some("0815".into()),
                ..employee(numbered, "numbered@example.org")
            },
        ];
        let matcher = EmployeeMatcher::new(&employees, Provider::Erfasst123);
        assert_eq!(matcher.match_person(&person("p-4711", None, None)), Some(linked));
        assert_eq!(
            matcher.match_person(&person("p-9", Some("unknown@example.org"), Some("0815"))),
            Some(numbered)
        );
        assert_eq!(matcher.match_ids(&"p-4711".into(), None), Some(linked));

        // The id of the other provider does not count.
        let timebutler = EmployeeMatcher::new(&employees, Provider::Timebutler);
        assert_eq!(timebutler.match_person(&person("p-4711", None, None)), None);
    }
}
