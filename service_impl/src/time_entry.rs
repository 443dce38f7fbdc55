use std::collections::BTreeMap;
use std::sync::Arc;

use crate::gen_service_impl;
use crate::locks::EmployeeLocks;
use async_trait::async_trait;
use dao::{time_entry::TimeEntryDao, TransactionDao};
use service::{
    activity::{ActivityService, ActivityType},
    clock::ClockService,
    employee::EmployeeService,
    permission::{Authentication, HR_PRIVILEGE},
    time_entry::{
        validate_time_entry, DataSource, DuplicateKey, TimeEntry, TimeEntryFilter,
        TimeEntryService, UpsertOutcome,
    },
    uuid_service::UuidService,
    PermissionService, ServiceError, ValidationFailureItem,
};
use time::Date;
use tokio::join;
use tracing::{debug, info};
use uuid::Uuid;

const TIME_ENTRY_SERVICE_PROCESS: &str = "time-entry-service";

gen_service_impl! {
    struct TimeEntryServiceImpl: TimeEntryService = TimeEntryServiceDeps {
        TimeEntryDao: TimeEntryDao<Transaction = Self::Transaction> = time_entry_dao,
        EmployeeService: EmployeeService<Context = Self::Context, Transaction = Self::Transaction> = employee_service,
        ActivityService: ActivityService<Context = Self::Context, Transaction = Self::Transaction> = activity_service,
        PermissionService: PermissionService<Context = Self::Context> = permission_service,
        ClockService: ClockService = clock_service,
        UuidService: UuidService = uuid_service,
        TransactionDao: TransactionDao<Transaction = Self::Transaction> = transaction_dao,
    }
    ; custom_fields {
        employee_locks: Arc<EmployeeLocks> = employee_locks
    }
}

/// Orders the members of a duplicate group, the first one is kept.
fn keep_order(a: &TimeEntry, b: &TimeEntry) -> std::cmp::Ordering {
    let manual_first = |entry: &TimeEntry| entry.source != DataSource::Manual;
    manual_first(a)
        .cmp(&manual_first(b))
        .then(a.created.cmp(&b.created))
        .then(a.id.cmp(&b.id))
}

#[async_trait]
impl<Deps: TimeEntryServiceDeps> TimeEntryService for TimeEntryServiceImpl<Deps> {
    type Context = Deps::Context;
    type Transaction = Deps::Transaction;

    async fn append(
        &self,
        entry: &TimeEntry,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<TimeEntry, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let (hr_permission, is_employee) = join!(
            self.permission_service
                .check_permission(HR_PRIVILEGE, context.clone()),
            self.employee_service.verify_user_is_employee(
                entry.employee_id,
                context.clone(),
                tx.clone().into()
            ),
        );
        hr_permission.or(is_employee)?;

        if entry.id != Uuid::nil() {
            return Err(ServiceError::IdSetOnCreate);
        }
        if entry.version != Uuid::nil() {
            return Err(ServiceError::VersionSetOnCreate);
        }
        self.employee_service
            .get(entry.employee_id, Authentication::Full, tx.clone().into())
            .await?;

        let mut entry = TimeEntry {
            source: DataSource::Manual,
            foreign_key: None,
            deleted: None,
            ..entry.clone()
        };
        entry.duration_hours = entry.hours_between_start_and_end();
        let failures = validate_time_entry(&entry, self.clock_service.date_now());
        if !failures.is_empty() {
            return Err(ServiceError::ValidationError(failures.into()));
        }

        let _guard = self.employee_locks.lock(entry.employee_id).await;
        entry.id = self
            .uuid_service
            .new_uuid(&format!("{}::append id", TIME_ENTRY_SERVICE_PROCESS));
        entry.version = self
            .uuid_service
            .new_uuid(&format!("{}::append version", TIME_ENTRY_SERVICE_PROCESS));
        entry.created = Some(self.clock_service.date_time_now());
        self.time_entry_dao
            .create(&(&entry).try_into()?, TIME_ENTRY_SERVICE_PROCESS, tx.clone())
            .await?;
        self.activity_service
            .log(
                ActivityType::TimeEntryAdded,
                Some(entry.employee_id),
                &format!("Zeiteintrag am {} mit {:.2} Std", entry.date, entry.duration_hours),
                context,
                tx.clone().into(),
            )
            .await?;
        self.transaction_dao.commit(tx).await?;
        Ok(entry)
    }

    async fn replace_by_foreign_key(
        &self,
        entry: &TimeEntry,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(TimeEntry, UpsertOutcome), ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;

        // Imported durations are authoritative and may be zero.
        let mut failures: Vec<ValidationFailureItem> =
            validate_time_entry(entry, self.clock_service.date_now())
                .into_iter()
                .filter(|failure| failure.field() != "duration_hours")
                .collect();
        if entry.source == DataSource::Manual {
            failures.push(ValidationFailureItem::InvalidValue("source".into()));
        }
        let foreign_key = match entry.foreign_key.as_deref() {
            Some(foreign_key) if !foreign_key.is_empty() => foreign_key,
            _ => {
                failures.push(ValidationFailureItem::InvalidValue("foreign_key".into()));
                ""
            }
        };
        if !entry.duration_hours.is_finite()
            || entry.duration_hours < 0.0
            || entry.duration_hours > 24.0
        {
            failures.push(ValidationFailureItem::InvalidValue("duration_hours".into()));
        }
        if !failures.is_empty() {
            return Err(ServiceError::ValidationError(failures.into()));
        }
        self.employee_service
            .get(entry.employee_id, Authentication::Full, tx.clone().into())
            .await?;

        let _guard = self.employee_locks.lock(entry.employee_id).await;
        let existing = self
            .time_entry_dao
            .find_by_source_and_foreign_key((&entry.source).into(), foreign_key, tx.clone())
            .await?;
        let result = match existing {
            Some(existing) if existing.deleted.is_some() => {
                debug!(
                    "Skip import of {} {}, it was deleted",
                    entry.source.code(),
                    foreign_key
                );
                (TimeEntry::from(&existing), UpsertOutcome::SkippedDeleted)
            }
            Some(existing) => {
                let updated = TimeEntry {
                    id: existing.id,
                    created: Some(existing.created),
                    deleted: None,
                    version: self
                        .uuid_service
                        .new_uuid(&format!("{}::replace version", TIME_ENTRY_SERVICE_PROCESS)),
                    ..entry.clone()
                };
                self.time_entry_dao
                    .update(&(&updated).try_into()?, TIME_ENTRY_SERVICE_PROCESS, tx.clone())
                    .await?;
                (updated, UpsertOutcome::Updated)
            }
            None => {
                let created = TimeEntry {
                    id: self
                        .uuid_service
                        .new_uuid(&format!("{}::replace id", TIME_ENTRY_SERVICE_PROCESS)),
                    version: self
                        .uuid_service
                        .new_uuid(&format!("{}::replace version", TIME_ENTRY_SERVICE_PROCESS)),
                    created: Some(self.clock_service.date_time_now()),
                    deleted: None,
                    ..entry.clone()
                };
                self.time_entry_dao
                    .create(&(&created).try_into()?, TIME_ENTRY_SERVICE_PROCESS, tx.clone())
                    .await?;
                (created, UpsertOutcome::Created)
            }
        };
        self.transaction_dao.commit(tx).await?;
        Ok(result)
    }

    async fn list_by_employee(
        &self,
        employee_id: Uuid,
        filter: &TimeEntryFilter,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[TimeEntry]>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        let (hr_permission, is_employee) = join!(
            self.permission_service
                .check_permission(HR_PRIVILEGE, context.clone()),
            self.employee_service.verify_user_is_employee(
                employee_id,
                context.clone(),
                tx.clone().into()
            ),
        );
        hr_permission.or(is_employee)?;

        let entries = self
            .time_entry_dao
            .find_by_employee_id(employee_id, tx.clone())
            .await?
            .iter()
            .map(TimeEntry::from)
            .filter(|entry| filter.matches(entry))
            .collect();
        self.transaction_dao.commit(tx).await?;
        Ok(entries)
    }

    async fn list_by_date_range(
        &self,
        from: Date,
        to: Date,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[TimeEntry]>, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;
        let entries = self
            .time_entry_dao
            .find_by_date_range(from, to, tx.clone())
            .await?
            .iter()
            .map(TimeEntry::from)
            .collect();
        self.transaction_dao.commit(tx).await?;
        Ok(entries)
    }

    async fn remove_duplicates(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<u32, ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;

        let _guard = self.employee_locks.lock(employee_id).await;
        let mut groups: BTreeMap<DuplicateKey, Vec<TimeEntry>> = BTreeMap::new();
        for entry in self
            .time_entry_dao
            .find_by_employee_id(employee_id, tx.clone())
            .await?
            .iter()
        {
            let entry = TimeEntry::from(entry);
            groups.entry(entry.duplicate_key()).or_default().push(entry);
        }

        let now = self.clock_service.date_time_now();
        let mut removed = 0;
        for mut group in groups.into_values().filter(|group| group.len() > 1) {
            group.sort_by(keep_order);
            for duplicate in group.into_iter().skip(1) {
                let deleted = TimeEntry {
                    deleted: Some(now),
                    version: self
                        .uuid_service
                        .new_uuid(&format!("{}::dedupe version", TIME_ENTRY_SERVICE_PROCESS)),
                    ..duplicate
                };
                self.time_entry_dao
                    .update(&(&deleted).try_into()?, TIME_ENTRY_SERVICE_PROCESS, tx.clone())
                    .await?;
                removed += 1;
            }
        }
        self.transaction_dao.commit(tx).await?;
        if removed > 0 {
            info!("Removed {removed} duplicate time entries of employee {employee_id}");
        }
        Ok(removed)
    }

    async fn delete(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError> {
        let tx = self.transaction_dao.use_transaction(tx).await?;
        self.permission_service
            .check_permission(HR_PRIVILEGE, context)
            .await?;

        let mut entry = match self.time_entry_dao.find_by_id(id, tx.clone()).await? {
            Some(entry) if entry.deleted.is_none() => entry,
            _ => return Err(ServiceError::EntityNotFound(id)),
        };
        let _guard = self.employee_locks.lock(entry.employee_id).await;
        entry.deleted = Some(self.clock_service.date_time_now());
        entry.version = self
            .uuid_service
            .new_uuid(&format!("{}::delete version", TIME_ENTRY_SERVICE_PROCESS));
        self.time_entry_dao
            .update(&entry, TIME_ENTRY_SERVICE_PROCESS, tx.clone())
            .await?;
        self.transaction_dao.commit(tx).await?;
        Ok(())
    }
}
