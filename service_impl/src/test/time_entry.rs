use std::sync::Arc;

use crate::locks::EmployeeLocks;
use crate::test::error_test::*;
use crate::time_entry::{TimeEntryServiceDeps, TimeEntryServiceImpl};
use dao::time_entry::{MockTimeEntryDao, TimeEntryEntity};
use dao::{DataSourceEntity, MockTransaction, MockTransactionDao};
use mockall::predicate::{always, eq};
use service::activity::MockActivityService;
use service::clock::MockClockService;
use service::employee::MockEmployeeService;
use service::permission::{Authentication, HR_PRIVILEGE};
use service::time_entry::{DataSource, TimeEntry, TimeEntryFilter, TimeEntryService, UpsertOutcome};
use service::uuid_service::MockUuidService;
use service::{MockPermissionService, ServiceError, ValidationFailureItem};
use time::macros::{date, datetime};
use uuid::{uuid, Uuid};

pub fn default_employee_id() -> Uuid {
    uuid!("67B2A1E0-0C3D-4F52-9E5B-3A1C5D0E7F10")
}

pub fn default_id() -> Uuid {
    uuid!("A1D3F6E2-5B8C-4D71-8E9F-0B2C4D6E8F01")
}

pub fn alternate_id() -> Uuid {
    uuid!("A1D3F6E2-5B8C-4D71-8E9F-0B2C4D6E8F02")
}

pub fn default_version() -> Uuid {
    uuid!("C4E5F607-1829-4A3B-9C4D-5E6F7A8B9C01")
}

pub fn alternate_version() -> Uuid {
    uuid!("C4E5F607-1829-4A3B-9C4D-5E6F7A8B9C02")
}

pub fn default_time_entry_entity() -> TimeEntryEntity {
    TimeEntryEntity {
        id: default_id(),
        employee_id: default_employee_id(),
        date: date!(2063 - 04 - 02),
        start: datetime!(2063-04-02 08:00),
        end: datetime!(2063-04-02 15:00),
        duration_hours: 7.0,
        project_ref: "P-100".into(),
        project_name: "Umbau Nord".into(),
        activity_ref: "".into(),
        wage_type: "".into(),
        source: DataSourceEntity::Erfasst123,
        foreign_key: Some("t-1".into()),
        created: generate_default_datetime(),
        deleted: None,
        version: default_version(),
    }
}

pub fn default_time_entry() -> TimeEntry {
    TimeEntry::from(&default_time_entry_entity())
}

pub fn manual_time_entry() -> TimeEntry {
    TimeEntry {
        id: Uuid::nil(),
        version: Uuid::nil(),
        created: None,
        source: DataSource::Manual,
        foreign_key: None,
        duration_hours: 0.0,
        ..default_time_entry()
    }
}

pub struct TimeEntryServiceDependencies {
    pub time_entry_dao: MockTimeEntryDao,
    pub employee_service: MockEmployeeService,
    pub activity_service: MockActivityService,
    pub permission_service: MockPermissionService,
    pub clock_service: MockClockService,
    pub uuid_service: MockUuidService,
}

impl TimeEntryServiceDeps for TimeEntryServiceDependencies {
    type Context = ();
    type Transaction = MockTransaction;
    type TimeEntryDao = MockTimeEntryDao;
    type EmployeeService = MockEmployeeService;
    type ActivityService = MockActivityService;
    type PermissionService = MockPermissionService;
    type ClockService = MockClockService;
    type UuidService = MockUuidService;
    type TransactionDao = MockTransactionDao;
}

impl TimeEntryServiceDependencies {
    pub fn build_service(self) -> TimeEntryServiceImpl<TimeEntryServiceDependencies> {
        let mut transaction_dao = MockTransactionDao::new();
        transaction_dao
            .expect_use_transaction()
            .returning(|_| Ok(MockTransaction));
        transaction_dao.expect_commit().returning(|_| Ok(()));

        TimeEntryServiceImpl {
            time_entry_dao: self.time_entry_dao.into(),
            employee_service: self.employee_service.into(),
            activity_service: self.activity_service.into(),
            permission_service: self.permission_service.into(),
            clock_service: self.clock_service.into(),
            uuid_service: self.uuid_service.into(),
            transaction_dao: Arc::new(transaction_dao),
            employee_locks: Arc::new(EmployeeLocks::default()),
        }
    }
}

pub fn build_dependencies(permission: bool, is_employee: bool) -> TimeEntryServiceDependencies {
    let time_entry_dao = MockTimeEntryDao::new();

    let mut permission_service = MockPermissionService::new();
    permission_service
        .expect_check_permission()
        .returning(move |role, context| {
            if context == Authentication::Full || (permission && role == HR_PRIVILEGE) {
                Ok(())
            } else {
                Err(ServiceError::Forbidden)
            }
        });

    let mut employee_service = MockEmployeeService::new();
    employee_service
        .expect_verify_user_is_employee()
        .returning(move |_, _, _| {
            if is_employee {
                Ok(())
            } else {
                Err(ServiceError::Forbidden)
            }
        });

    let mut activity_service = MockActivityService::new();
    activity_service
        .expect_log()
        .returning(|_, _, _, _, _| Ok(()));

    let mut clock_service = MockClockService::new();
    clock_service
        .expect_date_now()
        .returning(|| generate_default_datetime().date());
    clock_service
        .expect_date_time_now()
        .returning(generate_default_datetime);

    let mut uuid_service = MockUuidService::new();
    uuid_service.expect_new_uuid().returning(|usage| {
        if usage.ends_with(" id") {
            alternate_id()
        } else {
            alternate_version()
        }
    });

    TimeEntryServiceDependencies {
        time_entry_dao,
        employee_service,
        activity_service,
        permission_service,
        clock_service,
        uuid_service,
    }
}

fn expect_known_employee(deps: &mut TimeEntryServiceDependencies) {
    deps.employee_service
        .expect_get()
        .with(eq(default_employee_id()), eq(Authentication::Full), always())
        .returning(|_, _, _| {
            Ok(service::employee::Employee {
                id: default_employee_id(),
                ..service::employee::Employee::with_defaults(
                    "Anna",
                    "Schmidt",
                    "anna.schmidt@example.com",
                    &service::config::Config::default(),
                )
            })
        });
}

#[tokio::test]
async fn test_append() {
    let mut deps = build_dependencies(true, false);
    expect_known_employee(&mut deps);
    deps.time_entry_dao
        .expect_create()
        .with(
            eq(TimeEntryEntity {
                id: alternate_id(),
                version: alternate_version(),
                source: DataSourceEntity::Manual,
                foreign_key: None,
                ..default_time_entry_entity()
            }),
            eq("time-entry-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let result = service
        .append(&manual_time_entry(), ().auth(), None)
        .await
        .unwrap();
    assert_eq!(result.id, alternate_id());
    assert_eq!(result.duration_hours, 7.0);
    assert_eq!(result.source, DataSource::Manual);
    assert_eq!(result.created, Some(generate_default_datetime()));
}

#[tokio::test]
async fn test_append_as_employee() {
    let mut deps = build_dependencies(false, true);
    expect_known_employee(&mut deps);
    deps.time_entry_dao
        .expect_create()
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let result = service.append(&manual_time_entry(), ().auth(), None).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_append_no_permission() {
    let service = build_dependencies(false, false).build_service();
    let result = service.append(&manual_time_entry(), ().auth(), None).await;
    test_forbidden(&result);
}

#[tokio::test]
async fn test_append_with_id() {
    let service = build_dependencies(true, false).build_service();
    let result = service
        .append(
            &TimeEntry {
                id: default_id(),
                ..manual_time_entry()
            },
            ().auth(),
            None,
        )
        .await;
    test_zero_id_error(&result);
}

#[tokio::test]
async fn test_append_with_version() {
    let service = build_dependencies(true, false).build_service();
    let result = service
        .append(
            &TimeEntry {
                version: default_version(),
                ..manual_time_entry()
            },
            ().auth(),
            None,
        )
        .await;
    test_zero_version_error(&result);
}

#[tokio::test]
async fn test_append_unknown_employee() {
    let mut deps = build_dependencies(true, false);
    deps.employee_service
        .expect_get()
        .returning(|id, _, _| Err(ServiceError::EntityNotFound(id)));
    let service = deps.build_service();

    let result = service.append(&manual_time_entry(), ().auth(), None).await;
    test_not_found(&result, &default_employee_id());
}

#[tokio::test]
async fn test_append_end_before_start() {
    let mut deps = build_dependencies(true, false);
    expect_known_employee(&mut deps);
    let service = deps.build_service();

    let result = service
        .append(
            &TimeEntry {
                end: datetime!(2063-04-02 07:00),
                ..manual_time_entry()
            },
            ().auth(),
            None,
        )
        .await;
    // A reversed range also yields zero hours.
    test_validation_error(
        &result,
        &ValidationFailureItem::InvalidValue("end".into()),
        2,
    );
}

#[tokio::test]
async fn test_append_in_the_future() {
    let mut deps = build_dependencies(true, false);
    expect_known_employee(&mut deps);
    let service = deps.build_service();

    let result = service
        .append(
            &TimeEntry {
                date: date!(2063 - 04 - 06),
                start: datetime!(2063-04-06 08:00),
                end: datetime!(2063-04-06 12:00),
                ..manual_time_entry()
            },
            ().auth(),
            None,
        )
        .await;
    test_validation_error(
        &result,
        &ValidationFailureItem::InvalidValue("date".into()),
        1,
    );
}

#[tokio::test]
async fn test_replace_creates_new_entry() {
    let mut deps = build_dependencies(true, false);
    expect_known_employee(&mut deps);
    deps.time_entry_dao
        .expect_find_by_source_and_foreign_key()
        .with(eq(DataSourceEntity::Erfasst123), eq("t-1"), always())
        .returning(|_, _, _| Ok(None));
    deps.time_entry_dao
        .expect_create()
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let (entry, outcome) = service
        .replace_by_foreign_key(
            &TimeEntry {
                id: Uuid::nil(),
                version: Uuid::nil(),
                created: None,
                ..default_time_entry()
            },
            Authentication::Full,
            None,
        )
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Created);
    assert_eq!(entry.version, alternate_version());
    assert_eq!(entry.created, Some(generate_default_datetime()));
}

#[tokio::test]
async fn test_replace_updates_existing_entry() {
    let mut deps = build_dependencies(true, false);
    expect_known_employee(&mut deps);
    deps.time_entry_dao
        .expect_find_by_source_and_foreign_key()
        .returning(|_, _, _| Ok(Some(default_time_entry_entity())));
    deps.time_entry_dao
        .expect_update()
        .with(
            eq(TimeEntryEntity {
                duration_hours: 7.5,
                version: alternate_version(),
                ..default_time_entry_entity()
            }),
            eq("time-entry-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let (entry, outcome) = service
        .replace_by_foreign_key(
            &TimeEntry {
                id: Uuid::nil(),
                created: None,
                duration_hours: 7.5,
                ..default_time_entry()
            },
            Authentication::Full,
            None,
        )
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Updated);
    assert_eq!(entry.id, default_id());
}

#[tokio::test]
async fn test_replace_keeps_deleted_entry_deleted() {
    let mut deps = build_dependencies(true, false);
    expect_known_employee(&mut deps);
    deps.time_entry_dao
        .expect_find_by_source_and_foreign_key()
        .returning(|_, _, _| {
            Ok(Some(TimeEntryEntity {
                deleted: Some(generate_default_datetime()),
                ..default_time_entry_entity()
            }))
        });
    deps.time_entry_dao.expect_update().never();
    deps.time_entry_dao.expect_create().never();
    let service = deps.build_service();

    let (entry, outcome) = service
        .replace_by_foreign_key(&default_time_entry(), Authentication::Full, None)
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::SkippedDeleted);
    assert!(entry.deleted.is_some());
}

#[tokio::test]
async fn test_replace_end_before_start() {
    let mut deps = build_dependencies(true, false);
    expect_known_employee(&mut deps);
    deps.time_entry_dao.expect_create().never();
    let service = deps.build_service();

    let result = service
        .replace_by_foreign_key(
            &TimeEntry {
                end: datetime!(2063-04-02 07:00),
                ..default_time_entry()
            },
            Authentication::Full,
            None,
        )
        .await;
    test_validation_error(
        &result,
        &ValidationFailureItem::InvalidValue("end".into()),
        1,
    );
}

#[tokio::test]
async fn test_replace_unknown_employee() {
    let mut deps = build_dependencies(true, false);
    deps.employee_service
        .expect_get()
        .returning(|id, _, _| Err(ServiceError::EntityNotFound(id)));
    deps.time_entry_dao.expect_create().never();
    let service = deps.build_service();

    let result = service
        .replace_by_foreign_key(&default_time_entry(), Authentication::Full, None)
        .await;
    test_not_found(&result, &default_employee_id());
}

#[tokio::test]
async fn test_replace_requires_import_key() {
    let service = build_dependencies(true, false).build_service();
    let result = service
        .replace_by_foreign_key(
            &TimeEntry {
                foreign_key: None,
                ..default_time_entry()
            },
            Authentication::Full,
            None,
        )
        .await;
    test_validation_error(
        &result,
        &ValidationFailureItem::InvalidValue("foreign_key".into()),
        1,
    );
}

#[tokio::test]
async fn test_replace_rejects_manual_source() {
    let service = build_dependencies(true, false).build_service();
    let result = service
        .replace_by_foreign_key(
            &TimeEntry {
                source: DataSource::Manual,
                ..default_time_entry()
            },
            Authentication::Full,
            None,
        )
        .await;
    test_validation_error(
        &result,
        &ValidationFailureItem::InvalidValue("source".into()),
        1,
    );
}

#[tokio::test]
async fn test_replace_no_permission() {
    let service = build_dependencies(false, true).build_service();
    let result = service
        .replace_by_foreign_key(&default_time_entry(), ().auth(), None)
        .await;
    test_forbidden(&result);
}

#[tokio::test]
async fn test_list_by_employee_filters() {
    let mut deps = build_dependencies(false, true);
    deps.time_entry_dao
        .expect_find_by_employee_id()
        .with(eq(default_employee_id()), always())
        .returning(|_, _| {
            Ok(Arc::new([
                default_time_entry_entity(),
                TimeEntryEntity {
                    id: alternate_id(),
                    date: date!(2063 - 03 - 30),
                    source: DataSourceEntity::Manual,
                    foreign_key: None,
                    ..default_time_entry_entity()
                },
            ]))
        });
    let service = deps.build_service();

    let entries = service
        .list_by_employee(
            default_employee_id(),
            &TimeEntryFilter {
                from: Some(date!(2063 - 04 - 01)),
                ..Default::default()
            },
            ().auth(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, default_id());
}

#[tokio::test]
async fn test_list_by_employee_no_permission() {
    let service = build_dependencies(false, false).build_service();
    let result = service
        .list_by_employee(
            default_employee_id(),
            &TimeEntryFilter::default(),
            ().auth(),
            None,
        )
        .await;
    test_forbidden(&result);
}

#[tokio::test]
async fn test_list_by_date_range_requires_hr() {
    let service = build_dependencies(false, true).build_service();
    let result = service
        .list_by_date_range(date!(2063 - 04 - 01), date!(2063 - 04 - 05), ().auth(), None)
        .await;
    test_forbidden(&result);
}

#[tokio::test]
async fn test_remove_duplicates_keeps_manual_entry() {
    let mut deps = build_dependencies(true, false);
    let manual = TimeEntryEntity {
        id: alternate_id(),
        source: DataSourceEntity::Manual,
        foreign_key: None,
        created: datetime!(2063-04-03 10:00),
        ..default_time_entry_entity()
    };
    let other_day = TimeEntryEntity {
        id: uuid!("A1D3F6E2-5B8C-4D71-8E9F-0B2C4D6E8F03"),
        date: date!(2063 - 04 - 03),
        start: datetime!(2063-04-03 08:00),
        end: datetime!(2063-04-03 15:00),
        foreign_key: Some("t-2".into()),
        ..default_time_entry_entity()
    };
    let entries: Arc<[TimeEntryEntity]> =
        Arc::new([default_time_entry_entity(), manual, other_day]);
    deps.time_entry_dao
        .expect_find_by_employee_id()
        .returning(move |_, _| Ok(entries.clone()));
    deps.time_entry_dao
        .expect_update()
        .with(
            eq(TimeEntryEntity {
                deleted: Some(generate_default_datetime()),
                version: alternate_version(),
                ..default_time_entry_entity()
            }),
            eq("time-entry-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let removed = service
        .remove_duplicates(default_employee_id(), Authentication::Full, None)
        .await
        .unwrap();
    assert_eq!(removed, 1);
}

#[tokio::test]
async fn test_remove_duplicates_without_duplicates() {
    let mut deps = build_dependencies(true, false);
    deps.time_entry_dao
        .expect_find_by_employee_id()
        .returning(|_, _| Ok(Arc::new([default_time_entry_entity()])));
    deps.time_entry_dao.expect_update().never();
    let service = deps.build_service();

    let removed = service
        .remove_duplicates(default_employee_id(), Authentication::Full, None)
        .await
        .unwrap();
    assert_eq!(removed, 0);
}

#[tokio::test]
async fn test_delete() {
    let mut deps = build_dependencies(true, false);
    deps.time_entry_dao
        .expect_find_by_id()
        .with(eq(default_id()), always())
        .returning(|_, _| Ok(Some(default_time_entry_entity())));
    deps.time_entry_dao
        .expect_update()
        .with(
            eq(TimeEntryEntity {
                deleted: Some(generate_default_datetime()),
                version: alternate_version(),
                ..default_time_entry_entity()
            }),
            eq("time-entry-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    service
        .delete(default_id(), ().auth(), None)
        .await
        .expect("Expected successful delete");
}

#[tokio::test]
async fn test_delete_already_deleted() {
    let mut deps = build_dependencies(true, false);
    deps.time_entry_dao.expect_find_by_id().returning(|_, _| {
        Ok(Some(TimeEntryEntity {
            deleted: Some(generate_default_datetime()),
            ..default_time_entry_entity()
        }))
    });
    let service = deps.build_service();

    let result = service.delete(default_id(), ().auth(), None).await;
    test_not_found(&result, &default_id());
}

#[tokio::test]
async fn test_delete_no_permission() {
    let service = build_dependencies(false, true).build_service();
    let result = service.delete(default_id(), ().auth(), None).await;
    test_forbidden(&result);
}
