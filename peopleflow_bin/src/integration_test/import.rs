use std::sync::Arc;

use service::import::ImportService;
use service::integration::{IntegrationService, Provider, METADATA_LAST_ERROR};
use service::permission::Authentication;
use service::provider::{RemotePlanning, RemoteTimeEntry};
use service::project_assignment::ProjectAssignmentService;
use service::time_entry::{DataSource, TimeEntry, TimeEntryFilter, TimeEntryService};
use service::ErrorKind;
use time::macros::{date, datetime};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::integration_test::{remote_person, TestSetup};

fn remote_time(id: &str, email: &str) -> RemoteTimeEntry {
    RemoteTimeEntry {
        id: id.into(),
        person: remote_person("p-1", email),
        date: date!(2025 - 03 - 11),
        start: datetime!(2025-03-11 07:00),
        end: datetime!(2025-03-11 14:00),
        duration_hours: 7.0,
        project_ref: "B-12".into(),
        project_name: "Rohbau Süd".into(),
        activity_ref: "".into(),
        wage_type: "".into(),
    }
}

#[tokio::test]
async fn test_reimport_creates_no_duplicates() {
    let test_setup = TestSetup::new().await;
    let state = &test_setup.state;
    let employee = test_setup
        .create_employee("Paul", "Wagner", "paul.wagner@example.com")
        .await;
    test_setup.configure_erfasst123().await;
    test_setup
        .erfasst123
        .people
        .lock()
        .unwrap()
        .push(remote_person("p-1", "Paul.Wagner@example.com"));
    test_setup
        .erfasst123
        .times
        .lock()
        .unwrap()
        .push(remote_time("t-1", "paul.wagner@example.com"));

    let first = state
        .import_service
        .import_provider(Provider::Erfasst123, CancellationToken::new(), Authentication::Full)
        .await
        .unwrap();
    assert_eq!(first.employees_matched, 1);
    assert_eq!(first.time_entries_created, 1);

    let second = state
        .import_service
        .import_provider(Provider::Erfasst123, CancellationToken::new(), Authentication::Full)
        .await
        .unwrap();
    assert_eq!(second.time_entries_created, 0);
    assert_eq!(second.time_entries_updated, 1);

    let entries = state
        .time_entry_service
        .list_by_employee(
            employee.id,
            &TimeEntryFilter::default(),
            Authentication::Full,
            None,
        )
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].duration_hours, 7.0);
    assert_eq!(entries[0].source, DataSource::Erfasst123);
    assert_eq!(entries[0].foreign_key.as_deref(), Some("t-1"));

    let integration = state
        .integration_service
        .get(Provider::Erfasst123, Authentication::Full, None)
        .await
        .unwrap();
    assert!(integration.last_sync_at.is_some());
    assert_eq!(
        integration
            .metadata
            .get(METADATA_LAST_ERROR)
            .map(|error| error.as_ref()),
        Some("")
    );
}

#[tokio::test]
async fn test_changed_duration_replaces_imported_entry() {
    let test_setup = TestSetup::new().await;
    let state = &test_setup.state;
    let employee = test_setup
        .create_employee("Paul", "Wagner", "paul.wagner@example.com")
        .await;
    test_setup.configure_erfasst123().await;
    let eight_hours = RemoteTimeEntry {
        date: date!(2025 - 06 - 10),
        start: datetime!(2025-06-10 07:00),
        end: datetime!(2025-06-10 15:00),
        duration_hours: 8.0,
        ..remote_time("X1", "paul.wagner@example.com")
    };
    test_setup
        .erfasst123
        .times
        .lock()
        .unwrap()
        .push(eight_hours.clone());
    state
        .import_service
        .import_provider(Provider::Erfasst123, CancellationToken::new(), Authentication::Full)
        .await
        .unwrap();

    *test_setup.erfasst123.times.lock().unwrap() = vec![RemoteTimeEntry {
        end: datetime!(2025-06-10 14:00),
        duration_hours: 7.0,
        ..eight_hours
    }];
    let report = state
        .import_service
        .import_provider(Provider::Erfasst123, CancellationToken::new(), Authentication::Full)
        .await
        .unwrap();
    assert_eq!(report.time_entries_created, 0);
    assert_eq!(report.time_entries_updated, 1);

    let entries = state
        .time_entry_service
        .list_by_employee(
            employee.id,
            &TimeEntryFilter::default(),
            Authentication::Full,
            None,
        )
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].foreign_key.as_deref(), Some("X1"));
    assert_eq!(entries[0].duration_hours, 7.0);
    assert_eq!(entries[0].end, datetime!(2025-06-10 14:00));
}

#[tokio::test]
async fn test_remove_duplicates_twice_removes_nothing_more() {
    let test_setup = TestSetup::new().await;
    let state = &test_setup.state;
    let employee = test_setup
        .create_employee("Paul", "Wagner", "paul.wagner@example.com")
        .await;
    test_setup.configure_erfasst123().await;
    test_setup
        .erfasst123
        .times
        .lock()
        .unwrap()
        .push(remote_time("t-1", "paul.wagner@example.com"));
    state
        .import_service
        .import_provider(Provider::Erfasst123, CancellationToken::new(), Authentication::Full)
        .await
        .unwrap();

    // The imported shift typed in twice by hand.
    let manual = TimeEntry {
        id: Uuid::nil(),
        employee_id: employee.id,
        date: date!(2025 - 03 - 11),
        start: datetime!(2025-03-11 07:00),
        end: datetime!(2025-03-11 14:00),
        duration_hours: 0.0,
        project_ref: "B-12".into(),
        project_name: "Rohbau Süd".into(),
        activity_ref: "".into(),
        wage_type: "".into(),
        source: DataSource::Manual,
        foreign_key: None,
        created: None,
        deleted: None,
        version: Uuid::nil(),
    };
    for _ in 0..2 {
        state
            .time_entry_service
            .append(&manual, Authentication::Full, None)
            .await
            .unwrap();
    }

    let first = state
        .time_entry_service
        .remove_duplicates(employee.id, Authentication::Full, None)
        .await
        .unwrap();
    let second = state
        .time_entry_service
        .remove_duplicates(employee.id, Authentication::Full, None)
        .await
        .unwrap();
    assert_eq!(first, 2);
    assert_eq!(second, 0);

    let entries = state
        .time_entry_service
        .list_by_employee(
            employee.id,
            &TimeEntryFilter::default(),
            Authentication::Full,
            None,
        )
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source, DataSource::Manual);
}

#[tokio::test]
async fn test_deleted_import_is_not_restored() {
    let test_setup = TestSetup::new().await;
    let state = &test_setup.state;
    let employee = test_setup
        .create_employee("Paul", "Wagner", "paul.wagner@example.com")
        .await;
    test_setup.configure_erfasst123().await;
    test_setup
        .erfasst123
        .times
        .lock()
        .unwrap()
        .push(remote_time("t-1", "paul.wagner@example.com"));

    state
        .import_service
        .import_provider(Provider::Erfasst123, CancellationToken::new(), Authentication::Full)
        .await
        .unwrap();
    let entries = state
        .time_entry_service
        .list_by_employee(
            employee.id,
            &TimeEntryFilter::default(),
            Authentication::Full,
            None,
        )
        .await
        .unwrap();
    state
        .time_entry_service
        .delete(entries[0].id, Authentication::Full, None)
        .await
        .unwrap();

    let report = state
        .import_service
        .import_provider(Provider::Erfasst123, CancellationToken::new(), Authentication::Full)
        .await
        .unwrap();
    assert_eq!(report.skipped_deleted, 1);
    let entries = state
        .time_entry_service
        .list_by_employee(
            employee.id,
            &TimeEntryFilter::default(),
            Authentication::Full,
            None,
        )
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_plannings_become_assignments() {
    let test_setup = TestSetup::new().await;
    let state = &test_setup.state;
    let employee = test_setup
        .create_employee("Paul", "Wagner", "paul.wagner@example.com")
        .await;
    test_setup.configure_erfasst123().await;
    test_setup.erfasst123.plannings.lock().unwrap().push(RemotePlanning {
        project_id: "B-12".into(),
        project_name: "Rohbau Süd".into(),
        start_date: date!(2025 - 03 - 01),
        end_date: Some(date!(2025 - 06 - 30)),
        persons: Arc::new([remote_person("p-1", "paul.wagner@example.com")]),
    });

    for _ in 0..2 {
        let report = state
            .import_service
            .import_provider(Provider::Erfasst123, CancellationToken::new(), Authentication::Full)
            .await
            .unwrap();
        assert_eq!(report.plannings_imported, 1);
    }

    let assignments = state
        .project_assignment_service
        .list_by_employee(employee.id, Authentication::Full, None)
        .await
        .unwrap();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].project_name.as_ref(), "Rohbau Süd");
}

#[tokio::test]
async fn test_unconfigured_provider_fails() {
    let test_setup = TestSetup::new().await;
    let result = test_setup
        .state
        .import_service
        .import_provider(Provider::Erfasst123, CancellationToken::new(), Authentication::Full)
        .await;
    assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
}
