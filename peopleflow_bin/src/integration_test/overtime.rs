use service::employee::EmployeeService;
use service::overtime::{OvertimeService, OvertimeStatus};
use service::overtime_adjustment::{
    AdjustmentStatus, AdjustmentType, OvertimeAdjustment, OvertimeAdjustmentService,
};
use service::permission::Authentication;
use service::time_entry::{DataSource, TimeEntry, TimeEntryService};
use time::macros::{date, time};
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::integration_test::TestSetup;

fn manual_entry(employee_id: Uuid, date: Date, end: Time) -> TimeEntry {
    TimeEntry {
        id: Uuid::nil(),
        employee_id,
        date,
        start: PrimitiveDateTime::new(date, time!(07:00)),
        end: PrimitiveDateTime::new(date, end),
        duration_hours: 0.0,
        project_ref: "".into(),
        project_name: "".into(),
        activity_ref: "".into(),
        wage_type: "".into(),
        source: DataSource::Manual,
        foreign_key: None,
        created: None,
        deleted: None,
        version: Uuid::nil(),
    }
}

async fn approved_adjustment(
    test_setup: &TestSetup,
    employee_id: Uuid,
    adjustment_type: AdjustmentType,
    hours: f64,
) {
    let state = &test_setup.state;
    let adjustment = state
        .overtime_adjustment_service
        .submit(
            &OvertimeAdjustment {
                id: Uuid::nil(),
                employee_id,
                adjustment_type,
                hours,
                reason: "Nachtrag".into(),
                description: "".into(),
                status: AdjustmentStatus::Pending,
                author: "".into(),
                approved_by: None,
                approved_at: None,
                created: None,
                deleted: None,
                version: Uuid::nil(),
            },
            Authentication::Full,
            None,
        )
        .await
        .unwrap();
    state
        .overtime_adjustment_service
        .approve(adjustment.id, Authentication::Full, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_overtime_of_a_long_and_a_short_week_with_adjustments() {
    let test_setup = TestSetup::new().await;
    let state = &test_setup.state;
    let employee = test_setup
        .create_employee("Mia", "Hofmann", "mia.hofmann@example.com")
        .await;

    // 5 x 8.5 hours in week 10, then 4 x 9 hours in week 11.
    let long_week = [
        date!(2025 - 03 - 03),
        date!(2025 - 03 - 04),
        date!(2025 - 03 - 05),
        date!(2025 - 03 - 06),
        date!(2025 - 03 - 07),
    ]
    .map(|day| manual_entry(employee.id, day, time!(15:30)));
    let short_week = [
        date!(2025 - 03 - 10),
        date!(2025 - 03 - 11),
        date!(2025 - 03 - 12),
        date!(2025 - 03 - 13),
    ]
    .map(|day| manual_entry(employee.id, day, time!(16:00)));
    for entry in long_week.iter().chain(short_week.iter()) {
        state
            .time_entry_service
            .append(entry, Authentication::Full, None)
            .await
            .unwrap();
    }
    approved_adjustment(&test_setup, employee.id, AdjustmentType::Bonus, 1.5).await;
    approved_adjustment(&test_setup, employee.id, AdjustmentType::Correction, -0.25).await;

    let snapshot = state
        .overtime_service
        .recompute(employee.id, Authentication::Full, None)
        .await
        .unwrap();
    assert_eq!(snapshot.weekly_buckets.len(), 2);
    assert_eq!(snapshot.weekly_buckets[0].actual_hours, 42.5);
    assert_eq!(snapshot.weekly_buckets[0].overtime_hours, 2.5);
    assert_eq!(snapshot.weekly_buckets[1].actual_hours, 36.0);
    assert_eq!(snapshot.weekly_buckets[1].overtime_hours, -4.0);
    assert_eq!(snapshot.base_balance, -1.5);
    assert_eq!(snapshot.adjustments_total, 1.25);
    assert_eq!(snapshot.final_balance, -0.25);
    assert_eq!(snapshot.status, OvertimeStatus::Negative);
}

#[tokio::test]
async fn test_overtime_of_a_short_week_with_bonus() {
    let test_setup = TestSetup::new().await;
    let state = &test_setup.state;
    let employee = test_setup
        .create_employee("Lena", "Vogel", "lena.vogel@example.com")
        .await;

    // Monday to Thursday eight hours, Friday 7.75 hours.
    for day in [
        date!(2025 - 03 - 10),
        date!(2025 - 03 - 11),
        date!(2025 - 03 - 12),
        date!(2025 - 03 - 13),
    ] {
        state
            .time_entry_service
            .append(
                &manual_entry(employee.id, day, time!(15:00)),
                Authentication::Full,
                None,
            )
            .await
            .unwrap();
    }
    state
        .time_entry_service
        .append(
            &manual_entry(employee.id, date!(2025 - 03 - 14), time!(14:45)),
            Authentication::Full,
            None,
        )
        .await
        .unwrap();

    let snapshot = state
        .overtime_service
        .recompute(employee.id, Authentication::Full, None)
        .await
        .unwrap();
    assert_eq!(snapshot.weekly_buckets.len(), 1);
    assert_eq!(snapshot.final_balance, -0.25);
    assert_eq!(snapshot.status, OvertimeStatus::Negative);

    approved_adjustment(&test_setup, employee.id, AdjustmentType::Bonus, 1.5).await;

    let first = state
        .overtime_service
        .recompute(employee.id, Authentication::Full, None)
        .await
        .unwrap();
    let second = state
        .overtime_service
        .recompute(employee.id, Authentication::Full, None)
        .await
        .unwrap();
    assert_eq!(first.base_balance, -0.25);
    assert_eq!(first.final_balance, 1.25);
    assert_eq!(first.status, OvertimeStatus::Positive);
    assert_eq!(second.final_balance, first.final_balance);

    let employee = state
        .employee_service
        .get(employee.id, Authentication::Full, None)
        .await
        .unwrap();
    assert_eq!(employee.overtime_balance, 1.25);
    assert!(employee.last_computed_at.is_some());
}
