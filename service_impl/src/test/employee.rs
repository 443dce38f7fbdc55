use std::sync::Arc;

use crate::employee::{EmployeeServiceDeps, EmployeeServiceImpl};
use crate::test::error_test::*;
use dao::employee::{
    EmployeeEntity, EmployeeStatusEntity, MockEmployeeDao, WorkTimeModelEntity,
};
use dao::{MockTransaction, MockTransactionDao};
use mockall::predicate::{always, eq, function};
use service::clock::MockClockService;
use service::employee::{Employee, EmployeeService};
use service::integration::Provider;
use service::permission::{Authentication, HR_PRIVILEGE};
use service::uuid_service::MockUuidService;
use service::{MockPermissionService, ServiceError, ValidationFailureItem};
use time::macros::date;
use uuid::{uuid, Uuid};

pub fn default_id() -> Uuid {
    uuid!("5F7A9C1E-3B5D-4F7A-9C1E-3B5D7F9A1C01")
}

pub fn alternate_id() -> Uuid {
    uuid!("5F7A9C1E-3B5D-4F7A-9C1E-3B5D7F9A1C02")
}

pub fn default_version() -> Uuid {
    uuid!("8B0D2F4A-6C8E-4A0B-8D2F-4A6C8E0B2D01")
}

pub fn alternate_version() -> Uuid {
    uuid!("8B0D2F4A-6C8E-4A0B-8D2F-4A6C8E0B2D02")
}

pub fn default_employee_entity() -> EmployeeEntity {
    EmployeeEntity {
        id: default_id(),
        first_name: "Jonas".into(),
        last_name: "Keller".into(),
        email: "jonas.keller@example.com".into(),
        user_name: Some("jkeller".into()),
        employee_number: Some("0815".into()),
        department: Some("Montage".into()),
        weekly_hours_target: 40.0,
        working_days_per_week: 5,
        work_time_model: WorkTimeModelEntity::FullTime,
        region: Some("BY".into()),
        annual_vacation_entitlement: 30.0,
        status: EmployeeStatusEntity::Active,
        hire_date: None,
        timebutler_id: None,
        erfasst123_id: None,
        overtime_balance: 3.5,
        last_computed_at: None,
        created: generate_default_datetime(),
        version: default_version(),
    }
}

pub fn default_employee() -> Employee {
    Employee::from(&default_employee_entity())
}

pub fn new_employee() -> Employee {
    Employee {
        id: Uuid::nil(),
        version: Uuid::nil(),
        created: None,
        overtime_balance: 0.0,
        ..default_employee()
    }
}

pub struct EmployeeServiceDependencies {
    pub employee_dao: MockEmployeeDao,
    pub permission_service: MockPermissionService,
    pub clock_service: MockClockService,
    pub uuid_service: MockUuidService,
}

impl EmployeeServiceDeps for EmployeeServiceDependencies {
    type Context = ();
    type Transaction = MockTransaction;
    type EmployeeDao = MockEmployeeDao;
    type PermissionService = MockPermissionService;
    type ClockService = MockClockService;
    type UuidService = MockUuidService;
    type TransactionDao = MockTransactionDao;
}

impl EmployeeServiceDependencies {
    pub fn build_service(self) -> EmployeeServiceImpl<EmployeeServiceDependencies> {
        let mut transaction_dao = MockTransactionDao::new();
        transaction_dao
            .expect_use_transaction()
            .returning(|_| Ok(MockTransaction));
        transaction_dao.expect_commit().returning(|_| Ok(()));

        EmployeeServiceImpl {
            employee_dao: self.employee_dao.into(),
            permission_service: self.permission_service.into(),
            clock_service: self.clock_service.into(),
            uuid_service: self.uuid_service.into(),
            transaction_dao: Arc::new(transaction_dao),
        }
    }
}

/// `user` is the name of the authenticated user.
pub fn build_dependencies(permission: bool, user: &'static str) -> EmployeeServiceDependencies {
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
    permission_service
        .expect_current_user_id()
        .returning(move |context| {
            if context == Authentication::Full {
                Ok(None)
            } else {
                Ok(Some(user.into()))
            }
        });

    let mut employee_dao = MockEmployeeDao::new();
    employee_dao
        .expect_find_by_id()
        .with(eq(default_id()), always())
        .returning(|_, _| Ok(Some(default_employee_entity())));
    employee_dao
        .expect_find_by_id()
        .returning(|_, _| Ok(None));

    let mut clock_service = MockClockService::new();
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

    EmployeeServiceDependencies {
        employee_dao,
        permission_service,
        clock_service,
        uuid_service,
    }
}

#[tokio::test]
async fn test_get_as_hr() {
    let service = build_dependencies(true, "hr-user").build_service();
    let employee = service.get(default_id(), ().auth(), None).await.unwrap();
    assert_eq!(employee, default_employee());
}

#[tokio::test]
async fn test_get_own_employee() {
    let service = build_dependencies(false, "jkeller").build_service();
    let employee = service.get(default_id(), ().auth(), None).await.unwrap();
    assert_eq!(employee.id, default_id());
}

#[tokio::test]
async fn test_get_other_employee_is_forbidden() {
    let service = build_dependencies(false, "someone-else").build_service();
    let result = service.get(default_id(), ().auth(), None).await;
    test_forbidden(&result);
}

#[tokio::test]
async fn test_get_not_found() {
    let service = build_dependencies(true, "hr-user").build_service();
    let result = service.get(alternate_id(), ().auth(), None).await;
    test_not_found(&result, &alternate_id());
}

#[tokio::test]
async fn test_create() {
    let mut deps = build_dependencies(true, "hr-user");
    deps.employee_dao
        .expect_find_by_email()
        .with(eq("jonas.keller@example.com"), always())
        .returning(|_, _| Ok(None));
    deps.employee_dao
        .expect_create()
        .with(
            eq(EmployeeEntity {
                id: alternate_id(),
                version: alternate_version(),
                overtime_balance: 0.0,
                ..default_employee_entity()
            }),
            eq("employee-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let employee = service.create(&new_employee(), ().auth(), None).await.unwrap();
    assert_eq!(employee.id, alternate_id());
    assert_eq!(employee.created, Some(generate_default_datetime()));
}

#[tokio::test]
async fn test_create_with_taken_email() {
    let mut deps = build_dependencies(true, "hr-user");
    deps.employee_dao
        .expect_find_by_email()
        .returning(|_, _| Ok(Some(default_employee_entity())));
    deps.employee_dao.expect_create().never();
    let service = deps.build_service();

    let result = service.create(&new_employee(), ().auth(), None).await;
    test_validation_error(
        &result,
        &ValidationFailureItem::InvalidValue("email".into()),
        1,
    );
}

#[tokio::test]
async fn test_create_invalid_contract() {
    let mut deps = build_dependencies(true, "hr-user");
    deps.employee_dao
        .expect_find_by_email()
        .returning(|_, _| Ok(None));
    let service = deps.build_service();

    let result = service
        .create(
            &Employee {
                first_name: " ".into(),
                working_days_per_week: 0,
                ..new_employee()
            },
            ().auth(),
            None,
        )
        .await;
    test_validation_error(
        &result,
        &ValidationFailureItem::InvalidValue("working_days_per_week".into()),
        2,
    );
}

#[tokio::test]
async fn test_create_with_id() {
    let service = build_dependencies(true, "hr-user").build_service();
    let result = service
        .create(
            &Employee {
                id: default_id(),
                ..new_employee()
            },
            ().auth(),
            None,
        )
        .await;
    test_zero_id_error(&result);
}

#[tokio::test]
async fn test_create_no_permission() {
    let service = build_dependencies(false, "jkeller").build_service();
    let result = service.create(&new_employee(), ().auth(), None).await;
    test_forbidden(&result);
}

#[tokio::test]
async fn test_update_keeps_cached_balance() {
    let mut deps = build_dependencies(true, "hr-user");
    deps.employee_dao
        .expect_update()
        .with(
            eq(EmployeeEntity {
                weekly_hours_target: 30.0,
                version: alternate_version(),
                ..default_employee_entity()
            }),
            eq("employee-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let employee = service
        .update(
            &Employee {
                weekly_hours_target: 30.0,
                overtime_balance: 99.0,
                ..default_employee()
            },
            ().auth(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(employee.overtime_balance, 3.5);
}

#[tokio::test]
async fn test_update_outdated_version() {
    let mut deps = build_dependencies(true, "hr-user");
    deps.employee_dao.expect_update().never();
    let service = deps.build_service();

    let result = service
        .update(
            &Employee {
                version: alternate_version(),
                ..default_employee()
            },
            ().auth(),
            None,
        )
        .await;
    test_conflicts(&result, &default_id(), &alternate_version(), &default_version());
}

#[tokio::test]
async fn test_link_provider_identity() {
    let mut deps = build_dependencies(true, "hr-user");
    deps.employee_dao
        .expect_update()
        .with(
            function(|entity: &EmployeeEntity| {
                entity.erfasst123_id.as_deref() == Some("p-7")
                    && entity.timebutler_id.is_none()
                    && entity.hire_date == Some(date!(2061 - 02 - 01))
                    && entity.version == alternate_version()
            }),
            always(),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let employee = service
        .link_provider_identity(
            default_id(),
            Provider::Erfasst123,
            "p-7",
            Some(date!(2061 - 02 - 01)),
            Authentication::Full,
            None,
        )
        .await
        .unwrap();
    assert_eq!(employee.erfasst123_id.as_deref(), Some("p-7"));
}

#[tokio::test]
async fn test_link_known_identity_keeps_hire_date() {
    let mut deps = build_dependencies(true, "hr-user");
    deps.employee_dao.checkpoint();
    deps.employee_dao.expect_find_by_id().returning(|_, _| {
        Ok(Some(EmployeeEntity {
            timebutler_id: Some("42".into()),
            hire_date: Some(date!(2060 - 05 - 01)),
            ..default_employee_entity()
        }))
    });
    deps.employee_dao.expect_update().never();
    let service = deps.build_service();

    let employee = service
        .link_provider_identity(
            default_id(),
            Provider::Timebutler,
            "42",
            Some(date!(2061 - 02 - 01)),
            Authentication::Full,
            None,
        )
        .await
        .unwrap();
    assert_eq!(employee.hire_date, Some(date!(2060 - 05 - 01)));
    assert_eq!(employee.version, default_version());
}

#[tokio::test]
async fn test_update_overtime_cache() {
    let mut deps = build_dependencies(false, "jkeller");
    deps.employee_dao
        .expect_update_overtime_cache()
        .with(
            eq(default_id()),
            eq(-0.25),
            eq(generate_default_datetime()),
            eq("employee-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _, _, _| Ok(()));
    let service = deps.build_service();

    service
        .update_overtime_cache(
            default_id(),
            -0.25,
            generate_default_datetime(),
            Authentication::Full,
            None,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_current_employee_for_full_authentication() {
    let service = build_dependencies(true, "hr-user").build_service();
    let employee = service
        .current_employee(Authentication::Full, None)
        .await
        .unwrap();
    assert_eq!(employee, None);
}
