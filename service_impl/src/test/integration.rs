use std::collections::BTreeMap;
use std::sync::Arc;

use crate::integration::{IntegrationServiceDeps, IntegrationServiceImpl};
use crate::test::error_test::*;
use dao::integration::{IntegrationEntity, MockIntegrationDao, ProviderEntity};
use dao::{MockTransaction, MockTransactionDao};
use mockall::predicate::{always, eq};
use service::activity::{ActivityType, MockActivityService};
use service::clock::MockClockService;
use service::crypto::MockCredentialCipher;
use service::integration::{
    IntegrationService, IntegrationSettings, Provider, METADATA_IMPORTED_TIME_ENTRIES,
    METADATA_LAST_ERROR,
};
use service::permission::{Authentication, ADMIN_PRIVILEGE};
use service::uuid_service::MockUuidService;
use service::{MockPermissionService, ServiceError, ValidationFailureItem};
use time::macros::{date, datetime};
use uuid::{uuid, Uuid};

pub fn default_id() -> Uuid {
    uuid!("B7C9D1E3-F5A7-4B9C-8D1E-3F5A7B9C1D01")
}

pub fn alternate_id() -> Uuid {
    uuid!("B7C9D1E3-F5A7-4B9C-8D1E-3F5A7B9C1D02")
}

pub fn default_version() -> Uuid {
    uuid!("D2E4F6A8-B0C2-4D4E-9F6A-8B0C2D4E6F01")
}

pub fn alternate_version() -> Uuid {
    uuid!("D2E4F6A8-B0C2-4D4E-9F6A-8B0C2D4E6F02")
}

pub fn default_integration_entity() -> IntegrationEntity {
    IntegrationEntity {
        id: default_id(),
        provider: ProviderEntity::Timebutler,
        name: "Timebutler".into(),
        credentials: "sealed:token-1".into(),
        active: true,
        auto_sync: true,
        sync_start_date: Some(date!(2063 - 01 - 01)),
        last_sync_at: None,
        metadata: BTreeMap::from([(
            Arc::<str>::from(METADATA_LAST_ERROR),
            Arc::<str>::from("timeout"),
        )]),
        created: generate_default_datetime(),
        version: default_version(),
    }
}

fn settings(credentials: Option<&str>) -> IntegrationSettings {
    IntegrationSettings {
        name: "  ".into(),
        credentials: credentials.map(Arc::from),
        auto_sync: false,
        sync_start_date: None,
    }
}

pub struct IntegrationServiceDependencies {
    pub integration_dao: MockIntegrationDao,
    pub activity_service: MockActivityService,
    pub permission_service: MockPermissionService,
    pub credential_cipher: MockCredentialCipher,
    pub clock_service: MockClockService,
    pub uuid_service: MockUuidService,
}

impl IntegrationServiceDeps for IntegrationServiceDependencies {
    type Context = ();
    type Transaction = MockTransaction;
    type IntegrationDao = MockIntegrationDao;
    type ActivityService = MockActivityService;
    type PermissionService = MockPermissionService;
    type CredentialCipher = MockCredentialCipher;
    type ClockService = MockClockService;
    type UuidService = MockUuidService;
    type TransactionDao = MockTransactionDao;
}

impl IntegrationServiceDependencies {
    pub fn build_service(self) -> IntegrationServiceImpl<IntegrationServiceDependencies> {
        let mut transaction_dao = MockTransactionDao::new();
        transaction_dao
            .expect_use_transaction()
            .returning(|_| Ok(MockTransaction));
        transaction_dao.expect_commit().returning(|_| Ok(()));

        IntegrationServiceImpl {
            integration_dao: self.integration_dao.into(),
            activity_service: self.activity_service.into(),
            permission_service: self.permission_service.into(),
            credential_cipher: self.credential_cipher.into(),
            clock_service: self.clock_service.into(),
            uuid_service: self.uuid_service.into(),
            transaction_dao: Arc::new(transaction_dao),
        }
    }
}

pub fn build_dependencies(permission: bool, role: &'static str) -> IntegrationServiceDependencies {
    let mut permission_service = MockPermissionService::new();
    permission_service
        .expect_check_permission()
        .returning(move |inner_role, context| {
            if context == Authentication::Full || (permission && inner_role == role) {
                Ok(())
            } else {
                Err(ServiceError::Forbidden)
            }
        });
    permission_service
        .expect_check_only_full_authentication()
        .returning(|context| {
            if context == Authentication::Full {
                Ok(())
            } else {
                Err(ServiceError::Forbidden)
            }
        });

    let mut credential_cipher = MockCredentialCipher::new();
    credential_cipher
        .expect_encrypt()
        .returning(|plaintext| Ok(format!("sealed:{plaintext}").into()));
    credential_cipher.expect_decrypt().returning(|ciphertext| {
        ciphertext
            .strip_prefix("sealed:")
            .map(Arc::from)
            .ok_or_else(|| ServiceError::CryptoError("not sealed".into()))
    });

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

    let mut activity_service = MockActivityService::new();
    activity_service
        .expect_log()
        .returning(|_, _, _, _, _| Ok(()));

    IntegrationServiceDependencies {
        integration_dao: MockIntegrationDao::new(),
        activity_service,
        permission_service,
        credential_cipher,
        clock_service,
        uuid_service,
    }
}

fn expect_stored(deps: &mut IntegrationServiceDependencies, stored: Option<IntegrationEntity>) {
    deps.integration_dao
        .expect_find_by_provider()
        .with(eq(ProviderEntity::Timebutler), always())
        .returning(move |_, _| Ok(stored.clone()));
}

#[tokio::test]
async fn test_configure_new_integration() {
    let mut deps = build_dependencies(true, ADMIN_PRIVILEGE);
    expect_stored(&mut deps, None);
    deps.integration_dao
        .expect_create()
        .with(
            eq(IntegrationEntity {
                id: alternate_id(),
                credentials: "sealed:token-2".into(),
                auto_sync: false,
                sync_start_date: None,
                metadata: BTreeMap::new(),
                version: alternate_version(),
                ..default_integration_entity()
            }),
            eq("integration-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let integration = service
        .configure(
            Provider::Timebutler,
            &settings(Some(" token-2 ")),
            ().auth(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(integration.name.as_ref(), "Timebutler");
    assert!(integration.has_credentials);
    assert!(integration.active);
}

#[tokio::test]
async fn test_configure_new_integration_without_credentials() {
    let mut deps = build_dependencies(true, ADMIN_PRIVILEGE);
    expect_stored(&mut deps, None);
    deps.integration_dao.expect_create().never();
    let service = deps.build_service();

    let result = service
        .configure(Provider::Timebutler, &settings(None), ().auth(), None)
        .await;
    test_validation_error(
        &result,
        &ValidationFailureItem::InvalidValue("credentials".into()),
        1,
    );
}

#[tokio::test]
async fn test_configure_blank_credentials() {
    let service = build_dependencies(true, ADMIN_PRIVILEGE).build_service();
    let result = service
        .configure(Provider::Timebutler, &settings(Some("   ")), ().auth(), None)
        .await;
    test_validation_error(
        &result,
        &ValidationFailureItem::InvalidValue("credentials".into()),
        1,
    );
}

#[tokio::test]
async fn test_reconfigure_keeps_credentials_and_reactivates() {
    let mut deps = build_dependencies(true, ADMIN_PRIVILEGE);
    expect_stored(
        &mut deps,
        Some(IntegrationEntity {
            active: false,
            ..default_integration_entity()
        }),
    );
    deps.integration_dao
        .expect_update()
        .with(
            eq(IntegrationEntity {
                name: "Lohnbuchhaltung".into(),
                auto_sync: false,
                sync_start_date: None,
                metadata: BTreeMap::new(),
                version: alternate_version(),
                ..default_integration_entity()
            }),
            eq("integration-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let integration = service
        .configure(
            Provider::Timebutler,
            &IntegrationSettings {
                name: "Lohnbuchhaltung".into(),
                ..settings(None)
            },
            ().auth(),
            None,
        )
        .await
        .unwrap();
    assert!(integration.active);
    assert!(!integration.metadata.contains_key(METADATA_LAST_ERROR));
}

#[tokio::test]
async fn test_configure_requires_admin() {
    let service = build_dependencies(true, "hr").build_service();
    let result = service
        .configure(
            Provider::Timebutler,
            &settings(Some("token-2")),
            ().auth(),
            None,
        )
        .await;
    test_forbidden(&result);
}

#[tokio::test]
async fn test_deactivate_records_reason() {
    let mut deps = build_dependencies(true, ADMIN_PRIVILEGE);
    expect_stored(&mut deps, Some(default_integration_entity()));
    deps.integration_dao
        .expect_update()
        .with(
            eq(IntegrationEntity {
                active: false,
                metadata: BTreeMap::from([(
                    Arc::<str>::from(METADATA_LAST_ERROR),
                    Arc::<str>::from("401 Unauthorized"),
                )]),
                version: alternate_version(),
                ..default_integration_entity()
            }),
            eq("integration-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    deps.activity_service.checkpoint();
    deps.activity_service
        .expect_log()
        .with(
            eq(ActivityType::IntegrationDeactivated),
            eq(None::<Uuid>),
            always(),
            eq(Authentication::Full),
            always(),
        )
        .times(1)
        .returning(|_, _, _, _, _| Ok(()));
    let service = deps.build_service();

    let integration = service
        .deactivate(
            Provider::Timebutler,
            "401 Unauthorized",
            Authentication::Full,
            None,
        )
        .await
        .unwrap();
    assert!(!integration.active);
}

#[tokio::test]
async fn test_get_unconfigured_provider() {
    let mut deps = build_dependencies(true, "hr");
    expect_stored(&mut deps, None);
    let service = deps.build_service();

    let result = service.get(Provider::Timebutler, ().auth(), None).await;
    assert!(matches!(
        result,
        Err(ServiceError::IntegrationNotConfigured(ref provider)) if provider.as_ref() == "timebutler"
    ));
}

#[tokio::test]
async fn test_credentials_with_full_authentication() {
    let mut deps = build_dependencies(false, ADMIN_PRIVILEGE);
    expect_stored(&mut deps, Some(default_integration_entity()));
    let service = deps.build_service();

    let credentials = service
        .credentials(Provider::Timebutler, Authentication::Full, None)
        .await
        .unwrap();
    assert_eq!(credentials.as_ref(), "token-1");
}

#[tokio::test]
async fn test_credentials_are_never_handed_to_users() {
    let mut deps = build_dependencies(true, ADMIN_PRIVILEGE);
    expect_stored(&mut deps, Some(default_integration_entity()));
    let service = deps.build_service();

    let result = service
        .credentials(Provider::Timebutler, ().auth(), None)
        .await;
    test_forbidden(&result);
}

#[tokio::test]
async fn test_record_sync_merges_metadata() {
    let mut deps = build_dependencies(true, "hr");
    expect_stored(&mut deps, Some(default_integration_entity()));
    deps.integration_dao
        .expect_update()
        .with(
            eq(IntegrationEntity {
                last_sync_at: Some(datetime!(2063-04-05 12:00)),
                metadata: BTreeMap::from([
                    (
                        Arc::<str>::from(METADATA_LAST_ERROR),
                        Arc::<str>::from("timeout"),
                    ),
                    (
                        Arc::<str>::from(METADATA_IMPORTED_TIME_ENTRIES),
                        Arc::<str>::from("12"),
                    ),
                ]),
                version: alternate_version(),
                ..default_integration_entity()
            }),
            eq("integration-service"),
            always(),
        )
        .times(1)
        .returning(|_, _, _| Ok(()));
    let service = deps.build_service();

    let integration = service
        .record_sync(
            Provider::Timebutler,
            Some(datetime!(2063-04-05 12:00)),
            BTreeMap::from([(METADATA_IMPORTED_TIME_ENTRIES.into(), "12".into())]),
            ().auth(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(integration.last_sync_at, Some(datetime!(2063-04-05 12:00)));
}
