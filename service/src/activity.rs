use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use dao::activity::ActivityEntity;
use mockall::automock;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::permission::Authentication;
use crate::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityType {
    TimeEntryAdded,
    AbsenceRequested,
    AbsenceApproved,
    AbsenceRejected,
    AbsenceCancelled,
    OvertimeAdjusted,
    OvertimeRecomputed,
    SyncCompleted,
    SyncFailed,
    IntegrationDeactivated,
}

impl ActivityType {
    pub fn code(&self) -> &'static str {
        match self {
            ActivityType::TimeEntryAdded => "TIME_ENTRY_ADDED",
            ActivityType::AbsenceRequested => "ABSENCE_REQUESTED",
            ActivityType::AbsenceApproved => "ABSENCE_APPROVED",
            ActivityType::AbsenceRejected => "ABSENCE_REJECTED",
            ActivityType::AbsenceCancelled => "ABSENCE_CANCELLED",
            ActivityType::OvertimeAdjusted => "OVERTIME_ADJUSTED",
            ActivityType::OvertimeRecomputed => "OVERTIME_RECOMPUTED",
            ActivityType::SyncCompleted => "SYNC_COMPLETED",
            ActivityType::SyncFailed => "SYNC_FAILED",
            ActivityType::IntegrationDeactivated => "INTEGRATION_DEACTIVATED",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|activity_type| activity_type.code() == code)
    }

    pub fn all() -> &'static [ActivityType] {
        &[
            ActivityType::TimeEntryAdded,
            ActivityType::AbsenceRequested,
            ActivityType::AbsenceApproved,
            ActivityType::AbsenceRejected,
            ActivityType::AbsenceCancelled,
            ActivityType::OvertimeAdjusted,
            ActivityType::OvertimeRecomputed,
            ActivityType::SyncCompleted,
            ActivityType::SyncFailed,
            ActivityType::IntegrationDeactivated,
        ]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Activity {
    pub id: Uuid,
    pub activity_type: ActivityType,
    pub employee_id: Option<Uuid>,
    pub message: Arc<str>,
    pub user: Arc<str>,
    pub created: PrimitiveDateTime,
}

impl TryFrom<&ActivityEntity> for Activity {
    type Error = ServiceError;
    fn try_from(activity: &ActivityEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: activity.id,
            activity_type: ActivityType::from_code(&activity.activity_type)
                .ok_or(ServiceError::InternalError)?,
            employee_id: activity.employee_id,
            message: activity.message.clone(),
            user: activity.user.clone(),
            created: activity.created,
        })
    }
}
impl From<&Activity> for ActivityEntity {
    fn from(activity: &Activity) -> Self {
        Self {
            id: activity.id,
            activity_type: activity.activity_type.code().into(),
            employee_id: activity.employee_id,
            message: activity.message.clone(),
            user: activity.user.clone(),
            created: activity.created,
        }
    }
}

/// Append only log of what happened in the system.
#[automock(type Context=(); type Transaction=dao::MockTransaction;)]
#[async_trait]
pub trait ActivityService {
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;
    type Transaction: dao::Transaction;

    /// Records an activity on behalf of the calling user, `system` for
    /// full authentication.
    async fn log(
        &self,
        activity_type: ActivityType,
        employee_id: Option<Uuid>,
        message: &str,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError>;

    /// Newest first.
    async fn latest(
        &self,
        limit: u32,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Activity]>, ServiceError>;
}
