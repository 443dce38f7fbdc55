use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use dao::overtime_adjustment::{
    AdjustmentStatusEntity, AdjustmentTypeEntity, OvertimeAdjustmentEntity,
};
use mockall::automock;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::permission::Authentication;
use crate::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdjustmentType {
    Correction,
    Manual,
    Bonus,
    Penalty,
}

impl AdjustmentType {
    pub fn label(&self) -> &'static str {
        match self {
            AdjustmentType::Correction => "Korrektur",
            AdjustmentType::Manual => "Manuelle Anpassung",
            AdjustmentType::Bonus => "Bonus/Ausgleich",
            AdjustmentType::Penalty => "Abzug",
        }
    }
}

impl From<&AdjustmentTypeEntity> for AdjustmentType {
    fn from(adjustment_type: &AdjustmentTypeEntity) -> Self {
        match adjustment_type {
            AdjustmentTypeEntity::Correction => Self::Correction,
            AdjustmentTypeEntity::Manual => Self::Manual,
            AdjustmentTypeEntity::Bonus => Self::Bonus,
            AdjustmentTypeEntity::Penalty => Self::Penalty,
        }
    }
}
impl From<&AdjustmentType> for AdjustmentTypeEntity {
    fn from(adjustment_type: &AdjustmentType) -> Self {
        match adjustment_type {
            AdjustmentType::Correction => Self::Correction,
            AdjustmentType::Manual => Self::Manual,
            AdjustmentType::Bonus => Self::Bonus,
            AdjustmentType::Penalty => Self::Penalty,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdjustmentStatus {
    Pending,
    Approved,
    Rejected,
}

impl AdjustmentStatus {
    pub fn code(&self) -> &'static str {
        match self {
            AdjustmentStatus::Pending => "PENDING",
            AdjustmentStatus::Approved => "APPROVED",
            AdjustmentStatus::Rejected => "REJECTED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdjustmentStatus::Pending => "Ausstehend",
            AdjustmentStatus::Approved => "Genehmigt",
            AdjustmentStatus::Rejected => "Abgelehnt",
        }
    }

    /// Only pending adjustments can be decided on.
    pub fn transition_to(&self, to: AdjustmentStatus) -> Result<AdjustmentStatus, ServiceError> {
        if *self == AdjustmentStatus::Pending && to != AdjustmentStatus::Pending {
            Ok(to)
        } else {
            Err(ServiceError::InvalidTransition {
                from: self.code().into(),
                to: to.code().into(),
            })
        }
    }
}

impl From<&AdjustmentStatusEntity> for AdjustmentStatus {
    fn from(status: &AdjustmentStatusEntity) -> Self {
        match status {
            AdjustmentStatusEntity::Pending => Self::Pending,
            AdjustmentStatusEntity::Approved => Self::Approved,
            AdjustmentStatusEntity::Rejected => Self::Rejected,
        }
    }
}
impl From<&AdjustmentStatus> for AdjustmentStatusEntity {
    fn from(status: &AdjustmentStatus) -> Self {
        match status {
            AdjustmentStatus::Pending => Self::Pending,
            AdjustmentStatus::Approved => Self::Approved,
            AdjustmentStatus::Rejected => Self::Rejected,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OvertimeAdjustment {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub adjustment_type: AdjustmentType,
    /// Signed hours, positive adds to the balance.
    pub hours: f64,
    pub reason: Arc<str>,
    pub description: Arc<str>,
    pub status: AdjustmentStatus,
    pub author: Arc<str>,
    pub approved_by: Option<Arc<str>>,
    pub approved_at: Option<PrimitiveDateTime>,
    pub created: Option<PrimitiveDateTime>,
    pub deleted: Option<PrimitiveDateTime>,
    pub version: Uuid,
}

impl OvertimeAdjustment {
    /// Display form, e.g. `+2.5 Std`.
    pub fn formatted_hours(&self) -> String {
        peopleflow_utils::hours::format_hours(self.hours)
    }
}

impl From<&OvertimeAdjustmentEntity> for OvertimeAdjustment {
    fn from(adjustment: &OvertimeAdjustmentEntity) -> Self {
        Self {
            id: adjustment.id,
            employee_id: adjustment.employee_id,
            adjustment_type: (&adjustment.adjustment_type).into(),
            hours: adjustment.hours,
            reason: adjustment.reason.clone(),
            description: adjustment.description.clone(),
            status: (&adjustment.status).into(),
            author: adjustment.author.clone(),
            approved_by: adjustment.approved_by.clone(),
            approved_at: adjustment.approved_at,
            created: Some(adjustment.created),
            deleted: adjustment.deleted,
            version: adjustment.version,
        }
    }
}
impl TryFrom<&OvertimeAdjustment> for OvertimeAdjustmentEntity {
    type Error = ServiceError;
    fn try_from(adjustment: &OvertimeAdjustment) -> Result<Self, Self::Error> {
        Ok(Self {
            id: adjustment.id,
            employee_id: adjustment.employee_id,
            adjustment_type: (&adjustment.adjustment_type).into(),
            hours: adjustment.hours,
            reason: adjustment.reason.clone(),
            description: adjustment.description.clone(),
            status: (&adjustment.status).into(),
            author: adjustment.author.clone(),
            approved_by: adjustment.approved_by.clone(),
            approved_at: adjustment.approved_at,
            created: adjustment.created.ok_or(ServiceError::InternalError)?,
            deleted: adjustment.deleted,
            version: adjustment.version,
        })
    }
}

peopleflow_utils::derive_from_reference!(OvertimeAdjustmentEntity, OvertimeAdjustment);
peopleflow_utils::derive_try_from_reference!(
    OvertimeAdjustment,
    OvertimeAdjustmentEntity,
    ServiceError
);

#[automock(type Context=(); type Transaction=dao::MockTransaction;)]
#[async_trait]
pub trait OvertimeAdjustmentService {
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;
    type Transaction: dao::Transaction;

    /// Files an adjustment in status pending. Hours must be finite and not
    /// zero, the author is the calling user.
    async fn submit(
        &self,
        adjustment: &OvertimeAdjustment,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<OvertimeAdjustment, ServiceError>;

    async fn approve(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<OvertimeAdjustment, ServiceError>;

    async fn reject(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<OvertimeAdjustment, ServiceError>;

    async fn list_by_employee(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[OvertimeAdjustment]>, ServiceError>;

    async fn list_approved(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[OvertimeAdjustment]>, ServiceError>;

    async fn total_approved_hours(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<f64, ServiceError>;
}
