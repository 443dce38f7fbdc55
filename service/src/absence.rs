//! Absences of employees and their approval workflow.
//!
//! Days are counted as working days of the holiday region of the employee,
//! so weekends and public holidays inside an absence are free.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use dao::absence::{AbsenceEntity, AbsenceStatusEntity, AbsenceTypeEntity};
use mockall::automock;
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use crate::permission::Authentication;
use crate::time_entry::{DataSource, UpsertOutcome};
use crate::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbsenceType {
    Vacation,
    Sick,
    Special,
}

impl AbsenceType {
    pub fn label(&self) -> &'static str {
        match self {
            AbsenceType::Vacation => "Urlaub",
            AbsenceType::Sick => "Krankheit",
            AbsenceType::Special => "Sonderurlaub",
        }
    }
}

impl From<&AbsenceTypeEntity> for AbsenceType {
    fn from(absence_type: &AbsenceTypeEntity) -> Self {
        match absence_type {
            AbsenceTypeEntity::Vacation => Self::Vacation,
            AbsenceTypeEntity::Sick => Self::Sick,
            AbsenceTypeEntity::Special => Self::Special,
        }
    }
}
impl From<&AbsenceType> for AbsenceTypeEntity {
    fn from(absence_type: &AbsenceType) -> Self {
        match absence_type {
            AbsenceType::Vacation => Self::Vacation,
            AbsenceType::Sick => Self::Sick,
            AbsenceType::Special => Self::Special,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbsenceStatus {
    Requested,
    Approved,
    Rejected,
    Cancelled,
}

impl AbsenceStatus {
    pub fn code(&self) -> &'static str {
        match self {
            AbsenceStatus::Requested => "REQUESTED",
            AbsenceStatus::Approved => "APPROVED",
            AbsenceStatus::Rejected => "REJECTED",
            AbsenceStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AbsenceStatus::Requested => "Beantragt",
            AbsenceStatus::Approved => "Genehmigt",
            AbsenceStatus::Rejected => "Abgelehnt",
            AbsenceStatus::Cancelled => "Storniert",
        }
    }

    pub fn can_transition_to(&self, to: AbsenceStatus) -> bool {
        matches!(
            (self, to),
            (
                AbsenceStatus::Requested,
                AbsenceStatus::Approved | AbsenceStatus::Rejected | AbsenceStatus::Cancelled
            ) | (AbsenceStatus::Approved, AbsenceStatus::Cancelled)
        )
    }

    /// `Ok` if the transition is allowed, `InvalidTransition` otherwise.
    pub fn transition_to(&self, to: AbsenceStatus) -> Result<AbsenceStatus, ServiceError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(ServiceError::InvalidTransition {
                from: self.code().into(),
                to: to.code().into(),
            })
        }
    }
}

impl From<&AbsenceStatusEntity> for AbsenceStatus {
    fn from(status: &AbsenceStatusEntity) -> Self {
        match status {
            AbsenceStatusEntity::Requested => Self::Requested,
            AbsenceStatusEntity::Approved => Self::Approved,
            AbsenceStatusEntity::Rejected => Self::Rejected,
            AbsenceStatusEntity::Cancelled => Self::Cancelled,
        }
    }
}
impl From<&AbsenceStatus> for AbsenceStatusEntity {
    fn from(status: &AbsenceStatus) -> Self {
        match status {
            AbsenceStatus::Requested => Self::Requested,
            AbsenceStatus::Approved => Self::Approved,
            AbsenceStatus::Rejected => Self::Rejected,
            AbsenceStatus::Cancelled => Self::Cancelled,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Absence {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub absence_type: AbsenceType,
    pub start_date: Date,
    pub end_date: Date,
    pub days: f64,
    pub status: AbsenceStatus,
    pub approved_by: Option<Arc<str>>,
    pub approver_name: Option<Arc<str>>,
    pub reason: Arc<str>,
    pub notes: Arc<str>,
    pub source: DataSource,
    pub foreign_key: Option<Arc<str>>,
    pub created: Option<PrimitiveDateTime>,
    pub deleted: Option<PrimitiveDateTime>,
    pub version: Uuid,
}

impl Absence {
    pub fn is_approved_vacation(&self) -> bool {
        self.absence_type == AbsenceType::Vacation && self.status == AbsenceStatus::Approved
    }
}

impl From<&AbsenceEntity> for Absence {
    fn from(absence: &AbsenceEntity) -> Self {
        Self {
            id: absence.id,
            employee_id: absence.employee_id,
            absence_type: (&absence.absence_type).into(),
            start_date: absence.start_date,
            end_date: absence.end_date,
            days: absence.days,
            status: (&absence.status).into(),
            approved_by: absence.approved_by.clone(),
            approver_name: absence.approver_name.clone(),
            reason: absence.reason.clone(),
            notes: absence.notes.clone(),
            source: (&absence.source).into(),
            foreign_key: absence.foreign_key.clone(),
            created: Some(absence.created),
            deleted: absence.deleted,
            version: absence.version,
        }
    }
}
impl TryFrom<&Absence> for AbsenceEntity {
    type Error = ServiceError;
    fn try_from(absence: &Absence) -> Result<Self, Self::Error> {
        Ok(Self {
            id: absence.id,
            employee_id: absence.employee_id,
            absence_type: (&absence.absence_type).into(),
            start_date: absence.start_date,
            end_date: absence.end_date,
            days: absence.days,
            status: (&absence.status).into(),
            approved_by: absence.approved_by.clone(),
            approver_name: absence.approver_name.clone(),
            reason: absence.reason.clone(),
            notes: absence.notes.clone(),
            source: (&absence.source).into(),
            foreign_key: absence.foreign_key.clone(),
            created: absence.created.ok_or(ServiceError::InternalError)?,
            deleted: absence.deleted,
            version: absence.version,
        })
    }
}

peopleflow_utils::derive_from_reference!(AbsenceEntity, Absence);
peopleflow_utils::derive_try_from_reference!(Absence, AbsenceEntity, ServiceError);

/// Sum of the approved vacation days starting in the given year.
pub fn approved_vacation_days(absences: &[Absence], year: i32) -> f64 {
    absences
        .iter()
        .filter(|absence| absence.is_approved_vacation() && absence.start_date.year() == year)
        .map(|absence| absence.days)
        .sum()
}

#[automock(type Context=(); type Transaction=dao::MockTransaction;)]
#[async_trait]
pub trait AbsenceService {
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;
    type Transaction: dao::Transaction;

    /// Files a new absence in status requested. The day count is computed.
    async fn request(
        &self,
        absence: &Absence,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Absence, ServiceError>;

    /// Approves a requested absence. Vacations must fit into the annual
    /// entitlement of the year the vacation starts in.
    async fn approve(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Absence, ServiceError>;

    async fn reject(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Absence, ServiceError>;

    async fn cancel(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Absence, ServiceError>;

    async fn list_for_year(
        &self,
        employee_id: Uuid,
        year: i32,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[Absence]>, ServiceError>;

    /// Entitlement minus approved vacation days of the year.
    async fn remaining_vacation_days(
        &self,
        employee_id: Uuid,
        year: i32,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<f64, ServiceError>;

    /// Inserts or updates an absence delivered by a provider, identified by
    /// source and foreign key. The status is taken as delivered.
    async fn upsert_imported(
        &self,
        absence: &Absence,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(Absence, UpsertOutcome), ServiceError>;
}
