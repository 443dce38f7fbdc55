//! The seam to the external HR and time tracking systems.
//!
//! Every provider gets an adapter implementing [`ProviderClient`]. Adapters
//! only translate the remote formats, matching and storing is done by the
//! import.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use time::{Date, PrimitiveDateTime};

use crate::absence::{AbsenceStatus, AbsenceType};
use crate::integration::Provider;
use crate::ServiceError;

#[derive(Clone, Debug, PartialEq)]
pub struct RemotePerson {
    pub id: Arc<str>,
    pub first_name: Arc<str>,
    pub last_name: Arc<str>,
    pub email: Option<Arc<str>>,
    pub employee_number: Option<Arc<str>>,
    pub department: Option<Arc<str>>,
    pub hire_date: Option<Date>,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoteTimeEntry {
    pub id: Arc<str>,
    pub person: RemotePerson,
    pub date: Date,
    pub start: PrimitiveDateTime,
    pub end: PrimitiveDateTime,
    pub duration_hours: f64,
    pub project_ref: Arc<str>,
    pub project_name: Arc<str>,
    pub activity_ref: Arc<str>,
    pub wage_type: Arc<str>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoteAbsence {
    pub id: Arc<str>,
    pub person_id: Arc<str>,
    pub employee_number: Option<Arc<str>>,
    pub absence_type: AbsenceType,
    pub status: AbsenceStatus,
    pub start_date: Date,
    pub end_date: Date,
    pub half_day: bool,
    /// Working days as counted by the provider.
    pub workdays: f64,
    pub comment: Arc<str>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemotePlanning {
    pub project_id: Arc<str>,
    pub project_name: Arc<str>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub persons: Arc<[RemotePerson]>,
}

impl RemotePlanning {
    /// Key of the assignment of one planned person, stable across imports.
    pub fn foreign_key_for(&self, person: &RemotePerson) -> Arc<str> {
        format!("{}:{}:{}", self.project_id, person.id, self.start_date).into()
    }
}

/// Adapter to one provider. `credentials` is the decrypted secret stored in
/// the integration.
///
/// Errors are `IntegrationAuth` if the provider rejected the credentials and
/// `Transport` for every other failure.
#[automock]
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn test_connection(&self, credentials: &str) -> Result<(), ServiceError>;

    async fn list_people(&self, credentials: &str) -> Result<Arc<[RemotePerson]>, ServiceError>;

    /// Time records with a date in the inclusive range.
    async fn list_times(
        &self,
        credentials: &str,
        from: Date,
        to: Date,
    ) -> Result<Arc<[RemoteTimeEntry]>, ServiceError>;

    async fn list_absences(
        &self,
        credentials: &str,
        year: i32,
    ) -> Result<Arc<[RemoteAbsence]>, ServiceError>;

    /// Plannings starting in the inclusive range.
    async fn list_plannings(
        &self,
        credentials: &str,
        from: Date,
        to: Date,
    ) -> Result<Arc<[RemotePlanning]>, ServiceError>;
}
