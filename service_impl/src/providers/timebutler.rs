//! Timebutler: people and absences as semicolon separated text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use service::{
    absence::{AbsenceStatus, AbsenceType},
    integration::Provider,
    provider::{ProviderClient, RemoteAbsence, RemotePerson, RemotePlanning, RemoteTimeEntry},
    ServiceError,
};
use time::{macros::format_description, Date};
use tracing::{debug, warn};

use super::{check_status, transport_error};

const USER_FIELDS: usize = 17;
const ABSENCE_FIELDS: usize = 15;

pub struct TimebutlerClient {
    client: reqwest::Client,
    base_url: Arc<str>,
    timeout: Duration,
}

impl TimebutlerClient {
    pub fn new(client: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').into(),
            timeout,
        }
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .timeout(self.timeout)
            .form(form)
            .send()
            .await
            .map_err(|err| transport_error(Provider::Timebutler, err))?;
        check_status(Provider::Timebutler, response)?
            .text()
            .await
            .map_err(|err| transport_error(Provider::Timebutler, err))
    }
}

fn parse_date(value: &str) -> Option<Date> {
    Date::parse(value.trim(), format_description!("[day]/[month]/[year]")).ok()
}

fn optional(value: &str) -> Option<Arc<str>> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.into())
    }
}

/// Data lines without the header, split into trimmed fields.
fn records(body: &str) -> impl Iterator<Item = Vec<&str>> {
    body.lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(';').map(str::trim).collect())
}

pub(crate) fn parse_users(body: &str) -> Vec<RemotePerson> {
    records(body)
        .filter_map(|fields| {
            if fields.len() < USER_FIELDS {
                warn!("Skip Timebutler user with {} fields", fields.len());
                return None;
            }
            Some(RemotePerson {
                id: fields[0].into(),
                last_name: fields[1].into(),
                first_name: fields[2].into(),
                employee_number: optional(fields[3]),
                email: optional(fields[4]),
                department: optional(fields[9]),
                hire_date: parse_date(fields[15]),
                active: fields[13] != "true",
            })
        })
        .collect()
}

pub(crate) fn absence_type_of(value: &str) -> AbsenceType {
    let value = value.to_lowercase();
    if value.contains("sick") || value.contains("krank") {
        AbsenceType::Sick
    } else if value.contains("special") || value.contains("sonder") {
        AbsenceType::Special
    } else {
        AbsenceType::Vacation
    }
}

pub(crate) fn absence_status_of(value: &str) -> AbsenceStatus {
    let value = value.to_lowercase();
    if value.contains("requested") || value.contains("beantragt") {
        AbsenceStatus::Requested
    } else if value.contains("rejected")
        || value.contains("declined")
        || value.contains("abgelehnt")
    {
        AbsenceStatus::Rejected
    } else if value.contains("cancelled") || value.contains("storniert") {
        AbsenceStatus::Cancelled
    } else {
        AbsenceStatus::Approved
    }
}

pub(crate) fn parse_absences(body: &str) -> Vec<RemoteAbsence> {
    records(body)
        .filter_map(|fields| {
            if fields.len() < ABSENCE_FIELDS {
                warn!("Skip Timebutler absence with {} fields", fields.len());
                return None;
            }
            let person_id = fields[5];
            if person_id.is_empty() {
                debug!("Skip Timebutler absence {} without user", fields[0]);
                return None;
            }
            let (Some(start_date), Some(end_date)) = (parse_date(fields[1]), parse_date(fields[2]))
            else {
                debug!("Skip Timebutler absence {} with invalid dates", fields[0]);
                return None;
            };
            let id: Arc<str> = if fields[0].is_empty() {
                format!("{}:{}", person_id, start_date).into()
            } else {
                fields[0].into()
            };
            Some(RemoteAbsence {
                id,
                person_id: person_id.into(),
                employee_number: optional(fields[6]),
                absence_type: absence_type_of(fields[7]),
                status: absence_status_of(fields[9]),
                start_date,
                end_date,
                half_day: fields[3].eq_ignore_ascii_case("true"),
                workdays: fields[11].parse().unwrap_or(0.0),
                comment: fields[14].into(),
            })
        })
        .collect()
}

#[async_trait]
impl ProviderClient for TimebutlerClient {
    fn provider(&self) -> Provider {
        Provider::Timebutler
    }

    async fn test_connection(&self, credentials: &str) -> Result<(), ServiceError> {
        self.list_people(credentials).await.map(|_| ())
    }

    async fn list_people(&self, credentials: &str) -> Result<Arc<[RemotePerson]>, ServiceError> {
        let body = self
            .post("/api/v1/users", &[("auth", credentials)])
            .await?;
        Ok(parse_users(&body).into())
    }

    /// Timebutler does not track working time.
    async fn list_times(
        &self,
        _credentials: &str,
        _from: Date,
        _to: Date,
    ) -> Result<Arc<[RemoteTimeEntry]>, ServiceError> {
        Ok(Arc::new([]))
    }

    async fn list_absences(
        &self,
        credentials: &str,
        year: i32,
    ) -> Result<Arc<[RemoteAbsence]>, ServiceError> {
        let year = year.to_string();
        let body = self
            .post(
                "/api/v1/absences",
                &[("auth", credentials), ("year", &year), ("detailed", "true")],
            )
            .await?;
        Ok(parse_absences(&body).into())
    }

    async fn list_plannings(
        &self,
        _credentials: &str,
        _from: Date,
        _to: Date,
    ) -> Result<Arc<[RemotePlanning]>, ServiceError> {
        Ok(Arc::new([]))
    }
}
