//! 123erfasst: people, times and plannings over GraphQL.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use service::{
    integration::Provider,
    provider::{ProviderClient, RemoteAbsence, RemotePerson, RemotePlanning, RemoteTimeEntry},
    ServiceError,
};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime, Time,
};
use tracing::{debug, warn};

use super::{check_status, parse_flexible_date, transport_error};

const TEST_QUERY: &str = "query { persons { totalCount } }";

const PERSONS_QUERY: &str = "query {
  persons {
    nodes { ident firstname lastname mail employee { isActive hireDate exitDate } }
    totalCount
  }
}";

const TIMES_QUERY: &str = "query GetTimes($filter: TimeCollectionFilter) {
  times(filter: $filter) {
    nodes {
      fid
      person { ident firstname lastname mail }
      project { id name }
      date
      timeStart
      timeEnd
      activity { ident name }
      wageType { ident name }
    }
    totalCount
  }
}";

const PLANNINGS_QUERY: &str = "query GetPlannings($filter: PlanningCollectionFilter) {
  plannings(filter: $filter) {
    nodes {
      project { id name }
      persons { ident firstname lastname mail }
      dateStart
      dateEnd
    }
    totalCount
  }
}";

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
    #[serde(default)]
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct PersonsData {
    persons: Connection<PersonNode>,
}

#[derive(Debug, Deserialize)]
struct TimesData {
    times: Connection<TimeNode>,
}

#[derive(Debug, Deserialize)]
struct PlanningsData {
    plannings: Connection<PlanningNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonNode {
    ident: String,
    #[serde(default)]
    firstname: String,
    #[serde(default)]
    lastname: String,
    mail: Option<String>,
    employee: Option<EmployeeNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmployeeNode {
    #[serde(default)]
    is_active: bool,
    hire_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectNode {
    id: Option<Value>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedNode {
    ident: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeNode {
    fid: String,
    person: PersonNode,
    project: Option<ProjectNode>,
    date: String,
    time_start: Option<String>,
    time_end: Option<String>,
    activity: Option<NamedNode>,
    wage_type: Option<NamedNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanningNode {
    project: Option<ProjectNode>,
    #[serde(default)]
    persons: Vec<PersonNode>,
    date_start: String,
    date_end: Option<String>,
}

impl From<&PersonNode> for RemotePerson {
    fn from(person: &PersonNode) -> Self {
        Self {
            id: person.ident.as_str().into(),
            first_name: person.firstname.as_str().into(),
            last_name: person.lastname.as_str().into(),
            email: person
                .mail
                .as_deref()
                .map(str::trim)
                .filter(|mail| !mail.is_empty())
                .map(Arc::from),
            employee_number: None,
            department: None,
            hire_date: person
                .employee
                .as_ref()
                .and_then(|employee| employee.hire_date.as_deref())
                .and_then(parse_flexible_date),
            active: person
                .employee
                .as_ref()
                .is_none_or(|employee| employee.is_active),
        }
    }
}

fn project_id(project: Option<&ProjectNode>) -> Arc<str> {
    match project.and_then(|project| project.id.as_ref()) {
        Some(Value::String(id)) => id.as_str().into(),
        Some(Value::Null) | None => "".into(),
        Some(other) => other.to_string().into(),
    }
}

fn project_name(project: Option<&ProjectNode>) -> Arc<str> {
    project
        .and_then(|project| project.name.as_deref())
        .unwrap_or_default()
        .into()
}

/// RFC 3339, `YYYY-MM-DDTHH:MM:SS` or a time of day on the given date.
/// Offsets are dropped, the wall clock time is kept.
pub(crate) fn parse_point_in_time(value: &str, date: Date) -> Option<PrimitiveDateTime> {
    let value = value.trim();
    if let Ok(timestamp) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(PrimitiveDateTime::new(timestamp.date(), timestamp.time()));
    }
    if let Ok(timestamp) = PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(timestamp);
    }
    Time::parse(value, format_description!("[hour]:[minute]:[second]"))
        .or_else(|_| Time::parse(value, format_description!("[hour]:[minute]")))
        .ok()
        .map(|time| PrimitiveDateTime::new(date, time))
}

fn to_time_entry(node: &TimeNode) -> Option<RemoteTimeEntry> {
    let Some(date) = parse_flexible_date(&node.date) else {
        debug!("Skip 123erfasst time {} with invalid date {}", node.fid, node.date);
        return None;
    };
    let midnight = PrimitiveDateTime::new(date, Time::MIDNIGHT);
    let start = node
        .time_start
        .as_deref()
        .and_then(|value| parse_point_in_time(value, date));
    let end = node
        .time_end
        .as_deref()
        .and_then(|value| parse_point_in_time(value, date));
    let duration_hours = match (start, end) {
        (Some(start), Some(end)) if end > start => (end - start).as_seconds_f64() / 3600.0,
        _ => 0.0,
    };
    let named = |node: Option<&NamedNode>| -> Arc<str> {
        node.and_then(|node| node.ident.as_deref().or(node.name.as_deref()))
            .unwrap_or_default()
            .into()
    };
    Some(RemoteTimeEntry {
        id: node.fid.as_str().into(),
        person: (&node.person).into(),
        date,
        start: start.unwrap_or(midnight),
        end: end.unwrap_or(midnight),
        duration_hours,
        project_ref: project_id(node.project.as_ref()),
        project_name: project_name(node.project.as_ref()),
        activity_ref: named(node.activity.as_ref()),
        wage_type: named(node.wage_type.as_ref()),
    })
}

fn to_planning(node: &PlanningNode) -> Option<RemotePlanning> {
    let start_date = parse_flexible_date(&node.date_start)?;
    Some(RemotePlanning {
        project_id: project_id(node.project.as_ref()),
        project_name: project_name(node.project.as_ref()),
        start_date,
        end_date: node.date_end.as_deref().and_then(parse_flexible_date),
        persons: node.persons.iter().map(RemotePerson::from).collect(),
    })
}

fn date_filter(field: &str, from: Date, to: Date) -> Value {
    let mut filter = serde_json::Map::new();
    filter.insert(
        field.to_string(),
        json!({
            "_gte": format!("{}T00:00:00Z", from),
            "_lte": format!("{}T23:59:59Z", to),
        }),
    );
    json!({ "filter": filter })
}

pub(crate) fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T, ServiceError> {
    let response: GraphQlResponse<T> = serde_json::from_str(body).map_err(|err| {
        ServiceError::Transport(format!("Unexpected answer of 123erfasst: {}", err).into())
    })?;
    if !response.errors.is_empty() {
        let messages = response
            .errors
            .iter()
            .map(|error| error.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ServiceError::Transport(messages.into()));
    }
    response
        .data
        .ok_or_else(|| ServiceError::Transport("Empty answer of 123erfasst".into()))
}

pub struct Erfasst123Client {
    client: reqwest::Client,
    base_url: Arc<str>,
    timeout: Duration,
}

impl Erfasst123Client {
    pub fn new(client: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').into(),
            timeout,
        }
    }

    async fn query<T: DeserializeOwned>(
        &self,
        credentials: &str,
        query: &str,
        variables: Value,
    ) -> Result<T, ServiceError> {
        if !credentials.contains(':') {
            warn!("Stored 123erfasst credentials are not of the form email:password");
            return Err(ServiceError::IntegrationAuth(Provider::Erfasst123.code().into()));
        }
        let response = self
            .client
            .post(format!("{}/api/graphql", self.base_url))
            .timeout(self.timeout)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode(credentials)),
            )
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|err| transport_error(Provider::Erfasst123, err))?;
        let body = check_status(Provider::Erfasst123, response)?
            .text()
            .await
            .map_err(|err| transport_error(Provider::Erfasst123, err))?;
        parse_response(&body)
    }
}

#[async_trait]
impl ProviderClient for Erfasst123Client {
    fn provider(&self) -> Provider {
        Provider::Erfasst123
    }

    async fn test_connection(&self, credentials: &str) -> Result<(), ServiceError> {
        let data: PersonsData = self.query(credentials, TEST_QUERY, json!({})).await?;
        debug!("123erfasst knows {} persons", data.persons.total_count);
        Ok(())
    }

    async fn list_people(&self, credentials: &str) -> Result<Arc<[RemotePerson]>, ServiceError> {
        let data: PersonsData = self.query(credentials, PERSONS_QUERY, json!({})).await?;
        Ok(data.persons.nodes.iter().map(RemotePerson::from).collect())
    }

    async fn list_times(
        &self,
        credentials: &str,
        from: Date,
        to: Date,
    ) -> Result<Arc<[RemoteTimeEntry]>, ServiceError> {
        let data: TimesData = self
            .query(credentials, TIMES_QUERY, date_filter("date", from, to))
            .await?;
        Ok(data.times.nodes.iter().filter_map(to_time_entry).collect())
    }

    /// Absences are managed in Timebutler.
    async fn list_absences(
        &self,
        _credentials: &str,
        _year: i32,
    ) -> Result<Arc<[RemoteAbsence]>, ServiceError> {
        Ok(Arc::new([]))
    }

    async fn list_plannings(
        &self,
        credentials: &str,
        from: Date,
        to: Date,
    ) -> Result<Arc<[RemotePlanning]>, ServiceError> {
        let data: PlanningsData = self
            .query(credentials, PLANNINGS_QUERY, date_filter("dateFrom", from, to))
            .await?;
        Ok(data.plannings.nodes.iter().filter_map(to_planning).collect())
    }
}
