use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use dao::{time_entry::TimeEntryEntity, DataSourceEntity};
use mockall::automock;
use peopleflow_utils::IsoWeek;
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use crate::permission::Authentication;
use crate::{ServiceError, ValidationFailureItem};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataSource {
    Manual,
    Timebutler,
    Erfasst123,
}

impl DataSource {
    pub fn code(&self) -> &'static str {
        DataSourceEntity::from(self).code()
    }
}

impl From<&DataSourceEntity> for DataSource {
    fn from(source: &DataSourceEntity) -> Self {
        match source {
            DataSourceEntity::Manual => Self::Manual,
            DataSourceEntity::Timebutler => Self::Timebutler,
            DataSourceEntity::Erfasst123 => Self::Erfasst123,
        }
    }
}
impl From<&DataSource> for DataSourceEntity {
    fn from(source: &DataSource) -> Self {
        match source {
            DataSource::Manual => Self::Manual,
            DataSource::Timebutler => Self::Timebutler,
            DataSource::Erfasst123 => Self::Erfasst123,
        }
    }
}

/// Employee, date, start, end and project reference.
pub type DuplicateKey = (Uuid, Date, PrimitiveDateTime, PrimitiveDateTime, Arc<str>);

#[derive(Clone, Debug, PartialEq)]
pub struct TimeEntry {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub date: Date,
    pub start: PrimitiveDateTime,
    pub end: PrimitiveDateTime,
    /// Derived from start and end for manual entries, taken as delivered
    /// for imported ones.
    pub duration_hours: f64,
    pub project_ref: Arc<str>,
    pub project_name: Arc<str>,
    pub activity_ref: Arc<str>,
    pub wage_type: Arc<str>,
    pub source: DataSource,
    pub foreign_key: Option<Arc<str>>,
    pub created: Option<PrimitiveDateTime>,
    pub deleted: Option<PrimitiveDateTime>,
    pub version: Uuid,
}

impl TimeEntry {
    pub fn iso_week(&self) -> IsoWeek {
        IsoWeek::from_date(self.date)
    }

    /// Hours between start and end, zero if end is not after start.
    pub fn hours_between_start_and_end(&self) -> f64 {
        let seconds = (self.end - self.start).as_seconds_f64();
        if seconds > 0.0 {
            seconds / 3600.0
        } else {
            0.0
        }
    }

    /// Entries with the same key are considered duplicates of each other.
    pub fn duplicate_key(&self) -> DuplicateKey {
        (
            self.employee_id,
            self.date,
            self.start,
            self.end,
            self.project_ref.clone(),
        )
    }
}

/// Checks a time entry before it is stored. An empty result means valid.
pub fn validate_time_entry(entry: &TimeEntry, today: Date) -> Vec<ValidationFailureItem> {
    let mut failures = Vec::new();
    if entry.end <= entry.start {
        failures.push(ValidationFailureItem::InvalidValue("end".into()));
    }
    if entry.duration_hours.is_nan() || entry.duration_hours <= 0.0 || entry.duration_hours > 24.0
    {
        failures.push(ValidationFailureItem::InvalidValue("duration_hours".into()));
    }
    if entry.date > today {
        failures.push(ValidationFailureItem::InvalidValue("date".into()));
    }
    failures
}

impl From<&TimeEntryEntity> for TimeEntry {
    fn from(entry: &TimeEntryEntity) -> Self {
        Self {
            id: entry.id,
            employee_id: entry.employee_id,
            date: entry.date,
            start: entry.start,
            end: entry.end,
            duration_hours: entry.duration_hours,
            project_ref: entry.project_ref.clone(),
            project_name: entry.project_name.clone(),
            activity_ref: entry.activity_ref.clone(),
            wage_type: entry.wage_type.clone(),
            source: (&entry.source).into(),
            foreign_key: entry.foreign_key.clone(),
            created: Some(entry.created),
            deleted: entry.deleted,
            version: entry.version,
        }
    }
}
impl TryFrom<&TimeEntry> for TimeEntryEntity {
    type Error = ServiceError;
    fn try_from(entry: &TimeEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entry.id,
            employee_id: entry.employee_id,
            date: entry.date,
            start: entry.start,
            end: entry.end,
            duration_hours: entry.duration_hours,
            project_ref: entry.project_ref.clone(),
            project_name: entry.project_name.clone(),
            activity_ref: entry.activity_ref.clone(),
            wage_type: entry.wage_type.clone(),
            source: (&entry.source).into(),
            foreign_key: entry.foreign_key.clone(),
            created: entry.created.ok_or(ServiceError::InternalError)?,
            deleted: entry.deleted,
            version: entry.version,
        })
    }
}

peopleflow_utils::derive_from_reference!(TimeEntryEntity, TimeEntry);
peopleflow_utils::derive_try_from_reference!(TimeEntry, TimeEntryEntity, ServiceError);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimeEntryFilter {
    pub from: Option<Date>,
    pub to: Option<Date>,
    pub source: Option<DataSource>,
}

impl TimeEntryFilter {
    pub fn matches(&self, entry: &TimeEntry) -> bool {
        self.from.is_none_or(|from| entry.date >= from)
            && self.to.is_none_or(|to| entry.date <= to)
            && self.source.is_none_or(|source| entry.source == source)
    }
}

/// What an import did with a delivered record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    /// The record was deleted locally and stays deleted.
    SkippedDeleted,
}

#[automock(type Context=(); type Transaction=dao::MockTransaction;)]
#[async_trait]
pub trait TimeEntryService {
    type Context: Clone + Debug + PartialEq + Eq + Send + Sync + 'static;
    type Transaction: dao::Transaction;

    /// Adds a manual time entry.
    async fn append(
        &self,
        entry: &TimeEntry,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<TimeEntry, ServiceError>;

    /// Inserts or updates an imported entry identified by its source and
    /// foreign key.
    async fn replace_by_foreign_key(
        &self,
        entry: &TimeEntry,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(TimeEntry, UpsertOutcome), ServiceError>;

    async fn list_by_employee(
        &self,
        employee_id: Uuid,
        filter: &TimeEntryFilter,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[TimeEntry]>, ServiceError>;

    /// Entries of all employees in the inclusive date range.
    async fn list_by_date_range(
        &self,
        from: Date,
        to: Date,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<Arc<[TimeEntry]>, ServiceError>;

    /// Removes entries sharing date, start, end and project of the employee.
    /// Manual entries win over imported ones, the oldest entry wins a tie.
    /// Returns the number of removed entries.
    async fn remove_duplicates(
        &self,
        employee_id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<u32, ServiceError>;

    async fn delete(
        &self,
        id: Uuid,
        context: Authentication<Self::Context>,
        tx: Option<Self::Transaction>,
    ) -> Result<(), ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn entry() -> TimeEntry {
        TimeEntry {
            id: Uuid::nil(),
            employee_id: Uuid::nil(),
            date: date!(2025-03-03),
            start: datetime!(2025-03-03 08:00),
            end: datetime!(2025-03-03 16:15),
            duration_hours: 8.25,
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

    #[test]
    fn test_valid_entry() {
        assert!(validate_time_entry(&entry(), date!(2025-03-03)).is_empty());
        assert_eq!(entry().hours_between_start_and_end(), 8.25);
    }

    #[test]
    fn test_invalid_entry_reports_every_field() {
        let invalid = TimeEntry {
            date: date!(2025-03-10),
            end: datetime!(2025-03-03 07:00),
            duration_hours: 0.0,
            ..entry()
        };
        let failures = validate_time_entry(&invalid, date!(2025-03-03));
        assert_eq!(
            failures,
            vec![
                ValidationFailureItem::InvalidValue("end".into()),
                ValidationFailureItem::InvalidValue("duration_hours".into()),
                ValidationFailureItem::InvalidValue("date".into()),
            ]
        );
        assert_eq!(invalid.hours_between_start_and_end(), 0.0);
    }

    #[test]
    fn test_more_than_a_day_is_invalid() {
        let too_long = TimeEntry {
            duration_hours: 24.5,
            ..entry()
        };
        assert_eq!(
            validate_time_entry(&too_long, date!(2025-03-03)),
            vec![ValidationFailureItem::InvalidValue("duration_hours".into())]
        );
    }

    #[test]
    fn test_filter() {
        let filter = TimeEntryFilter {
            from: Some(date!(2025-03-01)),
            to: Some(date!(2025-03-02)),
            source: None,
        };
        assert!(!filter.matches(&entry()));
        assert!(TimeEntryFilter::default().matches(&entry()));
        let only_imported = TimeEntryFilter {
            source: Some(DataSource::Timebutler),
            ..Default::default()
        };
        assert!(!only_imported.matches(&entry()));
    }
}
