//! Groups time entries into ISO calendar weeks.

use std::collections::{BTreeMap, BTreeSet};

use peopleflow_utils::IsoWeek;
use time::macros::time;
use time::{Date, PrimitiveDateTime};

use crate::employee::Employee;
use crate::time_entry::TimeEntry;

/// The part of an employment contract the weekly planning depends on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contract {
    pub weekly_hours_target: f64,
    pub working_days_per_week: u8,
}

impl From<&Employee> for Contract {
    fn from(employee: &Employee) -> Self {
        Self {
            weekly_hours_target: employee.weekly_hours_target,
            working_days_per_week: employee.working_days_per_week,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeeklyBucket {
    pub iso_year: i32,
    pub iso_week: u8,
    /// Monday 00:00.
    pub week_start: PrimitiveDateTime,
    /// Sunday 23:59:59.
    pub week_end: PrimitiveDateTime,
    pub planned_hours: f64,
    pub actual_hours: f64,
    pub overtime_hours: f64,
    pub days_worked: u32,
}

impl WeeklyBucket {
    pub fn contains(&self, date: Date) -> bool {
        date >= self.week_start.date() && date <= self.week_end.date()
    }
}

/// One bucket per ISO week which has at least one entry, ascending by week.
/// Every week is planned with the full weekly target of the contract.
pub fn bucketize(entries: &[TimeEntry], contract: &Contract) -> Vec<WeeklyBucket> {
    let mut weeks: BTreeMap<Date, (IsoWeek, f64, BTreeSet<Date>)> = BTreeMap::new();
    for entry in entries {
        let week = entry.iso_week();
        let (_, hours, days) = weeks
            .entry(week.monday())
            .or_insert_with(|| (week, 0.0, BTreeSet::new()));
        *hours += entry.duration_hours;
        days.insert(entry.date);
    }

    weeks
        .into_values()
        .map(|(week, actual_hours, days)| WeeklyBucket {
            iso_year: week.year(),
            iso_week: week.week(),
            week_start: week.monday().midnight(),
            week_end: week.sunday().with_time(time!(23:59:59)),
            planned_hours: contract.weekly_hours_target,
            actual_hours,
            overtime_hours: actual_hours - contract.weekly_hours_target,
            days_worked: days.len() as u32,
        })
        .collect()
}
