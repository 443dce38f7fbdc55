use std::fmt::{Display, Formatter};
use thiserror::*;

use time::{Date, Duration, Weekday};

#[derive(Debug, Error)]
pub enum DateUtilsError {
    #[error("Invalid date: {0}")]
    DateError(#[from] time::error::ComponentRange),

    #[error("Year {0} has no ISO week {1}")]
    InvalidWeek(i32, u8),
}

/// An ISO-8601 calendar week.
///
/// Weeks start on Monday and week 1 is the week containing the first Thursday
/// of the year, so the ISO year of a week can differ from the calendar year of
/// some of its days (2024-12-30 belongs to 2025-W01).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoWeek {
    year: i32,
    week: u8,
    monday: Date,
}

impl IsoWeek {
    pub fn new(year: i32, week: u8) -> Result<Self, DateUtilsError> {
        if week == 0 || week > time::util::weeks_in_year(year) {
            return Err(DateUtilsError::InvalidWeek(year, week));
        }
        let monday = Date::from_iso_week_date(year, week, Weekday::Monday)?;
        Ok(Self { year, week, monday })
    }

    pub fn from_date(date: Date) -> Self {
        let (year, week, weekday) = date.to_iso_week_date();
        let monday = date.saturating_sub(Duration::days(weekday.number_days_from_monday() as i64));
        Self { year, week, monday }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u8 {
        self.week
    }

    pub fn monday(&self) -> Date {
        self.monday
    }

    pub fn sunday(&self) -> Date {
        self.monday.saturating_add(Duration::days(6))
    }

    pub fn contains(&self, date: Date) -> bool {
        date >= self.monday && date <= self.sunday()
    }

    /// The following week, `None` at the end of the supported calendar range.
    pub fn next(&self) -> Option<Self> {
        self.monday
            .checked_add(Duration::weeks(1))
            .map(Self::from_date)
    }

    pub fn iter_until(&self, end: &Self) -> IsoWeekIterator {
        IsoWeekIterator::new(*self, *end)
    }
}

impl From<Date> for IsoWeek {
    fn from(date: Date) -> Self {
        IsoWeek::from_date(date)
    }
}

impl From<IsoWeek> for (i32, u8) {
    fn from(week: IsoWeek) -> Self {
        (week.year, week.week)
    }
}

impl Display for IsoWeek {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

pub struct IsoWeekIterator {
    current: Option<IsoWeek>,
    end: IsoWeek,
}

impl IsoWeekIterator {
    pub fn new(start: IsoWeek, end: IsoWeek) -> Self {
        Self {
            current: Some(start),
            end,
        }
    }
}

impl Iterator for IsoWeekIterator {
    type Item = IsoWeek;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.filter(|week| week <= &self.end)?;
        self.current = current.next();
        Some(current)
    }
}

/// Iterates all days from `from` to `to`, both inclusive.
pub fn days_between(from: Date, to: Date) -> DateIterator {
    DateIterator {
        current: Some(from),
        end: to,
    }
}

pub struct DateIterator {
    current: Option<Date>,
    end: Date,
}

impl Iterator for DateIterator {
    type Item = Date;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.filter(|date| date <= &self.end)?;
        self.current = current.next_day();
        Some(current)
    }
}

pub fn is_weekend(date: Date) -> bool {
    matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
}
