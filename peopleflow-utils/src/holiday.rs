//! German public holiday calendar.
//!
//! Pure and stateless: the holidays of a year are derived from a fixed table
//! plus the Easter date, so every result can be recomputed at any time.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use time::{Date, Duration, Month};

use crate::date_utils::{days_between, is_weekend};

/// First year of the Gregorian Easter computation.
const FIRST_GREGORIAN_YEAR: i32 = 1583;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    BadenWuerttemberg,
    Bayern,
    Berlin,
    Brandenburg,
    Bremen,
    Hamburg,
    Hessen,
    MecklenburgVorpommern,
    Niedersachsen,
    #[default]
    NordrheinWestfalen,
    RheinlandPfalz,
    Saarland,
    Sachsen,
    SachsenAnhalt,
    SchleswigHolstein,
    Thueringen,
}

impl Region {
    pub fn all() -> &'static [Region] {
        &[
            Region::BadenWuerttemberg,
            Region::Bayern,
            Region::Berlin,
            Region::Brandenburg,
            Region::Bremen,
            Region::Hamburg,
            Region::Hessen,
            Region::MecklenburgVorpommern,
            Region::Niedersachsen,
            Region::NordrheinWestfalen,
            Region::RheinlandPfalz,
            Region::Saarland,
            Region::Sachsen,
            Region::SachsenAnhalt,
            Region::SchleswigHolstein,
            Region::Thueringen,
        ]
    }

    pub fn code(&self) -> &'static str {
        match self {
            Region::BadenWuerttemberg => "BW",
            Region::Bayern => "BY",
            Region::Berlin => "BE",
            Region::Brandenburg => "BB",
            Region::Bremen => "HB",
            Region::Hamburg => "HH",
            Region::Hessen => "HE",
            Region::MecklenburgVorpommern => "MV",
            Region::Niedersachsen => "NI",
            Region::NordrheinWestfalen => "NW",
            Region::RheinlandPfalz => "RP",
            Region::Saarland => "SL",
            Region::Sachsen => "SN",
            Region::SachsenAnhalt => "ST",
            Region::SchleswigHolstein => "SH",
            Region::Thueringen => "TH",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Region::BadenWuerttemberg => "Baden-Württemberg",
            Region::Bayern => "Bayern",
            Region::Berlin => "Berlin",
            Region::Brandenburg => "Brandenburg",
            Region::Bremen => "Bremen",
            Region::Hamburg => "Hamburg",
            Region::Hessen => "Hessen",
            Region::MecklenburgVorpommern => "Mecklenburg-Vorpommern",
            Region::Niedersachsen => "Niedersachsen",
            Region::NordrheinWestfalen => "Nordrhein-Westfalen",
            Region::RheinlandPfalz => "Rheinland-Pfalz",
            Region::Saarland => "Saarland",
            Region::Sachsen => "Sachsen",
            Region::SachsenAnhalt => "Sachsen-Anhalt",
            Region::SchleswigHolstein => "Schleswig-Holstein",
            Region::Thueringen => "Thüringen",
        }
    }

    /// Parses a two letter state code, ignoring case and surrounding whitespace.
    pub fn from_code(code: &str) -> Option<Region> {
        let code = code.trim();
        Region::all()
            .iter()
            .find(|region| region.code().eq_ignore_ascii_case(code))
            .copied()
    }

    pub fn from_code_or(code: &str, fallback: Region) -> Region {
        Region::from_code(code).unwrap_or(fallback)
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Holiday {
    pub date: Date,
    pub name: &'static str,
}

enum Scope {
    All,
    Only(&'static [Region]),
}

impl Scope {
    fn applies_to(&self, region: Region) -> bool {
        match self {
            Scope::All => true,
            Scope::Only(regions) => regions.contains(&region),
        }
    }
}

use Region::*;

const FIXED_HOLIDAYS: &[(Month, u8, &str, Scope)] = &[
    (Month::January, 1, "Neujahr", Scope::All),
    (
        Month::January,
        6,
        "Heilige Drei Könige",
        Scope::Only(&[BadenWuerttemberg, Bayern, SachsenAnhalt]),
    ),
    (Month::May, 1, "Tag der Arbeit", Scope::All),
    (
        Month::August,
        8,
        "Augsburger Friedensfest",
        Scope::Only(&[Bayern]),
    ),
    (
        Month::August,
        15,
        "Mariä Himmelfahrt",
        Scope::Only(&[Bayern, Saarland]),
    ),
    (Month::October, 3, "Tag der Deutschen Einheit", Scope::All),
    (
        Month::October,
        31,
        "Reformationstag",
        Scope::Only(&[
            Brandenburg,
            MecklenburgVorpommern,
            Sachsen,
            SachsenAnhalt,
            Thueringen,
            Bremen,
            Hamburg,
            Niedersachsen,
            SchleswigHolstein,
        ]),
    ),
    (
        Month::November,
        1,
        "Allerheiligen",
        Scope::Only(&[
            BadenWuerttemberg,
            Bayern,
            NordrheinWestfalen,
            RheinlandPfalz,
            Saarland,
        ]),
    ),
    (Month::December, 25, "1. Weihnachtsfeiertag", Scope::All),
    (Month::December, 26, "2. Weihnachtsfeiertag", Scope::All),
];

/// Offsets in days relative to Easter Sunday.
const EASTER_HOLIDAYS: &[(i64, &str, Scope)] = &[
    (-2, "Karfreitag", Scope::All),
    (1, "Ostermontag", Scope::All),
    (39, "Christi Himmelfahrt", Scope::All),
    (50, "Pfingstmontag", Scope::All),
    (
        60,
        "Fronleichnam",
        Scope::Only(&[
            BadenWuerttemberg,
            Bayern,
            Hessen,
            NordrheinWestfalen,
            RheinlandPfalz,
            Saarland,
            Sachsen,
            Thueringen,
        ]),
    ),
];

/// Easter Sunday after Gauss. `None` before the Gregorian reform or outside
/// the supported calendar range.
pub fn easter_sunday(year: i32) -> Option<Date> {
    if year < FIRST_GREGORIAN_YEAR {
        return None;
    }
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let n = (h + l - 7 * m + 114) / 31;
    let p = (h + l - 7 * m + 114) % 31;

    let month = Month::try_from(n as u8).ok()?;
    Date::from_calendar_date(year, month, (p + 1) as u8).ok()
}

/// Wednesday eleven days before the first Sunday of Advent.
pub fn buss_und_bettag(year: i32) -> Option<Date> {
    let christmas = Date::from_calendar_date(year, Month::December, 25).ok()?;
    let days_back = match christmas.weekday().number_days_from_sunday() {
        0 => 7,
        days => days as i64,
    };
    let fourth_advent = christmas.checked_sub(Duration::days(days_back))?;
    let first_advent = fourth_advent.checked_sub(Duration::weeks(3))?;
    first_advent.checked_sub(Duration::days(11))
}

/// All public holidays of `year` in `region`, ordered by date.
///
/// Years the calendar cannot represent yield an empty list.
pub fn holidays_of(year: i32, region: Region) -> Vec<Holiday> {
    let Some(easter) = easter_sunday(year) else {
        return Vec::new();
    };

    let mut holidays: Vec<Holiday> = FIXED_HOLIDAYS
        .iter()
        .filter(|(_, _, _, scope)| scope.applies_to(region))
        .filter_map(|(month, day, name, _)| {
            Date::from_calendar_date(year, *month, *day)
                .ok()
                .map(|date| Holiday { date, name: *name })
        })
        .chain(
            EASTER_HOLIDAYS
                .iter()
                .filter(|(_, _, scope)| scope.applies_to(region))
                .filter_map(|(offset, name, _)| {
                    easter
                        .checked_add(Duration::days(*offset))
                        .map(|date| Holiday { date, name: *name })
                }),
        )
        .collect();

    if let Some(date) = buss_und_bettag(year).filter(|_| region == Sachsen) {
        holidays.push(Holiday {
            date,
            name: "Buß- und Bettag",
        });
    }

    holidays.sort();
    holidays
}

pub fn holiday_name(date: Date, region: Region) -> Option<&'static str> {
    holidays_of(date.year(), region)
        .into_iter()
        .find(|holiday| holiday.date == date)
        .map(|holiday| holiday.name)
}

pub fn is_holiday(date: Date, region: Region) -> bool {
    holiday_name(date, region).is_some()
}

pub fn is_working_day(date: Date, region: Region) -> bool {
    !is_weekend(date) && !is_holiday(date, region)
}

/// Counts Monday to Friday days between `from` and `to` (inclusive) which
/// are no public holiday. Returns 0 if `to` lies before `from`.
pub fn working_days_between(from: Date, to: Date, region: Region) -> u32 {
    if to < from {
        return 0;
    }
    let holidays: HashSet<Date> = (from.year()..=to.year())
        .flat_map(|year| holidays_of(year, region))
        .map(|holiday| holiday.date)
        .collect();

    days_between(from, to)
        .filter(|date| !is_weekend(*date) && !holidays.contains(date))
        .count() as u32
}

pub fn working_days_in_month(year: i32, month: Month, region: Region) -> u32 {
    let Ok(first) = Date::from_calendar_date(year, month, 1) else {
        return 0;
    };
    let last = days_between(first, first.saturating_add(Duration::days(31)))
        .take_while(|date| date.month() == month)
        .last()
        .unwrap_or(first);
    working_days_between(first, last, region)
}
