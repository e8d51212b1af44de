use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ActivityError;

pub const MINUTES_IN_HOUR: i64 = 60;
pub const HOURS_BY_DAY: i64 = 8;
/// Minutes counted for a full day in day-based roles
pub const WORKABLE_DAY_MINUTES: i64 = MINUTES_IN_HOUR * HOURS_BY_DAY;

/// Unit a project role measures its activities in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    Minutes,
    Days,
    NaturalDays,
}

impl TimeUnit {
    pub fn is_days(self) -> bool {
        matches!(self, TimeUnit::Days | TimeUnit::NaturalDays)
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeUnit::Minutes => "minutes",
            TimeUnit::Days => "days",
            TimeUnit::NaturalDays => "natural days",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], " ").as_str() {
            "minutes" => Ok(TimeUnit::Minutes),
            "days" => Ok(TimeUnit::Days),
            "natural days" => Ok(TimeUnit::NaturalDays),
            other => Err(format!("Unknown time unit: {}", other)),
        }
    }
}

pub fn first_day_of_year(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub fn last_day_of_year(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX)
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Last second of the day (23:59:59)
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| start_of_day(date))
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    pub fn of(start: NaiveDate, end: NaiveDate) -> Self {
        DateInterval { start, end }
    }

    pub fn of_year(year: i32) -> Self {
        DateInterval {
            start: first_day_of_year(year),
            end: last_day_of_year(year),
        }
    }

    pub fn includes(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every day of the interval, in order. Empty when start is after end.
    pub fn days(&self) -> Vec<NaiveDate> {
        let end = self.end;
        self.start
            .iter_days()
            .take_while(|day| *day <= end)
            .collect()
    }

    pub fn intersection(&self, other: &DateInterval) -> Option<DateInterval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(DateInterval { start, end })
    }
}

/// Range of date-times an activity covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeInterval {
    pub fn of(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, ActivityError> {
        if start > end {
            return Err(ActivityError::InvalidTimeInterval { start, end });
        }
        Ok(TimeInterval { start, end })
    }

    /// Jan 1 00:00:00 to Dec 31 23:59:59 of `year`
    pub fn of_year(year: i32) -> Self {
        TimeInterval {
            start: start_of_day(first_day_of_year(year)),
            end: end_of_day(last_day_of_year(year)),
        }
    }

    /// Whole days from the first to the last date
    pub fn of_dates(start: NaiveDate, end: NaiveDate) -> Self {
        TimeInterval {
            start: start_of_day(start),
            end: end_of_day(end),
        }
    }

    pub fn date_interval(&self) -> DateInterval {
        DateInterval::of(self.start.date(), self.end.date())
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn is_one_day(&self) -> bool {
        self.start.date() == self.end.date()
    }

    /// Strict overlap: touching endpoints do not overlap
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Shares at least one instant with `other`, endpoints included
    pub fn intersects(&self, other: &TimeInterval) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn year_of_start(&self) -> i32 {
        self.start.year()
    }

    pub fn year_of_end(&self) -> i32 {
        self.end.year()
    }
}
