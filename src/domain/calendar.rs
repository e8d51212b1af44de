use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::time::DateInterval;

/// Public holiday
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub id: i64,
    pub description: String,
    pub date: NaiveDate,
}

/// Checks if a date is a weekend
pub fn is_weekend(date: &NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Working dates from `start_date` on, skipping weekends and `holidays`,
/// until `target_days` dates are collected
pub fn calculate_working_dates(
    start_date: NaiveDate,
    target_days: usize,
    holidays: &[NaiveDate],
) -> Vec<NaiveDate> {
    start_date
        .iter_days()
        .filter(|date| !is_weekend(date) && !holidays.contains(date))
        .take(target_days)
        .collect()
}

/// Days of an interval together with the holidays that fall in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    interval: DateInterval,
    holidays: BTreeSet<NaiveDate>,
}

impl Calendar {
    pub fn new(interval: DateInterval, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        let holidays = holidays
            .into_iter()
            .filter(|date| interval.includes(*date))
            .collect();
        Calendar { interval, holidays }
    }

    pub fn interval(&self) -> DateInterval {
        self.interval
    }

    pub fn holidays(&self) -> impl Iterator<Item = &NaiveDate> {
        self.holidays.iter()
    }

    /// Monday to Friday and not a holiday
    pub fn is_workable(&self, date: NaiveDate) -> bool {
        !is_weekend(&date) && !self.holidays.contains(&date)
    }

    pub fn all_days(&self) -> Vec<NaiveDate> {
        self.interval.days()
    }

    pub fn workable_days(&self) -> Vec<NaiveDate> {
        self.workable_days_in(&self.interval)
    }

    /// Workable days of `interval` clipped to the calendar
    pub fn workable_days_in(&self, interval: &DateInterval) -> Vec<NaiveDate> {
        self.days_in(interval)
            .into_iter()
            .filter(|date| self.is_workable(*date))
            .collect()
    }

    /// All days of `interval` clipped to the calendar
    pub fn days_in(&self, interval: &DateInterval) -> Vec<NaiveDate> {
        self.interval
            .intersection(interval)
            .map(|clipped| clipped.days())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_is_weekend() {
        assert!(is_weekend(&date(2023, 3, 4)));
        assert!(is_weekend(&date(2023, 3, 5)));
        assert!(!is_weekend(&date(2023, 3, 6)));
    }

    #[test]
    fn test_calculate_working_dates_skips_weekends_and_holidays() {
        // Friday start, Monday is a holiday
        let dates = calculate_working_dates(date(2023, 3, 3), 3, &[date(2023, 3, 6)]);
        assert_eq!(dates, vec![date(2023, 3, 3), date(2023, 3, 7), date(2023, 3, 8)]);
    }

    #[test]
    fn test_workable_days_exclude_weekends_and_holidays() {
        let calendar = Calendar::new(
            DateInterval::of(date(2023, 3, 1), date(2023, 3, 7)),
            vec![date(2023, 3, 2), date(2023, 4, 10)],
        );

        assert_eq!(
            calendar.workable_days(),
            vec![date(2023, 3, 1), date(2023, 3, 3), date(2023, 3, 6), date(2023, 3, 7)]
        );
        assert_eq!(calendar.all_days().len(), 7);
        assert_eq!(calendar.holidays().count(), 1);
    }

    #[test]
    fn test_workable_days_in_are_clipped() {
        let calendar = Calendar::new(DateInterval::of(date(2023, 1, 1), date(2023, 12, 31)), vec![]);
        let crossing_year = DateInterval::of(date(2022, 12, 28), date(2023, 1, 3));

        assert_eq!(
            calendar.workable_days_in(&crossing_year),
            vec![date(2023, 1, 2), date(2023, 1, 3)]
        );
        assert_eq!(calendar.days_in(&crossing_year).len(), 3);
        assert!(calendar
            .days_in(&DateInterval::of(date(2024, 1, 1), date(2024, 1, 2)))
            .is_empty());
    }
}
