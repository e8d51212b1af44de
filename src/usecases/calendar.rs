use chrono::NaiveDate;

use crate::domain::DateInterval;
use crate::error::{BinnacleError, Result};
use crate::services::CalendarFactory;

pub struct CalendarUseCases {
    calendar_factory: CalendarFactory,
}

impl CalendarUseCases {
    pub fn new(calendar_factory: CalendarFactory) -> Self {
        CalendarUseCases { calendar_factory }
    }

    /// Weekdays between `start` and `end` (inclusive) that are not holidays
    pub async fn workable_days(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        if start > end {
            return Err(BinnacleError::InvalidDateRange { start, end });
        }
        let calendar = self
            .calendar_factory
            .create(DateInterval::of(start, end))
            .await?;
        Ok(calendar.workable_days())
    }

    pub async fn workable_days_count(&self, start: NaiveDate, end: NaiveDate) -> Result<usize> {
        Ok(self.workable_days(start, end).await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_fixtures::date;
    use crate::domain::Holiday;
    use crate::store::{JsonStore, StoreData};
    use std::sync::Arc;

    fn use_cases() -> CalendarUseCases {
        let store = Arc::new(JsonStore::with_data(StoreData {
            holidays: vec![Holiday {
                id: 1,
                description: "Christmas".to_string(),
                date: date(2023, 12, 25),
            }],
            ..Default::default()
        }));
        CalendarUseCases::new(CalendarFactory::new(store))
    }

    #[tokio::test]
    async fn test_workable_days_count() {
        let use_cases = use_cases();
        // Mon 18th to Sun 31st, Christmas on Monday 25th
        let count = use_cases
            .workable_days_count(date(2023, 12, 18), date(2023, 12, 31))
            .await
            .unwrap();
        assert_eq!(count, 9);

        let weekend = use_cases
            .workable_days_count(date(2023, 12, 23), date(2023, 12, 24))
            .await
            .unwrap();
        assert_eq!(weekend, 0);
    }

    #[tokio::test]
    async fn test_reversed_range() {
        let err = use_cases()
            .workable_days(date(2023, 12, 31), date(2023, 12, 1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_DATE_RANGE");
    }
}
