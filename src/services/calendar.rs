use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::summary::minutes_to_hours;
use crate::domain::time::WORKABLE_DAY_MINUTES;
use crate::domain::{
    Activity, Calendar, DailyWorkingTime, DateInterval, MonthlyRoles, ProjectRole, TimeInterval,
    TimeUnit,
};
use crate::error::Result;
use crate::repository::{ActivityRepository, HolidayRepository};

/// Builds calendars with the holidays of their interval
#[derive(Clone)]
pub struct CalendarFactory {
    holidays: Arc<dyn HolidayRepository>,
}

impl CalendarFactory {
    pub fn new(holidays: Arc<dyn HolidayRepository>) -> Self {
        CalendarFactory { holidays }
    }

    pub async fn create(&self, interval: DateInterval) -> Result<Calendar> {
        let holidays = self.holidays.find_between(interval.start, interval.end).await?;
        Ok(Calendar::new(interval, holidays.into_iter().map(|h| h.date)))
    }
}

/// Measures activities against calendars of workable days
pub struct ActivityCalendarService {
    calendar_factory: CalendarFactory,
    activities: Arc<dyn ActivityRepository>,
}

impl ActivityCalendarService {
    pub fn new(calendar_factory: CalendarFactory, activities: Arc<dyn ActivityRepository>) -> Self {
        ActivityCalendarService {
            calendar_factory,
            activities,
        }
    }

    pub async fn create_calendar(&self, interval: DateInterval) -> Result<Calendar> {
        self.calendar_factory.create(interval).await
    }

    /// Every date of `interval` with the activities present on it
    pub async fn activity_calendar_map(
        &self,
        activities: &[Activity],
        interval: DateInterval,
    ) -> Result<BTreeMap<NaiveDate, Vec<Activity>>> {
        let calendar = self.create_calendar(interval).await?;
        Ok(activity_calendar_map_with(&calendar, activities))
    }

    /// Hours worked on each date of `interval`, zero for dates without activities
    pub async fn activity_duration_summary_in_hours(
        &self,
        activities: &[Activity],
        interval: DateInterval,
    ) -> Result<Vec<DailyWorkingTime>> {
        let calendar_map = self.activity_calendar_map(activities, interval).await?;

        Ok(calendar_map
            .into_iter()
            .map(|(date, activities)| DailyWorkingTime {
                date,
                worked_hours: minutes_to_hours(duration_counting_number_of_days(&activities, 1)),
            })
            .collect())
    }

    /// Minutes registered per month number of `interval`
    pub async fn activity_duration_by_month(
        &self,
        activities: &[Activity],
        interval: DateInterval,
    ) -> Result<BTreeMap<u32, i64>> {
        let calendar_map = self.activity_calendar_map(activities, interval).await?;

        let mut by_month: BTreeMap<u32, i64> = BTreeMap::new();
        for (date, activities) in calendar_map {
            *by_month.entry(date.month()).or_default() +=
                duration_counting_number_of_days(&activities, 1);
        }
        Ok(by_month)
    }

    /// Minutes registered per month number and role
    pub async fn activity_duration_by_monthly_roles(
        &self,
        activities: &[Activity],
        interval: DateInterval,
    ) -> Result<BTreeMap<u32, Vec<MonthlyRoles>>> {
        let calendar_map = self.activity_calendar_map(activities, interval).await?;

        let mut by_month: BTreeMap<u32, BTreeMap<i64, i64>> = BTreeMap::new();
        for (date, activities) in calendar_map {
            let month = by_month.entry(date.month()).or_default();
            for activity in &activities {
                *month.entry(activity.project_role.id).or_default() +=
                    activity.duration_counting_days(1);
            }
        }

        Ok(by_month
            .into_iter()
            .map(|(month, roles)| {
                let roles = roles
                    .into_iter()
                    .map(|(project_role_id, worked_minutes)| MonthlyRoles {
                        project_role_id,
                        worked_minutes,
                    })
                    .collect();
                (month, roles)
            })
            .collect())
    }

    /// Duration in minutes of `interval` for `time_unit`, using the holidays of the interval
    pub async fn duration_counting_working_days(
        &self,
        interval: &TimeInterval,
        time_unit: TimeUnit,
    ) -> Result<i64> {
        let calendar = self.create_calendar(interval.date_interval()).await?;
        Ok(duration_counting_working_days_with(
            interval,
            time_unit,
            &calendar.workable_days(),
        ))
    }

    /// Minutes registered by `user_id` for `project_role_id`, clipped to `interval`
    pub async fn sum_activities_duration(
        &self,
        interval: &TimeInterval,
        project_role_id: i64,
        user_id: i64,
    ) -> Result<i64> {
        let activities = self
            .activities
            .find_by_project_role_ids(interval, &[project_role_id], user_id)
            .await?;
        let calendar = self.create_calendar(interval.date_interval()).await?;

        let total: i64 = activities
            .iter()
            .map(|activity| activity.duration_in(&calendar))
            .sum();
        debug!(project_role_id, user_id, total, "Summed activities duration");
        Ok(total)
    }

    /// Remaining allowance of `role` for `user_id` given the activities of the period
    pub async fn remaining_of_project_role_for_user(
        &self,
        role: &ProjectRole,
        activities: &[Activity],
        interval: DateInterval,
        user_id: i64,
    ) -> Result<i64> {
        let calendar = self.create_calendar(interval).await?;
        let own: Vec<Activity> = activities
            .iter()
            .filter(|a| a.project_role.id == role.id && a.user_id == user_id)
            .cloned()
            .collect();
        Ok(role.remaining_in_units(&calendar, &own))
    }
}

/// Every date of the calendar mapped to the activities shown on it
pub fn activity_calendar_map_with(
    calendar: &Calendar,
    activities: &[Activity],
) -> BTreeMap<NaiveDate, Vec<Activity>> {
    let mut map: BTreeMap<NaiveDate, Vec<Activity>> = calendar
        .all_days()
        .into_iter()
        .map(|date| (date, Vec::new()))
        .collect();

    for activity in activities {
        for date in activity.dates_in(calendar) {
            if let Some(day) = map.get_mut(&date) {
                day.push(activity.clone());
            }
        }
    }
    map
}

/// Minutes-unit intervals count their minutes; day units count the workable
/// days of the interval found in `workable_days` (natural days count every day)
pub fn duration_counting_working_days_with(
    interval: &TimeInterval,
    time_unit: TimeUnit,
    workable_days: &[NaiveDate],
) -> i64 {
    let dates = interval.date_interval();
    match time_unit {
        TimeUnit::Minutes => interval.minutes(),
        TimeUnit::Days => {
            workable_days.iter().filter(|d| dates.includes(**d)).count() as i64
                * WORKABLE_DAY_MINUTES
        }
        TimeUnit::NaturalDays => dates.days().len() as i64 * WORKABLE_DAY_MINUTES,
    }
}

/// Total of `duration_counting_days(number_of_days)` over `activities`
pub fn duration_counting_number_of_days(activities: &[Activity], number_of_days: i64) -> i64 {
    activities
        .iter()
        .map(|activity| activity.duration_counting_days(number_of_days))
        .sum()
}

/// Like [`duration_counting_number_of_days`] for a bare interval
pub fn interval_duration_counting_number_of_days(
    interval: &TimeInterval,
    time_unit: TimeUnit,
    number_of_days: i64,
) -> i64 {
    if time_unit.is_days() {
        number_of_days * WORKABLE_DAY_MINUTES
    } else {
        interval.minutes()
    }
}
