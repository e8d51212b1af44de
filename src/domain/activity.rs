use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::calendar::Calendar;
use super::project::{ProjectRole, RequireEvidence};
use super::time::{DateInterval, TimeInterval, TimeUnit, WORKABLE_DAY_MINUTES};
use crate::error::{ActivityError, Result};

pub const MAX_DESCRIPTION_LENGTH: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalState {
    Na,
    Pending,
    Accepted,
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApprovalState::Na => "NA",
            ApprovalState::Pending => "PENDING",
            ApprovalState::Accepted => "ACCEPTED",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ApprovalState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NA" => Ok(ApprovalState::Na),
            "PENDING" => Ok(ApprovalState::Pending),
            "ACCEPTED" => Ok(ApprovalState::Accepted),
            other => Err(format!("Unknown approval state: {}", other)),
        }
    }
}

/// Evidence file attached to an activity, kept base64-encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub mime_type: String,
    pub base64_data: String,
}

impl Evidence {
    /// Parses `data:<mime>;base64,<data>`
    pub fn from_data_url(value: &str) -> std::result::Result<Self, ActivityError> {
        let (mime_type, base64_data) = value
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .ok_or(ActivityError::InvalidEvidenceFormat)?;

        if mime_type.is_empty() || base64_data.is_empty() {
            return Err(ActivityError::InvalidEvidenceFormat);
        }

        Ok(Evidence {
            mime_type: mime_type.to_string(),
            base64_data: base64_data.to_string(),
        })
    }

    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Evidence {
            mime_type: mime_type.to_string(),
            base64_data: STANDARD.encode(bytes),
        }
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data)
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(&self.base64_data)?)
    }
}

/// Duration in minutes of `interval` for a role measured in `time_unit`
pub fn duration_of(interval: &TimeInterval, time_unit: TimeUnit, calendar: &Calendar) -> i64 {
    let dates = interval.date_interval();
    match time_unit {
        TimeUnit::Minutes => interval.minutes(),
        TimeUnit::Days => calendar.workable_days_in(&dates).len() as i64 * WORKABLE_DAY_MINUTES,
        TimeUnit::NaturalDays => calendar.days_in(&dates).len() as i64 * WORKABLE_DAY_MINUTES,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Option<i64>,
    pub interval: TimeInterval,
    /// Minutes, as computed when the activity was registered
    pub duration: i64,
    pub description: String,
    pub project_role: ProjectRole,
    pub user_id: i64,
    pub billable: bool,
    pub department_id: Option<i64>,
    pub insert_date: Option<NaiveDateTime>,
    pub has_evidences: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub evidence: Option<Evidence>,
    pub approval_state: ApprovalState,
    pub approved_by_user_id: Option<i64>,
    pub approval_date: Option<NaiveDateTime>,
}

impl Activity {
    pub fn start(&self) -> NaiveDateTime {
        self.interval.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.interval.end
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.project_role.time_unit()
    }

    pub fn date_interval(&self) -> DateInterval {
        self.interval.date_interval()
    }

    pub fn year_of_start(&self) -> i32 {
        self.interval.year_of_start()
    }

    pub fn year_of_end(&self) -> i32 {
        self.interval.year_of_end()
    }

    pub fn is_more_than_one_day(&self) -> bool {
        !self.interval.is_one_day()
    }

    pub fn is_in_time_interval(&self, interval: &TimeInterval) -> bool {
        self.interval.intersects(interval)
    }

    pub fn is_approved(&self) -> bool {
        self.approval_state == ApprovalState::Accepted
    }

    pub fn requires_evidence(&self) -> RequireEvidence {
        self.project_role.require_evidence
    }

    /// Duration in minutes counted against `calendar`; day-based activities
    /// only count the days that fall inside it.
    pub fn duration_in(&self, calendar: &Calendar) -> i64 {
        duration_of(&self.interval, self.time_unit(), calendar)
    }

    /// Stored minutes for minute-based roles, `number_of_days` full days otherwise
    pub fn duration_counting_days(&self, number_of_days: i64) -> i64 {
        if self.time_unit().is_days() {
            number_of_days * WORKABLE_DAY_MINUTES
        } else {
            self.duration
        }
    }

    /// Dates of `calendar` this activity shows up on
    pub fn dates_in(&self, calendar: &Calendar) -> Vec<NaiveDate> {
        let dates = self.date_interval();
        match self.time_unit() {
            TimeUnit::Minutes => calendar
                .days_in(&DateInterval::of(dates.start, dates.start)),
            TimeUnit::Days => calendar.workable_days_in(&dates),
            TimeUnit::NaturalDays => calendar.days_in(&dates),
        }
    }
}

/// Optional criteria for listing activities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub approval_state: Option<ApprovalState>,
    pub organization_id: Option<i64>,
    pub project_id: Option<i64>,
    pub role_id: Option<i64>,
    pub user_id: Option<i64>,
}

impl ActivityFilter {
    pub fn matches(&self, activity: &Activity) -> bool {
        let role = &activity.project_role;
        self.start_date
            .map_or(true, |start| activity.end().date() >= start)
            && self
                .end_date
                .map_or(true, |end| activity.start().date() <= end)
            && self
                .approval_state
                .map_or(true, |state| activity.approval_state == state)
            && self
                .organization_id
                .map_or(true, |id| role.project.organization.id == id)
            && self.project_id.map_or(true, |id| role.project.id == id)
            && self.role_id.map_or(true, |id| role.id == id)
            && self.user_id.map_or(true, |id| activity.user_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_fixtures::{
        activity_at, activity_between, date, datetime, project_role_with,
    };

    #[test]
    fn test_evidence_from_data_url() {
        let evidence = Evidence::from_data_url("data:image/png;base64,SGVsbG8=").unwrap();
        assert_eq!(evidence.mime_type, "image/png");
        assert_eq!(evidence.base64_data, "SGVsbG8=");
        assert_eq!(evidence.decode().unwrap(), b"Hello".to_vec());
        assert_eq!(evidence.to_data_url(), "data:image/png;base64,SGVsbG8=");
    }

    #[test]
    fn test_evidence_rejects_malformed_data_url() {
        for value in [
            "image/png;base64,SGVsbG8=",
            "data:image/png,SGVsbG8=",
            "data:;base64,SGVsbG8=",
            "data:image/png;base64,",
        ] {
            assert_eq!(
                Evidence::from_data_url(value),
                Err(ActivityError::InvalidEvidenceFormat),
                "{} should be rejected",
                value
            );
        }
    }

    #[test]
    fn test_duration_in_days_counts_workable_days() {
        let role = project_role_with(TimeUnit::Days, 0, 0);
        let calendar = Calendar::new(DateInterval::of_year(2023), vec![]);
        let mut activity = activity_between(&role, date(2023, 3, 1), date(2023, 3, 3));
        activity.interval = TimeInterval::of(datetime(2023, 3, 1, 13, 5), datetime(2023, 3, 3, 14, 5)).unwrap();

        assert_eq!(activity.duration_in(&calendar), 1440);

        let with_holiday = Calendar::new(DateInterval::of_year(2023), vec![date(2023, 3, 2)]);
        assert_eq!(activity.duration_in(&with_holiday), 960);
    }

    #[test]
    fn test_duration_in_natural_days_counts_weekends() {
        let role = project_role_with(TimeUnit::NaturalDays, 0, 0);
        let calendar = Calendar::new(DateInterval::of_year(2023), vec![]);
        // Friday to Monday
        let activity = activity_between(&role, date(2023, 3, 3), date(2023, 3, 6));
        assert_eq!(activity.duration_in(&calendar), 4 * WORKABLE_DAY_MINUTES);
    }

    #[test]
    fn test_duration_counting_days() {
        let minutes_role = project_role_with(TimeUnit::Minutes, 0, 0);
        let days_role = project_role_with(TimeUnit::Days, 0, 0);

        let in_minutes = activity_at(&minutes_role, datetime(2023, 3, 1, 9, 0), 60);
        let in_days = activity_between(&days_role, date(2023, 3, 1), date(2023, 3, 3));

        assert_eq!(in_minutes.duration_counting_days(1), 60);
        assert_eq!(in_days.duration_counting_days(1), 480);
        assert_eq!(in_days.duration_counting_days(2), 960);
    }

    #[test]
    fn test_dates_in() {
        let calendar = Calendar::new(DateInterval::of(date(2023, 3, 1), date(2023, 3, 31)), vec![]);
        let days_role = project_role_with(TimeUnit::Days, 0, 0);
        let natural_role = project_role_with(TimeUnit::NaturalDays, 0, 0);
        let minutes_role = project_role_with(TimeUnit::Minutes, 0, 0);

        let days = activity_between(&days_role, date(2023, 3, 3), date(2023, 3, 6));
        let natural = activity_between(&natural_role, date(2023, 3, 3), date(2023, 3, 6));
        let minutes = activity_at(&minutes_role, datetime(2023, 3, 3, 23, 0), 120);

        assert_eq!(days.dates_in(&calendar), vec![date(2023, 3, 3), date(2023, 3, 6)]);
        assert_eq!(natural.dates_in(&calendar).len(), 4);
        assert_eq!(minutes.dates_in(&calendar), vec![date(2023, 3, 3)]);
    }

    #[test]
    fn test_filter_matches() {
        let role = project_role_with(TimeUnit::Minutes, 0, 0);
        let activity = activity_at(&role, datetime(2023, 3, 1, 9, 0), 60);

        assert!(ActivityFilter::default().matches(&activity));

        let filter = ActivityFilter {
            start_date: Some(date(2023, 3, 1)),
            end_date: Some(date(2023, 3, 1)),
            role_id: Some(role.id),
            user_id: Some(activity.user_id),
            ..Default::default()
        };
        assert!(filter.matches(&activity));

        let other_state = ActivityFilter {
            approval_state: Some(ApprovalState::Pending),
            ..Default::default()
        };
        assert!(!other_state.matches(&activity));

        let later = ActivityFilter {
            start_date: Some(date(2023, 3, 2)),
            ..Default::default()
        };
        assert!(!later.matches(&activity));
    }

    #[test]
    fn test_approval_state_parsing() {
        assert_eq!("pending".parse::<ApprovalState>().unwrap(), ApprovalState::Pending);
        assert_eq!(ApprovalState::Na.to_string(), "NA");
        assert!("done".parse::<ApprovalState>().is_err());
    }
}
