//! Business rules an activity must satisfy before it is created, updated,
//! deleted or approved.
//!
//! Rules are checked in a fixed order and the first one that fails is
//! reported, so callers always get the same error for the same input.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::debug;

use crate::domain::time::{TimeInterval, MINUTES_IN_HOUR};
use crate::domain::{Activity, ApprovalState, Project, TimeUnit, User};
use crate::error::{ActivityError, BinnacleError, Result};
use crate::repository::ProjectRepository;
use crate::services::{ActivityCalendarService, ActivityService};

const INCOHERENT_EVIDENCE: &str = "Activity sets has_evidences but the evidence does not match";

pub struct ActivityValidator {
    activity_service: Arc<ActivityService>,
    calendar_service: Arc<ActivityCalendarService>,
    projects: Arc<dyn ProjectRepository>,
}

impl ActivityValidator {
    pub fn new(
        activity_service: Arc<ActivityService>,
        calendar_service: Arc<ActivityCalendarService>,
        projects: Arc<dyn ProjectRepository>,
    ) -> Self {
        ActivityValidator {
            activity_service,
            calendar_service,
            projects,
        }
    }

    pub async fn check_activity_is_valid_for_creation(
        &self,
        activity: &Activity,
        user: &User,
    ) -> Result<()> {
        if let Some(id) = activity.id {
            return Err(BinnacleError::IllegalArgument(format!(
                "Cannot create a new activity with id {}",
                id
            )));
        }
        check_interval(activity)?;
        check_evidence_coherence(activity)?;

        let project = self.find_project(activity.project_role.project.id).await?;
        if !project.open {
            return Err(ActivityError::ProjectClosed.into());
        }
        if !is_open_period(activity.start()) {
            return Err(ActivityError::ActivityPeriodClosed.into());
        }
        check_not_blocked(&project, activity.start().date())?;

        self.check_common_rules(activity, None, &project, user).await?;
        debug!(user_id = user.id, project_role_id = activity.project_role.id, "Activity valid for creation");
        Ok(())
    }

    pub async fn check_activity_is_valid_for_update(
        &self,
        activity: &Activity,
        current: &Activity,
        user: &User,
    ) -> Result<()> {
        let id = activity.id.ok_or_else(|| {
            BinnacleError::IllegalArgument("Cannot update an activity without id".to_string())
        })?;
        if current.id != Some(id) {
            return Err(BinnacleError::IllegalArgument(format!(
                "Stored activity does not match activity {}",
                id
            )));
        }
        if current.is_approved() {
            return Err(BinnacleError::IllegalArgument(
                "Cannot update an activity already approved".to_string(),
            ));
        }
        if current.user_id != user.id {
            return Err(BinnacleError::UserPermission);
        }
        check_interval(activity)?;
        check_evidence_coherence(activity)?;

        let project = self.find_project(activity.project_role.project.id).await?;
        let current_project = self.find_project(current.project_role.project.id).await?;
        check_not_blocked(&project, activity.start().date())?;
        check_not_blocked(&current_project, current.start().date())?;
        if !project.open {
            return Err(ActivityError::ProjectClosed.into());
        }
        if !is_open_period(activity.start()) {
            return Err(ActivityError::ActivityPeriodClosed.into());
        }

        self.check_common_rules(activity, Some(current), &project, user)
            .await?;
        debug!(activity_id = id, user_id = user.id, "Activity valid for update");
        Ok(())
    }

    pub async fn check_activity_is_valid_for_deletion(
        &self,
        activity: &Activity,
        user: &User,
    ) -> Result<()> {
        if activity.is_approved() {
            return Err(BinnacleError::IllegalArgument(
                "Cannot delete an activity already approved".to_string(),
            ));
        }
        if activity.user_id != user.id {
            return Err(BinnacleError::UserPermission);
        }

        let project = self.find_project(activity.project_role.project.id).await?;
        check_not_blocked(&project, activity.start().date())?;
        if !is_open_period(activity.start()) {
            return Err(ActivityError::ActivityPeriodClosed.into());
        }
        Ok(())
    }

    pub fn check_activity_is_valid_for_approval(&self, activity: &Activity) -> Result<()> {
        if matches!(
            activity.approval_state,
            ApprovalState::Accepted | ApprovalState::Na
        ) {
            return Err(ActivityError::InvalidActivityApprovalState.into());
        }
        if !activity.has_evidences {
            let id = activity.id.map_or_else(|| "-".to_string(), |id| id.to_string());
            return Err(ActivityError::NoEvidenceInActivity(format!(
                "Activity (id: {}) has no evidence",
                id
            ))
            .into());
        }
        Ok(())
    }

    /// Rules shared by creation and update, after the project checks
    async fn check_common_rules(
        &self,
        activity: &Activity,
        current: Option<&Activity>,
        project: &Project,
        user: &User,
    ) -> Result<()> {
        if self.is_overlapping_another_activity_time(activity, user.id).await? {
            return Err(ActivityError::OverlapsAnotherTime.into());
        }
        if user.is_before_hiring_date(activity.start().date()) {
            return Err(ActivityError::ActivityBeforeHiringDate.into());
        }
        if activity.start().date() < project.start_date {
            return Err(ActivityError::ActivityBeforeProjectCreationDate.into());
        }
        if activity.time_unit() == TimeUnit::Minutes && activity.is_more_than_one_day() {
            return Err(ActivityError::ActivityPeriodNotValid.into());
        }
        self.check_max_time_per_activity(activity).await?;
        self.check_max_hours_for_role(current, activity, user.id)
            .await
    }

    async fn find_project(&self, id: i64) -> Result<Project> {
        self.projects
            .find_by_id(id)
            .await?
            .ok_or_else(|| ActivityError::ProjectNotFound(id).into())
    }

    /// Zero-length activities never overlap
    async fn is_overlapping_another_activity_time(
        &self,
        activity: &Activity,
        user_id: i64,
    ) -> Result<bool> {
        if activity.duration == 0 {
            return Ok(false);
        }
        let overlapped = self
            .activity_service
            .find_overlapped_activities(activity.start(), activity.end(), user_id)
            .await?;
        Ok(overlapped.iter().any(|other| other.id != activity.id))
    }

    async fn check_max_time_per_activity(&self, activity: &Activity) -> Result<()> {
        let role = &activity.project_role;
        let max_by_activity = role.max_time_allowed_by_activity();
        if max_by_activity <= 0 {
            return Ok(());
        }

        let calendar = self
            .calendar_service
            .create_calendar(activity.date_interval())
            .await?;
        if activity.duration_in(&calendar) > max_by_activity {
            return Err(ActivityError::MaxTimePerActivityRole {
                max_allowed: role.max_allowed_by_activity_in_units(),
                time_unit: role.time_unit(),
            }
            .into());
        }
        Ok(())
    }

    /// Yearly cap of the role for the start year and, when different, the end year.
    /// On update the stored activity is discounted when it belongs to the same role.
    async fn check_max_hours_for_role(
        &self,
        current: Option<&Activity>,
        activity: &Activity,
        user_id: i64,
    ) -> Result<()> {
        let role = &activity.project_role;
        if !role.has_yearly_cap() {
            return Ok(());
        }

        let mut years = vec![activity.year_of_start()];
        if activity.year_of_end() != activity.year_of_start() {
            years.push(activity.year_of_end());
        }

        for year in years {
            let year_interval = TimeInterval::of_year(year);
            let calendar = self
                .calendar_service
                .create_calendar(year_interval.date_interval())
                .await?;

            let registered = self
                .calendar_service
                .sum_activities_duration(&year_interval, role.id, user_id)
                .await?;
            let replaced = current
                .filter(|current| {
                    current.project_role.id == role.id && current.is_in_time_interval(&year_interval)
                })
                .map_or(0, |current| current.duration_in(&calendar));

            let registered = registered - replaced;
            let total_after = registered + activity.duration_in(&calendar);
            debug!(year, registered, total_after, max = role.max_time_allowed_by_year(), "Checked yearly cap");

            if total_after > role.max_time_allowed_by_year() {
                return Err(ActivityError::MaxHoursPerRole {
                    max_allowed_hours: to_hours(role.max_time_allowed_by_year()),
                    remaining_hours: to_hours(role.max_time_allowed_by_year() - registered),
                    year,
                }
                .into());
            }
        }
        Ok(())
    }
}

fn to_hours(minutes: i64) -> f64 {
    minutes as f64 / MINUTES_IN_HOUR as f64
}

fn check_interval(activity: &Activity) -> Result<()> {
    TimeInterval::of(activity.start(), activity.end())?;
    Ok(())
}

/// `has_evidences` must agree with the attached evidence
fn check_evidence_coherence(activity: &Activity) -> Result<()> {
    if activity.has_evidences != activity.evidence.is_some() {
        return Err(ActivityError::NoEvidenceInActivity(INCOHERENT_EVIDENCE.to_string()).into());
    }
    Ok(())
}

/// Activities of the current and the previous year can still change
fn is_open_period(start: NaiveDateTime) -> bool {
    start.year() >= Local::now().year() - 1
}

fn check_not_blocked(project: &Project, date: NaiveDate) -> Result<()> {
    match project.block_date {
        Some(block_date) if project.is_blocked_for(date) => {
            Err(ActivityError::ProjectBlocked { block_date }.into())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_fixtures::{activity_at, activity_between, project_role_with, user};
    use crate::domain::{Evidence, ProjectRole};
    use crate::repository::ActivityRepository;
    use crate::store::JsonStore;
    use crate::testing::{activity_service, calendar_service, data_with_roles};

    struct Fixture {
        store: Arc<JsonStore>,
        validator: ActivityValidator,
    }

    impl Fixture {
        fn new(roles: &[ProjectRole]) -> Self {
            let store = Arc::new(JsonStore::with_data(data_with_roles(roles)));
            let validator = ActivityValidator::new(
                activity_service(&store),
                calendar_service(&store),
                store.clone(),
            );
            Fixture { store, validator }
        }

        async fn save(&self, activity: Activity) -> Activity {
            ActivityRepository::save(self.store.as_ref(), activity)
                .await
                .unwrap()
        }

        async fn creation_code(&self, activity: &Activity) -> Option<&'static str> {
            self.validator
                .check_activity_is_valid_for_creation(activity, &user())
                .await
                .err()
                .map(|err| err.code())
        }
    }

    fn this_year() -> i32 {
        Local::now().year()
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(this_year(), month, day).unwrap()
    }

    fn at(month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        date(month, day).and_hms_opt(hour, minute, 0).unwrap()
    }

    fn minutes_role() -> ProjectRole {
        project_role_with(TimeUnit::Minutes, 0, 0)
    }

    #[tokio::test]
    async fn test_valid_creation() {
        let fixture = Fixture::new(&[minutes_role()]);
        let activity = activity_at(&minutes_role(), at(3, 1, 9, 0), 60);
        assert_eq!(fixture.creation_code(&activity).await, None);
    }

    #[tokio::test]
    async fn test_creation_with_id_is_illegal() {
        let fixture = Fixture::new(&[minutes_role()]);
        let mut activity = activity_at(&minutes_role(), at(3, 1, 9, 0), 60);
        activity.id = Some(1);
        assert_eq!(fixture.creation_code(&activity).await, Some("ILLEGAL_ARGUMENT"));
    }

    #[tokio::test]
    async fn test_reversed_interval() {
        let fixture = Fixture::new(&[minutes_role()]);
        let mut activity = activity_at(&minutes_role(), at(3, 1, 9, 0), 60);
        activity.interval.end = at(3, 1, 8, 0);
        assert_eq!(fixture.creation_code(&activity).await, Some("INVALID_DATE_RANGE"));
    }

    #[tokio::test]
    async fn test_incoherent_evidence() {
        let fixture = Fixture::new(&[minutes_role()]);

        let mut flagged = activity_at(&minutes_role(), at(3, 1, 9, 0), 60);
        flagged.has_evidences = true;
        assert_eq!(fixture.creation_code(&flagged).await, Some("NO_EVIDENCE"));

        let mut attached = activity_at(&minutes_role(), at(3, 1, 9, 0), 60);
        attached.evidence = Some(Evidence::from_data_url("data:image/png;base64,SGVsbG8=").unwrap());
        assert_eq!(fixture.creation_code(&attached).await, Some("NO_EVIDENCE"));
    }

    #[tokio::test]
    async fn test_closed_project() {
        let mut role = minutes_role();
        role.project.open = false;
        let fixture = Fixture::new(&[role.clone()]);

        let activity = activity_at(&role, at(3, 1, 9, 0), 60);
        assert_eq!(fixture.creation_code(&activity).await, Some("CLOSED_PROJECT"));
    }

    #[tokio::test]
    async fn test_closed_period() {
        let fixture = Fixture::new(&[minutes_role()]);
        let two_years_ago = NaiveDate::from_ymd_opt(this_year() - 2, 12, 31)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let activity = activity_at(&minutes_role(), two_years_ago, 60);
        assert_eq!(fixture.creation_code(&activity).await, Some("ACTIVITY_PERIOD_CLOSED"));

        let last_year = NaiveDate::from_ymd_opt(this_year() - 1, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let activity = activity_at(&minutes_role(), last_year, 60);
        assert_eq!(fixture.creation_code(&activity).await, None);
    }

    #[tokio::test]
    async fn test_blocked_project() {
        let mut role = minutes_role();
        role.project.block_date = Some(date(3, 31));
        let fixture = Fixture::new(&[role.clone()]);

        let blocked = activity_at(&role, at(3, 31, 9, 0), 60);
        let err = fixture
            .validator
            .check_activity_is_valid_for_creation(&blocked, &user())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BinnacleError::Activity(ActivityError::ProjectBlocked { block_date }) if block_date == date(3, 31)
        ));

        let after = activity_at(&role, at(4, 1, 9, 0), 60);
        assert_eq!(fixture.creation_code(&after).await, None);
    }

    #[test]
    fn test_check_not_blocked_up_to_block_date() {
        let mut blocked = crate::domain::test_fixtures::project();
        assert!(check_not_blocked(&blocked, date(3, 31)).is_ok());

        blocked.block_date = Some(date(3, 31));
        assert!(check_not_blocked(&blocked, date(3, 1)).is_err());
        assert!(check_not_blocked(&blocked, date(3, 31)).is_err());
        assert!(check_not_blocked(&blocked, date(4, 1)).is_ok());
    }

    #[tokio::test]
    async fn test_overlapping_activities() {
        let fixture = Fixture::new(&[minutes_role()]);
        fixture.save(activity_at(&minutes_role(), at(3, 1, 9, 0), 60)).await;

        let overlapping = activity_at(&minutes_role(), at(3, 1, 9, 30), 60);
        assert_eq!(fixture.creation_code(&overlapping).await, Some("ACTIVITY_TIME_OVERLAPS"));

        let touching = activity_at(&minutes_role(), at(3, 1, 10, 0), 60);
        assert_eq!(fixture.creation_code(&touching).await, None);

        let zero_duration = activity_at(&minutes_role(), at(3, 1, 9, 30), 0);
        assert_eq!(fixture.creation_code(&zero_duration).await, None);
    }

    #[tokio::test]
    async fn test_before_hiring_date() {
        let fixture = Fixture::new(&[minutes_role()]);
        let mut hired_later = user();
        hired_later.hiring_date = date(6, 1);

        let activity = activity_at(&minutes_role(), at(3, 1, 9, 0), 60);
        let err = fixture
            .validator
            .check_activity_is_valid_for_creation(&activity, &hired_later)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ACTIVITY_BEFORE_HIRING_DATE");
    }

    #[tokio::test]
    async fn test_before_project_start() {
        let mut role = minutes_role();
        role.project.start_date = date(6, 1);
        let fixture = Fixture::new(&[role.clone()]);

        let activity = activity_at(&role, at(3, 1, 9, 0), 60);
        assert_eq!(
            fixture.creation_code(&activity).await,
            Some("ACTIVITY_BEFORE_PROJECT_CREATION_DATE")
        );
    }

    #[tokio::test]
    async fn test_minutes_activity_spanning_days() {
        let fixture = Fixture::new(&[minutes_role()]);
        let activity = activity_at(&minutes_role(), at(3, 1, 23, 0), 120);
        assert_eq!(fixture.creation_code(&activity).await, Some("INVALID_ACTIVITY_PERIOD"));
    }

    #[tokio::test]
    async fn test_max_time_per_activity() {
        let role = project_role_with(TimeUnit::Minutes, 0, 60);
        let fixture = Fixture::new(&[role.clone()]);

        let too_long = activity_at(&role, at(3, 1, 9, 0), 90);
        let err = fixture
            .validator
            .check_activity_is_valid_for_creation(&too_long, &user())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BinnacleError::Activity(ActivityError::MaxTimePerActivityRole {
                max_allowed: 60,
                time_unit: TimeUnit::Minutes
            })
        ));

        let exact = activity_at(&role, at(3, 1, 9, 0), 60);
        assert_eq!(fixture.creation_code(&exact).await, None);
    }

    #[tokio::test]
    async fn test_max_hours_per_role() {
        let role = project_role_with(TimeUnit::Minutes, 120, 0);
        let fixture = Fixture::new(&[role.clone()]);
        fixture.save(activity_at(&role, at(3, 1, 9, 0), 90)).await;

        let exceeding = activity_at(&role, at(3, 2, 9, 0), 60);
        let err = fixture
            .validator
            .check_activity_is_valid_for_creation(&exceeding, &user())
            .await
            .unwrap_err();
        match err {
            BinnacleError::Activity(ActivityError::MaxHoursPerRole {
                max_allowed_hours,
                remaining_hours,
                year,
            }) => {
                assert_eq!(max_allowed_hours, 2.0);
                assert_eq!(remaining_hours, 0.5);
                assert_eq!(year, this_year());
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let fitting = activity_at(&role, at(3, 2, 9, 0), 30);
        assert_eq!(fixture.creation_code(&fitting).await, None);
    }

    #[tokio::test]
    async fn test_max_hours_checks_end_year() {
        let role = project_role_with(TimeUnit::NaturalDays, 2 * 480, 0);
        let fixture = Fixture::new(&[role.clone()]);
        fixture
            .save(activity_between(&role, date(1, 10), date(1, 10)))
            .await;

        let last_year_end = NaiveDate::from_ymd_opt(this_year() - 1, 12, 30).unwrap();
        let crossing = activity_between(&role, last_year_end, date(1, 2));
        let err = fixture
            .validator
            .check_activity_is_valid_for_creation(&crossing, &user())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BinnacleError::Activity(ActivityError::MaxHoursPerRole { year, .. }) if year == this_year()
        ));
    }

    #[tokio::test]
    async fn test_update_rules() {
        let fixture = Fixture::new(&[minutes_role()]);
        let current = fixture
            .save(activity_at(&minutes_role(), at(3, 1, 9, 0), 60))
            .await;

        let moved = Activity {
            interval: TimeInterval::of(at(3, 1, 9, 30), at(3, 1, 10, 30)).unwrap(),
            ..current.clone()
        };
        fixture
            .validator
            .check_activity_is_valid_for_update(&moved, &current, &user())
            .await
            .unwrap();

        let mut approved = current.clone();
        approved.approval_state = ApprovalState::Accepted;
        let err = fixture
            .validator
            .check_activity_is_valid_for_update(&moved, &approved, &user())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ILLEGAL_ARGUMENT");

        let mut someone_else = user();
        someone_else.id = 2;
        let err = fixture
            .validator
            .check_activity_is_valid_for_update(&moved, &current, &someone_else)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "USER_PERMISSION");

        let without_id = Activity { id: None, ..moved };
        let err = fixture
            .validator
            .check_activity_is_valid_for_update(&without_id, &current, &user())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ILLEGAL_ARGUMENT");
    }

    #[tokio::test]
    async fn test_update_discounts_current_duration() {
        let role = project_role_with(TimeUnit::Minutes, 120, 0);
        let fixture = Fixture::new(&[role.clone()]);
        let current = fixture.save(activity_at(&role, at(3, 1, 9, 0), 90)).await;

        let longer = Activity {
            interval: TimeInterval::of(at(3, 1, 9, 0), at(3, 1, 11, 0)).unwrap(),
            duration: 120,
            ..current.clone()
        };
        fixture
            .validator
            .check_activity_is_valid_for_update(&longer, &current, &user())
            .await
            .unwrap();

        let too_long = Activity {
            interval: TimeInterval::of(at(3, 1, 9, 0), at(3, 1, 11, 1)).unwrap(),
            duration: 121,
            ..current.clone()
        };
        let err = fixture
            .validator
            .check_activity_is_valid_for_update(&too_long, &current, &user())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MAX_REGISTRABLE_HOURS_LIMIT_EXCEEDED");
    }

    #[tokio::test]
    async fn test_update_of_blocked_activity() {
        let mut role = minutes_role();
        role.project.block_date = Some(date(3, 31));
        let fixture = Fixture::new(&[role.clone()]);
        let current = fixture.save(activity_at(&role, at(3, 1, 9, 0), 60)).await;

        let moved_out = Activity {
            interval: TimeInterval::of(at(4, 3, 9, 0), at(4, 3, 10, 0)).unwrap(),
            ..current.clone()
        };
        let err = fixture
            .validator
            .check_activity_is_valid_for_update(&moved_out, &current, &user())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BLOCKED_PROJECT");
    }

    #[tokio::test]
    async fn test_deletion_rules() {
        let mut role = minutes_role();
        role.project.block_date = Some(date(3, 31));
        let fixture = Fixture::new(&[role.clone()]);

        let open = fixture.save(activity_at(&role, at(4, 3, 9, 0), 60)).await;
        fixture
            .validator
            .check_activity_is_valid_for_deletion(&open, &user())
            .await
            .unwrap();

        let blocked = fixture.save(activity_at(&role, at(3, 1, 9, 0), 60)).await;
        let err = fixture
            .validator
            .check_activity_is_valid_for_deletion(&blocked, &user())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BLOCKED_PROJECT");

        let mut approved = open.clone();
        approved.approval_state = ApprovalState::Accepted;
        let err = fixture
            .validator
            .check_activity_is_valid_for_deletion(&approved, &user())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ILLEGAL_ARGUMENT");

        let mut someone_else = user();
        someone_else.id = 2;
        let err = fixture
            .validator
            .check_activity_is_valid_for_deletion(&open, &someone_else)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "USER_PERMISSION");
    }

    #[tokio::test]
    async fn test_approval_rules() {
        let fixture = Fixture::new(&[minutes_role()]);
        let mut activity = activity_at(&minutes_role(), at(3, 1, 9, 0), 60);
        activity.id = Some(7);

        activity.approval_state = ApprovalState::Na;
        let err = fixture.validator.check_activity_is_valid_for_approval(&activity).unwrap_err();
        assert_eq!(err.code(), "INVALID_ACTIVITY_APPROVAL_STATE");

        activity.approval_state = ApprovalState::Accepted;
        let err = fixture.validator.check_activity_is_valid_for_approval(&activity).unwrap_err();
        assert_eq!(err.code(), "INVALID_ACTIVITY_APPROVAL_STATE");

        activity.approval_state = ApprovalState::Pending;
        let err = fixture.validator.check_activity_is_valid_for_approval(&activity).unwrap_err();
        assert_eq!(err.code(), "NO_EVIDENCE");
        assert!(err.to_string().contains("id: 7"));

        activity.has_evidences = true;
        fixture.validator.check_activity_is_valid_for_approval(&activity).unwrap();
    }
}
