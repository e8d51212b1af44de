use chrono::{Datelike, Local, Months};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::domain::time::{end_of_day, start_of_day};
use crate::domain::{Activity, Principal, ProjectRole, ProjectRoleUser, TimeInterval};
use crate::error::{ActivityError, Result};
use crate::repository::ProjectRoleRepository;
use crate::services::{ActivityCalendarService, ActivityService};

pub struct ProjectRoleUseCases {
    activity_service: Arc<ActivityService>,
    calendar_service: Arc<ActivityCalendarService>,
    project_roles: Arc<dyn ProjectRoleRepository>,
}

impl ProjectRoleUseCases {
    pub fn new(
        activity_service: Arc<ActivityService>,
        calendar_service: Arc<ActivityCalendarService>,
        project_roles: Arc<dyn ProjectRoleRepository>,
    ) -> Self {
        ProjectRoleUseCases {
            activity_service,
            calendar_service,
            project_roles,
        }
    }

    /// Roles the principal worked on during the last month, most recently used
    /// first, with the allowance remaining in `year` (current year by default)
    pub async fn latest_project_roles(
        &self,
        year: Option<i32>,
        principal: &Principal,
    ) -> Result<Vec<ProjectRoleUser>> {
        let today = Local::now().date_naive();
        let month_ago = today.checked_sub_months(Months::new(1)).unwrap_or(today);
        let last_month = TimeInterval {
            start: start_of_day(month_ago),
            end: end_of_day(today),
        };
        let year_interval = TimeInterval::of_year(year.unwrap_or_else(|| today.year()));

        let year_activities = self
            .activity_service
            .get_activities_in(&year_interval, principal.user_id)
            .await?;
        let mut recent = self
            .activity_service
            .get_activities_in(&last_month, principal.user_id)
            .await?;
        recent.sort_by(|a, b| b.start().cmp(&a.start()));

        let mut seen = BTreeSet::new();
        let mut roles = Vec::new();
        for role in recent.into_iter().map(|activity| activity.project_role) {
            if seen.insert(role.id) {
                roles.push(role);
            }
        }
        debug!(user_id = principal.user_id, roles = roles.len(), "Found latest project roles");

        self.with_remaining(roles, &year_activities, &year_interval, principal.user_id)
            .await
    }

    pub async fn get_project_role_by_id(&self, id: i64) -> Result<ProjectRole> {
        self.project_roles
            .find_by_id(id)
            .await?
            .ok_or_else(|| ActivityError::ProjectRoleNotFound(id).into())
    }

    /// Every role of the project with the principal's remaining allowance in `year`
    pub async fn get_project_roles_by_project_id(
        &self,
        project_id: i64,
        year: Option<i32>,
        principal: &Principal,
    ) -> Result<Vec<ProjectRoleUser>> {
        let roles = self.project_roles.find_by_project_id(project_id).await?;
        let year_interval =
            TimeInterval::of_year(year.unwrap_or_else(|| Local::now().year()));
        let role_ids: Vec<i64> = roles.iter().map(|role| role.id).collect();
        let activities = self
            .activity_service
            .get_activities_by_project_role_ids(&year_interval, &role_ids, principal.user_id)
            .await?;

        self.with_remaining(roles, &activities, &year_interval, principal.user_id)
            .await
    }

    async fn with_remaining(
        &self,
        roles: Vec<ProjectRole>,
        activities: &[Activity],
        interval: &TimeInterval,
        user_id: i64,
    ) -> Result<Vec<ProjectRoleUser>> {
        let mut result = Vec::with_capacity(roles.len());
        for role in roles {
            let remaining = self
                .calendar_service
                .remaining_of_project_role_for_user(
                    &role,
                    activities,
                    interval.date_interval(),
                    user_id,
                )
                .await?;
            result.push(ProjectRoleUser::new(&role, remaining, user_id));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_fixtures::project_role_with;
    use crate::domain::TimeUnit;
    use crate::testing::{app_with, data_with_roles};
    use crate::usecases::ActivityRequest;
    use chrono::{Duration, NaiveDateTime};

    fn role(id: i64, name: &str, by_year: i64) -> ProjectRole {
        let mut role = project_role_with(TimeUnit::Minutes, by_year, 0);
        role.id = id;
        role.name = name.to_string();
        role
    }

    fn request(role_id: i64, start: NaiveDateTime, minutes: i64) -> ActivityRequest {
        ActivityRequest {
            id: None,
            start,
            end: start + Duration::minutes(minutes),
            description: "Work".to_string(),
            billable: false,
            project_role_id: role_id,
            has_evidences: false,
            evidence: None,
        }
    }

    #[tokio::test]
    async fn test_latest_project_roles_most_recent_first() {
        let (app, _, _) = app_with(data_with_roles(&[
            role(1, "Developer", 600),
            role(2, "Tester", 0),
        ]));
        let principal = Principal::user(1);
        let today = start_of_day(Local::now().date_naive());

        for (role_id, start) in [
            (1, today + Duration::hours(8)),
            (2, today + Duration::hours(10)),
            (1, today + Duration::hours(12)),
        ] {
            app.activities
                .create_activity(&request(role_id, start, 60), &principal)
                .await
                .unwrap();
        }

        let latest = app
            .project_roles
            .latest_project_roles(None, &principal)
            .await
            .unwrap();
        let names: Vec<&str> = latest.iter().map(|role| role.name.as_str()).collect();
        assert_eq!(names, vec!["Developer", "Tester"]);
        assert_eq!(latest[0].max_allowed, 600);
        assert_eq!(latest[0].remaining, 480);
        assert_eq!(latest[1].remaining, 0);
    }

    #[tokio::test]
    async fn test_latest_project_roles_without_activities() {
        let (app, _, _) = app_with(data_with_roles(&[role(1, "Developer", 0)]));
        let latest = app
            .project_roles
            .latest_project_roles(None, &Principal::user(1))
            .await
            .unwrap();
        assert!(latest.is_empty());
    }

    #[tokio::test]
    async fn test_project_role_lookups() {
        let (app, _, _) = app_with(data_with_roles(&[role(1, "Developer", 600), role(2, "Tester", 0)]));

        assert_eq!(app.project_roles.get_project_role_by_id(2).await.unwrap().name, "Tester");
        let err = app.project_roles.get_project_role_by_id(9).await.unwrap_err();
        assert_eq!(err.code(), "RESOURCE_NOT_FOUND");

        let roles = app
            .project_roles
            .get_project_roles_by_project_id(1, None, &Principal::user(1))
            .await
            .unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].remaining, 600);
    }
}
