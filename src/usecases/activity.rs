use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::activity::{duration_of, MAX_DESCRIPTION_LENGTH};
use crate::domain::time::{end_of_day, start_of_day};
use crate::domain::{
    Activity, ActivityFilter, ApprovalState, DailyWorkingTime, DateInterval, Evidence,
    MonthlySummary, Principal, TimeInterval, TimeUnit, User,
};
use crate::domain::summary::minutes_to_hours;
use crate::error::{ActivityError, BinnacleError, Result};
use crate::repository::{ProjectRoleRepository, UserRepository};
use crate::services::{ActivityCalendarService, ActivityService, MailService};
use crate::validators::ActivityValidator;

use super::find_user;

/// Activity as submitted by a user. `evidence` is a data URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRequest {
    pub id: Option<i64>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub description: String,
    pub billable: bool,
    pub project_role_id: i64,
    pub has_evidences: bool,
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub id: Option<i64>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration: i64,
    pub time_unit: TimeUnit,
    pub description: String,
    pub project_role_id: i64,
    pub project_role_name: String,
    pub project_id: i64,
    pub organization_id: i64,
    pub user_id: i64,
    pub billable: bool,
    pub has_evidences: bool,
    pub approval_state: ApprovalState,
    pub approved_by_user_id: Option<i64>,
    pub approval_date: Option<NaiveDateTime>,
}

impl From<&Activity> for ActivityResponse {
    fn from(activity: &Activity) -> Self {
        ActivityResponse {
            id: activity.id,
            start: activity.start(),
            end: activity.end(),
            duration: activity.duration,
            time_unit: activity.time_unit(),
            description: activity.description.clone(),
            project_role_id: activity.project_role.id,
            project_role_name: activity.project_role.name.clone(),
            project_id: activity.project_role.project.id,
            organization_id: activity.project_role.project.organization.id,
            user_id: activity.user_id,
            billable: activity.billable,
            has_evidences: activity.has_evidences,
            approval_state: activity.approval_state,
            approved_by_user_id: activity.approved_by_user_id,
            approval_date: activity.approval_date,
        }
    }
}

pub struct ActivityUseCases {
    activity_service: Arc<ActivityService>,
    calendar_service: Arc<ActivityCalendarService>,
    validator: ActivityValidator,
    users: Arc<dyn UserRepository>,
    project_roles: Arc<dyn ProjectRoleRepository>,
    mail_service: Arc<dyn MailService>,
}

impl ActivityUseCases {
    pub fn new(
        activity_service: Arc<ActivityService>,
        calendar_service: Arc<ActivityCalendarService>,
        validator: ActivityValidator,
        users: Arc<dyn UserRepository>,
        project_roles: Arc<dyn ProjectRoleRepository>,
        mail_service: Arc<dyn MailService>,
    ) -> Self {
        ActivityUseCases {
            activity_service,
            calendar_service,
            validator,
            users,
            project_roles,
            mail_service,
        }
    }

    pub async fn create_activity(
        &self,
        request: &ActivityRequest,
        principal: &Principal,
    ) -> Result<ActivityResponse> {
        let user = find_user(self.users.as_ref(), principal.user_id).await?;
        self.create_activity_for(request, &user).await
    }

    /// Registers an activity on behalf of `username`; only admins may do so
    pub async fn create_activity_for_username(
        &self,
        request: &ActivityRequest,
        username: &str,
        principal: &Principal,
    ) -> Result<ActivityResponse> {
        if !principal.is_admin() {
            return Err(BinnacleError::UserPermission);
        }
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| BinnacleError::IllegalArgument(format!("Unknown user {}", username)))?;
        self.create_activity_for(request, &user).await
    }

    async fn create_activity_for(
        &self,
        request: &ActivityRequest,
        user: &User,
    ) -> Result<ActivityResponse> {
        let activity = self.build_activity(request, user).await?;
        self.validator
            .check_activity_is_valid_for_creation(&activity, user)
            .await?;

        let created = self.activity_service.create_activity(activity).await?;
        self.notify_pending_approval(&created, user).await;
        Ok(ActivityResponse::from(&created))
    }

    pub async fn update_activity(
        &self,
        request: &ActivityRequest,
        principal: &Principal,
    ) -> Result<ActivityResponse> {
        let user = find_user(self.users.as_ref(), principal.user_id).await?;
        let id = request.id.ok_or_else(|| {
            BinnacleError::IllegalArgument("Cannot update an activity without id".to_string())
        })?;
        let current = self.activity_service.get_activity_by_id(id).await?;
        let activity = self.build_activity(request, &user).await?;

        self.validator
            .check_activity_is_valid_for_update(&activity, &current, &user)
            .await?;

        let updated = self
            .activity_service
            .update_activity(activity, &current)
            .await?;
        self.notify_pending_approval(&updated, &user).await;
        Ok(ActivityResponse::from(&updated))
    }

    pub async fn delete_activity(&self, id: i64, principal: &Principal) -> Result<()> {
        let user = find_user(self.users.as_ref(), principal.user_id).await?;
        let activity = self.activity_service.get_activity_by_id(id).await?;
        self.validator
            .check_activity_is_valid_for_deletion(&activity, &user)
            .await?;
        self.activity_service.delete_activity_by_id(id).await
    }

    pub async fn approve_activity(&self, id: i64, principal: &Principal) -> Result<ActivityResponse> {
        if !principal.can_approve_activities() {
            return Err(BinnacleError::UserPermission);
        }
        let activity = self.activity_service.get_activity_by_id(id).await?;
        self.validator.check_activity_is_valid_for_approval(&activity)?;

        let approved = self
            .activity_service
            .approve_activity(activity, principal.user_id)
            .await?;

        match self.users.find_by_id(approved.user_id).await? {
            Some(owner) => {
                if let Err(err) = self
                    .mail_service
                    .send_activity_approved_mail(&approved, &owner)
                    .await
                {
                    warn!(activity_id = id, error = %err, "Could not send approval mail");
                }
            }
            None => warn!(activity_id = id, user_id = approved.user_id, "Owner of approved activity not found"),
        }
        Ok(ActivityResponse::from(&approved))
    }

    /// Non-admins only ever see their own activities
    pub async fn get_activities(
        &self,
        filter: &ActivityFilter,
        principal: &Principal,
    ) -> Result<Vec<ActivityResponse>> {
        let mut filter = filter.clone();
        if !principal.is_admin() {
            filter.user_id = Some(principal.user_id);
        }
        let activities = self.activity_service.get_activities(&filter).await?;
        Ok(activities.iter().map(ActivityResponse::from).collect())
    }

    /// Activities of other users are reported as not found unless the principal is an admin
    pub async fn get_activity_by_id(&self, id: i64, principal: &Principal) -> Result<ActivityResponse> {
        let activity = self.readable_activity(id, principal).await?;
        Ok(ActivityResponse::from(&activity))
    }

    pub async fn get_activities_summary(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        principal: &Principal,
    ) -> Result<Vec<DailyWorkingTime>> {
        if start > end {
            return Err(BinnacleError::InvalidDateRange { start, end });
        }
        let interval = DateInterval::of(start, end);
        let activities = self
            .activity_service
            .get_activities_between_dates(interval, principal.user_id)
            .await?;
        self.calendar_service
            .activity_duration_summary_in_hours(&activities, interval)
            .await
    }

    /// Months of `year` with registered time, each with its per-role minutes
    pub async fn get_yearly_summary(&self, year: i32, principal: &Principal) -> Result<Vec<MonthlySummary>> {
        let interval = DateInterval::of_year(year);
        let activities = self
            .activity_service
            .get_activities_between_dates(interval, principal.user_id)
            .await?;

        let by_month = self
            .calendar_service
            .activity_duration_by_month(&activities, interval)
            .await?;
        let mut roles = self
            .calendar_service
            .activity_duration_by_monthly_roles(&activities, interval)
            .await?;

        Ok(by_month
            .into_iter()
            .filter(|(_, minutes)| *minutes > 0)
            .map(|(month, minutes)| MonthlySummary {
                month,
                worked_hours: minutes_to_hours(minutes),
                roles: roles.remove(&month).unwrap_or_default(),
            })
            .collect())
    }

    pub async fn get_activity_evidence(&self, id: i64, principal: &Principal) -> Result<Evidence> {
        let activity = self.readable_activity(id, principal).await?;
        if !activity.has_evidences {
            return Err(ActivityError::NoEvidenceInActivity(format!(
                "Activity (id: {}) has no evidence",
                id
            ))
            .into());
        }
        self.activity_service.get_evidence(&activity).await
    }

    async fn readable_activity(&self, id: i64, principal: &Principal) -> Result<Activity> {
        let activity = self.activity_service.get_activity_by_id(id).await?;
        if !principal.can_read(activity.user_id) {
            return Err(ActivityError::ActivityNotFound(id).into());
        }
        Ok(activity)
    }

    /// Turns a request into a domain activity owned by `user`, measured
    /// against the calendar of its dates
    async fn build_activity(&self, request: &ActivityRequest, user: &User) -> Result<Activity> {
        if request.description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(ActivityError::DescriptionTooLong(MAX_DESCRIPTION_LENGTH).into());
        }
        let project_role = self
            .project_roles
            .find_by_id(request.project_role_id)
            .await?
            .ok_or(ActivityError::ProjectRoleNotFound(request.project_role_id))?;

        let interval = if project_role.time_unit().is_days() {
            TimeInterval {
                start: start_of_day(request.start.date()),
                end: end_of_day(request.end.date()),
            }
        } else {
            TimeInterval {
                start: request.start,
                end: request.end,
            }
        };
        let evidence = request
            .evidence
            .as_deref()
            .map(Evidence::from_data_url)
            .transpose()?;

        let duration = if interval.start <= interval.end {
            let calendar = self
                .calendar_service
                .create_calendar(interval.date_interval())
                .await?;
            duration_of(&interval, project_role.time_unit(), &calendar)
        } else {
            0
        };

        Ok(Activity {
            id: request.id,
            interval,
            duration,
            description: request.description.clone(),
            approval_state: project_role.approval_state_for_new(),
            project_role,
            user_id: user.id,
            billable: request.billable,
            department_id: user.department_id,
            insert_date: None,
            has_evidences: request.has_evidences,
            evidence,
            approved_by_user_id: None,
            approval_date: None,
        })
    }

    /// Activities waiting for approval with their evidence attached are announced to approvers
    async fn notify_pending_approval(&self, activity: &Activity, user: &User) {
        if activity.approval_state != ApprovalState::Pending || !activity.has_evidences {
            return;
        }
        info!(activity_id = ?activity.id, user_id = user.id, "Activity pending approval");
        if let Err(err) = self
            .mail_service
            .send_activity_pending_approval_mail(activity, &user.username)
            .await
        {
            warn!(activity_id = ?activity.id, error = %err, "Could not send pending approval mail");
        }
    }
}
