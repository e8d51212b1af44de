use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::time::TimeInterval;
use crate::domain::{
    Activity, ActivityFilter, ApprovalState, DateInterval, Evidence, RequireEvidence,
};
use crate::error::{ActivityError, BinnacleError, Result};
use crate::repository::ActivityRepository;

use super::evidence::ActivityEvidenceService;

/// Activity persistence, keeping evidences in sync with the records
pub struct ActivityService {
    activities: Arc<dyn ActivityRepository>,
    evidence_service: Arc<ActivityEvidenceService>,
}

impl ActivityService {
    pub fn new(
        activities: Arc<dyn ActivityRepository>,
        evidence_service: Arc<ActivityEvidenceService>,
    ) -> Self {
        ActivityService {
            activities,
            evidence_service,
        }
    }

    pub async fn get_activity_by_id(&self, id: i64) -> Result<Activity> {
        self.activities
            .find_by_id(id)
            .await?
            .ok_or_else(|| ActivityError::ActivityNotFound(id).into())
    }

    /// Activities of the user touching any day from `interval.start` 00:00 to `interval.end` 23:59:59
    pub async fn get_activities_between_dates(
        &self,
        interval: DateInterval,
        user_id: i64,
    ) -> Result<Vec<Activity>> {
        self.get_activities_in(&TimeInterval::of_dates(interval.start, interval.end), user_id)
            .await
    }

    pub async fn get_activities_in(
        &self,
        interval: &TimeInterval,
        user_id: i64,
    ) -> Result<Vec<Activity>> {
        self.activities
            .find_between(interval.start, interval.end, user_id)
            .await
    }

    pub async fn get_activities_by_approval_state(
        &self,
        state: ApprovalState,
        user_id: Option<i64>,
    ) -> Result<Vec<Activity>> {
        self.activities.find_by_approval_state(state, user_id).await
    }

    pub async fn get_activities_by_project_role_ids(
        &self,
        interval: &TimeInterval,
        project_role_ids: &[i64],
        user_id: i64,
    ) -> Result<Vec<Activity>> {
        self.activities
            .find_by_project_role_ids(interval, project_role_ids, user_id)
            .await
    }

    pub async fn find_overlapped_activities(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        user_id: i64,
    ) -> Result<Vec<Activity>> {
        self.activities.find_overlapped(start, end, user_id).await
    }

    pub async fn get_activities(&self, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        self.activities.find_by_filter(filter).await
    }

    pub async fn get_activities_missing_evidence(
        &self,
        require_evidence: RequireEvidence,
        user_ids: &[i64],
    ) -> Result<Vec<Activity>> {
        self.activities
            .find_without_evidence(require_evidence, user_ids)
            .await
    }

    /// Saves the activity and its evidence. The activity is removed again
    /// when the evidence cannot be stored.
    pub async fn create_activity(&self, activity: Activity) -> Result<Activity> {
        let evidence = activity.evidence.clone();
        let saved = self.activities.save(activity).await?;
        let (id, insert_date) = saved_keys(&saved)?;

        if let Some(evidence) = &evidence {
            if let Err(err) = self
                .evidence_service
                .store_activity_evidence(id, evidence, insert_date)
                .await
            {
                warn!(activity_id = id, error = %err, "Evidence could not be stored, rolling back activity");
                self.activities.delete_by_id(id).await?;
                return Err(err);
            }
        }

        info!(activity_id = id, user_id = saved.user_id, "Activity created");
        Ok(Activity { evidence, ..saved })
    }

    /// Saves `activity` over `current`, replacing the evidence when a new one
    /// is given and dropping it when the activity no longer has one. The
    /// stored record is restored when the new evidence cannot be stored.
    pub async fn update_activity(&self, activity: Activity, current: &Activity) -> Result<Activity> {
        let evidence = activity.evidence.clone();
        let activity = Activity {
            insert_date: current.insert_date,
            ..activity
        };
        let updated = self.activities.update(activity).await?;
        let (id, insert_date) = saved_keys(&updated)?;

        match &evidence {
            Some(evidence) => {
                if let Err(err) = self
                    .evidence_service
                    .store_activity_evidence(id, evidence, insert_date)
                    .await
                {
                    warn!(activity_id = id, error = %err, "Evidence could not be stored, restoring activity");
                    self.activities.update(current.clone()).await?;
                    return Err(err);
                }
            }
            None if current.has_evidences && !updated.has_evidences => {
                self.evidence_service
                    .delete_activity_evidence(id, insert_date)
                    .await?;
            }
            None => {}
        }

        info!(activity_id = id, user_id = updated.user_id, "Activity updated");
        Ok(Activity { evidence, ..updated })
    }

    /// Removes the record first; a leftover evidence blob is only logged
    pub async fn delete_activity_by_id(&self, id: i64) -> Result<()> {
        let activity = self.get_activity_by_id(id).await?;
        self.activities.delete_by_id(id).await?;

        if activity.has_evidences {
            if let Some(insert_date) = activity.insert_date {
                if let Err(err) = self
                    .evidence_service
                    .delete_activity_evidence(id, insert_date)
                    .await
                {
                    warn!(activity_id = id, error = %err, "Evidence of deleted activity could not be removed");
                }
            }
        }
        info!(activity_id = id, "Activity deleted");
        Ok(())
    }

    pub async fn approve_activity(&self, activity: Activity, approver_id: i64) -> Result<Activity> {
        let approved = Activity {
            approval_state: ApprovalState::Accepted,
            approved_by_user_id: Some(approver_id),
            approval_date: Some(Local::now().naive_local()),
            ..activity
        };
        let approved = self.activities.update(approved).await?;
        info!(activity_id = ?approved.id, approver_id, "Activity approved");
        Ok(approved)
    }

    pub async fn get_evidence(&self, activity: &Activity) -> Result<Evidence> {
        let (id, insert_date) = saved_keys(activity)?;
        self.evidence_service
            .get_activity_evidence(id, insert_date)
            .await
    }
}

fn saved_keys(activity: &Activity) -> Result<(i64, NaiveDateTime)> {
    match (activity.id, activity.insert_date) {
        (Some(id), Some(insert_date)) => Ok((id, insert_date)),
        _ => Err(BinnacleError::IllegalArgument(
            "Activity has not been saved yet".to_string(),
        )),
    }
}
