use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{Activity, Project, RequireEvidence, User};
use crate::error::Result;
use crate::repository::UserRepository;
use crate::services::{ActivityService, MailService};

/// Reminds active users of roles requiring a one-time evidence they never attached
pub struct EvidenceReminderUseCase {
    activity_service: Arc<ActivityService>,
    users: Arc<dyn UserRepository>,
    mail_service: Arc<dyn MailService>,
}

impl EvidenceReminderUseCase {
    pub fn new(
        activity_service: Arc<ActivityService>,
        users: Arc<dyn UserRepository>,
        mail_service: Arc<dyn MailService>,
    ) -> Self {
        EvidenceReminderUseCase {
            activity_service,
            users,
            mail_service,
        }
    }

    /// Sends one mail per user and project. Returns how many were sent.
    pub async fn send_reminders(&self) -> Result<usize> {
        let active = self.users.find_active().await?;
        let user_ids: Vec<i64> = active.iter().map(|user| user.id).collect();
        let missing = self
            .activity_service
            .get_activities_missing_evidence(RequireEvidence::Once, &user_ids)
            .await?;

        let mut sent = 0;
        for user in &active {
            for (project, roles) in roles_by_project(user, &missing) {
                match self
                    .mail_service
                    .send_evidence_missing_mail(
                        &project.organization.name,
                        &project.name,
                        &roles,
                        &user.email,
                    )
                    .await
                {
                    Ok(()) => sent += 1,
                    Err(err) => {
                        warn!(user_id = user.id, project_id = project.id, error = %err, "Could not send evidence reminder")
                    }
                }
            }
        }

        info!(sent, users = active.len(), "Evidence reminders sent");
        Ok(sent)
    }
}

/// Names of the user's roles lacking evidence, grouped by project
fn roles_by_project(user: &User, activities: &[Activity]) -> Vec<(Project, BTreeSet<String>)> {
    let mut grouped: BTreeMap<i64, (Project, BTreeSet<String>)> = BTreeMap::new();
    for activity in activities.iter().filter(|a| a.user_id == user.id) {
        let role = &activity.project_role;
        grouped
            .entry(role.project.id)
            .or_insert_with(|| (role.project.clone(), BTreeSet::new()))
            .1
            .insert(role.name.clone());
    }
    grouped.into_values().collect()
}
