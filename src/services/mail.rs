use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::config::MailConfig;
use crate::domain::{Activity, User};
use crate::error::Result;

/// Templated notifications sent by the use cases
#[async_trait]
pub trait MailService: Send + Sync {
    async fn send_request_vacations_mail(
        &self,
        username: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        description: &str,
    ) -> Result<()>;

    async fn send_activity_pending_approval_mail(
        &self,
        activity: &Activity,
        username: &str,
    ) -> Result<()>;

    async fn send_activity_approved_mail(&self, activity: &Activity, user: &User) -> Result<()>;

    async fn send_evidence_missing_mail(
        &self,
        organization: &str,
        project: &str,
        roles: &BTreeSet<String>,
        recipient: &str,
    ) -> Result<()>;
}

/// Writes every mail to the log instead of delivering it
pub struct TracingMailService {
    config: MailConfig,
}

impl TracingMailService {
    pub fn new(config: MailConfig) -> Self {
        TracingMailService { config }
    }

    fn emit(&self, recipient: &str, subject: &str, body: &str) {
        if self.config.enabled {
            info!(from = %self.config.from, to = recipient, subject, body, "Mail sent");
        } else {
            debug!(to = recipient, subject, "Mail disabled, skipping");
        }
    }
}

#[async_trait]
impl MailService for TracingMailService {
    async fn send_request_vacations_mail(
        &self,
        username: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        description: &str,
    ) -> Result<()> {
        let body = format!(
            "{} requested vacations from {} to {}. {}",
            username, start_date, end_date, description
        );
        self.emit(&self.config.from, "Vacation request", body.trim_end());
        Ok(())
    }

    async fn send_activity_pending_approval_mail(
        &self,
        activity: &Activity,
        username: &str,
    ) -> Result<()> {
        let body = format!(
            "{} registered an activity in {} ({}) from {} to {} waiting for approval",
            username,
            activity.project_role.name,
            activity.project_role.project.name,
            activity.start(),
            activity.end()
        );
        self.emit(&self.config.from, "Activity pending approval", &body);
        Ok(())
    }

    async fn send_activity_approved_mail(&self, activity: &Activity, user: &User) -> Result<()> {
        let body = format!(
            "Your activity in {} from {} to {} has been approved",
            activity.project_role.name,
            activity.start(),
            activity.end()
        );
        self.emit(&user.email, "Activity approved", &body);
        Ok(())
    }

    async fn send_evidence_missing_mail(
        &self,
        organization: &str,
        project: &str,
        roles: &BTreeSet<String>,
        recipient: &str,
    ) -> Result<()> {
        let roles: Vec<&str> = roles.iter().map(String::as_str).collect();
        let body = format!(
            "Activities of {} / {} are missing their evidence for roles: {}",
            organization,
            project,
            roles.join(", ")
        );
        self.emit(recipient, "Evidence missing", &body);
        Ok(())
    }
}
