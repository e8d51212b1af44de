//! Shared fixtures for unit tests

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use crate::app::App;
use crate::domain::test_fixtures::{date, organization, project, project_role_with, user};
use crate::domain::{Activity, ProjectRole, TimeUnit, User};
use crate::config::{default_mime_types, Config};
use crate::error::Result;
use crate::services::mail::MailService;
use crate::services::{ActivityCalendarService, ActivityEvidenceService, ActivityService, CalendarFactory};
use crate::store::{JsonStore, ProjectRecord, ProjectRoleRecord, StoreData};

pub fn approver() -> User {
    User {
        id: 2,
        username: "approver".to_string(),
        name: "Approver".to_string(),
        email: "approver@example.com".to_string(),
        hiring_date: date(2000, 1, 1),
        department_id: None,
        active: true,
    }
}

/// Organization, project, minutes role (id 1) and two users
pub fn seeded_data() -> StoreData {
    data_with_roles(&[project_role_with(TimeUnit::Minutes, 0, 0)])
}

/// Same as [`seeded_data`] with `roles` stored, their projects included
pub fn data_with_roles(roles: &[ProjectRole]) -> StoreData {
    let mut projects: Vec<ProjectRecord> = vec![ProjectRecord::from(&project())];
    for role in roles {
        let record = ProjectRecord::from(&role.project);
        match projects.iter_mut().find(|p| p.id == record.id) {
            Some(existing) => *existing = record,
            None => projects.push(record),
        }
    }

    StoreData {
        organizations: vec![organization()],
        projects,
        project_roles: roles.iter().map(ProjectRoleRecord::from).collect(),
        users: vec![user(), approver()],
        ..Default::default()
    }
}

pub fn activity_service(store: &Arc<JsonStore>) -> Arc<ActivityService> {
    let evidence_service = Arc::new(ActivityEvidenceService::new(store.clone(), default_mime_types()));
    Arc::new(ActivityService::new(store.clone(), evidence_service))
}

pub fn calendar_service(store: &Arc<JsonStore>) -> Arc<ActivityCalendarService> {
    Arc::new(ActivityCalendarService::new(CalendarFactory::new(store.clone()), store.clone()))
}

/// App over an in-memory store seeded with `data`, recording every mail
pub fn app_with(data: StoreData) -> (App, Arc<RecordingMailService>, Arc<JsonStore>) {
    let store = Arc::new(JsonStore::with_data(data));
    let mail = Arc::new(RecordingMailService::default());
    let app = App::new(store.clone(), &Config::default(), mail.clone());
    (app, mail, store)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMail {
    VacationRequest { username: String, start: NaiveDate, end: NaiveDate },
    PendingApproval { activity_id: Option<i64>, username: String },
    Approved { activity_id: Option<i64>, email: String },
    EvidenceMissing { organization: String, project: String, roles: BTreeSet<String>, recipient: String },
}

/// Keeps every mail in memory for assertions
#[derive(Default)]
pub struct RecordingMailService {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailService {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, mail: SentMail) {
        self.sent.lock().unwrap().push(mail);
    }
}

#[async_trait]
impl MailService for RecordingMailService {
    async fn send_request_vacations_mail(
        &self,
        username: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        _description: &str,
    ) -> Result<()> {
        self.record(SentMail::VacationRequest {
            username: username.to_string(),
            start: start_date,
            end: end_date,
        });
        Ok(())
    }

    async fn send_activity_pending_approval_mail(&self, activity: &Activity, username: &str) -> Result<()> {
        self.record(SentMail::PendingApproval {
            activity_id: activity.id,
            username: username.to_string(),
        });
        Ok(())
    }

    async fn send_activity_approved_mail(&self, activity: &Activity, user: &User) -> Result<()> {
        self.record(SentMail::Approved {
            activity_id: activity.id,
            email: user.email.clone(),
        });
        Ok(())
    }

    async fn send_evidence_missing_mail(
        &self,
        organization: &str,
        project: &str,
        roles: &BTreeSet<String>,
        recipient: &str,
    ) -> Result<()> {
        self.record(SentMail::EvidenceMissing {
            organization: organization.to_string(),
            project: project.to_string(),
            roles: roles.clone(),
            recipient: recipient.to_string(),
        });
        Ok(())
    }
}
