use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{Local, NaiveDate, NaiveDateTime};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{
    Activity, ActivityFilter, ApprovalState, AttachmentInfo, Holiday, MaxTimeAllowed,
    Organization, Project, ProjectRole, RequireEvidence, TimeInfo, TimeInterval, TimeUnit, User,
    Vacation,
};
use crate::error::{ActivityError, BinnacleError, Result, StoreError, VacationError};
use crate::repository::{
    ActivityRepository, AttachmentInfoRepository, AttachmentStorage, HolidayRepository,
    OrganizationRepository, ProjectRepository, ProjectRoleRepository, UserRepository,
    VacationRepository,
};

/// Project as persisted, pointing at its organization by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: i64,
    pub name: String,
    pub open: bool,
    #[serde(default)]
    pub billable: bool,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub block_date: Option<NaiveDate>,
    #[serde(default)]
    pub blocked_by_user: Option<i64>,
    pub organization_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRoleRecord {
    pub id: i64,
    pub name: String,
    pub require_evidence: RequireEvidence,
    pub project_id: i64,
    #[serde(default = "default_true")]
    pub is_working_time: bool,
    #[serde(default)]
    pub is_approval_required: bool,
    #[serde(default)]
    pub max_time_allowed: MaxTimeAllowed,
    pub time_unit: TimeUnit,
}

fn default_true() -> bool {
    true
}

impl From<&Project> for ProjectRecord {
    fn from(project: &Project) -> Self {
        ProjectRecord {
            id: project.id,
            name: project.name.clone(),
            open: project.open,
            billable: project.billable,
            start_date: project.start_date,
            block_date: project.block_date,
            blocked_by_user: project.blocked_by_user,
            organization_id: project.organization.id,
        }
    }
}

impl From<&ProjectRole> for ProjectRoleRecord {
    fn from(role: &ProjectRole) -> Self {
        ProjectRoleRecord {
            id: role.id,
            name: role.name.clone(),
            require_evidence: role.require_evidence,
            project_id: role.project.id,
            is_working_time: role.is_working_time,
            is_approval_required: role.is_approval_required,
            max_time_allowed: role.time_info.max_time_allowed,
            time_unit: role.time_info.time_unit,
        }
    }
}

/// Activity as persisted; the evidence itself lives in the blob map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration: i64,
    pub description: String,
    pub project_role_id: i64,
    pub user_id: i64,
    pub billable: bool,
    pub department_id: Option<i64>,
    pub insert_date: NaiveDateTime,
    pub has_evidences: bool,
    pub approval_state: ApprovalState,
    pub approved_by_user_id: Option<i64>,
    pub approval_date: Option<NaiveDateTime>,
}

impl ActivityRecord {
    fn new(id: i64, insert_date: NaiveDateTime, activity: &Activity) -> Self {
        ActivityRecord {
            id,
            start: activity.start(),
            end: activity.end(),
            duration: activity.duration,
            description: activity.description.clone(),
            project_role_id: activity.project_role.id,
            user_id: activity.user_id,
            billable: activity.billable,
            department_id: activity.department_id,
            insert_date,
            has_evidences: activity.has_evidences,
            approval_state: activity.approval_state,
            approved_by_user_id: activity.approved_by_user_id,
            approval_date: activity.approval_date,
        }
    }
}

/// Everything the store keeps, serialized as a single JSON document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreData {
    pub organizations: Vec<Organization>,
    pub projects: Vec<ProjectRecord>,
    pub project_roles: Vec<ProjectRoleRecord>,
    pub users: Vec<User>,
    pub holidays: Vec<Holiday>,
    pub activities: Vec<ActivityRecord>,
    pub vacations: Vec<Vacation>,
    pub attachments: Vec<AttachmentInfo>,
    /// path -> base64 content
    pub blobs: BTreeMap<String, String>,
    pub last_updated: Option<String>,
}

impl StoreData {
    fn project(&self, id: i64) -> Result<Option<Project>> {
        let Some(record) = self.projects.iter().find(|p| p.id == id) else {
            return Ok(None);
        };
        let organization = self
            .organizations
            .iter()
            .find(|o| o.id == record.organization_id)
            .cloned()
            .ok_or_else(|| missing_reference("project", id))?;

        Ok(Some(Project {
            id: record.id,
            name: record.name.clone(),
            open: record.open,
            billable: record.billable,
            start_date: record.start_date,
            block_date: record.block_date,
            blocked_by_user: record.blocked_by_user,
            organization,
        }))
    }

    fn project_role(&self, id: i64) -> Result<Option<ProjectRole>> {
        let Some(record) = self.project_roles.iter().find(|r| r.id == id) else {
            return Ok(None);
        };
        let project = self
            .project(record.project_id)?
            .ok_or_else(|| missing_reference("project role", id))?;

        Ok(Some(ProjectRole {
            id: record.id,
            name: record.name.clone(),
            require_evidence: record.require_evidence,
            project,
            is_working_time: record.is_working_time,
            is_approval_required: record.is_approval_required,
            time_info: TimeInfo {
                max_time_allowed: record.max_time_allowed,
                time_unit: record.time_unit,
            },
        }))
    }

    fn activity(&self, record: &ActivityRecord) -> Result<Activity> {
        let project_role = self
            .project_role(record.project_role_id)?
            .ok_or_else(|| missing_reference("activity", record.id))?;

        Ok(Activity {
            id: Some(record.id),
            interval: TimeInterval {
                start: record.start,
                end: record.end,
            },
            duration: record.duration,
            description: record.description.clone(),
            project_role,
            user_id: record.user_id,
            billable: record.billable,
            department_id: record.department_id,
            insert_date: Some(record.insert_date),
            has_evidences: record.has_evidences,
            evidence: None,
            approval_state: record.approval_state,
            approved_by_user_id: record.approved_by_user_id,
            approval_date: record.approval_date,
        })
    }

    /// Hydrated activities accepted by `predicate`, ordered by start
    fn activities_where(&self, predicate: impl Fn(&Activity) -> bool) -> Result<Vec<Activity>> {
        let mut activities = Vec::new();
        for record in &self.activities {
            let activity = self.activity(record)?;
            if predicate(&activity) {
                activities.push(activity);
            }
        }
        activities.sort_by_key(|activity| activity.start());
        Ok(activities)
    }

    /// Inserts or replaces reference data (organizations, projects, roles,
    /// users, holidays) keyed by id
    pub fn merge(&mut self, other: StoreData) {
        upsert(&mut self.organizations, other.organizations, |o| o.id);
        upsert(&mut self.projects, other.projects, |p| p.id);
        upsert(&mut self.project_roles, other.project_roles, |r| r.id);
        upsert(&mut self.users, other.users, |u| u.id);
        upsert(&mut self.holidays, other.holidays, |h| h.id);
    }
}

fn missing_reference(kind: &'static str, id: i64) -> BinnacleError {
    StoreError::MissingReference {
        kind,
        id: id.to_string(),
    }
    .into()
}

fn upsert<T>(target: &mut Vec<T>, items: Vec<T>, key: impl Fn(&T) -> i64) {
    for item in items {
        match target.iter_mut().find(|existing| key(existing) == key(&item)) {
            Some(existing) => *existing = item,
            None => target.push(item),
        }
    }
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

/// JSON-file backed store implementing every repository
pub struct JsonStore {
    path: Option<PathBuf>,
    data: RwLock<StoreData>,
}

impl JsonStore {
    /// Store that never touches the disk
    pub fn in_memory() -> Self {
        Self::with_data(StoreData::default())
    }

    pub fn with_data(data: StoreData) -> Self {
        JsonStore {
            path: None,
            data: RwLock::new(data),
        }
    }

    /// Default data file location
    pub fn get_default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "binnacle", "binnacle")
            .map(|proj_dirs| proj_dirs.data_dir().join("binnacle.json"))
    }

    /// Load the store from `path`, starting empty when the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .map_err(|e| StoreError::LoadFailed(format!("{}: {}", path.display(), e)))?;
            serde_json::from_str(&contents)
                .map_err(|e| StoreError::LoadFailed(format!("{}: {}", path.display(), e)))?
        } else {
            debug!(path = %path.display(), "Data file not found, starting empty");
            StoreData::default()
        };

        Ok(JsonStore {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Merge reference data into the store and persist it
    pub async fn import(&self, incoming: StoreData) -> Result<()> {
        let mut data = self.data.write().await;
        info!(
            organizations = incoming.organizations.len(),
            projects = incoming.projects.len(),
            project_roles = incoming.project_roles.len(),
            users = incoming.users.len(),
            holidays = incoming.holidays.len(),
            "Importing reference data"
        );
        data.merge(incoming);
        self.persist(&mut data)
    }

    pub async fn snapshot(&self) -> StoreData {
        self.data.read().await.clone()
    }

    fn persist(&self, data: &mut StoreData) -> Result<()> {
        data.last_updated = Some(Local::now().to_rfc3339());

        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::SaveFailed(format!("{}: {}", parent.display(), e)))?;
        }

        let contents = serde_json::to_string_pretty(data)?;
        fs::write(path, contents)
            .map_err(|e| StoreError::SaveFailed(format!("{}: {}", path.display(), e)))?;

        debug!(path = %path.display(), "Data file saved");
        Ok(())
    }
}

#[async_trait]
impl ActivityRepository for JsonStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Activity>> {
        let data = self.data.read().await;
        data.activities
            .iter()
            .find(|record| record.id == id)
            .map(|record| data.activity(record))
            .transpose()
    }

    async fn find_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        user_id: i64,
    ) -> Result<Vec<Activity>> {
        let interval = TimeInterval { start, end };
        let data = self.data.read().await;
        data.activities_where(|a| a.user_id == user_id && a.is_in_time_interval(&interval))
    }

    async fn find_overlapped(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        user_id: i64,
    ) -> Result<Vec<Activity>> {
        let interval = TimeInterval { start, end };
        let data = self.data.read().await;
        data.activities_where(|a| a.user_id == user_id && a.interval.overlaps(&interval))
    }

    async fn find_by_approval_state(
        &self,
        state: ApprovalState,
        user_id: Option<i64>,
    ) -> Result<Vec<Activity>> {
        let data = self.data.read().await;
        data.activities_where(|a| {
            a.approval_state == state && user_id.map_or(true, |id| a.user_id == id)
        })
    }

    async fn find_by_project_role_ids(
        &self,
        interval: &TimeInterval,
        project_role_ids: &[i64],
        user_id: i64,
    ) -> Result<Vec<Activity>> {
        let data = self.data.read().await;
        data.activities_where(|a| {
            a.user_id == user_id
                && project_role_ids.contains(&a.project_role.id)
                && a.is_in_time_interval(interval)
        })
    }

    async fn find_by_filter(&self, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        let data = self.data.read().await;
        data.activities_where(|a| filter.matches(a))
    }

    async fn find_without_evidence(
        &self,
        require_evidence: RequireEvidence,
        user_ids: &[i64],
    ) -> Result<Vec<Activity>> {
        let data = self.data.read().await;
        data.activities_where(|a| {
            !a.has_evidences
                && a.requires_evidence() == require_evidence
                && user_ids.contains(&a.user_id)
        })
    }

    async fn save(&self, activity: Activity) -> Result<Activity> {
        let mut data = self.data.write().await;
        let id = next_id(data.activities.iter().map(|a| a.id));
        let insert_date = activity
            .insert_date
            .unwrap_or_else(|| Local::now().naive_local());

        data.activities
            .push(ActivityRecord::new(id, insert_date, &activity));
        self.persist(&mut data)?;

        Ok(Activity {
            id: Some(id),
            insert_date: Some(insert_date),
            ..activity
        })
    }

    async fn update(&self, activity: Activity) -> Result<Activity> {
        let id = activity.id.ok_or_else(|| {
            BinnacleError::IllegalArgument("Cannot update an activity without id".to_string())
        })?;

        let mut data = self.data.write().await;
        let record = data
            .activities
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(ActivityError::ActivityNotFound(id))?;

        let insert_date = activity.insert_date.unwrap_or(record.insert_date);
        *record = ActivityRecord::new(id, insert_date, &activity);
        self.persist(&mut data)?;

        Ok(Activity {
            insert_date: Some(insert_date),
            ..activity
        })
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        let mut data = self.data.write().await;
        let before = data.activities.len();
        data.activities.retain(|record| record.id != id);
        if data.activities.len() == before {
            return Err(ActivityError::ActivityNotFound(id).into());
        }
        self.persist(&mut data)
    }
}

#[async_trait]
impl OrganizationRepository for JsonStore {
    async fn find_all(&self) -> Result<Vec<Organization>> {
        let data = self.data.read().await;
        let mut organizations = data.organizations.clone();
        organizations.sort_by_key(|o| o.id);
        Ok(organizations)
    }
}

#[async_trait]
impl ProjectRepository for JsonStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Project>> {
        self.data.read().await.project(id)
    }

    async fn find_by_organization_id(&self, organization_id: i64) -> Result<Vec<Project>> {
        let data = self.data.read().await;
        let mut projects = Vec::new();
        for record in data.projects.iter().filter(|p| p.organization_id == organization_id) {
            if let Some(project) = data.project(record.id)? {
                projects.push(project);
            }
        }
        projects.sort_by_key(|p| p.id);
        Ok(projects)
    }
}

#[async_trait]
impl ProjectRoleRepository for JsonStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<ProjectRole>> {
        self.data.read().await.project_role(id)
    }

    async fn find_by_project_id(&self, project_id: i64) -> Result<Vec<ProjectRole>> {
        let data = self.data.read().await;
        let mut roles = Vec::new();
        for record in data.project_roles.iter().filter(|r| r.project_id == project_id) {
            if let Some(role) = data.project_role(record.id)? {
                roles.push(role);
            }
        }
        Ok(roles)
    }
}

#[async_trait]
impl UserRepository for JsonStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_all(&self) -> Result<Vec<User>> {
        let data = self.data.read().await;
        let mut users = data.users.clone();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn find_active(&self) -> Result<Vec<User>> {
        let data = self.data.read().await;
        let mut users: Vec<User> = data.users.iter().filter(|u| u.active).cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}

#[async_trait]
impl HolidayRepository for JsonStore {
    async fn find_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Holiday>> {
        let data = self.data.read().await;
        let mut holidays: Vec<Holiday> = data
            .holidays
            .iter()
            .filter(|h| start <= h.date && h.date <= end)
            .cloned()
            .collect();
        holidays.sort_by_key(|h| h.date);
        Ok(holidays)
    }
}

#[async_trait]
impl VacationRepository for JsonStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Vacation>> {
        let data = self.data.read().await;
        Ok(data.vacations.iter().find(|v| v.id == Some(id)).cloned())
    }

    async fn find_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        user_id: i64,
    ) -> Result<Vec<Vacation>> {
        let data = self.data.read().await;
        let mut vacations: Vec<Vacation> = data
            .vacations
            .iter()
            .filter(|v| v.user_id == user_id && v.start_date <= end && start <= v.end_date)
            .cloned()
            .collect();
        vacations.sort_by_key(|v| v.start_date);
        Ok(vacations)
    }

    async fn find_by_charge_year(&self, year: i32, user_id: i64) -> Result<Vec<Vacation>> {
        let data = self.data.read().await;
        let mut vacations: Vec<Vacation> = data
            .vacations
            .iter()
            .filter(|v| v.user_id == user_id && v.charge_year_value() == year)
            .cloned()
            .collect();
        vacations.sort_by_key(|v| v.start_date);
        Ok(vacations)
    }

    async fn save(&self, vacation: Vacation) -> Result<Vacation> {
        let mut data = self.data.write().await;
        let id = next_id(data.vacations.iter().filter_map(|v| v.id));
        let saved = Vacation {
            id: Some(id),
            ..vacation
        };
        data.vacations.push(saved.clone());
        self.persist(&mut data)?;
        Ok(saved)
    }

    async fn update(&self, vacation: Vacation) -> Result<Vacation> {
        let id = vacation.id.ok_or_else(|| {
            BinnacleError::IllegalArgument("Cannot update a vacation without id".to_string())
        })?;

        let mut data = self.data.write().await;
        let existing = data
            .vacations
            .iter_mut()
            .find(|v| v.id == Some(id))
            .ok_or(VacationError::NotFound(id))?;
        *existing = vacation.clone();
        self.persist(&mut data)?;
        Ok(vacation)
    }
}

#[async_trait]
impl AttachmentInfoRepository for JsonStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AttachmentInfo>> {
        let data = self.data.read().await;
        Ok(data.attachments.iter().find(|a| a.id == id).cloned())
    }

    async fn find_temporary(&self) -> Result<Vec<AttachmentInfo>> {
        let data = self.data.read().await;
        Ok(data
            .attachments
            .iter()
            .filter(|a| a.is_temporary)
            .cloned()
            .collect())
    }

    async fn save(&self, info: AttachmentInfo) -> Result<AttachmentInfo> {
        let mut data = self.data.write().await;
        match data.attachments.iter_mut().find(|a| a.id == info.id) {
            Some(existing) => *existing = info.clone(),
            None => data.attachments.push(info.clone()),
        }
        self.persist(&mut data)?;
        Ok(info)
    }

    async fn delete(&self, ids: &[Uuid]) -> Result<()> {
        let mut data = self.data.write().await;
        data.attachments.retain(|a| !ids.contains(&a.id));
        self.persist(&mut data)
    }
}

#[async_trait]
impl AttachmentStorage for JsonStore {
    async fn store(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let mut data = self.data.write().await;
        data.blobs.insert(path.to_string(), STANDARD.encode(bytes));
        self.persist(&mut data)
    }

    async fn retrieve(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let data = self.data.read().await;
        data.blobs
            .get(path)
            .map(|encoded| STANDARD.decode(encoded).map_err(BinnacleError::from))
            .transpose()
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let mut data = self.data.write().await;
        if data.blobs.remove(path).is_none() {
            return Ok(false);
        }
        self.persist(&mut data)?;
        Ok(true)
    }
}
