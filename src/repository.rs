//! Storage seams used by services and use cases.
//!
//! Lookups return `Ok(None)` when the record does not exist; callers decide
//! whether that is an error.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::domain::{
    Activity, ActivityFilter, ApprovalState, AttachmentInfo, Holiday, Organization, Project,
    ProjectRole, RequireEvidence, TimeInterval, User, Vacation,
};
use crate::error::Result;

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Activity>>;

    /// Activities of `user_id` sharing at least one instant with `start..=end`
    async fn find_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        user_id: i64,
    ) -> Result<Vec<Activity>>;

    /// Activities of `user_id` strictly overlapping `start..end`
    async fn find_overlapped(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        user_id: i64,
    ) -> Result<Vec<Activity>>;

    async fn find_by_approval_state(
        &self,
        state: ApprovalState,
        user_id: Option<i64>,
    ) -> Result<Vec<Activity>>;

    async fn find_by_project_role_ids(
        &self,
        interval: &TimeInterval,
        project_role_ids: &[i64],
        user_id: i64,
    ) -> Result<Vec<Activity>>;

    async fn find_by_filter(&self, filter: &ActivityFilter) -> Result<Vec<Activity>>;

    /// Activities of `user_ids` without evidence whose role requires `require_evidence`
    async fn find_without_evidence(
        &self,
        require_evidence: RequireEvidence,
        user_ids: &[i64],
    ) -> Result<Vec<Activity>>;

    /// Stores a new activity, assigning its id and insert date
    async fn save(&self, activity: Activity) -> Result<Activity>;

    async fn update(&self, activity: Activity) -> Result<Activity>;

    async fn delete_by_id(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Organization>>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Project>>;

    async fn find_by_organization_id(&self, organization_id: i64) -> Result<Vec<Project>>;
}

#[async_trait]
pub trait ProjectRoleRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<ProjectRole>>;

    async fn find_by_project_id(&self, project_id: i64) -> Result<Vec<ProjectRole>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Every user, active or not, ordered by id
    async fn find_all(&self) -> Result<Vec<User>>;

    async fn find_active(&self) -> Result<Vec<User>>;
}

#[async_trait]
pub trait HolidayRepository: Send + Sync {
    async fn find_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Holiday>>;
}

#[async_trait]
pub trait VacationRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Vacation>>;

    /// Vacations of `user_id` sharing at least one day with `start..=end`
    async fn find_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        user_id: i64,
    ) -> Result<Vec<Vacation>>;

    async fn find_by_charge_year(&self, year: i32, user_id: i64) -> Result<Vec<Vacation>>;

    async fn save(&self, vacation: Vacation) -> Result<Vacation>;

    async fn update(&self, vacation: Vacation) -> Result<Vacation>;
}

#[async_trait]
pub trait AttachmentInfoRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AttachmentInfo>>;

    async fn find_temporary(&self) -> Result<Vec<AttachmentInfo>>;

    async fn save(&self, info: AttachmentInfo) -> Result<AttachmentInfo>;

    async fn delete(&self, ids: &[Uuid]) -> Result<()>;
}

/// Byte storage addressed by path
#[async_trait]
pub trait AttachmentStorage: Send + Sync {
    async fn store(&self, path: &str, bytes: &[u8]) -> Result<()>;

    async fn retrieve(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Returns whether something was deleted
    async fn delete(&self, path: &str) -> Result<bool>;
}
