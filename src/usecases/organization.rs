use std::sync::Arc;
use tracing::debug;

use crate::domain::Organization;
use crate::error::Result;
use crate::repository::{OrganizationRepository, ProjectRepository, ProjectRoleRepository};

/// Organizations activities can be registered against
pub struct ImputableOrganizationsUseCase {
    organizations: Arc<dyn OrganizationRepository>,
    projects: Arc<dyn ProjectRepository>,
    project_roles: Arc<dyn ProjectRoleRepository>,
}

impl ImputableOrganizationsUseCase {
    pub fn new(
        organizations: Arc<dyn OrganizationRepository>,
        projects: Arc<dyn ProjectRepository>,
        project_roles: Arc<dyn ProjectRoleRepository>,
    ) -> Self {
        ImputableOrganizationsUseCase {
            organizations,
            projects,
            project_roles,
        }
    }

    /// Organizations with at least one open project that has a role
    pub async fn get(&self) -> Result<Vec<Organization>> {
        let mut imputable = Vec::new();
        for organization in self.organizations.find_all().await? {
            if self.has_imputable_project(organization.id).await? {
                imputable.push(organization);
            }
        }
        debug!(count = imputable.len(), "Imputable organizations");
        Ok(imputable)
    }

    async fn has_imputable_project(&self, organization_id: i64) -> Result<bool> {
        for project in self.projects.find_by_organization_id(organization_id).await? {
            if project.open && !self.project_roles.find_by_project_id(project.id).await?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_fixtures::date;
    use crate::domain::{MaxTimeAllowed, RequireEvidence, TimeUnit};
    use crate::store::{JsonStore, ProjectRecord, ProjectRoleRecord, StoreData};

    fn organization(id: i64, name: &str) -> Organization {
        Organization {
            id,
            name: name.to_string(),
        }
    }

    fn project(id: i64, organization_id: i64, open: bool) -> ProjectRecord {
        ProjectRecord {
            id,
            name: format!("Project {}", id),
            open,
            billable: false,
            start_date: date(2000, 1, 1),
            block_date: None,
            blocked_by_user: None,
            organization_id,
        }
    }

    fn role(id: i64, project_id: i64) -> ProjectRoleRecord {
        ProjectRoleRecord {
            id,
            name: format!("Role {}", id),
            require_evidence: RequireEvidence::No,
            project_id,
            is_working_time: true,
            is_approval_required: false,
            max_time_allowed: MaxTimeAllowed::default(),
            time_unit: TimeUnit::Minutes,
        }
    }

    #[tokio::test]
    async fn test_only_organizations_with_open_projects_having_roles() {
        let store = Arc::new(JsonStore::with_data(StoreData {
            organizations: vec![
                organization(1, "Open and closed projects"),
                organization(2, "Open project without roles"),
                organization(3, "Closed project"),
                organization(4, "No projects"),
            ],
            projects: vec![
                project(1, 1, true),
                project(2, 1, false),
                project(3, 2, true),
                project(4, 3, false),
            ],
            project_roles: vec![role(1, 1), role(2, 2), role(4, 4)],
            ..Default::default()
        }));
        let use_case = ImputableOrganizationsUseCase::new(store.clone(), store.clone(), store);

        let organizations = use_case.get().await.unwrap();
        assert_eq!(organizations, vec![organization(1, "Open and closed projects")]);
    }
}
