use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "admin";
pub const ACTIVITY_APPROVAL_ROLE: &str = "activity-approval";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    pub hiring_date: NaiveDate,
    pub department_id: Option<i64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn is_before_hiring_date(&self, date: NaiveDate) -> bool {
        date < self.hiring_date
    }
}

/// Authenticated caller of a use case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(user_id: i64, roles: Vec<String>) -> Self {
        Principal { user_id, roles }
    }

    pub fn user(user_id: i64) -> Self {
        Principal::new(user_id, Vec::new())
    }

    pub fn admin(user_id: i64) -> Self {
        Principal::new(user_id, vec![ADMIN_ROLE.to_string()])
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    pub fn can_approve_activities(&self) -> bool {
        self.is_admin() || self.has_role(ACTIVITY_APPROVAL_ROLE)
    }

    pub fn can_access_all_attachments(&self) -> bool {
        self.is_admin()
    }

    /// Owner of the resource, or an admin
    pub fn can_read(&self, owner_id: i64) -> bool {
        self.user_id == owner_id || self.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_roles() {
        let user = Principal::user(1);
        assert!(!user.is_admin());
        assert!(!user.can_approve_activities());
        assert!(user.can_read(1));
        assert!(!user.can_read(2));

        let approver = Principal::new(2, vec![ACTIVITY_APPROVAL_ROLE.to_string()]);
        assert!(approver.can_approve_activities());
        assert!(!approver.can_access_all_attachments());

        let admin = Principal::admin(3);
        assert!(admin.can_approve_activities());
        assert!(admin.can_access_all_attachments());
        assert!(admin.can_read(1));
    }

    #[test]
    fn test_user_defaults_to_active() {
        let json = r#"{
            "id": 1,
            "username": "jdoe",
            "name": "Jane Doe",
            "email": "jdoe@example.com",
            "hiring_date": "2020-02-01",
            "department_id": null
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert!(user.active);
        assert!(user.is_before_hiring_date(NaiveDate::from_ymd_opt(2020, 1, 31).unwrap()));
        assert!(!user.is_before_hiring_date(NaiveDate::from_ymd_opt(2020, 2, 1).unwrap()));
    }
}
