use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::project::{ProjectRole, RequireEvidence};
use super::time::{TimeUnit, MINUTES_IN_HOUR};

/// Hours worked on a single date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWorkingTime {
    pub date: NaiveDate,
    pub worked_hours: Decimal,
}

/// Minutes registered for a role within a month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRoles {
    pub project_role_id: i64,
    pub worked_minutes: i64,
}

/// Hours worked within one month of a year, split by role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: u32,
    pub worked_hours: Decimal,
    pub roles: Vec<MonthlyRoles>,
}

/// A role as seen by one user, with the allowance that user has left
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRoleUser {
    pub id: i64,
    pub name: String,
    pub organization_id: i64,
    pub project_id: i64,
    pub max_allowed: i64,
    pub remaining: i64,
    pub time_unit: TimeUnit,
    pub require_evidence: RequireEvidence,
    pub require_approval: bool,
    pub user_id: i64,
}

impl ProjectRoleUser {
    pub fn new(role: &ProjectRole, remaining: i64, user_id: i64) -> Self {
        ProjectRoleUser {
            id: role.id,
            name: role.name.clone(),
            organization_id: role.project.organization.id,
            project_id: role.project.id,
            max_allowed: role.max_allowed_in_units(),
            remaining,
            time_unit: role.time_unit(),
            require_evidence: role.require_evidence,
            require_approval: role.is_approval_required,
            user_id,
        }
    }
}

/// Minutes expressed in hours with two decimals, rounded down
pub fn minutes_to_hours(minutes: i64) -> Decimal {
    let mut hours = (Decimal::from(minutes) / Decimal::from(MINUTES_IN_HOUR))
        .round_dp_with_strategy(2, RoundingStrategy::ToZero);
    hours.rescale(2);
    hours
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_to_hours_rounds_down() {
        assert_eq!(minutes_to_hours(620).to_string(), "10.33");
        assert_eq!(minutes_to_hours(480).to_string(), "8.00");
        assert_eq!(minutes_to_hours(0).to_string(), "0.00");
        // 59 minutes is 0.98333.. hours
        assert_eq!(minutes_to_hours(59).to_string(), "0.98");
    }
}
