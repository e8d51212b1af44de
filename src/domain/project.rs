use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::activity::{Activity, ApprovalState};
use super::calendar::Calendar;
use super::time::{TimeUnit, WORKABLE_DAY_MINUTES};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub open: bool,
    pub billable: bool,
    pub start_date: NaiveDate,
    pub block_date: Option<NaiveDate>,
    pub blocked_by_user: Option<i64>,
    pub organization: Organization,
}

impl Project {
    /// Activities on or before the block date can no longer change
    pub fn is_blocked_for(&self, date: NaiveDate) -> bool {
        matches!(self.block_date, Some(block_date) if block_date >= date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequireEvidence {
    No,
    Once,
    Weekly,
}

impl RequireEvidence {
    pub fn is_required(self) -> bool {
        matches!(self, RequireEvidence::Once | RequireEvidence::Weekly)
    }
}

impl fmt::Display for RequireEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequireEvidence::No => "NO",
            RequireEvidence::Once => "ONCE",
            RequireEvidence::Weekly => "WEEKLY",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for RequireEvidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NO" => Ok(RequireEvidence::No),
            "ONCE" => Ok(RequireEvidence::Once),
            "WEEKLY" => Ok(RequireEvidence::Weekly),
            other => Err(format!("Unknown evidence requirement: {}", other)),
        }
    }
}

/// Caps in minutes, 0 meaning no cap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxTimeAllowed {
    pub by_year: i64,
    pub by_activity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInfo {
    pub max_time_allowed: MaxTimeAllowed,
    pub time_unit: TimeUnit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRole {
    pub id: i64,
    pub name: String,
    pub require_evidence: RequireEvidence,
    pub project: Project,
    pub is_working_time: bool,
    pub is_approval_required: bool,
    pub time_info: TimeInfo,
}

impl ProjectRole {
    pub fn time_unit(&self) -> TimeUnit {
        self.time_info.time_unit
    }

    pub fn max_time_allowed_by_year(&self) -> i64 {
        self.time_info.max_time_allowed.by_year
    }

    pub fn max_time_allowed_by_activity(&self) -> i64 {
        self.time_info.max_time_allowed.by_activity
    }

    pub fn has_yearly_cap(&self) -> bool {
        self.max_time_allowed_by_year() > 0
    }

    pub fn approval_state_for_new(&self) -> ApprovalState {
        if self.is_approval_required {
            ApprovalState::Pending
        } else {
            ApprovalState::Na
        }
    }

    pub fn max_allowed_in_units(&self) -> i64 {
        self.to_units(self.max_time_allowed_by_year())
    }

    pub fn max_allowed_by_activity_in_units(&self) -> i64 {
        self.to_units(self.max_time_allowed_by_activity())
    }

    /// Yearly cap left after `activities`, in the role's unit. Roles without
    /// a yearly cap report 0.
    pub fn remaining_in_units(&self, calendar: &Calendar, activities: &[Activity]) -> i64 {
        if !self.has_yearly_cap() {
            return 0;
        }
        let consumed: i64 = activities
            .iter()
            .map(|activity| activity.duration_in(calendar))
            .sum();
        self.to_units(self.max_time_allowed_by_year() - consumed)
    }

    fn to_units(&self, minutes: i64) -> i64 {
        if self.time_unit().is_days() {
            minutes / WORKABLE_DAY_MINUTES
        } else {
            minutes
        }
    }
}
