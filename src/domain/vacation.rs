use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::time::{first_day_of_year, DateInterval};

pub const MAX_VACATION_DESCRIPTION_LENGTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VacationState {
    Pending,
    Accept,
    Reject,
    Cancelled,
}

impl VacationState {
    /// Still counts against the allowance and blocks overlapping requests
    pub fn is_requested(self) -> bool {
        matches!(self, VacationState::Pending | VacationState::Accept)
    }
}

impl fmt::Display for VacationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VacationState::Pending => "PENDING",
            VacationState::Accept => "ACCEPT",
            VacationState::Reject => "REJECT",
            VacationState::Cancelled => "CANCELLED",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vacation {
    pub id: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub state: VacationState,
    pub user_id: i64,
    #[serde(default)]
    pub observations: String,
    pub department_id: Option<i64>,
    #[serde(default)]
    pub description: String,
    /// Jan 1 of the year the days are charged to
    pub charge_year: NaiveDate,
}

impl Vacation {
    pub fn date_interval(&self) -> DateInterval {
        DateInterval::of(self.start_date, self.end_date)
    }

    pub fn charge_year_value(&self) -> i32 {
        self.charge_year.year()
    }
}

/// Vacation together with the workable days it consumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacationDetails {
    pub id: Option<i64>,
    pub observations: String,
    pub description: String,
    pub state: VacationState,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: Vec<NaiveDate>,
    pub charge_year: NaiveDate,
}

impl VacationDetails {
    pub fn new(vacation: &Vacation, days: Vec<NaiveDate>) -> Self {
        VacationDetails {
            id: vacation.id,
            observations: vacation.observations.clone(),
            description: vacation.description.clone(),
            state: vacation.state,
            start_date: vacation.start_date,
            end_date: vacation.end_date,
            days,
            charge_year: vacation.charge_year,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestVacation {
    pub id: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub charge_year: i32,
    pub description: Option<String>,
}

impl RequestVacation {
    pub fn is_date_range_valid(&self) -> bool {
        self.start_date <= self.end_date
    }

    pub fn date_interval(&self) -> DateInterval {
        DateInterval::of(self.start_date, self.end_date)
    }

    pub fn charge_year_date(&self) -> NaiveDate {
        first_day_of_year(self.charge_year)
    }

    pub fn is_description_valid(&self) -> bool {
        self.description
            .as_deref()
            .map_or(true, |description| {
                description.chars().count() <= MAX_VACATION_DESCRIPTION_LENGTH
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateVacationResponse {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: usize,
    pub charge_year: i32,
}
