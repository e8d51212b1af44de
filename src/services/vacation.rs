use chrono::{Datelike, NaiveDate};
use std::sync::Arc;
use tracing::info;

use crate::domain::time::{last_day_of_year, DateInterval};
use crate::domain::{
    CreateVacationResponse, RequestVacation, User, Vacation, VacationDetails, VacationState,
};
use crate::error::Result;
use crate::repository::VacationRepository;

use super::calendar::CalendarFactory;

pub struct VacationService {
    vacations: Arc<dyn VacationRepository>,
    calendar_factory: CalendarFactory,
    vacation_days_per_year: u32,
}

impl VacationService {
    pub fn new(
        vacations: Arc<dyn VacationRepository>,
        calendar_factory: CalendarFactory,
        vacation_days_per_year: u32,
    ) -> Self {
        VacationService {
            vacations,
            calendar_factory,
            vacation_days_per_year,
        }
    }

    pub async fn get_vacations_between_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        user_id: i64,
    ) -> Result<Vec<VacationDetails>> {
        let vacations = self.vacations.find_between(start, end, user_id).await?;
        self.with_days(vacations).await
    }

    pub async fn get_vacations_by_charge_year(
        &self,
        year: i32,
        user_id: i64,
    ) -> Result<Vec<VacationDetails>> {
        let vacations = self.vacations.find_by_charge_year(year, user_id).await?;
        self.with_days(vacations).await
    }

    /// Workable days between `start` and `end`
    pub async fn requested_days(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        let calendar = self.calendar_factory.create(DateInterval::of(start, end)).await?;
        Ok(calendar.workable_days())
    }

    /// Yearly allowance, prorated by the days left after hiring in the hiring year
    pub fn corresponding_vacation_days(&self, user: &User, year: i32) -> i64 {
        let per_year = i64::from(self.vacation_days_per_year);
        let hiring_year = user.hiring_date.year();

        if hiring_year > year {
            0
        } else if hiring_year == year {
            let year_end = last_day_of_year(year);
            let days_in_year = i64::from(year_end.ordinal());
            let days_employed = (year_end - user.hiring_date).num_days() + 1;
            ((per_year * days_employed) as f64 / days_in_year as f64).round() as i64
        } else {
            per_year
        }
    }

    /// Allowance for `year` minus the days of pending and accepted vacations charged to it
    pub async fn remaining_vacation_days(&self, year: i32, user: &User) -> Result<i64> {
        let charged: usize = self
            .get_vacations_by_charge_year(year, user.id)
            .await?
            .iter()
            .filter(|vacation| vacation.state.is_requested())
            .map(|vacation| vacation.days.len())
            .sum();
        Ok(self.corresponding_vacation_days(user, year) - charged as i64)
    }

    pub async fn create_vacation_period(
        &self,
        request: &RequestVacation,
        user: &User,
    ) -> Result<CreateVacationResponse> {
        let days = self.requested_days(request.start_date, request.end_date).await?;
        let vacation = Vacation {
            id: None,
            start_date: request.start_date,
            end_date: request.end_date,
            state: VacationState::Pending,
            user_id: user.id,
            observations: String::new(),
            department_id: user.department_id,
            description: request.description.clone().unwrap_or_default(),
            charge_year: request.charge_year_date(),
        };

        let saved = self.vacations.save(vacation).await?;
        info!(vacation_id = ?saved.id, user_id = user.id, days = days.len(), "Vacation requested");
        Ok(response(&saved, days.len()))
    }

    pub async fn update_vacation_period(
        &self,
        request: &RequestVacation,
        user: &User,
        current: Vacation,
    ) -> Result<CreateVacationResponse> {
        let days = self.requested_days(request.start_date, request.end_date).await?;
        let vacation = Vacation {
            start_date: request.start_date,
            end_date: request.end_date,
            description: request.description.clone().unwrap_or_default(),
            charge_year: request.charge_year_date(),
            ..current
        };

        let updated = self.vacations.update(vacation).await?;
        info!(vacation_id = ?updated.id, user_id = user.id, days = days.len(), "Vacation updated");
        Ok(response(&updated, days.len()))
    }

    async fn with_days(&self, vacations: Vec<Vacation>) -> Result<Vec<VacationDetails>> {
        let mut details = Vec::with_capacity(vacations.len());
        for vacation in &vacations {
            let days = self
                .requested_days(vacation.start_date, vacation.end_date)
                .await?;
            details.push(VacationDetails::new(vacation, days));
        }
        Ok(details)
    }
}

fn response(vacation: &Vacation, days: usize) -> CreateVacationResponse {
    CreateVacationResponse {
        start_date: vacation.start_date,
        end_date: vacation.end_date,
        days,
        charge_year: vacation.charge_year_value(),
    }
}
