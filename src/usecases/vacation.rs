use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::time::{first_day_of_year, last_day_of_year};
use crate::domain::vacation::MAX_VACATION_DESCRIPTION_LENGTH;
use crate::domain::{
    CreateVacationResponse, Holiday, Principal, RequestVacation, User, VacationDetails,
};
use crate::error::{BinnacleError, Result, VacationError};
use crate::repository::{HolidayRepository, UserRepository};
use crate::services::{MailService, VacationService};
use crate::validators::{CreateVacationValidation, UpdateVacationValidation, VacationValidator};

use super::find_user;

/// Public holidays and the user's own vacations of a period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidaysResponse {
    pub holidays: Vec<Holiday>,
    pub vacations: Vec<VacationDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacationSummary {
    pub charge_year: i32,
    pub corresponding_days: i64,
    pub remaining_days: i64,
}

pub struct VacationUseCases {
    vacation_service: Arc<VacationService>,
    validator: VacationValidator,
    users: Arc<dyn UserRepository>,
    holidays: Arc<dyn HolidayRepository>,
    mail_service: Arc<dyn MailService>,
}

impl VacationUseCases {
    pub fn new(
        vacation_service: Arc<VacationService>,
        validator: VacationValidator,
        users: Arc<dyn UserRepository>,
        holidays: Arc<dyn HolidayRepository>,
        mail_service: Arc<dyn MailService>,
    ) -> Self {
        VacationUseCases {
            vacation_service,
            validator,
            users,
            holidays,
            mail_service,
        }
    }

    pub async fn create_private_holiday_period(
        &self,
        request: &RequestVacation,
        principal: &Principal,
    ) -> Result<CreateVacationResponse> {
        if let Some(id) = request.id {
            return Err(BinnacleError::IllegalArgument(format!(
                "Cannot create vacation with id {}",
                id
            )));
        }
        check_description(request)?;
        let user = find_user(self.users.as_ref(), principal.user_id).await?;

        match self.validator.can_create_vacation_period(request, &user).await? {
            CreateVacationValidation::Success => {
                let response = self
                    .vacation_service
                    .create_vacation_period(request, &user)
                    .await?;
                self.notify(&user, &response, request).await;
                Ok(response)
            }
            CreateVacationValidation::Failure(reason) => {
                info!(user_id = user.id, ?reason, "Vacation request rejected");
                Err(reason.into_error(request))
            }
        }
    }

    pub async fn update_private_holiday_period(
        &self,
        request: &RequestVacation,
        principal: &Principal,
    ) -> Result<CreateVacationResponse> {
        check_description(request)?;
        let user = find_user(self.users.as_ref(), principal.user_id).await?;

        match self.validator.can_update_vacation_period(request, &user).await? {
            UpdateVacationValidation::Success(current) => {
                let response = self
                    .vacation_service
                    .update_vacation_period(request, &user, current)
                    .await?;
                self.notify(&user, &response, request).await;
                Ok(response)
            }
            UpdateVacationValidation::Failure(reason) => {
                info!(user_id = user.id, ?reason, "Vacation update rejected");
                Err(reason.into_error(request))
            }
        }
    }

    pub async fn get_holidays_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        principal: &Principal,
    ) -> Result<HolidaysResponse> {
        if start > end {
            return Err(BinnacleError::InvalidDateRange { start, end });
        }
        let holidays = self.holidays.find_between(start, end).await?;
        let vacations = self
            .vacation_service
            .get_vacations_between_dates(start, end, principal.user_id)
            .await?;
        Ok(HolidaysResponse {
            holidays,
            vacations,
        })
    }

    pub async fn get_holidays_by_year(
        &self,
        year: i32,
        principal: &Principal,
    ) -> Result<HolidaysResponse> {
        self.get_holidays_between(first_day_of_year(year), last_day_of_year(year), principal)
            .await
    }

    pub async fn get_vacations_by_charge_year(
        &self,
        year: i32,
        principal: &Principal,
    ) -> Result<Vec<VacationDetails>> {
        self.vacation_service
            .get_vacations_by_charge_year(year, principal.user_id)
            .await
    }

    pub async fn get_vacation_summary(
        &self,
        charge_year: i32,
        principal: &Principal,
    ) -> Result<VacationSummary> {
        let user = find_user(self.users.as_ref(), principal.user_id).await?;
        Ok(VacationSummary {
            charge_year,
            corresponding_days: self
                .vacation_service
                .corresponding_vacation_days(&user, charge_year),
            remaining_days: self
                .vacation_service
                .remaining_vacation_days(charge_year, &user)
                .await?,
        })
    }

    async fn notify(&self, user: &User, response: &CreateVacationResponse, request: &RequestVacation) {
        let description = request.description.as_deref().unwrap_or_default();
        if let Err(err) = self
            .mail_service
            .send_request_vacations_mail(&user.username, response.start_date, response.end_date, description)
            .await
        {
            warn!(user_id = user.id, error = %err, "Could not send vacation request mail");
        }
    }
}

fn check_description(request: &RequestVacation) -> Result<()> {
    if !request.is_description_valid() {
        return Err(VacationError::DescriptionTooLong(MAX_VACATION_DESCRIPTION_LENGTH).into());
    }
    Ok(())
}
