use chrono::{Datelike, Local};
use std::sync::Arc;
use tracing::debug;

use crate::domain::{RequestVacation, User, Vacation, VacationState};
use crate::error::{BinnacleError, Result, VacationError};
use crate::repository::VacationRepository;
use crate::services::VacationService;

/// Why a vacation request was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VacationFailureReason {
    VacationNotFound,
    UserUnauthorized,
    VacationAlreadyAccepted,
    InvalidDateRange,
    VacationRangeClosed,
    VacationBeforeHiringDate,
    VacationRequestOverlaps,
    VacationRequestEmpty,
    NoMoreDaysLeftInYear,
}

impl VacationFailureReason {
    pub fn into_error(self, request: &RequestVacation) -> BinnacleError {
        match self {
            VacationFailureReason::VacationNotFound => {
                VacationError::NotFound(request.id.unwrap_or_default()).into()
            }
            VacationFailureReason::UserUnauthorized => BinnacleError::UserPermission,
            VacationFailureReason::VacationAlreadyAccepted => VacationError::AcceptedState.into(),
            VacationFailureReason::InvalidDateRange => VacationError::DateRange {
                start: request.start_date,
                end: request.end_date,
            }
            .into(),
            VacationFailureReason::VacationRangeClosed => VacationError::RangeClosed.into(),
            VacationFailureReason::VacationBeforeHiringDate => {
                VacationError::BeforeHiringDate.into()
            }
            VacationFailureReason::VacationRequestOverlaps => VacationError::RequestOverlaps.into(),
            VacationFailureReason::VacationRequestEmpty => VacationError::RequestEmpty.into(),
            VacationFailureReason::NoMoreDaysLeftInYear => {
                VacationError::NoMoreDaysLeftInYear.into()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateVacationValidation {
    Success,
    Failure(VacationFailureReason),
}

/// On success carries the stored vacation being replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateVacationValidation {
    Success(Vacation),
    Failure(VacationFailureReason),
}

pub struct VacationValidator {
    vacations: Arc<dyn VacationRepository>,
    vacation_service: Arc<VacationService>,
}

impl VacationValidator {
    pub fn new(vacations: Arc<dyn VacationRepository>, vacation_service: Arc<VacationService>) -> Self {
        VacationValidator {
            vacations,
            vacation_service,
        }
    }

    pub async fn can_create_vacation_period(
        &self,
        request: &RequestVacation,
        user: &User,
    ) -> Result<CreateVacationValidation> {
        Ok(match self.check_request(request, user, None).await? {
            Some(reason) => CreateVacationValidation::Failure(reason),
            None => CreateVacationValidation::Success,
        })
    }

    pub async fn can_update_vacation_period(
        &self,
        request: &RequestVacation,
        user: &User,
    ) -> Result<UpdateVacationValidation> {
        let current = match request.id {
            Some(id) => self.vacations.find_by_id(id).await?,
            None => None,
        };
        let Some(current) = current else {
            return Ok(UpdateVacationValidation::Failure(
                VacationFailureReason::VacationNotFound,
            ));
        };
        if current.user_id != user.id {
            return Ok(UpdateVacationValidation::Failure(
                VacationFailureReason::UserUnauthorized,
            ));
        }
        if current.state == VacationState::Accept {
            return Ok(UpdateVacationValidation::Failure(
                VacationFailureReason::VacationAlreadyAccepted,
            ));
        }

        Ok(match self.check_request(request, user, Some(&current)).await? {
            Some(reason) => UpdateVacationValidation::Failure(reason),
            None => UpdateVacationValidation::Success(current),
        })
    }

    async fn check_request(
        &self,
        request: &RequestVacation,
        user: &User,
        current: Option<&Vacation>,
    ) -> Result<Option<VacationFailureReason>> {
        if !request.is_date_range_valid() {
            return Ok(Some(VacationFailureReason::InvalidDateRange));
        }
        if request.start_date.year() < Local::now().year() - 1 {
            return Ok(Some(VacationFailureReason::VacationRangeClosed));
        }
        if user.is_before_hiring_date(request.start_date) {
            return Ok(Some(VacationFailureReason::VacationBeforeHiringDate));
        }

        let current_id = current.and_then(|vacation| vacation.id);
        let overlaps = self
            .vacations
            .find_between(request.start_date, request.end_date, user.id)
            .await?
            .iter()
            .any(|other| other.state.is_requested() && other.id != current_id);
        if overlaps {
            return Ok(Some(VacationFailureReason::VacationRequestOverlaps));
        }

        let days = self
            .vacation_service
            .requested_days(request.start_date, request.end_date)
            .await?;
        if days.is_empty() {
            return Ok(Some(VacationFailureReason::VacationRequestEmpty));
        }

        let remaining = self
            .vacation_service
            .remaining_vacation_days(request.charge_year, user)
            .await?
            + self.credited_days(request, current).await?;
        debug!(user_id = user.id, requested = days.len(), remaining, "Checked vacation allowance");
        if days.len() as i64 > remaining {
            return Ok(Some(VacationFailureReason::NoMoreDaysLeftInYear));
        }
        Ok(None)
    }

    /// Days of the replaced vacation given back when it is charged to the same year
    async fn credited_days(&self, request: &RequestVacation, current: Option<&Vacation>) -> Result<i64> {
        match current {
            Some(current)
                if current.state.is_requested()
                    && current.charge_year_value() == request.charge_year =>
            {
                let days = self
                    .vacation_service
                    .requested_days(current.start_date, current.end_date)
                    .await?;
                Ok(days.len() as i64)
            }
            _ => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_fixtures::user;
    use crate::services::CalendarFactory;
    use crate::store::JsonStore;
    use chrono::{Duration, NaiveDate, Weekday};

    struct Fixture {
        store: Arc<JsonStore>,
        validator: VacationValidator,
        service: Arc<VacationService>,
    }

    fn fixture(days_per_year: u32) -> Fixture {
        let store = Arc::new(JsonStore::in_memory());
        let service = Arc::new(VacationService::new(
            store.clone(),
            CalendarFactory::new(store.clone()),
            days_per_year,
        ));
        let validator = VacationValidator::new(store.clone(), service.clone());
        Fixture {
            store,
            validator,
            service,
        }
    }

    fn this_year() -> i32 {
        Local::now().year()
    }

    /// First Monday of `month` in the current year
    fn monday(month: u32) -> NaiveDate {
        let mut day = NaiveDate::from_ymd_opt(this_year(), month, 1).unwrap();
        while day.weekday() != Weekday::Mon {
            day = day + Duration::days(1);
        }
        day
    }

    fn request(start: NaiveDate, end: NaiveDate) -> RequestVacation {
        RequestVacation {
            id: None,
            start_date: start,
            end_date: end,
            charge_year: this_year(),
            description: None,
        }
    }

    async fn create_failure(fixture: &Fixture, request: &RequestVacation) -> Option<VacationFailureReason> {
        match fixture
            .validator
            .can_create_vacation_period(request, &user())
            .await
            .unwrap()
        {
            CreateVacationValidation::Success => None,
            CreateVacationValidation::Failure(reason) => Some(reason),
        }
    }

    #[tokio::test]
    async fn test_valid_request() {
        let fixture = fixture(22);
        let week = request(monday(6), monday(6) + Duration::days(4));
        assert_eq!(create_failure(&fixture, &week).await, None);
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let fixture = fixture(22);

        let reversed = request(monday(6), monday(6) - Duration::days(1));
        assert_eq!(
            create_failure(&fixture, &reversed).await,
            Some(VacationFailureReason::InvalidDateRange)
        );

        let old = NaiveDate::from_ymd_opt(this_year() - 2, 6, 1).unwrap();
        assert_eq!(
            create_failure(&fixture, &request(old, old)).await,
            Some(VacationFailureReason::VacationRangeClosed)
        );

        let saturday = monday(6) + Duration::days(5);
        let weekend = request(saturday, saturday + Duration::days(1));
        assert_eq!(
            create_failure(&fixture, &weekend).await,
            Some(VacationFailureReason::VacationRequestEmpty)
        );
    }

    #[tokio::test]
    async fn test_before_hiring_date() {
        let fixture = fixture(22);
        let mut hired_later = user();
        hired_later.hiring_date = monday(7);

        let validation = fixture
            .validator
            .can_create_vacation_period(&request(monday(6), monday(6)), &hired_later)
            .await
            .unwrap();
        assert_eq!(
            validation,
            CreateVacationValidation::Failure(VacationFailureReason::VacationBeforeHiringDate)
        );
    }

    #[tokio::test]
    async fn test_overlapping_request() {
        let fixture = fixture(22);
        let week = request(monday(6), monday(6) + Duration::days(4));
        fixture.service.create_vacation_period(&week, &user()).await.unwrap();

        let overlapping = request(monday(6) + Duration::days(4), monday(6) + Duration::days(7));
        assert_eq!(
            create_failure(&fixture, &overlapping).await,
            Some(VacationFailureReason::VacationRequestOverlaps)
        );

        let mut cancelled = VacationRepository::find_by_id(fixture.store.as_ref(), 1)
            .await
            .unwrap()
            .unwrap();
        cancelled.state = VacationState::Cancelled;
        VacationRepository::update(fixture.store.as_ref(), cancelled).await.unwrap();
        assert_eq!(create_failure(&fixture, &overlapping).await, None);
    }

    #[tokio::test]
    async fn test_no_more_days_left() {
        let fixture = fixture(3);
        let week = request(monday(6), monday(6) + Duration::days(4));
        assert_eq!(
            create_failure(&fixture, &week).await,
            Some(VacationFailureReason::NoMoreDaysLeftInYear)
        );

        let three_days = request(monday(6), monday(6) + Duration::days(2));
        assert_eq!(create_failure(&fixture, &three_days).await, None);
    }

    #[tokio::test]
    async fn test_update_credits_replaced_days() {
        let fixture = fixture(3);
        let three_days = request(monday(6), monday(6) + Duration::days(2));
        fixture.service.create_vacation_period(&three_days, &user()).await.unwrap();

        let moved = RequestVacation {
            id: Some(1),
            ..request(monday(6) + Duration::days(1), monday(6) + Duration::days(3))
        };
        let validation = fixture
            .validator
            .can_update_vacation_period(&moved, &user())
            .await
            .unwrap();
        assert!(matches!(validation, UpdateVacationValidation::Success(current) if current.id == Some(1)));
    }

    #[tokio::test]
    async fn test_update_failures() {
        let fixture = fixture(22);
        let missing = RequestVacation {
            id: Some(9),
            ..request(monday(6), monday(6))
        };
        assert_eq!(
            fixture.validator.can_update_vacation_period(&missing, &user()).await.unwrap(),
            UpdateVacationValidation::Failure(VacationFailureReason::VacationNotFound)
        );

        fixture
            .service
            .create_vacation_period(&request(monday(6), monday(6)), &user())
            .await
            .unwrap();
        let existing = RequestVacation {
            id: Some(1),
            ..request(monday(6), monday(6))
        };

        let mut someone_else = user();
        someone_else.id = 2;
        assert_eq!(
            fixture.validator.can_update_vacation_period(&existing, &someone_else).await.unwrap(),
            UpdateVacationValidation::Failure(VacationFailureReason::UserUnauthorized)
        );

        let mut accepted = VacationRepository::find_by_id(fixture.store.as_ref(), 1)
            .await
            .unwrap()
            .unwrap();
        accepted.state = VacationState::Accept;
        VacationRepository::update(fixture.store.as_ref(), accepted).await.unwrap();
        assert_eq!(
            fixture.validator.can_update_vacation_period(&existing, &user()).await.unwrap(),
            UpdateVacationValidation::Failure(VacationFailureReason::VacationAlreadyAccepted)
        );
    }

    #[test]
    fn test_failure_into_error() {
        let request = request(monday(6), monday(6));
        assert_eq!(
            VacationFailureReason::NoMoreDaysLeftInYear.into_error(&request).code(),
            "NO_MORE_DAYS_LEFT_IN_YEAR"
        );
        assert_eq!(
            VacationFailureReason::UserUnauthorized.into_error(&request).code(),
            "USER_PERMISSION"
        );
    }
}
