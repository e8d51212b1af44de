//! Operations exposed to the entry points. Each one resolves the acting
//! user from an explicit [`Principal`](crate::domain::Principal).

pub mod activity;
pub mod attachment;
pub mod calendar;
pub mod organization;
pub mod project_role;
pub mod reminder;
pub mod user;
pub mod vacation;

pub use activity::{ActivityRequest, ActivityResponse, ActivityUseCases};
pub use attachment::AttachmentUseCases;
pub use calendar::CalendarUseCases;
pub use organization::ImputableOrganizationsUseCase;
pub use project_role::ProjectRoleUseCases;
pub use reminder::EvidenceReminderUseCase;
pub use user::UsersRetrievalUseCase;
pub use vacation::{HolidaysResponse, VacationSummary, VacationUseCases};

use crate::domain::User;
use crate::error::{BinnacleError, Result};
use crate::repository::UserRepository;

pub(crate) async fn find_user(users: &dyn UserRepository, id: i64) -> Result<User> {
    users
        .find_by_id(id)
        .await?
        .ok_or(BinnacleError::UserNotFound(id))
}
