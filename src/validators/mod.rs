pub mod activity;
pub mod vacation;

pub use activity::ActivityValidator;
pub use vacation::{
    CreateVacationValidation, UpdateVacationValidation, VacationFailureReason, VacationValidator,
};
