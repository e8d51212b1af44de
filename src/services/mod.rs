pub mod activity;
pub mod calendar;
pub mod evidence;
pub mod mail;
pub mod vacation;

pub use activity::ActivityService;
pub use calendar::{ActivityCalendarService, CalendarFactory};
pub use evidence::ActivityEvidenceService;
pub use mail::{MailService, TracingMailService};
pub use vacation::VacationService;
