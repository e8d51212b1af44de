//! Domain model: activities registered against project roles, vacations,
//! attachments and the calendars used to measure them.

pub mod activity;
pub mod attachment;
pub mod calendar;
pub mod project;
pub mod summary;
pub mod time;
pub mod user;
pub mod vacation;

pub use activity::{Activity, ActivityFilter, ApprovalState, Evidence};
pub use attachment::{Attachment, AttachmentInfo};
pub use calendar::{Calendar, Holiday};
pub use project::{MaxTimeAllowed, Organization, Project, ProjectRole, RequireEvidence, TimeInfo};
pub use summary::{DailyWorkingTime, MonthlyRoles, MonthlySummary, ProjectRoleUser};
pub use time::{DateInterval, TimeInterval, TimeUnit};
pub use user::{Principal, User};
pub use vacation::{CreateVacationResponse, RequestVacation, Vacation, VacationDetails, VacationState};
