//! Custom error types for the binnacle application
//!
//! Every domain failure carries a stable machine code (see [`BinnacleError::code`])
//! so callers can react to the rule that was broken without parsing messages.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::time::TimeUnit;

/// Main error type for the binnacle application
#[derive(Error, Debug)]
pub enum BinnacleError {
    /// Activity rules and lookups
    #[error("Activity error: {0}")]
    Activity(#[from] ActivityError),

    /// Vacation rules and lookups
    #[error("Vacation error: {0}")]
    Vacation(#[from] VacationError),

    /// Attachment and evidence storage
    #[error("Attachment error: {0}")]
    Attachment(#[from] AttachmentError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("User has no permission to perform this operation")]
    UserPermission,

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Start date {start} must not be after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Date/time parsing errors
    #[error("Date/time error: {0}")]
    DateTime(String),

    #[error("{0}")]
    Other(String),
}

/// Activity-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActivityError {
    #[error("Start {start} must not be after end {end}")]
    InvalidTimeInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Activity (id: {0}) not found")]
    ActivityNotFound(i64),

    #[error("Project role (id: {0}) not found")]
    ProjectRoleNotFound(i64),

    #[error("Project (id: {0}) not found")]
    ProjectNotFound(i64),

    #[error("{0}")]
    NoEvidenceInActivity(String),

    #[error("The project is closed")]
    ProjectClosed,

    #[error("The period of the activity is closed")]
    ActivityPeriodClosed,

    #[error("The project is blocked until {block_date}")]
    ProjectBlocked { block_date: NaiveDate },

    #[error("There is already an activity in the indicated period of time")]
    OverlapsAnotherTime,

    #[error("The start of the activity is prior to the user hiring date")]
    ActivityBeforeHiringDate,

    #[error("The start of the activity is prior to the date the project was created")]
    ActivityBeforeProjectCreationDate,

    #[error("An activity measured in minutes cannot span more than one day")]
    ActivityPeriodNotValid,

    #[error("The activity exceeds the maximum of {max_allowed} {time_unit} allowed per activity")]
    MaxTimePerActivityRole {
        max_allowed: i64,
        time_unit: TimeUnit,
    },

    #[error(
        "There is a limit of {max_allowed_hours} hours per year for this role, {remaining_hours} hours remain for {year}"
    )]
    MaxHoursPerRole {
        max_allowed_hours: f64,
        remaining_hours: f64,
        year: i32,
    },

    #[error("The activity cannot be approved in its current approval state")]
    InvalidActivityApprovalState,

    #[error("Evidence must use the format data:<mediatype>;base64,<data>")]
    InvalidEvidenceFormat,

    #[error("Unsupported evidence mime type: {0}")]
    InvalidEvidenceMimeType(String),

    #[error("Description must not exceed {0} characters")]
    DescriptionTooLong(usize),
}

/// Vacation-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VacationError {
    #[error("Vacation start {start} must not be after end {end}")]
    DateRange { start: NaiveDate, end: NaiveDate },

    #[error("The vacation period is closed")]
    RangeClosed,

    #[error("The vacation starts before the user hiring date")]
    BeforeHiringDate,

    #[error("The vacation overlaps another request")]
    RequestOverlaps,

    #[error("The vacation period does not contain any workable day")]
    RequestEmpty,

    #[error("No more vacation days left in the charge year")]
    NoMoreDaysLeftInYear,

    #[error("The vacation has already been accepted")]
    AcceptedState,

    #[error("Vacation (id: {0}) not found")]
    NotFound(i64),

    #[error("Description must not exceed {0} characters")]
    DescriptionTooLong(usize),
}

/// Attachment and evidence storage errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttachmentError {
    #[error("Attachment mime type not supported: {0}")]
    MimeTypeNotSupported(String),

    #[error("Attachment (id: {0}) not found")]
    NotFound(Uuid),

    #[error("Attachment file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid attachment data: {0}")]
    InvalidData(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No user configured. Run `binnacle config --user <id>` first")]
    UserNotConfigured,

    #[error("Could not determine the {0} directory")]
    DirectoryUnavailable(&'static str),

    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration file: {0}")]
    SaveFailed(String),
}

/// Storage-related errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to load data file: {0}")]
    LoadFailed(String),

    #[error("Failed to save data file: {0}")]
    SaveFailed(String),

    #[error("Stored {kind} (id: {id}) references a missing record")]
    MissingReference { kind: &'static str, id: String },
}

impl BinnacleError {
    /// Stable machine code for the failure
    pub fn code(&self) -> &'static str {
        match self {
            BinnacleError::Activity(err) => err.code(),
            BinnacleError::Vacation(err) => err.code(),
            BinnacleError::Attachment(err) => err.code(),
            BinnacleError::Config(_) => "CONFIGURATION_ERROR",
            BinnacleError::Store(_) => "STORAGE_ERROR",
            BinnacleError::UserNotFound(_) => "RESOURCE_NOT_FOUND",
            BinnacleError::UserPermission => "USER_PERMISSION",
            BinnacleError::IllegalArgument(_) => "ILLEGAL_ARGUMENT",
            BinnacleError::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            BinnacleError::Io(_) | BinnacleError::Json(_) | BinnacleError::Other(_) => {
                "INTERNAL_ERROR"
            }
            BinnacleError::DateTime(_) => "INVALID_DATE",
        }
    }
}

impl ActivityError {
    pub fn code(&self) -> &'static str {
        match self {
            ActivityError::InvalidTimeInterval { .. } => "INVALID_DATE_RANGE",
            ActivityError::ActivityNotFound(_)
            | ActivityError::ProjectRoleNotFound(_)
            | ActivityError::ProjectNotFound(_) => "RESOURCE_NOT_FOUND",
            ActivityError::NoEvidenceInActivity(_) => "NO_EVIDENCE",
            ActivityError::ProjectClosed => "CLOSED_PROJECT",
            ActivityError::ActivityPeriodClosed => "ACTIVITY_PERIOD_CLOSED",
            ActivityError::ProjectBlocked { .. } => "BLOCKED_PROJECT",
            ActivityError::OverlapsAnotherTime => "ACTIVITY_TIME_OVERLAPS",
            ActivityError::ActivityBeforeHiringDate => "ACTIVITY_BEFORE_HIRING_DATE",
            ActivityError::ActivityBeforeProjectCreationDate => {
                "ACTIVITY_BEFORE_PROJECT_CREATION_DATE"
            }
            ActivityError::ActivityPeriodNotValid => "INVALID_ACTIVITY_PERIOD",
            ActivityError::MaxTimePerActivityRole { .. } => "MAX_TIME_PER_ACTIVITY_EXCEEDED",
            ActivityError::MaxHoursPerRole { .. } => "MAX_REGISTRABLE_HOURS_LIMIT_EXCEEDED",
            ActivityError::InvalidActivityApprovalState => "INVALID_ACTIVITY_APPROVAL_STATE",
            ActivityError::InvalidEvidenceFormat => "INVALID_EVIDENCE",
            ActivityError::InvalidEvidenceMimeType(_) => "INVALID_EVIDENCE_MIME_TYPE",
            ActivityError::DescriptionTooLong(_) => "INVALID_DESCRIPTION",
        }
    }
}

impl VacationError {
    pub fn code(&self) -> &'static str {
        match self {
            VacationError::DateRange { .. } => "INVALID_DATE_RANGE",
            VacationError::RangeClosed => "VACATION_RANGE_CLOSED",
            VacationError::BeforeHiringDate => "VACATION_BEFORE_HIRING_DATE",
            VacationError::RequestOverlaps => "VACATION_REQUEST_OVERLAPS",
            VacationError::RequestEmpty => "VACATION_REQUEST_EMPTY",
            VacationError::NoMoreDaysLeftInYear => "NO_MORE_DAYS_LEFT_IN_YEAR",
            VacationError::AcceptedState => "VACATION_ALREADY_ACCEPTED",
            VacationError::NotFound(_) => "RESOURCE_NOT_FOUND",
            VacationError::DescriptionTooLong(_) => "INVALID_DESCRIPTION",
        }
    }
}

impl AttachmentError {
    pub fn code(&self) -> &'static str {
        match self {
            AttachmentError::MimeTypeNotSupported(_) => "ATTACHMENT_MIMETYPE_NOT_SUPPORTED",
            AttachmentError::NotFound(_) | AttachmentError::FileNotFound(_) => {
                "RESOURCE_NOT_FOUND"
            }
            AttachmentError::InvalidData(_) => "INVALID_ATTACHMENT",
        }
    }
}

/// Result type alias for the binnacle application
pub type Result<T> = std::result::Result<T, BinnacleError>;

impl From<anyhow::Error> for BinnacleError {
    fn from(err: anyhow::Error) -> Self {
        BinnacleError::Other(err.to_string())
    }
}

impl From<chrono::ParseError> for BinnacleError {
    fn from(err: chrono::ParseError) -> Self {
        BinnacleError::DateTime(err.to_string())
    }
}

impl From<base64::DecodeError> for BinnacleError {
    fn from(err: base64::DecodeError) -> Self {
        BinnacleError::Attachment(AttachmentError::InvalidData(err.to_string()))
    }
}
