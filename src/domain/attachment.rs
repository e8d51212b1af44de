use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    pub id: Uuid,
    pub user_id: i64,
    pub path: String,
    pub file_name: String,
    pub mime_type: String,
    pub upload_date: NaiveDateTime,
    pub is_temporary: bool,
}

impl AttachmentInfo {
    /// Uploaded more than `ttl_hours` before `now`
    pub fn is_outdated(&self, now: NaiveDateTime, ttl_hours: i64) -> bool {
        self.upload_date < now - Duration::hours(ttl_hours)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub info: AttachmentInfo,
    pub file: Vec<u8>,
}
