use chrono::{Datelike, Local, NaiveDateTime};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Attachment, AttachmentInfo, Principal};
use crate::error::{AttachmentError, Result};
use crate::repository::{AttachmentInfoRepository, AttachmentStorage};

/// Uploaded files, kept as temporary until they are older than the TTL
pub struct AttachmentUseCases {
    infos: Arc<dyn AttachmentInfoRepository>,
    storage: Arc<dyn AttachmentStorage>,
    /// mime type -> extension
    supported_mime_types: BTreeMap<String, String>,
    ttl_hours: i64,
}

impl AttachmentUseCases {
    pub fn new(
        infos: Arc<dyn AttachmentInfoRepository>,
        storage: Arc<dyn AttachmentStorage>,
        supported_mime_types: BTreeMap<String, String>,
        ttl_hours: i64,
    ) -> Self {
        AttachmentUseCases {
            infos,
            storage,
            supported_mime_types,
            ttl_hours,
        }
    }

    pub fn attachment_path(id: Uuid, upload_date: NaiveDateTime, extension: &str) -> String {
        format!(
            "attachments/{}/{}/{}.{}",
            upload_date.year(),
            upload_date.month(),
            id,
            extension
        )
    }

    pub async fn store_attachment(
        &self,
        file_name: &str,
        mime_type: &str,
        file: &[u8],
        principal: &Principal,
    ) -> Result<AttachmentInfo> {
        let extension = self
            .supported_mime_types
            .get(mime_type)
            .ok_or_else(|| AttachmentError::MimeTypeNotSupported(mime_type.to_string()))?;

        let id = Uuid::new_v4();
        let upload_date = Local::now().naive_local();
        let path = Self::attachment_path(id, upload_date, extension);

        self.storage.store(&path, file).await?;
        let info = self
            .infos
            .save(AttachmentInfo {
                id,
                user_id: principal.user_id,
                path,
                file_name: file_name.to_string(),
                mime_type: mime_type.to_string(),
                upload_date,
                is_temporary: true,
            })
            .await?;

        info!(attachment_id = %id, user_id = principal.user_id, size = file.len(), "Attachment stored");
        Ok(info)
    }

    /// Only the uploader and admins can read an attachment
    pub async fn get_attachment(&self, id: Uuid, principal: &Principal) -> Result<Attachment> {
        let info = self
            .infos
            .find_by_id(id)
            .await?
            .filter(|info| {
                principal.can_access_all_attachments() || info.user_id == principal.user_id
            })
            .ok_or(AttachmentError::NotFound(id))?;

        let file = self
            .storage
            .retrieve(&info.path)
            .await?
            .ok_or_else(|| AttachmentError::FileNotFound(info.path.clone()))?;
        Ok(Attachment { info, file })
    }

    pub async fn delete_temporary_attachments(&self) -> Result<usize> {
        self.delete_temporary_attachments_at(Local::now().naive_local())
            .await
    }

    /// Removes temporary attachments uploaded more than the TTL before `now`.
    /// Returns how many were removed.
    pub async fn delete_temporary_attachments_at(&self, now: NaiveDateTime) -> Result<usize> {
        let outdated: Vec<AttachmentInfo> = self
            .infos
            .find_temporary()
            .await?
            .into_iter()
            .filter(|info| info.is_outdated(now, self.ttl_hours))
            .collect();

        for info in &outdated {
            if !self.storage.delete(&info.path).await? {
                warn!(attachment_id = %info.id, path = %info.path, "Attachment file already missing");
            }
        }
        let ids: Vec<Uuid> = outdated.iter().map(|info| info.id).collect();
        self.infos.delete(&ids).await?;

        info!(deleted = ids.len(), "Temporary attachments deleted");
        Ok(ids.len())
    }
}
