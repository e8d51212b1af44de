use chrono::{Datelike, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

use crate::domain::Evidence;
use crate::error::{ActivityError, AttachmentError, Result};
use crate::repository::AttachmentStorage;

/// Keeps activity evidences in the attachment storage under
/// `{year}/{month}/{activity_id}.{extension}`, dated by the activity insert date
pub struct ActivityEvidenceService {
    storage: Arc<dyn AttachmentStorage>,
    /// mime type -> extension
    supported_mime_types: BTreeMap<String, String>,
}

impl ActivityEvidenceService {
    pub fn new(
        storage: Arc<dyn AttachmentStorage>,
        supported_mime_types: BTreeMap<String, String>,
    ) -> Self {
        ActivityEvidenceService {
            storage,
            supported_mime_types,
        }
    }

    pub fn evidence_path(activity_id: i64, insert_date: NaiveDateTime, extension: &str) -> String {
        format!(
            "{}/{}/{}.{}",
            insert_date.year(),
            insert_date.month(),
            activity_id,
            extension
        )
    }

    /// Stores `evidence`, replacing any previous evidence of the activity
    pub async fn store_activity_evidence(
        &self,
        activity_id: i64,
        evidence: &Evidence,
        insert_date: NaiveDateTime,
    ) -> Result<()> {
        let extension = self
            .supported_mime_types
            .get(&evidence.mime_type)
            .ok_or_else(|| ActivityError::InvalidEvidenceMimeType(evidence.mime_type.clone()))?;
        let bytes = evidence.decode()?;

        self.delete_activity_evidence(activity_id, insert_date).await?;

        let path = Self::evidence_path(activity_id, insert_date, extension);
        self.storage.store(&path, &bytes).await?;
        debug!(activity_id, path = %path, "Evidence stored");
        Ok(())
    }

    /// Returns whether an evidence was found and deleted
    pub async fn delete_activity_evidence(
        &self,
        activity_id: i64,
        insert_date: NaiveDateTime,
    ) -> Result<bool> {
        let mut deleted = false;
        for extension in self.extensions() {
            let path = Self::evidence_path(activity_id, insert_date, extension);
            if self.storage.delete(&path).await? {
                debug!(activity_id, path = %path, "Evidence deleted");
                deleted = true;
            }
        }
        Ok(deleted)
    }

    pub async fn get_activity_evidence(
        &self,
        activity_id: i64,
        insert_date: NaiveDateTime,
    ) -> Result<Evidence> {
        for (mime_type, extension) in &self.supported_mime_types {
            let path = Self::evidence_path(activity_id, insert_date, extension);
            if let Some(bytes) = self.storage.retrieve(&path).await? {
                return Ok(Evidence::from_bytes(mime_type, &bytes));
            }
        }
        Err(AttachmentError::FileNotFound(Self::evidence_path(activity_id, insert_date, "*")).into())
    }

    pub async fn get_activity_evidence_as_base64(
        &self,
        activity_id: i64,
        insert_date: NaiveDateTime,
    ) -> Result<String> {
        Ok(self
            .get_activity_evidence(activity_id, insert_date)
            .await?
            .base64_data)
    }

    fn extensions(&self) -> BTreeSet<&str> {
        self.supported_mime_types
            .values()
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_mime_types;
    use crate::domain::test_fixtures::datetime;
    use crate::store::JsonStore;

    fn service_with(store: Arc<JsonStore>) -> ActivityEvidenceService {
        ActivityEvidenceService::new(store, default_mime_types())
    }

    fn png() -> Evidence {
        Evidence::from_data_url("data:image/png;base64,SGVsbG8=").unwrap()
    }

    #[test]
    fn test_evidence_path() {
        let insert_date = datetime(2022, 4, 8, 10, 30);
        assert_eq!(ActivityEvidenceService::evidence_path(2, insert_date, "png"), "2022/4/2.png");
    }

    #[tokio::test]
    async fn test_store_and_get_evidence() {
        let store = Arc::new(JsonStore::in_memory());
        let service = service_with(store.clone());
        let insert_date = datetime(2022, 4, 8, 10, 30);

        service.store_activity_evidence(2, &png(), insert_date).await.unwrap();
        assert_eq!(store.retrieve("2022/4/2.png").await.unwrap(), Some(b"Hello".to_vec()));

        let evidence = service.get_activity_evidence(2, insert_date).await.unwrap();
        assert_eq!(evidence, png());
        assert_eq!(
            service.get_activity_evidence_as_base64(2, insert_date).await.unwrap(),
            "SGVsbG8="
        );
    }

    #[tokio::test]
    async fn test_store_replaces_other_extension() {
        let store = Arc::new(JsonStore::in_memory());
        let service = service_with(store.clone());
        let insert_date = datetime(2022, 4, 8, 10, 30);

        service.store_activity_evidence(2, &png(), insert_date).await.unwrap();
        let pdf = Evidence::from_data_url("data:application/pdf;base64,JVBERi0=").unwrap();
        service.store_activity_evidence(2, &pdf, insert_date).await.unwrap();

        assert_eq!(store.retrieve("2022/4/2.png").await.unwrap(), None);
        assert_eq!(service.get_activity_evidence(2, insert_date).await.unwrap(), pdf);
    }

    #[tokio::test]
    async fn test_unsupported_mime_type() {
        let service = service_with(Arc::new(JsonStore::in_memory()));
        let evidence = Evidence::from_data_url("data:text/plain;base64,SGVsbG8=").unwrap();

        let err = service
            .store_activity_evidence(2, &evidence, datetime(2022, 4, 8, 10, 30))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_EVIDENCE_MIME_TYPE");
    }

    #[tokio::test]
    async fn test_delete_evidence() {
        let service = service_with(Arc::new(JsonStore::in_memory()));
        let insert_date = datetime(2022, 4, 8, 10, 30);

        assert!(!service.delete_activity_evidence(2, insert_date).await.unwrap());

        service.store_activity_evidence(2, &png(), insert_date).await.unwrap();
        assert!(service.delete_activity_evidence(2, insert_date).await.unwrap());

        let err = service.get_activity_evidence(2, insert_date).await.unwrap_err();
        assert_eq!(err.code(), "RESOURCE_NOT_FOUND");
    }
}
