//! Pending-upload recovery state
//!
//! Tracks the single photo of an in-progress form independently of whether
//! its record has been saved. A photo whose upload failed after the record
//! was saved stays here, byte-for-byte unchanged, until a manual retry
//! succeeds or the user picks another photo.

use crate::models::{RecordId, StagedPhoto};
use crate::upload::{PhotoUploader, UploadError};

/// Where the form's photo currently stands
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    /// Photo compressed and ready, record not saved yet
    Staged(StagedPhoto),
    /// Record saved, photo upload failed
    Pending {
        record_id: RecordId,
        photo: StagedPhoto,
    },
}

#[derive(Debug)]
pub enum RetryError {
    NothingPending,
    Upload(UploadError),
}

impl std::fmt::Display for RetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryError::NothingPending => write!(f, "No photo is waiting for upload"),
            RetryError::Upload(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RetryError {}

impl From<UploadError> for RetryError {
    fn from(err: UploadError) -> Self {
        RetryError::Upload(err)
    }
}

/// Single-writer holder of the form's photo and its pending flag
#[derive(Debug, Default)]
pub struct PhotoSlot {
    state: UploadState,
}

impl PhotoSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// Staged or pending photo, if any
    pub fn photo(&self) -> Option<&StagedPhoto> {
        match &self.state {
            UploadState::Idle => None,
            UploadState::Staged(photo) => Some(photo),
            UploadState::Pending { photo, .. } => Some(photo),
        }
    }

    /// Replaces whatever photo is held. A pending upload for the previous
    /// photo is abandoned and never retried.
    pub fn stage(&mut self, photo: StagedPhoto) {
        if let UploadState::Pending { record_id, photo: old } = &self.state {
            log::warn!(
                "Abandoning pending upload of {} for record {}",
                old.file_name,
                record_id
            );
        }
        log::debug!("Staged photo {}", photo.file_name);
        self.state = UploadState::Staged(photo);
    }

    /// Flags the held photo as pending for `record_id`.
    /// Returns false (and changes nothing) when no photo is held.
    pub fn mark_pending(&mut self, record_id: RecordId) -> bool {
        match std::mem::take(&mut self.state) {
            UploadState::Idle => false,
            UploadState::Staged(photo) | UploadState::Pending { photo, .. } => {
                log::info!(
                    "Photo {} pending upload for record {}",
                    photo.file_name,
                    record_id
                );
                self.state = UploadState::Pending { record_id, photo };
                true
            }
        }
    }

    /// Drops the photo and any pending flag (photo abandoned)
    pub fn clear_pending(&mut self) {
        if let UploadState::Pending { record_id, .. } = &self.state {
            log::info!("Cleared pending photo for record {}", record_id);
        }
        self.state = UploadState::Idle;
    }

    /// Upload confirmed by the server; the photo is no longer needed
    pub fn mark_uploaded(&mut self) {
        self.state = UploadState::Idle;
    }

    pub fn is_pending(&self, record_id: RecordId) -> bool {
        matches!(&self.state, UploadState::Pending { record_id: id, .. } if *id == record_id)
    }

    pub fn pending_record(&self) -> Option<RecordId> {
        match &self.state {
            UploadState::Pending { record_id, .. } => Some(*record_id),
            _ => None,
        }
    }

    /// Retries the pending upload. Success returns to idle; failure keeps
    /// the pending photo untouched.
    pub async fn retry_upload<U: PhotoUploader>(&mut self, uploader: &U) -> Result<(), RetryError> {
        let UploadState::Pending { record_id, photo } = &self.state else {
            return Err(RetryError::NothingPending);
        };
        let record_id = *record_id;

        let result = uploader.upload(record_id, photo).await;
        match result {
            Ok(()) => {
                log::info!("Retried photo upload for record {} succeeded", record_id);
                self.mark_uploaded();
                Ok(())
            }
            Err(e) => {
                log::warn!("Retried photo upload for record {} failed: {}", record_id, e);
                Err(RetryError::Upload(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::UploadResult;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Uploader answering from a script and recording every call
    #[derive(Default)]
    struct ScriptedUploader {
        results: Mutex<VecDeque<UploadResult<()>>>,
        calls: Mutex<Vec<(RecordId, StagedPhoto)>>,
    }

    impl ScriptedUploader {
        fn new(results: Vec<UploadResult<()>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl PhotoUploader for ScriptedUploader {
        async fn upload(&self, record_id: RecordId, photo: &StagedPhoto) -> UploadResult<()> {
            self.calls.lock().unwrap().push((record_id, photo.clone()));
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(UploadError::Timeout))
        }
    }

    fn photo(name: &str) -> StagedPhoto {
        StagedPhoto {
            local_path: PathBuf::from(format!("/cache/{}", name)),
            file_name: name.to_string(),
            mime_type: "image/jpeg".to_string(),
            size_bytes: Some(100_000),
        }
    }

    /// A pending flag must always come with a retryable photo
    fn assert_no_pending_without_photo(slot: &PhotoSlot) {
        if slot.pending_record().is_some() {
            assert!(slot.photo().is_some());
        }
    }

    #[test]
    fn test_stage_then_mark_pending() {
        let mut slot = PhotoSlot::new();
        assert_eq!(slot.state(), &UploadState::Idle);

        slot.stage(photo("a.jpg"));
        assert!(!slot.is_pending(RecordId(1)));

        assert!(slot.mark_pending(RecordId(1)));
        assert!(slot.is_pending(RecordId(1)));
        assert!(!slot.is_pending(RecordId(2)));
        assert_eq!(slot.photo(), Some(&photo("a.jpg")));
        assert_no_pending_without_photo(&slot);
    }

    #[test]
    fn test_mark_pending_requires_photo() {
        let mut slot = PhotoSlot::new();
        assert!(!slot.mark_pending(RecordId(5)));
        assert!(!slot.is_pending(RecordId(5)));
        assert_eq!(slot.state(), &UploadState::Idle);
        assert_no_pending_without_photo(&slot);
    }

    #[test]
    fn test_new_photo_abandons_pending() {
        let mut slot = PhotoSlot::new();
        slot.stage(photo("old.jpg"));
        slot.mark_pending(RecordId(9));

        slot.stage(photo("new.jpg"));
        assert!(!slot.is_pending(RecordId(9)));
        assert_eq!(slot.state(), &UploadState::Staged(photo("new.jpg")));
    }

    #[test]
    fn test_clear_pending_drops_photo() {
        let mut slot = PhotoSlot::new();
        slot.stage(photo("a.jpg"));
        slot.mark_pending(RecordId(3));
        slot.clear_pending();
        assert_eq!(slot.state(), &UploadState::Idle);
        assert!(slot.photo().is_none());
    }

    #[tokio::test]
    async fn test_retry_success_returns_to_idle() {
        let mut slot = PhotoSlot::new();
        slot.stage(photo("a.jpg"));
        slot.mark_pending(RecordId(11));

        let uploader = ScriptedUploader::new(vec![Ok(())]);
        slot.retry_upload(&uploader).await.unwrap();

        assert_eq!(slot.state(), &UploadState::Idle);
        assert!(!slot.is_pending(RecordId(11)));
        let calls = uploader.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(RecordId(11), photo("a.jpg"))]);
    }

    #[tokio::test]
    async fn test_retry_failure_keeps_pending_photo_unchanged() {
        let mut slot = PhotoSlot::new();
        slot.stage(photo("a.jpg"));
        slot.mark_pending(RecordId(11));
        let before = slot.state().clone();

        let uploader = ScriptedUploader::new(vec![Err(UploadError::Rejected {
            status: 500,
            message: "Upload failed (500)".into(),
        })]);
        let err = slot.retry_upload(&uploader).await.unwrap_err();

        assert!(matches!(err, RetryError::Upload(UploadError::Rejected { .. })));
        assert_eq!(slot.state(), &before);
        assert!(slot.is_pending(RecordId(11)));
        assert_no_pending_without_photo(&slot);

        // A later retry can still succeed
        let uploader = ScriptedUploader::new(vec![Ok(())]);
        slot.retry_upload(&uploader).await.unwrap();
        assert_eq!(slot.state(), &UploadState::Idle);
    }

    #[tokio::test]
    async fn test_retry_without_pending_makes_no_call() {
        let uploader = ScriptedUploader::new(vec![Ok(())]);

        let mut slot = PhotoSlot::new();
        assert!(matches!(
            slot.retry_upload(&uploader).await,
            Err(RetryError::NothingPending)
        ));

        slot.stage(photo("a.jpg"));
        assert!(matches!(
            slot.retry_upload(&uploader).await,
            Err(RetryError::NothingPending)
        ));
        assert_eq!(uploader.call_count(), 0);
    }
}
