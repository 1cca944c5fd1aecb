//! Visit submission: record first, photo second
//!
//! The record is saved before anything else. A photo upload failing after
//! that point never fails the submission; the photo is parked in the
//! [`PhotoSlot`] as pending so the user can retry it later.
//!
//! A photo already pending for one visit is never sent with another visit.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::visit::VisitForm;
use crate::services::visit_api::{RecordApi, VisitApiClient};
use photo_pipeline::{
    PhotoSlot, PhotoUploadConfig, PhotoUploadService, PhotoUploader, RecordId, StagedPhoto,
    UploadState,
};
use sales_auth::Session;
use std::sync::atomic::{AtomicBool, Ordering};

/// What happened to the form's photo during a submission
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoOutcome {
    Uploaded,
    /// Upload failed; the photo waits in the slot for a retry
    Pending { message: String },
    /// Record saved without an id to attach to; the photo stays staged
    NotAttempted,
    /// No photo belongs to this visit
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    /// `None` when the server saved the visit but did not report its id
    pub record_id: Option<RecordId>,
    /// True when an existing visit was updated instead of created
    pub updated: bool,
    pub photo_outcome: PhotoOutcome,
}

/// Photo to send with `record_id`: a freshly staged one, or one already
/// pending for that same record
fn photo_for(slot: &PhotoSlot, record_id: Option<RecordId>) -> Option<StagedPhoto> {
    match slot.state() {
        UploadState::Staged(photo) => Some(photo.clone()),
        UploadState::Pending {
            record_id: pending,
            photo,
        } if Some(*pending) == record_id => Some(photo.clone()),
        _ => None,
    }
}

/// Clears the in-flight flag when the submission ends, early returns included
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, AppError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::SubmissionInFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SubmissionService<R, U> {
    records: R,
    uploader: U,
    in_flight: AtomicBool,
}

impl SubmissionService<VisitApiClient, PhotoUploadService> {
    /// Wires the HTTP record client and photo uploader for a logged-in session
    pub fn for_session(session: &Session, config: &AppConfig) -> Result<Self, AppError> {
        let records = VisitApiClient::new(session, config.request_timeout())?;

        let mut upload_config = PhotoUploadConfig::new(session.base_url.clone(), "visits");
        upload_config.bearer_token = session.token.clone();
        upload_config.timeout = config.upload_timeout();
        let uploader = PhotoUploadService::new(upload_config)?;

        Ok(Self::new(records, uploader))
    }
}

impl<R: RecordApi, U: PhotoUploader> SubmissionService<R, U> {
    pub fn new(records: R, uploader: U) -> Self {
        Self {
            records,
            uploader,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn records(&self) -> &R {
        &self.records
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Saves the visit, then uploads the slot's photo if there is one.
    ///
    /// Validation and record errors abort before any upload and leave the
    /// slot as it was. Once the record exists the call succeeds; the photo
    /// result is reported in [`SubmissionReceipt::photo_outcome`].
    pub async fn submit(
        &self,
        form: &VisitForm,
        user_name: &str,
        slot: &mut PhotoSlot,
    ) -> Result<SubmissionReceipt, AppError> {
        let _guard = InFlight::acquire(&self.in_flight)?;

        form.validate()?;
        let payload = form.to_payload(user_name);

        let (record_id, updated) = match form.existing_visit_id {
            Some(id) => {
                self.records.update(id, &payload).await?;
                (Some(id), true)
            }
            None => (self.records.create(&payload).await?, false),
        };

        let photo_outcome = match (photo_for(slot, record_id), record_id) {
            (None, _) => {
                if let Some(pending) = slot.pending_record() {
                    log::debug!("Photo pending for visit {} left as is", pending);
                }
                PhotoOutcome::None
            }
            (Some(photo), None) => {
                log::warn!("Visit saved without an id, {} not uploaded", photo.file_name);
                PhotoOutcome::NotAttempted
            }
            (Some(photo), Some(record_id)) => {
                let result = self.uploader.upload(record_id, &photo).await;
                match result {
                    Ok(()) => {
                        log::info!("Photo uploaded for visit {}", record_id);
                        slot.mark_uploaded();
                        PhotoOutcome::Uploaded
                    }
                    Err(e) => {
                        log::warn!("Visit {} saved, photo upload failed: {}", record_id, e);
                        let message = AppError::Upload(e).user_message();
                        slot.mark_pending(record_id);
                        PhotoOutcome::Pending { message }
                    }
                }
            }
        };

        Ok(SubmissionReceipt {
            record_id,
            updated,
            photo_outcome,
        })
    }

    /// Manual retry of a pending photo; failure keeps it pending
    pub async fn retry_photo(&self, slot: &mut PhotoSlot) -> Result<(), AppError> {
        slot.retry_upload(&self.uploader).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::visit::VisitPayload;
    use photo_pipeline::{CompressedPhoto, RetryError, UploadError, UploadResult};
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// In-memory record store; saved records survive whatever the photo does
    #[derive(Default)]
    struct MemoryRecords {
        saved: Mutex<Vec<(RecordId, VisitPayload)>>,
        reject_with: Option<String>,
        /// Store the visit but answer without its id
        omit_ids: bool,
        next_id: i64,
    }

    impl MemoryRecords {
        fn starting_at(next_id: i64) -> Self {
            Self {
                next_id,
                ..Default::default()
            }
        }

        fn rejecting(message: &str) -> Self {
            Self {
                reject_with: Some(message.to_string()),
                ..Default::default()
            }
        }

        fn without_ids() -> Self {
            Self {
                omit_ids: true,
                next_id: 1,
                ..Default::default()
            }
        }

        fn saved(&self) -> Vec<(RecordId, VisitPayload)> {
            self.saved.lock().unwrap().clone()
        }
    }

    impl RecordApi for MemoryRecords {
        async fn create(&self, payload: &VisitPayload) -> Result<Option<RecordId>, AppError> {
            if let Some(message) = &self.reject_with {
                return Err(AppError::RecordSave(message.clone()));
            }
            let mut saved = self.saved.lock().unwrap();
            let id = RecordId(self.next_id + saved.len() as i64);
            saved.push((id, payload.clone()));
            Ok((!self.omit_ids).then_some(id))
        }

        async fn update(&self, id: RecordId, payload: &VisitPayload) -> Result<(), AppError> {
            if let Some(message) = &self.reject_with {
                return Err(AppError::RecordSave(message.clone()));
            }
            let mut saved = self.saved.lock().unwrap();
            saved.retain(|(existing, _)| *existing != id);
            saved.push((id, payload.clone()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct ScriptedUploader {
        results: Mutex<VecDeque<UploadResult<()>>>,
        calls: Mutex<Vec<(RecordId, String)>>,
    }

    impl ScriptedUploader {
        fn new(results: Vec<UploadResult<()>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(RecordId, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PhotoUploader for ScriptedUploader {
        async fn upload(&self, record_id: RecordId, photo: &StagedPhoto) -> UploadResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push((record_id, photo.file_name.clone()));
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(UploadError::Timeout))
        }
    }

    fn form() -> VisitForm {
        VisitForm::new("Toko Maju", "C001", "2026-10-18")
    }

    fn compressed_photo(preset_index: usize) -> StagedPhoto {
        let compressed = CompressedPhoto {
            output_path: PathBuf::from("/cache/3f2a.jpg"),
            size_bytes: 812_000,
            preset_index,
        };
        StagedPhoto::from_compressed(&compressed, Some("shop.jpg"))
    }

    fn slot_with_photo() -> PhotoSlot {
        let mut slot = PhotoSlot::new();
        slot.stage(compressed_photo(1));
        slot
    }

    #[tokio::test]
    async fn test_record_and_photo_uploaded() {
        let service = SubmissionService::new(
            MemoryRecords::starting_at(40),
            ScriptedUploader::new(vec![Ok(())]),
        );
        let mut slot = slot_with_photo();

        let receipt = service.submit(&form(), "Budi", &mut slot).await.unwrap();

        assert_eq!(receipt.record_id, Some(RecordId(40)));
        assert!(!receipt.updated);
        assert_eq!(receipt.photo_outcome, PhotoOutcome::Uploaded);
        assert_eq!(slot.state(), &UploadState::Idle);
        assert_eq!(
            service.uploader.calls(),
            vec![(RecordId(40), "shop.jpg".to_string())]
        );
        assert_eq!(service.records().saved()[0].1.user, "Budi");
    }

    #[tokio::test]
    async fn test_rejected_record_skips_upload() {
        let service = SubmissionService::new(
            MemoryRecords::rejecting("Duplicate"),
            ScriptedUploader::new(vec![Ok(())]),
        );
        let mut slot = slot_with_photo();

        let err = service.submit(&form(), "Budi", &mut slot).await.unwrap_err();

        assert_eq!(err.user_message(), "Duplicate");
        assert!(service.uploader.calls().is_empty());
        assert_eq!(slot.pending_record(), None);
        assert!(matches!(slot.state(), UploadState::Staged(_)));
    }

    #[tokio::test]
    async fn test_upload_timeout_leaves_photo_pending() {
        let service = SubmissionService::new(
            MemoryRecords::starting_at(7),
            ScriptedUploader::new(vec![Err(UploadError::Timeout)]),
        );
        let mut slot = slot_with_photo();

        let receipt = service.submit(&form(), "Budi", &mut slot).await.unwrap();

        assert_eq!(receipt.record_id, Some(RecordId(7)));
        assert_eq!(
            receipt.photo_outcome,
            PhotoOutcome::Pending {
                message: "Could not connect to server".to_string()
            }
        );
        assert!(slot.is_pending(RecordId(7)));
        assert_eq!(slot.photo(), Some(&compressed_photo(1)));
        // The record is not rolled back
        assert_eq!(service.records().saved().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_form_makes_no_request() {
        let service =
            SubmissionService::new(MemoryRecords::default(), ScriptedUploader::new(vec![]));
        let mut slot = slot_with_photo();

        let form = VisitForm::new("Toko Maju", "", "2026-10-18");
        let err = service.submit(&form, "Budi", &mut slot).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(service.records().saved().is_empty());
        assert!(service.uploader.calls().is_empty());
    }

    #[tokio::test]
    async fn test_without_photo_outcome_is_none() {
        let service =
            SubmissionService::new(MemoryRecords::starting_at(1), ScriptedUploader::new(vec![]));
        let mut slot = PhotoSlot::new();

        let receipt = service.submit(&form(), "Budi", &mut slot).await.unwrap();

        assert_eq!(receipt.photo_outcome, PhotoOutcome::None);
        assert!(service.uploader.calls().is_empty());
        assert_eq!(slot.state(), &UploadState::Idle);
    }

    #[tokio::test]
    async fn test_existing_visit_is_updated() {
        let service = SubmissionService::new(
            MemoryRecords::starting_at(1),
            ScriptedUploader::new(vec![Ok(())]),
        );
        let mut slot = slot_with_photo();
        let mut form = form();
        form.existing_visit_id = Some(RecordId(88));

        let receipt = service.submit(&form, "Budi", &mut slot).await.unwrap();

        assert!(receipt.updated);
        assert_eq!(receipt.record_id, Some(RecordId(88)));
        assert_eq!(service.uploader.calls()[0].0, RecordId(88));
    }

    #[tokio::test]
    async fn test_retry_after_pending() {
        let service = SubmissionService::new(
            MemoryRecords::starting_at(5),
            ScriptedUploader::new(vec![
                Err(UploadError::Rejected {
                    status: 500,
                    message: "Upload failed (500)".to_string(),
                }),
                Err(UploadError::Timeout),
                Ok(()),
            ]),
        );
        let mut slot = slot_with_photo();

        let receipt = service.submit(&form(), "Budi", &mut slot).await.unwrap();
        assert_eq!(
            receipt.photo_outcome,
            PhotoOutcome::Pending {
                message: "Upload failed (500)".to_string()
            }
        );

        let err = service.retry_photo(&mut slot).await.unwrap_err();
        assert!(matches!(err, AppError::Retry(RetryError::Upload(UploadError::Timeout))));
        assert!(slot.is_pending(RecordId(5)));

        service.retry_photo(&mut slot).await.unwrap();
        assert_eq!(slot.state(), &UploadState::Idle);
        assert_eq!(service.uploader.calls().len(), 3);
        assert!(service.uploader.calls().iter().all(|(id, _)| *id == RecordId(5)));
    }

    #[tokio::test]
    async fn test_new_photo_abandons_pending_retry() {
        let service = SubmissionService::new(
            MemoryRecords::starting_at(5),
            ScriptedUploader::new(vec![Err(UploadError::Timeout)]),
        );
        let mut slot = slot_with_photo();
        service.submit(&form(), "Budi", &mut slot).await.unwrap();
        assert!(slot.is_pending(RecordId(5)));

        slot.stage(compressed_photo(2));
        assert!(!slot.is_pending(RecordId(5)));

        let err = service.retry_photo(&mut slot).await.unwrap_err();
        assert!(matches!(err, AppError::Retry(RetryError::NothingPending)));
        assert_eq!(service.uploader.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_pending_photo_stays_with_its_own_visit() {
        let service = SubmissionService::new(
            MemoryRecords::starting_at(5),
            ScriptedUploader::new(vec![Err(UploadError::Timeout), Ok(())]),
        );
        let mut slot = slot_with_photo();
        service.submit(&form(), "Budi", &mut slot).await.unwrap();
        assert!(slot.is_pending(RecordId(5)));
        let pending = slot.state().clone();

        // Next visit, no new photo picked
        let other = VisitForm::new("Toko Makmur", "C002", "2026-10-18");
        let receipt = service.submit(&other, "Budi", &mut slot).await.unwrap();

        assert_eq!(receipt.record_id, Some(RecordId(6)));
        assert_eq!(receipt.photo_outcome, PhotoOutcome::None);
        assert_eq!(slot.state(), &pending);
        assert_eq!(
            service.uploader.calls(),
            vec![(RecordId(5), "shop.jpg".to_string())]
        );

        // Saving the first visit again sends its own pending photo
        let mut again = form();
        again.existing_visit_id = Some(RecordId(5));
        let receipt = service.submit(&again, "Budi", &mut slot).await.unwrap();
        assert_eq!(receipt.photo_outcome, PhotoOutcome::Uploaded);
        assert_eq!(service.uploader.calls()[1], (RecordId(5), "shop.jpg".to_string()));
        assert_eq!(slot.state(), &UploadState::Idle);
    }

    #[tokio::test]
    async fn test_saved_without_id_keeps_photo_staged() {
        let service =
            SubmissionService::new(MemoryRecords::without_ids(), ScriptedUploader::new(vec![]));
        let mut slot = slot_with_photo();

        let receipt = service.submit(&form(), "Budi", &mut slot).await.unwrap();

        assert_eq!(receipt.record_id, None);
        assert_eq!(receipt.photo_outcome, PhotoOutcome::NotAttempted);
        assert_eq!(slot.state(), &UploadState::Staged(compressed_photo(1)));
        assert!(service.uploader.calls().is_empty());
        assert_eq!(service.records().saved().len(), 1);
    }

    #[tokio::test]
    async fn test_large_noisy_photo_compressed_saved_and_uploaded() {
        use crate::camera::stage_from_source;
        use image::{Rgb, RgbImage};
        use photo_pipeline::{FsImageSource, PickKind, MAX_UPLOAD_BYTES};

        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("storefront.png");
        let mut state: u32 = 0x1234_5678;
        let img = RgbImage::from_fn(1280, 1280, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            Rgb([state as u8, (state >> 8) as u8, (state >> 16) as u8])
        });
        img.save(&source_path).unwrap();
        assert!(std::fs::metadata(&source_path).unwrap().len() > 2 * MAX_UPLOAD_BYTES);

        let source = FsImageSource::new(dir.path()).with_gallery_selection(&source_path);
        let mut slot = PhotoSlot::new();
        let report =
            stage_from_source(&source, PickKind::Gallery, &dir.path().join("cache"), &mut slot)
                .await
                .unwrap()
                .unwrap();
        assert!(report.preset_index >= 1, "preset {}", report.preset_index);
        assert!(report.within_budget);
        assert!(report.size_bytes <= MAX_UPLOAD_BYTES);

        let service = SubmissionService::new(
            MemoryRecords::starting_at(70),
            ScriptedUploader::new(vec![Ok(())]),
        );
        let receipt = service.submit(&form(), "Budi", &mut slot).await.unwrap();

        assert_eq!(receipt.record_id, Some(RecordId(70)));
        assert_eq!(receipt.photo_outcome, PhotoOutcome::Uploaded);
        assert_eq!(slot.state(), &UploadState::Idle);
        assert_eq!(
            service.uploader.calls(),
            vec![(RecordId(70), "storefront.png".to_string())]
        );
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_refused() {
        let service =
            SubmissionService::new(MemoryRecords::starting_at(1), ScriptedUploader::new(vec![]));

        let guard = InFlight::acquire(&service.in_flight).unwrap();
        assert!(service.is_submitting());

        let mut slot = PhotoSlot::new();
        let err = service.submit(&form(), "Budi", &mut slot).await.unwrap_err();
        assert!(matches!(err, AppError::SubmissionInFlight));
        assert!(service.records().saved().is_empty());

        drop(guard);
        assert!(!service.is_submitting());
        service.submit(&form(), "Budi", &mut slot).await.unwrap();
    }
}
