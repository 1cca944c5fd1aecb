//! # Photo Pipeline
//!
//! Capture, compress and upload a single photo attached to a server record.
//!
//! This crate provides:
//! - Camera / gallery access behind the [`ImageSource`] trait
//! - Size-budget compression through a fixed preset table
//! - Multipart upload to `{base}/{resource}/{record_id}/photo`
//! - [`PhotoSlot`], the pending-upload recovery state of one form
//!
//! ## Separation of Concerns
//!
//! This crate knows nothing about the records themselves. Saving the record
//! and deciding when to upload is left to the application.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use photo_pipeline::{compress_photo, PhotoSlot, PhotoUploadConfig, PhotoUploadService, StagedPhoto};
//!
//! let compressed = compress_photo(&picked.path, &cache_dir).await?;
//! let mut slot = PhotoSlot::new();
//! slot.stage(StagedPhoto::from_compressed(&compressed, picked.file_name.as_deref()));
//!
//! let uploader = PhotoUploadService::new(PhotoUploadConfig::new(base_url, "visits"))?;
//! if slot.mark_pending(record_id) {
//!     slot.retry_upload(&uploader).await?;
//! }
//! ```

pub mod compression;
pub mod models;
pub mod pending;
pub mod picker;
pub mod upload;

pub use compression::{compress_photo, compress_to_budget, CompressionError};
pub use models::{
    CompressedPhoto, CompressionAttempt, CompressionPreset, ImageAsset, PickOutcome, RecordId,
    StagedPhoto, COMPRESS_PRESETS, MAX_UPLOAD_BYTES,
};
pub use pending::{PhotoSlot, RetryError, UploadState};
pub use picker::{FsImageSource, ImageSource, PickKind, PickerError, UnsupportedImageSource};
pub use upload::{
    PhotoUploadConfig, PhotoUploadService, PhotoUploader, UploadError, UploadResult,
};
