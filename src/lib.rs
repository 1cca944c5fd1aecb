//! Field sales visit capture.
//!
//! A visit is saved first and its photo uploaded second. When the photo
//! upload fails the visit stays saved and the photo waits in a
//! [`photo_pipeline::PhotoSlot`] for a manual retry.

pub mod camera;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use camera::{stage_from_source, StagingReport};
pub use config::{default_config_path, get_app_data_dir, AppConfig};
pub use error::AppError;
pub use models::{Customer, VisitForm, VisitPayload};
pub use services::{
    ExistingVisit, PhotoOutcome, RecordApi, SubmissionReceipt, SubmissionService, VisitApiClient,
};
