//! Photo upload to the record-scoped photo endpoint
//!
//! Sends a staged photo as a single multipart `file` field to
//! `{base_url}/{resource}/{record_id}/photo`. Anything other than a 2xx
//! response carrying `"success": true` counts as a failure.

use crate::models::{RecordId, StagedPhoto, MAX_UPLOAD_BYTES};
use serde::Deserialize;
use std::time::Duration;

/// Configuration for the photo upload transport
#[derive(Debug, Clone)]
pub struct PhotoUploadConfig {
    pub base_url: String,
    /// Collection path segment, e.g. `visits`
    pub resource: String,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
}

impl PhotoUploadConfig {
    pub fn new(base_url: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            resource: resource.into(),
            bearer_token: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn photo_url(&self, record_id: RecordId) -> String {
        format!(
            "{}/{}/{}/photo",
            self.base_url.trim_end_matches('/'),
            self.resource.trim_matches('/'),
            record_id
        )
    }
}

/// Result type for upload operations
pub type UploadResult<T> = Result<T, UploadError>;

/// Errors that can occur during photo upload
#[derive(Debug)]
pub enum UploadError {
    /// Known size is over the budget; no request was made
    OversizedPhoto { size_bytes: u64, limit: u64 },
    IoError(std::io::Error),
    Timeout,
    Network(String),
    /// Non-2xx status or a body without an explicit success flag
    Rejected { status: u16, message: String },
    Client(String),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::OversizedPhoto { size_bytes, limit } => write!(
                f,
                "Photo is {:.2} MB, larger than the {:.0} MB limit",
                *size_bytes as f64 / 1024.0 / 1024.0,
                *limit as f64 / 1024.0 / 1024.0
            ),
            UploadError::IoError(e) => write!(f, "IO error: {}", e),
            UploadError::Timeout => write!(f, "Upload timed out"),
            UploadError::Network(e) => write!(f, "Network error: {}", e),
            UploadError::Rejected { message, .. } => write!(f, "{}", message),
            UploadError::Client(e) => write!(f, "HTTP client error: {}", e),
        }
    }
}

impl std::error::Error for UploadError {}

impl From<std::io::Error> for UploadError {
    fn from(err: std::io::Error) -> Self {
        UploadError::IoError(err)
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UploadError::Timeout
        } else if err.is_builder() {
            UploadError::Client(err.to_string())
        } else {
            UploadError::Network(err.to_string())
        }
    }
}

/// Sends a staged photo for a saved record
#[allow(async_fn_in_trait)]
pub trait PhotoUploader {
    async fn upload(&self, record_id: RecordId, photo: &StagedPhoto) -> UploadResult<()>;
}

#[derive(Debug, Default, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
}

/// Interprets the photo endpoint's answer.
///
/// A body that is empty or not JSON carries no success flag and is therefore
/// a failure even with a 2xx status.
pub fn interpret_upload_response(status: u16, body: &str) -> UploadResult<()> {
    let parsed: UploadResponse = if body.trim().is_empty() {
        UploadResponse::default()
    } else {
        serde_json::from_str(body).unwrap_or_else(|e| {
            log::debug!("Upload response is not JSON ({}): {:?}", e, body);
            UploadResponse::default()
        })
    };

    let status_ok = (200..300).contains(&status);
    if status_ok && parsed.success == Some(true) {
        return Ok(());
    }

    let message = parsed
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Upload failed ({})", status));
    Err(UploadError::Rejected { status, message })
}

/// Rejects photos whose known size is over the upload budget
pub fn check_upload_budget(photo: &StagedPhoto) -> UploadResult<()> {
    match photo.size_bytes {
        Some(size_bytes) if size_bytes > MAX_UPLOAD_BYTES => Err(UploadError::OversizedPhoto {
            size_bytes,
            limit: MAX_UPLOAD_BYTES,
        }),
        _ => Ok(()),
    }
}

/// Multipart upload over HTTP
pub struct PhotoUploadService {
    config: PhotoUploadConfig,
    client: reqwest::Client,
}

impl PhotoUploadService {
    /// Create a new photo upload service
    pub fn new(config: PhotoUploadConfig) -> UploadResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| UploadError::Client(format!("Client build failed: {}", e)))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &PhotoUploadConfig {
        &self.config
    }
}

impl PhotoUploader for PhotoUploadService {
    async fn upload(&self, record_id: RecordId, photo: &StagedPhoto) -> UploadResult<()> {
        check_upload_budget(photo)?;

        let data = std::fs::read(&photo.local_path)?;
        let url = self.config.photo_url(record_id);
        log::info!(
            "Uploading {} ({} bytes) to {}",
            photo.file_name,
            data.len(),
            url
        );

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(photo.file_name.clone())
            .mime_str(&photo.mime_type)
            .map_err(|e| UploadError::Client(format!("Invalid mime type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut request = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .multipart(form);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            log::error!("Photo upload for record {} failed: {}", record_id, e);
            UploadError::from(e)
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(UploadError::from)?;
        log::debug!("Upload response {}: {}", status, body);

        interpret_upload_response(status, &body).inspect_err(|e| {
            log::error!("Photo upload for record {} rejected: {}", record_id, e);
        })
    }
}
