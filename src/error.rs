use photo_pipeline::{CompressionError, PickerError, RetryError, UploadError};
use sales_auth::AuthError;
use std::fmt;

const CONNECTION_FAILED: &str = "Could not connect to server";

/// Central error types for the field visit app
#[derive(Debug)]
pub enum AppError {
    /// Form input rejected before any request
    Validation(String),
    /// Record create/update failed; carries the most specific message
    RecordSave(String),
    /// Customer search or other read request failed
    Lookup(String),
    /// Login / session error
    Auth(AuthError),
    /// Camera or gallery failure (cancellation is not an error)
    Picker(PickerError),
    /// Source photo could not be processed
    Compression(CompressionError),
    /// Photo upload failure outside of a submission
    Upload(UploadError),
    /// Manual retry failure
    Retry(RetryError),
    /// Configuration file problem
    Config(String),
    /// Filesystem error
    IoError(std::io::Error),
    /// A submission is already running on this form
    SubmissionInFlight,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::RecordSave(msg) => write!(f, "Record save failed: {}", msg),
            AppError::Lookup(msg) => write!(f, "Lookup failed: {}", msg),
            AppError::Auth(e) => write!(f, "Authentication error: {}", e),
            AppError::Picker(e) => write!(f, "{}", e),
            AppError::Compression(e) => write!(f, "Compression error: {}", e),
            AppError::Upload(e) => write!(f, "Upload error: {}", e),
            AppError::Retry(e) => write!(f, "Retry failed: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::IoError(e) => write!(f, "Filesystem error: {}", e),
            AppError::SubmissionInFlight => write!(f, "A submission is already in progress"),
        }
    }
}

impl std::error::Error for AppError {}

// Conversions from other error types
impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}

impl From<PickerError> for AppError {
    fn from(e: PickerError) -> Self {
        AppError::Picker(e)
    }
}

impl From<CompressionError> for AppError {
    fn from(e: CompressionError) -> Self {
        AppError::Compression(e)
    }
}

impl From<UploadError> for AppError {
    fn from(e: UploadError) -> Self {
        AppError::Upload(e)
    }
}

impl From<RetryError> for AppError {
    fn from(e: RetryError) -> Self {
        AppError::Retry(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::IoError(e)
    }
}

impl From<toml::de::Error> for AppError {
    fn from(e: toml::de::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

fn upload_message(e: &UploadError) -> String {
    match e {
        UploadError::Rejected { message, .. } => message.clone(),
        UploadError::OversizedPhoto { .. } => e.to_string(),
        UploadError::Timeout | UploadError::Network(_) => CONNECTION_FAILED.to_string(),
        _ => "Failed to upload photo".to_string(),
    }
}

/// User-friendly error messages, most specific first
impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::RecordSave(msg) | AppError::Lookup(msg) => {
                msg.clone()
            }
            AppError::Auth(e) => e.user_message(),
            AppError::Picker(PickerError::PermissionDenied(msg)) => {
                format!("Permission required: {}", msg)
            }
            AppError::Picker(e) => e.to_string(),
            AppError::Compression(_) => "Error processing photo.".to_string(),
            AppError::Upload(e) => upload_message(e),
            AppError::Retry(RetryError::NothingPending) => {
                "Please choose a photo first".to_string()
            }
            AppError::Retry(RetryError::Upload(e)) => upload_message(e),
            AppError::Config(msg) => format!("Invalid configuration: {}", msg),
            AppError::IoError(_) => {
                "Error accessing files. Please check app permissions.".to_string()
            }
            AppError::SubmissionInFlight => "Please wait, still saving".to_string(),
        }
    }
}
