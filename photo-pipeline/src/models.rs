use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Maximum byte size accepted by the photo endpoint (1 MiB)
pub const MAX_UPLOAD_BYTES: u64 = 1024 * 1024;

/// Content type of every compressed photo
pub const STAGED_MIME_TYPE: &str = "image/jpeg";

/// Extensions of images the compression engine can decode
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];

/// Photo formats cameras produce that cannot be decoded here
pub const UNSUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["heic", "heif"];

/// One resize/encode setting tried by the compression engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionPreset {
    /// Neither width nor height may exceed this after resizing
    pub max_dimension: u32,
    /// JPEG quality, 1..=100
    pub quality: u8,
}

/// Presets in the order they are tried, least aggressive first
pub const COMPRESS_PRESETS: [CompressionPreset; 4] = [
    CompressionPreset {
        max_dimension: 1280,
        quality: 75,
    },
    CompressionPreset {
        max_dimension: 1024,
        quality: 65,
    },
    CompressionPreset {
        max_dimension: 1024,
        quality: 55,
    },
    CompressionPreset {
        max_dimension: 800,
        quality: 55,
    },
];

/// Server-side identifier of the record a photo belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw image handed over by the camera or the gallery
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    pub path: PathBuf,
    pub file_name: Option<String>,
    pub size_bytes: Option<u64>,
}

/// Outcome of a picker interaction
#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    Picked(ImageAsset),
    /// User dismissed the picker; callers treat this as a no-op
    Cancelled,
}

/// Output of a single resize/encode attempt
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionAttempt {
    pub output_path: PathBuf,
    pub size_bytes: u64,
}

/// Final result of the compression engine
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedPhoto {
    pub output_path: PathBuf,
    pub size_bytes: u64,
    /// Index into the preset table that produced this output
    pub preset_index: usize,
}

impl CompressedPhoto {
    /// False when every preset was exhausted and the output is still too large
    pub fn is_within_budget(&self) -> bool {
        self.size_bytes > 0 && self.size_bytes <= MAX_UPLOAD_BYTES
    }
}

/// Compressed photo held locally until the server confirms the upload
#[derive(Debug, Clone, PartialEq)]
pub struct StagedPhoto {
    pub local_path: PathBuf,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: Option<u64>,
}

impl StagedPhoto {
    /// Builds a staged photo from a compression result and the picked asset's name
    pub fn from_compressed(compressed: &CompressedPhoto, asset_name: Option<&str>) -> Self {
        let fallback = format!("visit_{}.jpg", chrono::Utc::now().timestamp_millis());
        Self {
            local_path: compressed.output_path.clone(),
            file_name: safe_file_name(asset_name, &fallback),
            mime_type: STAGED_MIME_TYPE.to_string(),
            size_bytes: Some(compressed.size_bytes),
        }
    }

    pub fn exceeds_budget(&self) -> bool {
        self.size_bytes.is_some_and(|size| size > MAX_UPLOAD_BYTES)
    }
}

/// Returns `name` if usable, appending `.jpg` when it has no image extension.
/// Blank names fall back to `fallback`.
pub fn safe_file_name(name: Option<&str>, fallback: &str) -> String {
    let trimmed = name.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    if has_image_extension(trimmed) {
        trimmed.to_string()
    } else {
        format!("{}.jpg", trimmed)
    }
}

fn lowercase_extension(name: &str) -> Option<String> {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn has_image_extension(name: &str) -> bool {
    lowercase_extension(name).is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

/// Upper-cased format name when `name` is a photo format that cannot be decoded
pub fn unsupported_image_format(name: &str) -> Option<String> {
    lowercase_extension(name)
        .filter(|e| UNSUPPORTED_IMAGE_EXTENSIONS.contains(&e.as_str()))
        .map(|e| e.to_ascii_uppercase())
}
