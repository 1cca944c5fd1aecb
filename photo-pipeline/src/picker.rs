//! Image source adapter
//!
//! Wraps camera capture and gallery selection behind `ImageSource`. The
//! filesystem implementation treats a camera directory as the capture inbox
//! (newest image wins) and an explicit file path as the gallery selection.

use crate::models::{has_image_extension, unsupported_image_format, ImageAsset, PickOutcome};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub enum PickerError {
    PermissionDenied(String),
    Failed(String),
    PlatformNotSupported(String),
}

impl std::fmt::Display for PickerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PickerError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            PickerError::Failed(msg) => write!(f, "Picker failed: {}", msg),
            PickerError::PlatformNotSupported(msg) => write!(f, "Platform not supported: {}", msg),
        }
    }
}

impl std::error::Error for PickerError {}

fn io_to_picker_error(e: std::io::Error, what: &str) -> PickerError {
    match e.kind() {
        ErrorKind::PermissionDenied => PickerError::PermissionDenied(format!("{}: {}", what, e)),
        _ => PickerError::Failed(format!("{}: {}", what, e)),
    }
}

/// Which picker the user opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickKind {
    Camera,
    Gallery,
}

/// Camera and gallery access
pub trait ImageSource {
    fn capture_from_camera(&self) -> Result<PickOutcome, PickerError>;
    fn select_from_gallery(&self) -> Result<PickOutcome, PickerError>;

    fn pick(&self, kind: PickKind) -> Result<PickOutcome, PickerError> {
        match kind {
            PickKind::Camera => self.capture_from_camera(),
            PickKind::Gallery => self.select_from_gallery(),
        }
    }
}

/// Refuses photo formats the compression engine cannot decode
fn ensure_decodable(path: &Path) -> Result<(), PickerError> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    match unsupported_image_format(name) {
        Some(format) => Err(PickerError::Failed(format!(
            "{} photos are not supported, choose a JPEG or PNG instead: {}",
            format,
            path.display()
        ))),
        None => Ok(()),
    }
}

/// Builds an asset handle for an existing image file
pub fn asset_from_path(path: &Path) -> Result<ImageAsset, PickerError> {
    let metadata =
        std::fs::metadata(path).map_err(|e| io_to_picker_error(e, &path.display().to_string()))?;
    if !metadata.is_file() {
        return Err(PickerError::Failed(format!(
            "Not a file: {}",
            path.display()
        )));
    }

    Ok(ImageAsset {
        path: path.to_path_buf(),
        file_name: path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string()),
        size_bytes: Some(metadata.len()),
    })
}

/// Filesystem-backed image source
#[derive(Debug, Clone)]
pub struct FsImageSource {
    /// Directory the camera app writes captures into
    pub camera_dir: PathBuf,
    /// File chosen in the gallery; `None` means the user backed out
    pub gallery_selection: Option<PathBuf>,
}

impl FsImageSource {
    pub fn new(camera_dir: impl Into<PathBuf>) -> Self {
        Self {
            camera_dir: camera_dir.into(),
            gallery_selection: None,
        }
    }

    pub fn with_gallery_selection(mut self, path: impl Into<PathBuf>) -> Self {
        self.gallery_selection = Some(path.into());
        self
    }

    fn newest_capture(&self) -> Result<Option<PathBuf>, PickerError> {
        let entries = std::fs::read_dir(&self.camera_dir).map_err(|e| {
            io_to_picker_error(e, &format!("camera directory {}", self.camera_dir.display()))
        })?;

        let newest = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| {
                        has_image_extension(name) || unsupported_image_format(name).is_some()
                    })
            })
            .filter_map(|entry| {
                let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
                Some((modified, entry.path()))
            })
            .max_by_key(|(modified, _)| *modified)
            .map(|(_, path)| path);

        Ok(newest)
    }
}

impl ImageSource for FsImageSource {
    fn capture_from_camera(&self) -> Result<PickOutcome, PickerError> {
        match self.newest_capture()? {
            Some(path) => {
                log::debug!("Camera capture: {:?}", path);
                ensure_decodable(&path)?;
                asset_from_path(&path).map(PickOutcome::Picked)
            }
            None => {
                log::debug!("No capture in {:?}, treating as cancelled", self.camera_dir);
                Ok(PickOutcome::Cancelled)
            }
        }
    }

    fn select_from_gallery(&self) -> Result<PickOutcome, PickerError> {
        let Some(path) = &self.gallery_selection else {
            return Ok(PickOutcome::Cancelled);
        };

        ensure_decodable(path)?;
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if !has_image_extension(name) {
            return Err(PickerError::Failed(format!(
                "Not an image file: {}",
                path.display()
            )));
        }

        asset_from_path(path).map(PickOutcome::Picked)
    }
}

/// Image source for targets without camera or gallery access
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedImageSource;

impl ImageSource for UnsupportedImageSource {
    fn capture_from_camera(&self) -> Result<PickOutcome, PickerError> {
        Err(PickerError::PlatformNotSupported(
            "Camera capture is not available on this platform".to_string(),
        ))
    }

    fn select_from_gallery(&self) -> Result<PickOutcome, PickerError> {
        Err(PickerError::PlatformNotSupported(
            "Gallery selection is not available on this platform".to_string(),
        ))
    }
}
