//! Size-budget compression
//!
//! Re-encodes a photo through [`COMPRESS_PRESETS`] until the output fits
//! under [`MAX_UPLOAD_BYTES`]. Compression never fails for a decodable
//! source: when no preset fits, the last preset's output is returned and
//! [`CompressedPhoto::is_within_budget`] reports `false`.

use crate::models::{
    CompressedPhoto, CompressionAttempt, CompressionPreset, COMPRESS_PRESETS, MAX_UPLOAD_BYTES,
};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, DynamicImage, ImageReader};
use std::path::{Path, PathBuf};

/// Error type for compression operations
#[derive(Debug)]
pub enum CompressionError {
    Decode(String),
    Encode(String),
    IoError(std::io::Error),
    TaskJoin(String),
}

impl std::fmt::Display for CompressionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionError::Decode(msg) => write!(f, "Image decode error: {}", msg),
            CompressionError::Encode(msg) => write!(f, "Image encode error: {}", msg),
            CompressionError::IoError(e) => write!(f, "IO error: {}", e),
            CompressionError::TaskJoin(msg) => write!(f, "Task join error: {}", msg),
        }
    }
}

impl std::error::Error for CompressionError {}

impl From<std::io::Error> for CompressionError {
    fn from(err: std::io::Error) -> Self {
        CompressionError::IoError(err)
    }
}

/// Runs `attempt` for each preset in order and keeps the first output that is
/// non-empty and within `budget`.
///
/// Rejected outputs are handed to `discard`. A failing attempt is skipped; if
/// none fits, the last successful attempt wins. Only when every attempt fails
/// is the last error returned.
pub fn select_within_budget<A, D>(
    presets: &[CompressionPreset],
    budget: u64,
    mut attempt: A,
    mut discard: D,
) -> Result<CompressedPhoto, CompressionError>
where
    A: FnMut(usize, &CompressionPreset) -> Result<CompressionAttempt, CompressionError>,
    D: FnMut(&CompressionAttempt),
{
    let mut fallback: Option<CompressedPhoto> = None;
    let mut last_error = None;

    for (index, preset) in presets.iter().enumerate() {
        let result = match attempt(index, preset) {
            Ok(result) => result,
            Err(e) => {
                log::warn!(
                    "Compression preset {} ({}px/{}%) failed: {}",
                    index,
                    preset.max_dimension,
                    preset.quality,
                    e
                );
                last_error = Some(e);
                continue;
            }
        };

        log::debug!(
            "Preset {} ({}px/{}%) produced {} bytes",
            index,
            preset.max_dimension,
            preset.quality,
            result.size_bytes
        );

        if result.size_bytes > 0 && result.size_bytes <= budget {
            if let Some(previous) = fallback.take() {
                discard(&CompressionAttempt {
                    output_path: previous.output_path,
                    size_bytes: previous.size_bytes,
                });
            }
            return Ok(CompressedPhoto {
                output_path: result.output_path,
                size_bytes: result.size_bytes,
                preset_index: index,
            });
        }

        if let Some(previous) = fallback.replace(CompressedPhoto {
            output_path: result.output_path,
            size_bytes: result.size_bytes,
            preset_index: index,
        }) {
            discard(&CompressionAttempt {
                output_path: previous.output_path,
                size_bytes: previous.size_bytes,
            });
        }
    }

    match (fallback, last_error) {
        (Some(best_effort), _) => {
            log::warn!(
                "No preset fits the {} byte budget, using preset {} at {} bytes",
                budget,
                best_effort.preset_index,
                best_effort.size_bytes
            );
            Ok(best_effort)
        }
        (None, Some(e)) => Err(e),
        (None, None) => Err(CompressionError::Encode(
            "No compression presets configured".to_string(),
        )),
    }
}

/// Fits `(width, height)` inside a `max_dimension` square keeping the aspect
/// ratio. Images already small enough keep their size.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let ratio = (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);

    if ratio > 1.0 {
        let new_width = ((width as f32 / ratio).round() as u32).clamp(1, max_dimension);
        let new_height = ((height as f32 / ratio).round() as u32).clamp(1, max_dimension);
        (new_width, new_height)
    } else {
        (width, height)
    }
}

/// Resizes and JPEG-encodes an already decoded image with one preset
pub fn encode_preset(
    img: &DynamicImage,
    preset: &CompressionPreset,
) -> Result<Vec<u8>, CompressionError> {
    let (width, height) = fit_within(img.width(), img.height(), preset.max_dimension);
    let resized = if (width, height) == (img.width(), img.height()) {
        img.to_rgb8()
    } else {
        img.resize_exact(width, height, FilterType::Lanczos3).to_rgb8()
    };

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, preset.quality)
        .encode_image(&resized)
        .map_err(|e| CompressionError::Encode(format!("Failed to encode JPEG: {}", e)))?;
    Ok(buffer)
}

/// Compresses `source` into `output_dir` following the fixed preset table
pub fn compress_to_budget(
    source: &Path,
    output_dir: &Path,
) -> Result<CompressedPhoto, CompressionError> {
    log::debug!("Compressing {:?} into {:?}", source, output_dir);

    let img = ImageReader::open(source)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| {
            CompressionError::Decode(format!("Failed to decode {}: {}", source.display(), e))
        })?;

    std::fs::create_dir_all(output_dir)?;

    let compressed = select_within_budget(
        &COMPRESS_PRESETS,
        MAX_UPLOAD_BYTES,
        |_, preset| {
            let bytes = encode_preset(&img, preset)?;
            let output_path: PathBuf =
                output_dir.join(format!("{}.jpg", uuid::Uuid::new_v4()));
            std::fs::write(&output_path, &bytes)?;
            Ok(CompressionAttempt {
                output_path,
                size_bytes: bytes.len() as u64,
            })
        },
        |rejected| {
            if let Err(e) = std::fs::remove_file(&rejected.output_path) {
                log::warn!("Could not remove {:?}: {}", rejected.output_path, e);
            }
        },
    )?;

    log::info!(
        "Compressed {:?} with preset {} to {} bytes",
        source,
        compressed.preset_index,
        compressed.size_bytes
    );
    Ok(compressed)
}

/// Runs [`compress_to_budget`] on the blocking pool
pub async fn compress_photo(
    source: &Path,
    output_dir: &Path,
) -> Result<CompressedPhoto, CompressionError> {
    let source = source.to_path_buf();
    let output_dir = output_dir.to_path_buf();

    tokio::task::spawn_blocking(move || compress_to_budget(&source, &output_dir))
        .await
        .map_err(|e| CompressionError::TaskJoin(e.to_string()))?
}
