// Photo staging for the visit form: pick, compress, hold in the slot.

use crate::error::AppError;
use photo_pipeline::{compress_photo, ImageSource, PhotoSlot, PickKind, PickOutcome, StagedPhoto};
use std::path::Path;

/// Summary of a freshly staged photo, for the form to display
#[derive(Debug, Clone, PartialEq)]
pub struct StagingReport {
    pub file_name: String,
    pub size_bytes: u64,
    pub preset_index: usize,
    /// False when even the smallest preset is over the upload limit
    pub within_budget: bool,
}

/// Picks a photo, compresses it into `cache_dir` and stages it in `slot`.
///
/// Returns `Ok(None)` when the user cancels; the slot is left untouched.
pub async fn stage_from_source<S: ImageSource>(
    source: &S,
    kind: PickKind,
    cache_dir: &Path,
    slot: &mut PhotoSlot,
) -> Result<Option<StagingReport>, AppError> {
    let asset = match source.pick(kind)? {
        PickOutcome::Cancelled => {
            log::debug!("{:?} pick cancelled", kind);
            return Ok(None);
        }
        PickOutcome::Picked(asset) => asset,
    };

    log::info!(
        "Compressing {:?} ({} bytes)",
        asset.path,
        asset.size_bytes.map_or("?".to_string(), |s| s.to_string())
    );
    let compressed = compress_photo(&asset.path, cache_dir).await?;
    let within_budget = compressed.is_within_budget();
    if !within_budget {
        log::warn!(
            "Photo still {} bytes after the smallest preset, upload will be refused",
            compressed.size_bytes
        );
    }

    let photo = StagedPhoto::from_compressed(&compressed, asset.file_name.as_deref());
    let report = StagingReport {
        file_name: photo.file_name.clone(),
        size_bytes: compressed.size_bytes,
        preset_index: compressed.preset_index,
        within_budget,
    };
    slot.stage(photo);

    Ok(Some(report))
}
