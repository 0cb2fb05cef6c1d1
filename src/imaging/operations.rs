//! High-level image operations.
//!
//! The `plan_*` functions turn validated [`ProcessingOptions`] plus the source
//! dimensions into backend parameters without executing anything, so the
//! sizing rules are testable on their own.

use super::backend::BackendError;
use super::calculations::{
    calculate_fit_dimensions, calculate_target_dimensions, calculate_thumbnail_dimensions,
};
use super::params::{EncodeParams, ImageOutputFormat, Sharpening, ThumbnailParams};
use crate::options::{MAX_DIMENSION, ProcessingOptions};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Resolve the output extension into an encodable format.
pub fn output_format(extension: &str) -> Result<ImageOutputFormat> {
    ImageOutputFormat::from_extension(extension)
        .ok_or_else(|| BackendError::UnsupportedFormat(extension.to_string()))
}

/// Optimize: re-encode at the requested quality; width/height act as a
/// bounding box that only ever shrinks the image.
pub fn plan_optimize(
    source: &Path,
    output: &Path,
    format: ImageOutputFormat,
    original: (u32, u32),
    options: &ProcessingOptions,
) -> EncodeParams {
    let (max_w, max_h) = options.dimensions();
    EncodeParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        format,
        resize: calculate_fit_dimensions(original, max_w, max_h),
        quality: options.quality,
    }
}

/// Transform: resize to the requested dimensions. At least one of width or
/// height must be set; a format change alone is expressed through
/// `optimize`. A side derived from the aspect ratio is held to the same
/// [`MAX_DIMENSION`] bound as requested ones.
pub fn plan_transform(
    source: &Path,
    output: &Path,
    format: ImageOutputFormat,
    original: (u32, u32),
    options: &ProcessingOptions,
) -> Result<EncodeParams> {
    let (width, height) = options.dimensions();
    if width.is_none() && height.is_none() {
        return Err(BackendError::ProcessingFailed(
            "transform requires a target width and/or height".into(),
        ));
    }
    let (target_w, target_h) = calculate_target_dimensions(original, width, height);
    if target_w > MAX_DIMENSION || target_h > MAX_DIMENSION {
        return Err(BackendError::ProcessingFailed(format!(
            "resizing to {target_w}x{target_h} exceeds the {MAX_DIMENSION} pixel limit"
        )));
    }
    Ok(EncodeParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        format,
        resize: Some((target_w, target_h)),
        quality: options.quality,
    })
}

/// Generate: a center-cropped, lightly sharpened thumbnail.
pub fn plan_thumbnail(
    source: &Path,
    output: &Path,
    format: ImageOutputFormat,
    options: &ProcessingOptions,
) -> ThumbnailParams {
    let (width, height) = options.dimensions();
    let (crop_width, crop_height) = calculate_thumbnail_dimensions(width, height);
    ThumbnailParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        format,
        crop_width,
        crop_height,
        quality: options.quality,
        sharpening: Some(Sharpening::light()),
    }
}
