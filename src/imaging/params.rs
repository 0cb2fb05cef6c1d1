//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the image handlers (which decide what to produce) and the
//! [`backend`](super::backend) (which does the pixel work), so tests can swap
//! in a recording mock.
//!
//! ## Types
//!
//! - [`ImageOutputFormat`]: encodable output formats, resolved from an extension token.
//! - [`Sharpening`]: Unsharp-mask parameters (sigma + threshold) for thumbnail crispness.
//! - [`EncodeParams`]: re-encode, optionally resized to exact dimensions.
//! - [`ThumbnailParams`]: resize-to-fill + center crop, optional sharpening.

use crate::options::Quality;
use image::ImageFormat;
use std::path::PathBuf;

/// Formats the stock backend can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
    Tiff,
}

impl ImageOutputFormat {
    /// Resolve a lowercase extension token. `None` for anything we cannot encode.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
            Self::Gif => ImageFormat::Gif,
            Self::Bmp => ImageFormat::Bmp,
            Self::Tiff => ImageFormat::Tiff,
        }
    }

    /// Whether the quality setting affects the encoder. The `image` crate's
    /// WebP, PNG, GIF, BMP and TIFF encoders are lossless.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg)
    }
}

/// Sharpening parameters for unsharp mask.
///
/// - `sigma`: Standard deviation of the Gaussian blur (higher = more sharpening)
/// - `threshold`: Minimum brightness difference to sharpen (0 = sharpen all pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpening {
    pub sigma: f32,
    pub threshold: i32,
}

impl Sharpening {
    /// Light sharpening suitable for thumbnails.
    pub fn light() -> Self {
        Self {
            sigma: 0.5,
            threshold: 0,
        }
    }
}

/// Decode `source`, optionally resize to exactly `resize`, encode to `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub format: ImageOutputFormat,
    pub resize: Option<(u32, u32)>,
    pub quality: Quality,
}

/// Parameters for a thumbnail operation (resize + center crop).
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub format: ImageOutputFormat,
    /// Final crop dimensions.
    pub crop_width: u32,
    pub crop_height: u32,
    pub quality: Quality,
    pub sharpening: Option<Sharpening>,
}
