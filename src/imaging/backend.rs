//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations every backend must
//! support: inspect, encode, and thumbnail. The image handlers only talk to
//! this trait, so they can be tested against a recording mock.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::params::{EncodeParams, ThumbnailParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// What a decode tells us about an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub dimensions: Dimensions,
    /// Detected container format, lowercase (`"jpeg"`, `"png"`, ...).
    pub format: Option<String>,
    /// Pixel layout as reported by the decoder (`"Rgb8"`, `"Rgba8"`, ...).
    pub color_type: String,
    pub has_alpha: bool,
}

pub trait ImageBackend: Send + Sync {
    /// Decode headers and pixels far enough to describe the image.
    fn inspect(&self, path: &Path) -> Result<ImageInfo, BackendError>;

    /// Re-encode, optionally resized. Returns the written dimensions.
    fn encode(&self, params: &EncodeParams) -> Result<Dimensions, BackendError>;

    /// Resize-to-fill and center-crop. Returns the written dimensions.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<Dimensions, BackendError>;
}
