//! Error taxonomy shared by every entry point.
//!
//! - [`ValidationError`]: a request was rejected before anything touched the
//!   filesystem (bad mode, out-of-range quality, missing input, ...).
//! - [`ProcessError`]: anything that went wrong from dispatch onwards. Wraps
//!   validation errors so batch and plugin code can carry a single type.
//!
//! None of these reach the CLI as a crash. The dispatcher converts them into a
//! failed [`ProcessingResult`](crate::result::ProcessingResult).

use crate::asset::AssetType;
use crate::imaging::BackendError;
use crate::options::ProcessingMode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid mode '{value}'. Valid values: {}", .valid.join(", "))]
    UnknownMode {
        value: String,
        valid: Vec<&'static str>,
    },
    #[error("Invalid asset type '{value}'. Valid values: {}", .valid.join(", "))]
    UnknownAssetType {
        value: String,
        valid: Vec<&'static str>,
    },
    #[error("quality must be between 1 and 100 (got {0})")]
    QualityOutOfRange(i64),
    #[error(
        "{field} must be between 1 and {} pixels (got {value})",
        crate::options::MAX_DIMENSION
    )]
    InvalidDimension { field: &'static str, value: i64 },
    #[error("Invalid output format '{0}': expected a file extension like 'webp'")]
    InvalidFormat(String),
    #[error("Invalid options: {0}")]
    MalformedOptions(String),
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("Input path is not a file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("Input file is not readable: {}: {source}", .path.display())]
    InputUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(
        "Cannot infer asset type from '{}'; pass --type explicitly",
        .0.display()
    )]
    UnresolvedAssetType(PathBuf),
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("No handler registered for {mode} on {asset_type} assets")]
    NoHandler {
        asset_type: AssetType,
        mode: ProcessingMode,
    },
    #[error("Processing failed: {0}")]
    Handler(String),
    #[error("Image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
