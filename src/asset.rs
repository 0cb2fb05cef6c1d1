//! Asset types, extension-based type inference, and the validated
//! [`AssetConfig`] request.
//!
//! Inference is a plain lookup in an [`ExtensionTable`]. The table is a value,
//! not a hard-coded rule: the stock table covers common media extensions and
//! the `[extensions]` config section can add or override entries.

use crate::error::ValidationError;
use crate::options::ProcessingOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Kind of media an asset holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Image,
    Video,
    Audio,
    Document,
}

impl AssetType {
    pub const ALL: [AssetType; 4] = [
        AssetType::Image,
        AssetType::Video,
        AssetType::Audio,
        AssetType::Document,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetType::Image => "image",
            AssetType::Video => "video",
            AssetType::Audio => "audio",
            AssetType::Document => "document",
        }
    }

    pub fn values() -> Vec<&'static str> {
        Self::ALL.iter().map(|t| t.as_str()).collect()
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnknownAssetType {
                value: s.to_string(),
                valid: Self::values(),
            })
    }
}

const STOCK_EXTENSIONS: &[(AssetType, &[&str])] = &[
    (
        AssetType::Image,
        &["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "tiff", "tif"],
    ),
    (
        AssetType::Video,
        &["mp4", "avi", "mov", "wmv", "flv", "mkv", "webm"],
    ),
    (AssetType::Audio, &["mp3", "wav", "ogg", "aac", "flac", "m4a"]),
    (
        AssetType::Document,
        &["pdf", "doc", "docx", "txt", "md", "html", "xml"],
    ),
];

/// Lowercase extension → [`AssetType`] lookup used for inference.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionTable {
    map: HashMap<String, AssetType>,
}

impl ExtensionTable {
    /// An empty table: nothing can be inferred.
    pub fn empty() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Add or replace a mapping. Leading dots and case are ignored.
    pub fn insert(&mut self, extension: &str, asset_type: AssetType) {
        self.map.insert(normalize_extension(extension), asset_type);
    }

    /// Return a copy with `overrides` applied on top.
    pub fn with_overrides<'a>(
        mut self,
        overrides: impl IntoIterator<Item = (&'a String, &'a AssetType)>,
    ) -> Self {
        for (ext, asset_type) in overrides {
            self.insert(ext, *asset_type);
        }
        self
    }

    pub fn lookup(&self, extension: &str) -> Option<AssetType> {
        self.map.get(&normalize_extension(extension)).copied()
    }

    /// Infer the type of `path` from its extension.
    pub fn infer(&self, path: &Path) -> Option<AssetType> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| self.lookup(e))
    }
}

impl Default for ExtensionTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (asset_type, extensions) in STOCK_EXTENSIONS {
            for ext in *extensions {
                table.insert(ext, *asset_type);
            }
        }
        table
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// A validated processing request for one asset.
///
/// Construction checks the input is an existing, readable file and resolves
/// the asset type, so a value of this type is always safe to dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetConfig {
    input_path: PathBuf,
    output_path: Option<PathBuf>,
    asset_type: AssetType,
    options: ProcessingOptions,
}

impl AssetConfig {
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: Option<PathBuf>,
        asset_type: Option<AssetType>,
        options: ProcessingOptions,
        extensions: &ExtensionTable,
    ) -> Result<Self, ValidationError> {
        let input_path = input_path.into();
        check_readable(&input_path)?;
        let asset_type = match asset_type {
            Some(t) => t,
            None => extensions
                .infer(&input_path)
                .ok_or_else(|| ValidationError::UnresolvedAssetType(input_path.clone()))?,
        };
        Ok(Self {
            input_path,
            output_path,
            asset_type,
            options,
        })
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    /// Explicit output path, if the caller gave one.
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }
}

fn check_readable(path: &Path) -> Result<(), ValidationError> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ValidationError::InputNotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ValidationError::InputUnreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if !metadata.is_file() {
        return Err(ValidationError::NotAFile(path.to_path_buf()));
    }
    File::open(path).map_err(|source| ValidationError::InputUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
